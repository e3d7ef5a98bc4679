//! Knotwork Graph
//!
//! Serializable graph types for knotwork flows: typed nodes, edges tagged with
//! output handles, per-node execution results, and the [`GraphModel`] through
//! which every mutation passes.
//!
//! A saved flow is plain JSON:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "req", "type": "httpRequest", "position": { "x": 0, "y": 0 },
//!       "data": { "method": "GET", "endpoint": "https://example.com" } },
//!     { "id": "out", "type": "response", "data": {} }
//!   ],
//!   "edges": [
//!     { "id": "e1", "source": "req", "target": "out", "sourceHandle": "success" }
//!   ]
//! }
//! ```

mod edge;
mod error;
mod flow;
mod graph;
mod kind;
mod lenient;
mod model;
mod node;
mod payload;
mod result;

pub use edge::Edge;
pub use error::GraphError;
pub use flow::{Environment, Flow};
pub use graph::Topology;
pub use kind::{HandleSet, NodeKind, handle};
pub use model::GraphModel;
pub use node::{Node, Position};
pub use payload::{
  ApiResponse, ArrayMapData, AssertData, CaptureData, CarouselData, CommentData,
  ComparisonOperator, ConditionData, ContentType, CounterData, CounterOperation, FilterData,
  HttpMethod, HttpRequestData, InputData, InputType, LabelData, LoopData, MapperData, NodeData,
  ResponseData, ScraperData, ScraperRule, ServerResponseData, ServerTriggerData, SinkData,
  ValueSelectorData,
};
pub use result::{ExecutionResult, ExecutionStatus};
