use thiserror::Error;

use crate::kind::NodeKind;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("edge not found: {0}")]
  EdgeNotFound(String),

  #[error("edge '{edge_id}' references unknown node '{node_id}'")]
  InvalidReference { edge_id: String, node_id: String },

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("duplicate edge id: {0}")]
  DuplicateEdge(String),

  #[error("edge '{edge_id}' connects node '{node_id}' to itself")]
  SelfLoop { edge_id: String, node_id: String },

  #[error("node '{node_id}' is a {expected} node, got {actual} data")]
  KindMismatch {
    node_id: String,
    expected: NodeKind,
    actual: NodeKind,
  },
}
