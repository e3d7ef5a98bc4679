//! Typed node payloads, one per [`NodeKind`].
//!
//! Every payload flattens unrecognised keys into `extra`, so a flow written by a
//! newer editor survives a load/save cycle untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::kind::NodeKind;
use crate::lenient;

type Extra = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
  #[default]
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
  Json,
  FormData,
  Multipart,
}

/// Response captured by a direct (non-batch) execution of an HTTP request node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
  pub success: bool,
  #[serde(default, deserialize_with = "lenient::optional_u16")]
  pub status: Option<u16>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestData {
  #[serde(default)]
  pub method: HttpMethod,
  #[serde(default)]
  pub endpoint: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub params: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub headers: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_type: Option<ContentType>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_response: Option<ApiResponse>,
  #[serde(flatten)]
  pub extra: Extra,
}

/// Display of an HTTP response delivered over a `success`/`failure` edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
  #[serde(
    default,
    deserialize_with = "lenient::optional_u16",
    skip_serializing_if = "Option::is_none"
  )]
  pub status: Option<u16>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub response: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub latency: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
  #[default]
  #[serde(alias = "equals")]
  Equal,
  #[serde(alias = "notEquals")]
  NotEqual,
  GreaterThan,
  LessThan,
  Contains,
}

/// A two-input comparison. `input` is the left side, `target_value` the right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionData {
  #[serde(default)]
  pub condition: ComparisonOperator,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub input: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_value: Option<Value>,
  #[serde(flatten)]
  pub extra: Extra,
}

/// Shared shape of the display, tabulize and debug sinks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SinkData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub input: Option<Value>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
  #[default]
  String,
  Number,
  Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputData {
  #[serde(default)]
  pub key: String,
  #[serde(default)]
  pub value: String,
  #[serde(default, rename = "type")]
  pub value_type: InputType,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopData {
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureData {
  /// Dotted path into the upstream output, e.g. `data.token`.
  #[serde(default)]
  pub path: String,
  #[serde(default)]
  pub variable: String,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapperData {
  #[serde(default)]
  pub mapping: Map<String, Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fallback: Option<Value>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterOperation {
  #[default]
  Increment,
  Decrement,
  Set,
  Assign,
  Append,
  Prepend,
  Pop,
  Shift,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterData {
  #[serde(default)]
  pub variable: String,
  #[serde(default)]
  pub operation: CounterOperation,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub amount: Option<Value>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScraperRule {
  #[serde(default)]
  pub selector: String,
  #[serde(default)]
  pub attribute: String,
  #[serde(default)]
  pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScraperData {
  #[serde(default)]
  pub container_selector: String,
  #[serde(default)]
  pub rules: Vec<ScraperRule>,
  #[serde(flatten)]
  pub extra: Extra,
}

/// Filter and assert predicates are evaluated by the backend; the operator
/// names are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterData {
  #[serde(default)]
  pub property: String,
  #[serde(default)]
  pub condition: String,
  #[serde(default)]
  pub value: String,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertData {
  #[serde(default)]
  pub condition: String,
  #[serde(default)]
  pub value: String,
  #[serde(default)]
  pub message: String,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayMapData {
  #[serde(default)]
  pub path: String,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarouselData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub items: Option<Vec<Value>>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentData {
  #[serde(default)]
  pub text: String,
  #[serde(flatten)]
  pub extra: Extra,
}

/// Shared shape of group, start, output and the terminal case nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerTriggerData {
  #[serde(default)]
  pub method: HttpMethod,
  #[serde(default)]
  pub path: String,
  #[serde(
    default,
    deserialize_with = "lenient::optional_u16",
    skip_serializing_if = "Option::is_none"
  )]
  pub port: Option<u16>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerResponseData {
  #[serde(
    default,
    deserialize_with = "lenient::optional_u16",
    skip_serializing_if = "Option::is_none"
  )]
  pub status: Option<u16>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<Value>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSelectorData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub selected_value: Option<Value>,
  #[serde(flatten)]
  pub extra: Extra,
}

/// A node's payload, tagged by its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
  HttpRequest(HttpRequestData),
  Response(ResponseData),
  Condition(ConditionData),
  Debug(SinkData),
  Input(InputData),
  Output(LabelData),
  Start(LabelData),
  Loop(LoopData),
  Capture(CaptureData),
  Mapper(MapperData),
  Counter(CounterData),
  Scraper(ScraperData),
  Filter(FilterData),
  ArrayMap(ArrayMapData),
  Carousel(CarouselData),
  Assert(AssertData),
  Comment(CommentData),
  Group(LabelData),
  ServerTrigger(ServerTriggerData),
  ServerResponse(ServerResponseData),
  Display(SinkData),
  Tabulize(SinkData),
  CaseSuccess(LabelData),
  CaseFail(LabelData),
  ValueSelector(ValueSelectorData),
}

impl NodeData {
  pub fn kind(&self) -> NodeKind {
    match self {
      NodeData::HttpRequest(_) => NodeKind::HttpRequest,
      NodeData::Response(_) => NodeKind::Response,
      NodeData::Condition(_) => NodeKind::Condition,
      NodeData::Debug(_) => NodeKind::Debug,
      NodeData::Input(_) => NodeKind::Input,
      NodeData::Output(_) => NodeKind::Output,
      NodeData::Start(_) => NodeKind::Start,
      NodeData::Loop(_) => NodeKind::Loop,
      NodeData::Capture(_) => NodeKind::Capture,
      NodeData::Mapper(_) => NodeKind::Mapper,
      NodeData::Counter(_) => NodeKind::Counter,
      NodeData::Scraper(_) => NodeKind::Scraper,
      NodeData::Filter(_) => NodeKind::Filter,
      NodeData::ArrayMap(_) => NodeKind::ArrayMap,
      NodeData::Carousel(_) => NodeKind::Carousel,
      NodeData::Assert(_) => NodeKind::Assert,
      NodeData::Comment(_) => NodeKind::Comment,
      NodeData::Group(_) => NodeKind::Group,
      NodeData::ServerTrigger(_) => NodeKind::ServerTrigger,
      NodeData::ServerResponse(_) => NodeKind::ServerResponse,
      NodeData::Display(_) => NodeKind::Display,
      NodeData::Tabulize(_) => NodeKind::Tabulize,
      NodeData::CaseSuccess(_) => NodeKind::CaseSuccess,
      NodeData::CaseFail(_) => NodeKind::CaseFail,
      NodeData::ValueSelector(_) => NodeKind::ValueSelector,
    }
  }

  /// An empty payload of the given kind, as created from the editor's node menu.
  pub fn empty(kind: NodeKind) -> Self {
    match kind {
      NodeKind::HttpRequest => NodeData::HttpRequest(Default::default()),
      NodeKind::Response => NodeData::Response(Default::default()),
      NodeKind::Condition => NodeData::Condition(Default::default()),
      NodeKind::Debug => NodeData::Debug(Default::default()),
      NodeKind::Input => NodeData::Input(Default::default()),
      NodeKind::Output => NodeData::Output(Default::default()),
      NodeKind::Start => NodeData::Start(Default::default()),
      NodeKind::Loop => NodeData::Loop(Default::default()),
      NodeKind::Capture => NodeData::Capture(Default::default()),
      NodeKind::Mapper => NodeData::Mapper(Default::default()),
      NodeKind::Counter => NodeData::Counter(Default::default()),
      NodeKind::Scraper => NodeData::Scraper(Default::default()),
      NodeKind::Filter => NodeData::Filter(Default::default()),
      NodeKind::ArrayMap => NodeData::ArrayMap(Default::default()),
      NodeKind::Carousel => NodeData::Carousel(Default::default()),
      NodeKind::Assert => NodeData::Assert(Default::default()),
      NodeKind::Comment => NodeData::Comment(Default::default()),
      NodeKind::Group => NodeData::Group(Default::default()),
      NodeKind::ServerTrigger => NodeData::ServerTrigger(Default::default()),
      NodeKind::ServerResponse => NodeData::ServerResponse(Default::default()),
      NodeKind::Display => NodeData::Display(Default::default()),
      NodeKind::Tabulize => NodeData::Tabulize(Default::default()),
      NodeKind::CaseSuccess => NodeData::CaseSuccess(Default::default()),
      NodeKind::CaseFail => NodeData::CaseFail(Default::default()),
      NodeKind::ValueSelector => NodeData::ValueSelector(Default::default()),
    }
  }

  /// Parse the raw `data` object of a node of the given kind.
  ///
  /// `null` is treated as an empty object.
  pub fn from_value(kind: NodeKind, value: Value) -> Result<Self, serde_json::Error> {
    let value = match value {
      Value::Null => Value::Object(Map::new()),
      other => other,
    };

    Ok(match kind {
      NodeKind::HttpRequest => NodeData::HttpRequest(serde_json::from_value(value)?),
      NodeKind::Response => NodeData::Response(serde_json::from_value(value)?),
      NodeKind::Condition => NodeData::Condition(serde_json::from_value(value)?),
      NodeKind::Debug => NodeData::Debug(serde_json::from_value(value)?),
      NodeKind::Input => NodeData::Input(serde_json::from_value(value)?),
      NodeKind::Output => NodeData::Output(serde_json::from_value(value)?),
      NodeKind::Start => NodeData::Start(serde_json::from_value(value)?),
      NodeKind::Loop => NodeData::Loop(serde_json::from_value(value)?),
      NodeKind::Capture => NodeData::Capture(serde_json::from_value(value)?),
      NodeKind::Mapper => NodeData::Mapper(serde_json::from_value(value)?),
      NodeKind::Counter => NodeData::Counter(serde_json::from_value(value)?),
      NodeKind::Scraper => NodeData::Scraper(serde_json::from_value(value)?),
      NodeKind::Filter => NodeData::Filter(serde_json::from_value(value)?),
      NodeKind::ArrayMap => NodeData::ArrayMap(serde_json::from_value(value)?),
      NodeKind::Carousel => NodeData::Carousel(serde_json::from_value(value)?),
      NodeKind::Assert => NodeData::Assert(serde_json::from_value(value)?),
      NodeKind::Comment => NodeData::Comment(serde_json::from_value(value)?),
      NodeKind::Group => NodeData::Group(serde_json::from_value(value)?),
      NodeKind::ServerTrigger => NodeData::ServerTrigger(serde_json::from_value(value)?),
      NodeKind::ServerResponse => NodeData::ServerResponse(serde_json::from_value(value)?),
      NodeKind::Display => NodeData::Display(serde_json::from_value(value)?),
      NodeKind::Tabulize => NodeData::Tabulize(serde_json::from_value(value)?),
      NodeKind::CaseSuccess => NodeData::CaseSuccess(serde_json::from_value(value)?),
      NodeKind::CaseFail => NodeData::CaseFail(serde_json::from_value(value)?),
      NodeKind::ValueSelector => NodeData::ValueSelector(serde_json::from_value(value)?),
    })
  }

  /// Serialize the payload back into the node's `data` object.
  pub fn to_value(&self) -> Result<Value, serde_json::Error> {
    match self {
      NodeData::HttpRequest(d) => serde_json::to_value(d),
      NodeData::Response(d) => serde_json::to_value(d),
      NodeData::Condition(d) => serde_json::to_value(d),
      NodeData::Input(d) => serde_json::to_value(d),
      NodeData::Loop(d) => serde_json::to_value(d),
      NodeData::Capture(d) => serde_json::to_value(d),
      NodeData::Mapper(d) => serde_json::to_value(d),
      NodeData::Counter(d) => serde_json::to_value(d),
      NodeData::Scraper(d) => serde_json::to_value(d),
      NodeData::Filter(d) => serde_json::to_value(d),
      NodeData::ArrayMap(d) => serde_json::to_value(d),
      NodeData::Carousel(d) => serde_json::to_value(d),
      NodeData::Assert(d) => serde_json::to_value(d),
      NodeData::Comment(d) => serde_json::to_value(d),
      NodeData::ServerTrigger(d) => serde_json::to_value(d),
      NodeData::ServerResponse(d) => serde_json::to_value(d),
      NodeData::ValueSelector(d) => serde_json::to_value(d),
      NodeData::Debug(d) | NodeData::Display(d) | NodeData::Tabulize(d) => serde_json::to_value(d),
      NodeData::Output(d)
      | NodeData::Start(d)
      | NodeData::Group(d)
      | NodeData::CaseSuccess(d)
      | NodeData::CaseFail(d) => serde_json::to_value(d),
    }
  }

  /// The sink payload for display, tabulize and debug nodes.
  pub fn as_sink_mut(&mut self) -> Option<&mut SinkData> {
    match self {
      NodeData::Debug(d) | NodeData::Display(d) | NodeData::Tabulize(d) => Some(d),
      _ => None,
    }
  }

  pub fn as_condition(&self) -> Option<&ConditionData> {
    match self {
      NodeData::Condition(d) => Some(d),
      _ => None,
    }
  }
}
