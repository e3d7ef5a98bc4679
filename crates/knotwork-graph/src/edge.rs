use serde::{Deserialize, Serialize};

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
  pub id: String,
  pub source: String,
  pub target: String,
  /// Output handle on the source node, e.g. `success` or `true`.
  #[serde(default)]
  pub source_handle: Option<String>,
  #[serde(default)]
  pub target_handle: Option<String>,
  /// Transient UI flag marking an edge that just carried a result.
  #[serde(default)]
  pub animated: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub style: Option<serde_json::Value>,
}

impl Edge {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      source_handle: None,
      target_handle: None,
      animated: false,
      style: None,
    }
  }

  /// Builder-style source handle.
  pub fn from_handle(mut self, handle: impl Into<String>) -> Self {
    self.source_handle = Some(handle.into());
    self
  }

  pub fn source_handle(&self) -> Option<&str> {
    self.source_handle.as_deref()
  }
}
