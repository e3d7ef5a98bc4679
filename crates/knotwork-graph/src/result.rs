//! Per-node execution results as reported by the backend.

use serde::{Deserialize, Serialize};

/// Outcome of one node in one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
  Success,
  Error,
  Skipped,
}

/// Result of executing a single node.
///
/// Produced once per node per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
  pub node_id: String,
  pub status: ExecutionStatus,
  #[serde(default)]
  pub output: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Branch hint some backends attach. Routing does not depend on it.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub active_handle: Option<String>,
}

impl ExecutionResult {
  pub fn success(node_id: impl Into<String>, output: serde_json::Value) -> Self {
    Self {
      node_id: node_id.into(),
      status: ExecutionStatus::Success,
      output,
      error: None,
      active_handle: None,
    }
  }

  pub fn error(node_id: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      node_id: node_id.into(),
      status: ExecutionStatus::Error,
      output: serde_json::Value::Null,
      error: Some(message.into()),
      active_handle: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.status == ExecutionStatus::Success
  }
}
