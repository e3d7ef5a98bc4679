//! Error types for running flows.

use knotwork_graph::GraphError;
use thiserror::Error;

/// Errors surfaced by the coordinator and the reactive driver.
#[derive(Debug, Error)]
pub enum EngineError {
  /// The backend could not be reached or answered with something unusable.
  /// Nothing is stamped or propagated when this is returned.
  #[error("execution failed: {reason}")]
  ExecutionFailed { reason: String },

  /// Another batch run is still in flight on this graph.
  #[error("a run is already in progress")]
  RunInProgress,

  #[error(transparent)]
  Graph(#[from] GraphError),
}

impl From<ExecutorError> for EngineError {
  fn from(err: ExecutorError) -> Self {
    EngineError::ExecutionFailed {
      reason: err.to_string(),
    }
  }
}

/// Errors from a [`FlowExecutor`](crate::FlowExecutor) backend.
#[derive(Debug, Error)]
pub enum ExecutorError {
  /// The runner program could not be started.
  #[error("executor '{program}' is unreachable: {source}")]
  Unreachable {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The runner exited unsuccessfully.
  #[error("executor exited with {code}: {stderr}", code = exit_label(.status))]
  Backend { status: Option<i32>, stderr: String },

  /// The runner's answer was not a valid execution response.
  #[error("malformed executor response: {message}")]
  Malformed { message: String },

  #[error("executor timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  #[error("executor I/O failed: {0}")]
  Io(#[from] std::io::Error),
}

fn exit_label(status: &Option<i32>) -> String {
  match status {
    Some(code) => format!("status {}", code),
    None => "a signal".to_string(),
  }
}
