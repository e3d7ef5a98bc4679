//! Run events and notifiers.
//!
//! Events are emitted by batch runs and by the reactive watcher so callers
//! can surface outcomes without polling the graph.

use knotwork_graph::ExecutionStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Aggregate outcome of a completed batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
  AllSucceeded,
  /// One or more nodes errored. `first_error` is the message of the first
  /// failed node in declaration order.
  PartialFailure {
    failed: Vec<String>,
    first_error: String,
  },
}

impl RunOutcome {
  pub fn is_success(&self) -> bool {
    matches!(self, RunOutcome::AllSucceeded)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
  RunStarted {
    run_id: String,
    node_count: usize,
  },

  /// The backend answered and results were applied.
  RunCompleted {
    run_id: String,
    outcome: RunOutcome,
  },

  /// The run was aborted before anything was applied.
  RunFailed {
    run_id: String,
    error: String,
  },

  ReactiveTriggered {
    node_id: String,
  },

  ReactiveCompleted {
    node_id: String,
    status: ExecutionStatus,
    error: Option<String>,
  },
}

pub trait RunNotifier: Send + Sync {
  fn notify(&self, event: RunEvent);
}

#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl RunNotifier for NoopNotifier {
  fn notify(&self, _event: RunEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
    Self { sender }
  }
}

impl RunNotifier for ChannelNotifier {
  fn notify(&self, event: RunEvent) {
    // Receiver may be gone.
    let _ = self.sender.send(event);
  }
}
