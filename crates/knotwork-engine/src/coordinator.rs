//! Batch runs.
//!
//! A run snapshots the shared graph, hands it to the backend, validates the
//! answer, then in one graph update stamps every reported node and walks the
//! edges. The captured variables are replaced wholesale. A failed round trip
//! applies nothing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use knotwork_graph::{Environment, ExecutionResult, ExecutionStatus, Flow, GraphModel};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::error::EngineError;
use crate::events::{NoopNotifier, RunEvent, RunNotifier, RunOutcome};
use crate::executor::{ExecutionResponse, FlowExecutor};
use crate::propagation::{PropagationEngine, PropagationReport};
use crate::shared::SharedGraph;
use crate::variables::Variables;

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub run_id: String,
  pub response: ExecutionResponse,
  pub outcome: RunOutcome,
  pub propagation: PropagationReport,
}

/// Coordinates batch runs for one shared graph.
///
/// At most one run is in flight at a time; a second call while one is pending
/// fails with [`EngineError::RunInProgress`].
pub struct ExecutionCoordinator<N: RunNotifier = NoopNotifier> {
  graph: SharedGraph,
  executor: Arc<dyn FlowExecutor>,
  variables: Variables,
  propagation: PropagationEngine,
  notifier: N,
  in_flight: AtomicBool,
}

impl ExecutionCoordinator<NoopNotifier> {
  pub fn new(graph: SharedGraph, executor: Arc<dyn FlowExecutor>, variables: Variables) -> Self {
    Self::with_notifier(graph, executor, variables, NoopNotifier)
  }
}

impl<N: RunNotifier> ExecutionCoordinator<N> {
  pub fn with_notifier(
    graph: SharedGraph,
    executor: Arc<dyn FlowExecutor>,
    variables: Variables,
    notifier: N,
  ) -> Self {
    Self {
      graph,
      executor,
      variables,
      propagation: PropagationEngine::default(),
      notifier,
      in_flight: AtomicBool::new(false),
    }
  }

  /// Replace the propagation engine, e.g. to register extra transfer rules.
  pub fn with_propagation(mut self, propagation: PropagationEngine) -> Self {
    self.propagation = propagation;
    self
  }

  pub fn graph(&self) -> &SharedGraph {
    &self.graph
  }

  pub fn variables(&self) -> &Variables {
    &self.variables
  }

  pub fn is_running(&self) -> bool {
    self.in_flight.load(Ordering::Acquire)
  }

  /// Execute the whole graph once.
  #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
  pub async fn run(&self, env: &Environment) -> Result<RunReport, EngineError> {
    let _guard = RunGuard::acquire(&self.in_flight)?;

    let run_id = uuid::Uuid::new_v4().to_string();
    tracing::Span::current().record("run_id", run_id.as_str());

    let flow = self.graph.read().await.to_flow();
    info!(run_id = %run_id, node_count = flow.nodes.len(), "run_started");
    self.notifier.notify(RunEvent::RunStarted {
      run_id: run_id.clone(),
      node_count: flow.nodes.len(),
    });

    let response = match self.round_trip(&flow, env).await {
      Ok(response) => response,
      Err(e) => {
        error!(run_id = %run_id, error = %e, "run_failed");
        self.notifier.notify(RunEvent::RunFailed {
          run_id: run_id.clone(),
          error: e.to_string(),
        });
        return Err(e);
      }
    };

    self.variables.replace(response.variables.clone());

    let propagation = self
      .graph
      .update(|model| self.apply(model, &response.results))
      .await?;

    let outcome = outcome_of(&flow, &response.results);
    match &outcome {
      RunOutcome::AllSucceeded => {
        info!(
          run_id = %run_id,
          results = response.results.len(),
          transfers = propagation.applied.len(),
          "run_completed"
        );
      }
      RunOutcome::PartialFailure {
        failed,
        first_error,
      } => {
        warn!(
          run_id = %run_id,
          failed = failed.len(),
          first_error = %first_error,
          "run_completed_with_failures"
        );
      }
    }
    self.notifier.notify(RunEvent::RunCompleted {
      run_id: run_id.clone(),
      outcome: outcome.clone(),
    });

    Ok(RunReport {
      run_id,
      response,
      outcome,
      propagation,
    })
  }

  async fn round_trip(
    &self,
    flow: &Flow,
    env: &Environment,
  ) -> Result<ExecutionResponse, EngineError> {
    let response = self.executor.execute_flow(flow, env).await?;
    validate(flow, &response)?;
    Ok(response)
  }

  fn apply(
    &self,
    model: &mut GraphModel,
    results: &HashMap<String, ExecutionResult>,
  ) -> Result<PropagationReport, EngineError> {
    // Nodes deleted while the run was in flight are skipped.
    let stamped: Vec<&ExecutionResult> = model
      .nodes()
      .iter()
      .filter_map(|n| results.get(&n.id))
      .collect();

    for result in stamped {
      model.set_execution_result(&result.node_id, result.clone())?;
    }

    Ok(self.propagation.propagate(model, results)?)
  }
}

/// Reject answers that do not describe the submitted snapshot.
fn validate(flow: &Flow, response: &ExecutionResponse) -> Result<(), EngineError> {
  for (key, result) in &response.results {
    if !flow.contains_node(key) {
      return Err(EngineError::ExecutionFailed {
        reason: format!("result for unknown node '{}'", key),
      });
    }
    if &result.node_id != key {
      return Err(EngineError::ExecutionFailed {
        reason: format!(
          "result keyed '{}' reports node_id '{}'",
          key, result.node_id
        ),
      });
    }
  }
  Ok(())
}

fn outcome_of(flow: &Flow, results: &HashMap<String, ExecutionResult>) -> RunOutcome {
  let failed: Vec<&ExecutionResult> = flow
    .nodes
    .iter()
    .filter_map(|n| results.get(&n.id))
    .filter(|r| r.status == ExecutionStatus::Error)
    .collect();

  let Some(first) = failed.first() else {
    return RunOutcome::AllSucceeded;
  };
  let first_error = first
    .error
    .clone()
    .unwrap_or_else(|| format!("node '{}' failed", first.node_id));

  RunOutcome::PartialFailure {
    failed: failed.iter().map(|r| r.node_id.clone()).collect(),
    first_error,
  }
}

/// Holds the in-flight flag for the lifetime of one run.
struct RunGuard<'a> {
  flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
  fn acquire(flag: &'a AtomicBool) -> Result<Self, EngineError> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .map_err(|_| EngineError::RunInProgress)?;
    Ok(Self { flag })
  }
}

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    self.flag.store(false, Ordering::Release);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use knotwork_graph::{Node, NodeKind};
  use serde_json::json;

  fn flow_of(ids: &[&str]) -> Flow {
    Flow {
      nodes: ids
        .iter()
        .map(|id| Node::of_kind(*id, NodeKind::Mapper))
        .collect(),
      edges: vec![],
    }
  }

  fn results(entries: Vec<ExecutionResult>) -> HashMap<String, ExecutionResult> {
    entries
      .into_iter()
      .map(|r| (r.node_id.clone(), r))
      .collect()
  }

  #[test]
  fn test_guard_rejects_second_run() {
    let flag = AtomicBool::new(false);
    let guard = RunGuard::acquire(&flag).unwrap();
    assert!(matches!(
      RunGuard::acquire(&flag),
      Err(EngineError::RunInProgress)
    ));
    drop(guard);
    assert!(RunGuard::acquire(&flag).is_ok());
  }

  #[test]
  fn test_validate_rejects_foreign_and_mislabelled_results() {
    let flow = flow_of(&["a", "b"]);

    let foreign = ExecutionResponse {
      results: results(vec![ExecutionResult::success("zzz", json!(null))]),
      variables: Default::default(),
    };
    assert!(matches!(
      validate(&flow, &foreign),
      Err(EngineError::ExecutionFailed { .. })
    ));

    let mut mislabelled = HashMap::new();
    mislabelled.insert("a".to_string(), ExecutionResult::success("b", json!(null)));
    let mislabelled = ExecutionResponse {
      results: mislabelled,
      variables: Default::default(),
    };
    assert!(validate(&flow, &mislabelled).is_err());

    let subset = ExecutionResponse {
      results: results(vec![ExecutionResult::success("b", json!(1))]),
      variables: Default::default(),
    };
    assert!(validate(&flow, &subset).is_ok());
  }

  #[test]
  fn test_outcome_reports_first_error_in_node_order() {
    let flow = flow_of(&["a", "b", "c"]);
    let results = results(vec![
      ExecutionResult::error("c", "third"),
      ExecutionResult::success("a", json!(1)),
      ExecutionResult::error("b", "second"),
    ]);

    assert_eq!(
      outcome_of(&flow, &results),
      RunOutcome::PartialFailure {
        failed: vec!["b".to_string(), "c".to_string()],
        first_error: "second".to_string(),
      }
    );

    let ok = HashMap::from([("a".to_string(), ExecutionResult::success("a", json!(1)))]);
    assert_eq!(outcome_of(&flow, &ok), RunOutcome::AllSucceeded);
  }
}
