//! Async driver for the reactive watch layer.

use std::sync::Arc;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use knotwork_graph::{
  ApiResponse, Environment, ExecutionResult, Flow, GraphError, GraphModel, NodeData,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{EngineError, ExecutorError};
use crate::events::{NoopNotifier, RunEvent, RunNotifier};
use crate::executor::{ExecutionResponse, FlowExecutor};
use crate::reactive::ReactiveWatchLayer;
use crate::router::HandleRouter;
use crate::shared::SharedGraph;

type Execution = BoxFuture<'static, (String, Result<ExecutionResponse, ExecutorError>)>;

/// Watches a shared graph and runs reactively triggered nodes.
///
/// Each triggered node is sent to the backend on its own, as a one-node flow.
/// Results are written straight into the graph; they never pass through the
/// batch coordinator.
///
/// ```ignore
/// let watcher = ReactiveWatcher::new(graph.clone(), executor, env);
/// let cancel = CancellationToken::new();
/// tokio::spawn(watcher.start(cancel.clone()));
/// ```
pub struct ReactiveWatcher<N: RunNotifier = NoopNotifier> {
  graph: SharedGraph,
  executor: Arc<dyn FlowExecutor>,
  env: Environment,
  layer: ReactiveWatchLayer,
  notifier: N,
}

impl ReactiveWatcher<NoopNotifier> {
  pub fn new(graph: SharedGraph, executor: Arc<dyn FlowExecutor>, env: Environment) -> Self {
    Self::with_notifier(graph, executor, env, NoopNotifier)
  }
}

impl<N: RunNotifier> ReactiveWatcher<N> {
  pub fn with_notifier(
    graph: SharedGraph,
    executor: Arc<dyn FlowExecutor>,
    env: Environment,
    notifier: N,
  ) -> Self {
    Self {
      graph,
      executor,
      env,
      layer: ReactiveWatchLayer::new(),
      notifier,
    }
  }

  pub fn with_layer(mut self, layer: ReactiveWatchLayer) -> Self {
    self.layer = layer;
    self
  }

  /// Run until cancelled.
  pub async fn start(mut self, cancel: CancellationToken) -> Result<(), EngineError> {
    info!("starting reactive watcher");

    let mut revisions = self.graph.subscribe();
    let mut in_flight: FuturesUnordered<Execution> = FuturesUnordered::new();

    self.scan(&mut in_flight).await;

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!(pending = in_flight.len(), "reactive watcher cancelled");
          break;
        }
        changed = revisions.changed() => {
          if changed.is_err() {
            break;
          }
          self.scan(&mut in_flight).await;
        }
        Some((node_id, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
          self.complete(node_id, outcome).await;
        }
      }
    }

    Ok(())
  }

  async fn scan(&mut self, in_flight: &mut FuturesUnordered<Execution>) {
    let flows: Vec<(String, Flow)> = {
      let graph = self.graph.read().await;
      self
        .layer
        .observe(&graph)
        .into_iter()
        .filter_map(|id| {
          let node = graph.node(&id)?.clone();
          Some((
            id,
            Flow {
              nodes: vec![node],
              edges: vec![],
            },
          ))
        })
        .collect()
    };

    for (node_id, flow) in flows {
      info!(node_id = %node_id, "reactive_triggered");
      self.notifier.notify(RunEvent::ReactiveTriggered {
        node_id: node_id.clone(),
      });

      let executor = self.executor.clone();
      let env = self.env.clone();
      in_flight.push(Box::pin(async move {
        let outcome = executor.execute_flow(&flow, &env).await;
        (node_id, outcome)
      }));
    }
  }

  async fn complete(
    &mut self,
    node_id: String,
    outcome: Result<ExecutionResponse, ExecutorError>,
  ) {
    let result = match outcome {
      Ok(mut response) => response
        .results
        .remove(&node_id)
        .unwrap_or_else(|| ExecutionResult::error(&node_id, "executor returned no result")),
      Err(e) => ExecutionResult::error(&node_id, e.to_string()),
    };

    self.layer.finish(&node_id);

    if result.is_success() {
      info!(node_id = %node_id, "reactive_completed");
    } else {
      warn!(
        node_id = %node_id,
        error = result.error.as_deref().unwrap_or_default(),
        "reactive_failed"
      );
    }
    let event = RunEvent::ReactiveCompleted {
      node_id: node_id.clone(),
      status: result.status,
      error: result.error.clone(),
    };

    let applied = self
      .graph
      .update(|model| apply_reactive_result(model, &node_id, result))
      .await;
    if let Err(e) = applied {
      warn!(node_id = %node_id, error = %e, "reactive result dropped");
    }
    self.notifier.notify(event);
  }
}

/// Stamp a directly executed node, record its last response and re-animate
/// its outgoing edges.
pub fn apply_reactive_result(
  model: &mut GraphModel,
  node_id: &str,
  result: ExecutionResult,
) -> Result<(), GraphError> {
  let node = model
    .node(node_id)
    .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?
    .clone();

  if let NodeData::HttpRequest(mut data) = node.data.clone() {
    data.last_response = Some(api_response(&result));
    model.update_node_data(node_id, NodeData::HttpRequest(data))?;
  }

  let outgoing: Vec<(String, bool)> = model
    .edges()
    .iter()
    .filter(|e| e.source == node_id)
    .map(|e| (e.id.clone(), HandleRouter::is_active(e, &node, &result)))
    .collect();
  for (edge_id, active) in outgoing {
    model.set_edge_animated(&edge_id, active)?;
  }

  model.set_execution_result(node_id, result)
}

fn api_response(result: &ExecutionResult) -> ApiResponse {
  let status = result
    .output
    .get("status")
    .and_then(|s| s.as_u64())
    .and_then(|s| u16::try_from(s).ok());
  let error = result.error.clone().or_else(|| {
    result
      .output
      .get("error")
      .and_then(|e| e.as_str())
      .map(str::to_string)
  });

  ApiResponse {
    success: result.is_success(),
    status,
    data: result.output.get("data").cloned(),
    error,
  }
}
