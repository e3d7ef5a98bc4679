#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use knotwork_engine::{ExecutionResponse, ExecutorError, FlowExecutor};
use knotwork_graph::{Environment, ExecutionResult, Flow};
use serde_json::{Map, Value};
use tokio::sync::Notify;

type Responder = dyn Fn(&Flow) -> Result<ExecutionResponse, ExecutorError> + Send + Sync;

/// In-memory backend answering from a closure.
pub struct ScriptedExecutor {
  responder: Box<Responder>,
  calls: AtomicUsize,
  flows: Mutex<Vec<Flow>>,
  /// Signalled when a call starts.
  pub entered: Arc<Notify>,
  /// When set, each call waits for a permit before answering.
  gate: Option<Arc<Notify>>,
}

impl ScriptedExecutor {
  pub fn new<F>(responder: F) -> Self
  where
    F: Fn(&Flow) -> Result<ExecutionResponse, ExecutorError> + Send + Sync + 'static,
  {
    Self {
      responder: Box::new(responder),
      calls: AtomicUsize::new(0),
      flows: Mutex::new(Vec::new()),
      entered: Arc::new(Notify::new()),
      gate: None,
    }
  }

  /// Always answer with the same results and variables.
  pub fn fixed(results: Vec<ExecutionResult>, variables: Map<String, Value>) -> Self {
    let response = response(results, variables);
    Self::new(move |_| Ok(response.clone()))
  }

  pub fn gated(mut self, gate: Arc<Notify>) -> Self {
    self.gate = Some(gate);
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn flows(&self) -> Vec<Flow> {
    self.flows.lock().unwrap().clone()
  }
}

#[async_trait]
impl FlowExecutor for ScriptedExecutor {
  async fn execute_flow(
    &self,
    flow: &Flow,
    _env: &Environment,
  ) -> Result<ExecutionResponse, ExecutorError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.flows.lock().unwrap().push(flow.clone());
    self.entered.notify_one();
    if let Some(gate) = &self.gate {
      gate.notified().await;
    }
    (self.responder)(flow)
  }
}

pub fn response(results: Vec<ExecutionResult>, variables: Map<String, Value>) -> ExecutionResponse {
  ExecutionResponse {
    results: results
      .into_iter()
      .map(|r| (r.node_id.clone(), r))
      .collect::<HashMap<_, _>>(),
    variables,
  }
}

pub fn vars(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    _ => Map::new(),
  }
}
