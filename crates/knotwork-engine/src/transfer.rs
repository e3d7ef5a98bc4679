//! Transfer rules: how an active edge's payload lands in its target node.

use std::collections::HashMap;
use std::sync::Arc;

use knotwork_graph::{NodeData, NodeKind};
use serde_json::Value;

/// The source side of one transfer.
#[derive(Debug, Clone, Copy)]
pub struct Transfer<'a> {
  pub source_kind: NodeKind,
  pub payload: &'a Value,
}

/// Writes a transfer into the target payload. Returns `false` when the target
/// payload was not the shape the rule expects.
pub type TransferRule = Arc<dyn Fn(&Transfer<'_>, &mut NodeData) -> bool + Send + Sync>;

/// Rules keyed by `(source kind, target kind)`. A `None` source matches any
/// kind; rules with an exact source take precedence.
#[derive(Clone)]
pub struct TransferRegistry {
  rules: HashMap<(Option<NodeKind>, NodeKind), TransferRule>,
}

impl TransferRegistry {
  /// A registry with no rules at all.
  pub fn empty() -> Self {
    Self {
      rules: HashMap::new(),
    }
  }

  /// Register (or replace) a rule. Pass `None` as the source to match any kind.
  pub fn register<F>(&mut self, source: Option<NodeKind>, target: NodeKind, rule: F)
  where
    F: Fn(&Transfer<'_>, &mut NodeData) -> bool + Send + Sync + 'static,
  {
    self.rules.insert((source, target), Arc::new(rule));
  }

  pub fn lookup(&self, source: NodeKind, target: NodeKind) -> Option<&TransferRule> {
    self
      .rules
      .get(&(Some(source), target))
      .or_else(|| self.rules.get(&(None, target)))
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}

impl Default for TransferRegistry {
  fn default() -> Self {
    let mut registry = Self::empty();
    registry.register(Some(NodeKind::HttpRequest), NodeKind::Response, response_from_http);
    for sink in [NodeKind::Display, NodeKind::Tabulize, NodeKind::Debug] {
      registry.register(None, sink, sink_input);
    }
    registry
  }
}

impl std::fmt::Debug for TransferRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TransferRegistry")
      .field("rules", &self.rules.keys().collect::<Vec<_>>())
      .finish()
  }
}

/// `status` and `data` of an HTTP envelope become the response node's
/// `status` and `response`.
fn response_from_http(transfer: &Transfer<'_>, target: &mut NodeData) -> bool {
  let NodeData::Response(data) = target else {
    return false;
  };
  data.status = transfer.payload.get("status").and_then(status_code);
  data.response = transfer.payload.get("data").cloned();
  true
}

/// Sinks show the payload itself, or the response body for HTTP sources.
fn sink_input(transfer: &Transfer<'_>, target: &mut NodeData) -> bool {
  let Some(sink) = target.as_sink_mut() else {
    return false;
  };
  let value = match (transfer.source_kind, transfer.payload.get("data")) {
    (NodeKind::HttpRequest, Some(body)) => body.clone(),
    _ => transfer.payload.clone(),
  };
  sink.input = Some(value);
  true
}

fn status_code(value: &Value) -> Option<u16> {
  match value {
    Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}
