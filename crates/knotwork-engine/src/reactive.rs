//! Reactive watches.
//!
//! Some node kinds re-execute on their own when the node feeding them changes,
//! outside any batch run. This module holds the state machine: it re-derives
//! each watched node's predicate from the current graph and reports the nodes
//! whose predicate just turned true. Executing them is up to the caller (see
//! [`ReactiveWatcher`](crate::ReactiveWatcher)), which reports back with
//! [`ReactiveWatchLayer::finish`].

use std::collections::HashMap;

use knotwork_graph::{GraphModel, Node, NodeData, NodeKind, Topology, handle};

use crate::condition;

/// Decides whether a watched node should run, given the current graph.
pub type ReactivePredicate = fn(&GraphModel, &Topology, &Node) -> bool;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchPhase {
  #[default]
  Idle,
  Executing,
}

#[derive(Debug, Clone, Copy, Default)]
struct WatchState {
  phase: WatchPhase,
  /// Predicate value at the previous observation.
  armed: bool,
}

#[derive(Debug, Clone)]
pub struct ReactiveWatchLayer {
  predicates: HashMap<NodeKind, ReactivePredicate>,
  states: HashMap<String, WatchState>,
}

impl Default for ReactiveWatchLayer {
  fn default() -> Self {
    let mut layer = Self::empty();
    layer.register(NodeKind::HttpRequest, upstream_condition_true);
    layer
  }
}

impl ReactiveWatchLayer {
  pub fn new() -> Self {
    Self::default()
  }

  /// A layer watching nothing.
  pub fn empty() -> Self {
    Self {
      predicates: HashMap::new(),
      states: HashMap::new(),
    }
  }

  pub fn register(&mut self, kind: NodeKind, predicate: ReactivePredicate) {
    self.predicates.insert(kind, predicate);
  }

  pub fn watches(&self, kind: NodeKind) -> bool {
    self.predicates.contains_key(&kind)
  }

  pub fn phase(&self, node_id: &str) -> WatchPhase {
    self
      .states
      .get(node_id)
      .map(|s| s.phase)
      .unwrap_or_default()
  }

  /// Re-evaluate every watched node and return those to execute now.
  ///
  /// A node is returned only when its predicate goes from false to true while
  /// it is idle; it is then `Executing` until [`finish`](Self::finish). A
  /// rising edge seen while executing is dropped.
  pub fn observe(&mut self, graph: &GraphModel) -> Vec<String> {
    self.states.retain(|id, _| graph.node(id).is_some());

    let topology = graph.topology();
    let mut triggered = Vec::new();

    for node in graph.nodes() {
      let Some(predicate) = self.predicates.get(&node.kind()) else {
        continue;
      };
      let now = predicate(graph, &topology, node);
      let state = self.states.entry(node.id.clone()).or_default();
      let rising = now && !state.armed;
      state.armed = now;

      if rising && state.phase == WatchPhase::Idle {
        state.phase = WatchPhase::Executing;
        triggered.push(node.id.clone());
      }
    }

    triggered
  }

  /// Mark a triggered node's execution as finished.
  pub fn finish(&mut self, node_id: &str) {
    if let Some(state) = self.states.get_mut(node_id) {
      state.phase = WatchPhase::Idle;
    }
  }
}

/// The first edge into `node` leaves a condition node through `true`, and that
/// condition currently holds.
pub fn upstream_condition_true(graph: &GraphModel, topology: &Topology, node: &Node) -> bool {
  let Some(edge) = topology
    .feeding_edge(&node.id)
    .and_then(|index| graph.edges().get(index))
  else {
    return false;
  };
  if edge.source_handle() != Some(handle::TRUE) {
    return false;
  }
  let Some(source) = graph.node(&edge.source) else {
    return false;
  };
  let NodeData::Condition(data) = &source.data else {
    return false;
  };
  condition::resolve(data, source.execution_result.as_ref()) == Some(true)
}
