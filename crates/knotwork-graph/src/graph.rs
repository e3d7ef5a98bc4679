use std::collections::{HashMap, HashSet};

use crate::edge::Edge;
use crate::node::Node;

/// Adjacency index over a node/edge set.
///
/// Edge lists are edge indices in declaration order. The index is rebuilt from
/// the model on demand and never cached across mutations.
#[derive(Debug, Clone)]
pub struct Topology {
  /// node_id -> indices of edges leaving it.
  outgoing: HashMap<String, Vec<usize>>,
  /// node_id -> indices of edges entering it.
  incoming: HashMap<String, Vec<usize>>,
  /// Nodes with no incoming edges, in node declaration order.
  entry_points: Vec<String>,
  /// Nodes with more than one incoming edge.
  join_points: HashSet<String>,
}

impl Topology {
  pub fn new(nodes: &[Node], edges: &[Edge]) -> Self {
    let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
    let mut incoming: HashMap<String, Vec<usize>> = HashMap::new();

    for node in nodes {
      outgoing.entry(node.id.clone()).or_default();
      incoming.entry(node.id.clone()).or_default();
    }

    for (index, edge) in edges.iter().enumerate() {
      outgoing.entry(edge.source.clone()).or_default().push(index);
      incoming.entry(edge.target.clone()).or_default().push(index);
    }

    let entry_points: Vec<String> = nodes
      .iter()
      .filter(|n| incoming.get(&n.id).is_none_or(|v| v.is_empty()))
      .map(|n| n.id.clone())
      .collect();

    let join_points: HashSet<String> = incoming
      .iter()
      .filter(|(_, edges)| edges.len() > 1)
      .map(|(id, _)| id.clone())
      .collect();

    Self {
      outgoing,
      incoming,
      entry_points,
      join_points,
    }
  }

  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Indices of edges leaving `node_id`.
  pub fn outgoing(&self, node_id: &str) -> &[usize] {
    self
      .outgoing
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Indices of edges entering `node_id`.
  pub fn incoming(&self, node_id: &str) -> &[usize] {
    self
      .incoming
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// The first declared edge feeding `node_id`, if any.
  pub fn feeding_edge(&self, node_id: &str) -> Option<usize> {
    self.incoming(node_id).first().copied()
  }

  /// Check if a node has several writers.
  pub fn is_join_point(&self, node_id: &str) -> bool {
    self.join_points.contains(node_id)
  }

  pub fn join_points(&self) -> &HashSet<String> {
    &self.join_points
  }
}
