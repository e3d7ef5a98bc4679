//! The canonical in-memory graph.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::flow::Flow;
use crate::graph::Topology;
use crate::node::Node;
use crate::payload::NodeData;
use crate::result::ExecutionResult;

/// Nodes and edges in declaration order.
///
/// Every mutation goes through one of the methods below. Node payloads are
/// only ever replaced wholesale, never patched field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphModel {
  nodes: Vec<Node>,
  edges: Vec<Edge>,
}

impl GraphModel {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a model from a saved flow, applying the same checks as the
  /// individual mutations.
  pub fn from_flow(flow: Flow) -> Result<Self, GraphError> {
    let mut model = Self::new();
    for node in flow.nodes {
      model.add_node(node)?;
    }
    for edge in flow.edges {
      model.add_edge(edge)?;
    }
    Ok(model)
  }

  pub fn to_flow(&self) -> Flow {
    Flow {
      nodes: self.nodes.clone(),
      edges: self.edges.clone(),
    }
  }

  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  pub fn node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id == node_id)
  }

  pub fn edge(&self, edge_id: &str) -> Option<&Edge> {
    self.edges.iter().find(|e| e.id == edge_id)
  }

  pub fn topology(&self) -> Topology {
    Topology::new(&self.nodes, &self.edges)
  }

  pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
    if self.node(&node.id).is_some() {
      return Err(GraphError::DuplicateNode(node.id));
    }
    self.nodes.push(node);
    Ok(())
  }

  /// Remove a node together with every edge touching it.
  pub fn remove_node(&mut self, node_id: &str) -> Result<Node, GraphError> {
    let index = self
      .nodes
      .iter()
      .position(|n| n.id == node_id)
      .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

    self
      .edges
      .retain(|e| e.source != node_id && e.target != node_id);
    Ok(self.nodes.remove(index))
  }

  pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
    for endpoint in [&edge.source, &edge.target] {
      if self.node(endpoint).is_none() {
        return Err(GraphError::InvalidReference {
          edge_id: edge.id.clone(),
          node_id: endpoint.clone(),
        });
      }
    }
    if edge.source == edge.target {
      return Err(GraphError::SelfLoop {
        edge_id: edge.id,
        node_id: edge.source,
      });
    }
    if self.edge(&edge.id).is_some() {
      return Err(GraphError::DuplicateEdge(edge.id));
    }
    self.edges.push(edge);
    Ok(())
  }

  pub fn remove_edge(&mut self, edge_id: &str) -> Result<Edge, GraphError> {
    let index = self
      .edges
      .iter()
      .position(|e| e.id == edge_id)
      .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;
    Ok(self.edges.remove(index))
  }

  /// Replace a node's payload. Id, position and kind are preserved.
  pub fn update_node_data(&mut self, node_id: &str, data: NodeData) -> Result<(), GraphError> {
    let node = self.node_mut(node_id)?;
    if node.kind() != data.kind() {
      return Err(GraphError::KindMismatch {
        node_id: node_id.to_string(),
        expected: node.kind(),
        actual: data.kind(),
      });
    }
    node.data = data;
    Ok(())
  }

  /// Attach the display annotation for a node's latest execution.
  pub fn set_execution_result(
    &mut self,
    node_id: &str,
    result: ExecutionResult,
  ) -> Result<(), GraphError> {
    self.node_mut(node_id)?.execution_result = Some(result);
    Ok(())
  }

  pub fn set_edge_animated(&mut self, edge_id: &str, animated: bool) -> Result<(), GraphError> {
    let edge = self
      .edges
      .iter_mut()
      .find(|e| e.id == edge_id)
      .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;
    edge.animated = animated;
    Ok(())
  }

  /// Lock (`false`) or unlock (`true`) dragging for every node.
  pub fn set_draggable(&mut self, draggable: bool) {
    for node in &mut self.nodes {
      node.draggable = draggable;
    }
  }

  pub fn clear(&mut self) {
    self.nodes.clear();
    self.edges.clear();
  }

  fn node_mut(&mut self, node_id: &str) -> Result<&mut Node, GraphError> {
    self
      .nodes
      .iter_mut()
      .find(|n| n.id == node_id)
      .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))
  }
}
