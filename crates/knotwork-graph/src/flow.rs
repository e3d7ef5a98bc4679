use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::node::Node;

/// Key/value environment handed to the backend with every run.
pub type Environment = HashMap<String, String>;

/// Saved and submitted shape of a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flow {
  #[serde(default)]
  pub nodes: Vec<Node>,
  #[serde(default)]
  pub edges: Vec<Edge>,
}

impl Flow {
  pub fn contains_node(&self, node_id: &str) -> bool {
    self.nodes.iter().any(|n| n.id == node_id)
  }
}
