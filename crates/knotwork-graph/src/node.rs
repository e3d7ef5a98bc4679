use serde::{Deserialize, Serialize};

use crate::kind::NodeKind;
use crate::payload::NodeData;
use crate::result::ExecutionResult;

const EXECUTION_RESULT_KEY: &str = "executionResult";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

/// A node in a flow.
///
/// On the wire the display annotation lives inside `data.executionResult`; in
/// memory it is kept apart from the payload so replacing the payload never
/// clobbers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
  pub id: String,
  pub position: Position,
  pub draggable: bool,
  pub data: NodeData,
  pub execution_result: Option<ExecutionResult>,
}

impl Node {
  pub fn new(id: impl Into<String>, data: NodeData) -> Self {
    Self {
      id: id.into(),
      position: Position::default(),
      draggable: true,
      data,
      execution_result: None,
    }
  }

  /// A node with the default payload for `kind`.
  pub fn of_kind(id: impl Into<String>, kind: NodeKind) -> Self {
    Self::new(id, NodeData::empty(kind))
  }

  pub fn at(mut self, x: f64, y: f64) -> Self {
    self.position = Position { x, y };
    self
  }

  pub fn kind(&self) -> NodeKind {
    self.data.kind()
  }
}

#[derive(Serialize, Deserialize)]
struct RawNode {
  id: String,
  #[serde(rename = "type")]
  kind: NodeKind,
  #[serde(default)]
  position: Position,
  #[serde(default = "default_draggable")]
  draggable: bool,
  #[serde(default)]
  data: serde_json::Value,
}

fn default_draggable() -> bool {
  true
}

impl TryFrom<RawNode> for Node {
  type Error = String;

  fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
    let mut data = raw.data;

    let execution_result = match data.as_object_mut() {
      Some(map) => match map.remove(EXECUTION_RESULT_KEY) {
        Some(serde_json::Value::Null) | None => None,
        Some(value) => Some(serde_json::from_value(value).map_err(|e| {
          format!("invalid executionResult on node '{}': {}", raw.id, e)
        })?),
      },
      None => None,
    };

    let data = NodeData::from_value(raw.kind, data)
      .map_err(|e| format!("invalid {} data on node '{}': {}", raw.kind, raw.id, e))?;

    Ok(Node {
      id: raw.id,
      position: raw.position,
      draggable: raw.draggable,
      data,
      execution_result,
    })
  }
}

impl From<Node> for RawNode {
  fn from(node: Node) -> Self {
    // Payload structs only hold JSON-representable fields.
    let mut data = node
      .data
      .to_value()
      .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));

    if let (Some(result), Some(map)) = (node.execution_result, data.as_object_mut())
      && let Ok(value) = serde_json::to_value(result)
    {
      map.insert(EXECUTION_RESULT_KEY.to_string(), value);
    }

    RawNode {
      id: node.id,
      kind: node.data.kind(),
      position: node.position,
      draggable: node.draggable,
      data,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::payload::SinkData;
  use serde_json::json;

  #[test]
  fn test_parse_editor_node() {
    let node: Node = serde_json::from_value(json!({
      "id": "display-1",
      "type": "display",
      "position": { "x": 10.0, "y": 20.5 },
      "data": { "input": [1, 2, 3] }
    }))
    .unwrap();

    assert_eq!(node.kind(), NodeKind::Display);
    assert!(node.draggable);
    assert_eq!(node.position.y, 20.5);
    assert_eq!(
      node.data,
      NodeData::Display(SinkData {
        input: Some(json!([1, 2, 3])),
        extra: Default::default(),
      })
    );
  }

  #[test]
  fn test_execution_result_is_split_from_payload() {
    let node: Node = serde_json::from_value(json!({
      "id": "n1",
      "type": "comment",
      "data": {
        "text": "hello",
        "executionResult": { "node_id": "n1", "status": "success", "output": 1 }
      }
    }))
    .unwrap();

    assert!(node.execution_result.as_ref().unwrap().is_success());

    let back = serde_json::to_value(&node).unwrap();
    assert_eq!(back["data"]["text"], "hello");
    assert_eq!(back["data"]["executionResult"]["status"], "success");
    assert_eq!(back["type"], "comment");
  }

  #[test]
  fn test_unknown_type_is_rejected() {
    let result = serde_json::from_value::<Node>(json!({
      "id": "x",
      "type": "teleporter",
      "data": {}
    }));
    assert!(result.is_err());
  }
}
