//! Output handle routing.
//!
//! Decides, per edge, whether an executed node's result travels along it and
//! with what payload. Edges wired to a handle their source kind does not
//! declare are inert.

use knotwork_graph::{Edge, ExecutionResult, HandleSet, Node, NodeData, handle};
use serde_json::Value;

use crate::condition;

/// What an edge carries for one execution of its source.
#[derive(Debug, Clone, PartialEq)]
pub enum Firing {
  Inactive,
  /// The edge fires once with this payload.
  Once(Value),
  /// The edge fires once per element, in collection order.
  PerElement(Vec<Value>),
}

impl Firing {
  pub fn is_active(&self) -> bool {
    !matches!(self, Firing::Inactive)
  }

  /// The payload written downstream. Per-element firings accumulate into one
  /// array.
  pub fn into_payload(self) -> Option<Value> {
    match self {
      Firing::Inactive => None,
      Firing::Once(value) => Some(value),
      Firing::PerElement(items) => Some(Value::Array(items)),
    }
  }
}

pub struct HandleRouter;

impl HandleRouter {
  pub fn is_active(edge: &Edge, source: &Node, result: &ExecutionResult) -> bool {
    Self::fire(edge, source, result).is_active()
  }

  pub fn fire(edge: &Edge, source: &Node, result: &ExecutionResult) -> Firing {
    let handle_set = source.kind().handle_set();
    if !handle_set.declares(edge.source_handle()) {
      return Firing::Inactive;
    }

    match handle_set {
      HandleSet::Outcome => {
        let wanted = if result.is_success() {
          handle::SUCCESS
        } else {
          handle::FAILURE
        };
        if edge.source_handle() == Some(wanted) {
          Firing::Once(payload_of(result))
        } else {
          Firing::Inactive
        }
      }
      HandleSet::Branch => {
        let NodeData::Condition(data) = &source.data else {
          return Firing::Inactive;
        };
        let wanted = match condition::resolve(data, Some(result)) {
          Some(true) => handle::TRUE,
          Some(false) => handle::FALSE,
          None => return Firing::Inactive,
        };
        if edge.source_handle() == Some(wanted) {
          Firing::Once(payload_of(result))
        } else {
          Firing::Inactive
        }
      }
      HandleSet::Iteration => {
        if !result.is_success() {
          return Firing::Inactive;
        }
        let wants_done = edge.source_handle() == Some(handle::DONE);
        match step_handle(result) {
          // Backends that answer one iteration per result say which handle fired.
          Some(handle::DONE) if wants_done => Firing::Once(result.output.clone()),
          Some(handle::DONE) => Firing::Inactive,
          Some(_) if wants_done => Firing::Inactive,
          Some(_) => Firing::Once(
            result
              .output
              .get("item")
              .cloned()
              .unwrap_or_else(|| result.output.clone()),
          ),
          None if wants_done => Firing::Once(result.output.clone()),
          None => match collection(&result.output) {
            Some(items) if !items.is_empty() => Firing::PerElement(items.clone()),
            _ => Firing::Inactive,
          },
        }
      }
      HandleSet::Single(_) => {
        if result.is_success() {
          Firing::Once(result.output.clone())
        } else {
          Firing::Inactive
        }
      }
    }
  }
}

/// The elements a loop iterates: `items`, then `data`, then the output itself.
pub fn collection(output: &Value) -> Option<&Vec<Value>> {
  output
    .get("items")
    .and_then(Value::as_array)
    .or_else(|| output.get("data").and_then(Value::as_array))
    .or_else(|| output.as_array())
}

/// The loop handle named by the result, if it names one.
fn step_handle(result: &ExecutionResult) -> Option<&str> {
  result
    .active_handle
    .as_deref()
    .filter(|h| matches!(*h, handle::ITEM | handle::BODY | handle::DONE))
}

fn payload_of(result: &ExecutionResult) -> Value {
  match (&result.output, &result.error) {
    (Value::Null, Some(error)) => serde_json::json!({ "error": error }),
    (output, _) => output.clone(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use knotwork_graph::{ComparisonOperator, ConditionData, NodeKind};
  use serde_json::json;

  fn edge(handle: Option<&str>) -> Edge {
    let edge = Edge::new("e", "src", "dst");
    match handle {
      Some(h) => edge.from_handle(h),
      None => edge,
    }
  }

  fn condition_node(input: Option<Value>, target: Option<Value>) -> Node {
    Node::new(
      "src",
      NodeData::Condition(ConditionData {
        condition: ComparisonOperator::GreaterThan,
        input,
        target_value: target,
        extra: Default::default(),
      }),
    )
  }

  #[test]
  fn test_http_success_and_failure_handles() {
    let node = Node::of_kind("src", NodeKind::HttpRequest);
    let ok = ExecutionResult::success("src", json!({ "status": 200 }));
    let failed = ExecutionResult::error("src", "timeout");

    assert!(HandleRouter::is_active(&edge(Some("success")), &node, &ok));
    assert!(!HandleRouter::is_active(&edge(Some("failure")), &node, &ok));
    assert!(!HandleRouter::is_active(&edge(Some("success")), &node, &failed));
    assert_eq!(
      HandleRouter::fire(&edge(Some("failure")), &node, &failed),
      Firing::Once(json!({ "error": "timeout" }))
    );
  }

  #[test]
  fn test_undeclared_handle_is_inert() {
    let node = Node::of_kind("src", NodeKind::HttpRequest);
    let ok = ExecutionResult::success("src", json!({}));
    assert!(!HandleRouter::is_active(&edge(Some("true")), &node, &ok));
    assert!(!HandleRouter::is_active(&edge(None), &node, &ok));

    let display = Node::of_kind("src", NodeKind::Display);
    assert!(!HandleRouter::is_active(&edge(Some("success")), &display, &ok));
  }

  #[test]
  fn test_condition_branches() {
    let node = condition_node(Some(json!(5)), Some(json!(3)));
    let result = ExecutionResult::success("src", json!({}));

    assert!(HandleRouter::is_active(&edge(Some("true")), &node, &result));
    assert!(!HandleRouter::is_active(&edge(Some("false")), &node, &result));
  }

  #[test]
  fn test_indeterminate_condition_routes_nothing() {
    let node = condition_node(None, Some(json!(3)));
    let result = ExecutionResult::success("src", json!({}));

    assert!(!HandleRouter::is_active(&edge(Some("true")), &node, &result));
    assert!(!HandleRouter::is_active(&edge(Some("false")), &node, &result));
  }

  #[test]
  fn test_loop_item_and_done() {
    let node = Node::of_kind("src", NodeKind::Loop);
    let result = ExecutionResult::success("src", json!({ "items": [1, 2] }));

    assert_eq!(
      HandleRouter::fire(&edge(Some("item")), &node, &result),
      Firing::PerElement(vec![json!(1), json!(2)])
    );
    assert!(HandleRouter::is_active(&edge(Some("body")), &node, &result));
    assert_eq!(
      HandleRouter::fire(&edge(Some("done")), &node, &result),
      Firing::Once(json!({ "items": [1, 2] }))
    );

    let empty = ExecutionResult::success("src", json!([]));
    assert!(!HandleRouter::is_active(&edge(Some("item")), &node, &empty));
    assert!(HandleRouter::is_active(&edge(Some("done")), &node, &empty));
  }

  #[test]
  fn test_loop_step_follows_active_handle() {
    let node = Node::of_kind("src", NodeKind::Loop);
    let mut step = ExecutionResult::success(
      "src",
      json!({ "index": 0, "item": { "a": 1 }, "data": { "a": 1 } }),
    );
    step.active_handle = Some("body".to_string());

    assert!(!HandleRouter::is_active(&edge(Some("done")), &node, &step));
    assert_eq!(
      HandleRouter::fire(&edge(Some("body")), &node, &step),
      Firing::Once(json!({ "a": 1 }))
    );
    assert_eq!(
      HandleRouter::fire(&edge(Some("item")), &node, &step),
      Firing::Once(json!({ "a": 1 }))
    );

    let mut exhausted = ExecutionResult::success("src", json!({ "status": "done" }));
    exhausted.active_handle = Some("done".to_string());

    assert!(!HandleRouter::is_active(&edge(Some("body")), &node, &exhausted));
    assert_eq!(
      HandleRouter::fire(&edge(Some("done")), &node, &exhausted),
      Firing::Once(json!({ "status": "done" }))
    );
  }

  #[test]
  fn test_named_single_output() {
    let node = Node::of_kind("src", NodeKind::Response);
    let ok = ExecutionResult::success("src", json!({ "x": 1 }));

    assert_eq!(
      HandleRouter::fire(&edge(Some("output")), &node, &ok),
      Firing::Once(json!({ "x": 1 }))
    );
    assert!(!HandleRouter::is_active(&edge(Some("value")), &node, &ok));

    let selector = Node::of_kind("src", NodeKind::ValueSelector);
    assert!(HandleRouter::is_active(&edge(Some("value")), &selector, &ok));
  }

  #[test]
  fn test_single_output_requires_success() {
    let node = Node::of_kind("src", NodeKind::Mapper);
    let ok = ExecutionResult::success("src", json!({ "x": 1 }));
    let failed = ExecutionResult::error("src", "bad mapping");

    assert_eq!(
      HandleRouter::fire(&edge(None), &node, &ok),
      Firing::Once(json!({ "x": 1 }))
    );
    assert!(!HandleRouter::is_active(&edge(None), &node, &failed));
  }
}
