use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle ids used by branching node kinds.
pub mod handle {
  pub const SUCCESS: &str = "success";
  pub const FAILURE: &str = "failure";
  pub const TRUE: &str = "true";
  pub const FALSE: &str = "false";
  pub const ITEM: &str = "item";
  /// Older flows name the loop body handle `body`.
  pub const BODY: &str = "body";
  pub const DONE: &str = "done";
  /// Named single output of `response` nodes.
  pub const OUTPUT: &str = "output";
  /// Named single output of `valueselector` nodes.
  pub const VALUE: &str = "value";
}

/// The fixed set of node types a flow can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
  #[serde(rename = "httpRequest")]
  HttpRequest,
  #[serde(rename = "response")]
  Response,
  #[serde(rename = "condition")]
  Condition,
  #[serde(rename = "debug")]
  Debug,
  #[serde(rename = "input")]
  Input,
  #[serde(rename = "output")]
  Output,
  #[serde(rename = "start")]
  Start,
  #[serde(rename = "loop")]
  Loop,
  #[serde(rename = "capture")]
  Capture,
  #[serde(rename = "mapper")]
  Mapper,
  #[serde(rename = "counter")]
  Counter,
  #[serde(rename = "scraper")]
  Scraper,
  #[serde(rename = "filter")]
  Filter,
  #[serde(rename = "arrayMap")]
  ArrayMap,
  #[serde(rename = "carousel")]
  Carousel,
  #[serde(rename = "assert")]
  Assert,
  #[serde(rename = "comment")]
  Comment,
  #[serde(rename = "group")]
  Group,
  #[serde(rename = "serverTrigger")]
  ServerTrigger,
  #[serde(rename = "serverResponse")]
  ServerResponse,
  #[serde(rename = "display")]
  Display,
  #[serde(rename = "tabulize")]
  Tabulize,
  #[serde(rename = "caseSuccess")]
  CaseSuccess,
  #[serde(rename = "caseFail")]
  CaseFail,
  #[serde(rename = "valueselector")]
  ValueSelector,
}

/// Output handles a node kind declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleSet {
  /// `success` / `failure`, exactly one fires per execution.
  Outcome,
  /// `true` / `false`, selected by the computed boolean.
  Branch,
  /// `item` (alias `body`) per element, then `done` once.
  Iteration,
  /// A single output, unnamed or with the given id.
  Single(Option<&'static str>),
}

impl HandleSet {
  /// Whether an edge leaving through `source_handle` is wired to a declared handle.
  ///
  /// Edges that fail this check are inert: the router never activates them.
  pub fn declares(&self, source_handle: Option<&str>) -> bool {
    match (self, source_handle) {
      (HandleSet::Outcome, Some(h)) => h == handle::SUCCESS || h == handle::FAILURE,
      (HandleSet::Branch, Some(h)) => h == handle::TRUE || h == handle::FALSE,
      (HandleSet::Iteration, Some(h)) => {
        h == handle::ITEM || h == handle::BODY || h == handle::DONE
      }
      (HandleSet::Single(_), None) => true,
      (HandleSet::Single(Some(id)), Some(h)) => h == *id,
      _ => false,
    }
  }
}

impl NodeKind {
  pub const ALL: [NodeKind; 25] = [
    NodeKind::HttpRequest,
    NodeKind::Response,
    NodeKind::Condition,
    NodeKind::Debug,
    NodeKind::Input,
    NodeKind::Output,
    NodeKind::Start,
    NodeKind::Loop,
    NodeKind::Capture,
    NodeKind::Mapper,
    NodeKind::Counter,
    NodeKind::Scraper,
    NodeKind::Filter,
    NodeKind::ArrayMap,
    NodeKind::Carousel,
    NodeKind::Assert,
    NodeKind::Comment,
    NodeKind::Group,
    NodeKind::ServerTrigger,
    NodeKind::ServerResponse,
    NodeKind::Display,
    NodeKind::Tabulize,
    NodeKind::CaseSuccess,
    NodeKind::CaseFail,
    NodeKind::ValueSelector,
  ];

  /// The handle set this kind exposes. Not user-configurable.
  pub fn handle_set(&self) -> HandleSet {
    match self {
      NodeKind::HttpRequest => HandleSet::Outcome,
      NodeKind::Condition => HandleSet::Branch,
      NodeKind::Loop => HandleSet::Iteration,
      NodeKind::Response => HandleSet::Single(Some(handle::OUTPUT)),
      NodeKind::ValueSelector => HandleSet::Single(Some(handle::VALUE)),
      _ => HandleSet::Single(None),
    }
  }

  /// Wire name, as it appears in the node's `type` field.
  pub fn as_str(&self) -> &'static str {
    match self {
      NodeKind::HttpRequest => "httpRequest",
      NodeKind::Response => "response",
      NodeKind::Condition => "condition",
      NodeKind::Debug => "debug",
      NodeKind::Input => "input",
      NodeKind::Output => "output",
      NodeKind::Start => "start",
      NodeKind::Loop => "loop",
      NodeKind::Capture => "capture",
      NodeKind::Mapper => "mapper",
      NodeKind::Counter => "counter",
      NodeKind::Scraper => "scraper",
      NodeKind::Filter => "filter",
      NodeKind::ArrayMap => "arrayMap",
      NodeKind::Carousel => "carousel",
      NodeKind::Assert => "assert",
      NodeKind::Comment => "comment",
      NodeKind::Group => "group",
      NodeKind::ServerTrigger => "serverTrigger",
      NodeKind::ServerResponse => "serverResponse",
      NodeKind::Display => "display",
      NodeKind::Tabulize => "tabulize",
      NodeKind::CaseSuccess => "caseSuccess",
      NodeKind::CaseFail => "caseFail",
      NodeKind::ValueSelector => "valueselector",
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_wire_names_match_serde() {
    for kind in NodeKind::ALL {
      let json = serde_json::to_value(kind).unwrap();
      assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
    }
  }

  #[test]
  fn test_outcome_handles() {
    let set = NodeKind::HttpRequest.handle_set();
    assert!(set.declares(Some("success")));
    assert!(set.declares(Some("failure")));
    assert!(!set.declares(Some("true")));
    assert!(!set.declares(None));
  }

  #[test]
  fn test_loop_accepts_body_alias() {
    let set = NodeKind::Loop.handle_set();
    assert!(set.declares(Some("item")));
    assert!(set.declares(Some("body")));
    assert!(set.declares(Some("done")));
    assert!(!set.declares(Some("success")));
  }

  #[test]
  fn test_single_output_rejects_named_handle() {
    let set = NodeKind::Display.handle_set();
    assert!(set.declares(None));
    assert!(!set.declares(Some("success")));
  }

  #[test]
  fn test_named_single_outputs() {
    let response = NodeKind::Response.handle_set();
    assert_eq!(response, HandleSet::Single(Some("output")));
    assert!(response.declares(Some("output")));
    assert!(response.declares(None));
    assert!(!response.declares(Some("value")));

    let selector = NodeKind::ValueSelector.handle_set();
    assert!(selector.declares(Some("value")));
    assert!(!selector.declares(Some("output")));
  }
}
