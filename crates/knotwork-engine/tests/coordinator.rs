//! Batch runs end to end against a scripted backend.

mod common;

use std::sync::Arc;

use common::{ScriptedExecutor, vars};
use knotwork_engine::{
  ChannelNotifier, EngineError, ExecutionCoordinator, ExecutorError, PropagationEngine, RunEvent,
  RunOutcome, SharedGraph, Variables,
};
use knotwork_graph::{
  ComparisonOperator, ConditionData, Edge, Environment, ExecutionResult, Flow, GraphModel,
  Node, NodeData, NodeKind,
};
use serde_json::{Value, json};
use tokio::sync::{Notify, mpsc};

fn data_of(graph: &GraphModel, id: &str) -> Value {
  graph.node(id).unwrap().data.to_value().unwrap()
}

fn http_graph() -> GraphModel {
  let mut graph = GraphModel::new();
  graph
    .add_node(Node::of_kind("req", NodeKind::HttpRequest))
    .unwrap();
  graph
    .add_node(Node::of_kind("res", NodeKind::Response))
    .unwrap();
  graph
    .add_node(Node::of_kind("dbg", NodeKind::Debug))
    .unwrap();
  graph
    .add_edge(Edge::new("ok", "req", "res").from_handle("success"))
    .unwrap();
  graph
    .add_edge(Edge::new("ko", "req", "dbg").from_handle("failure"))
    .unwrap();
  graph
}

fn coordinator(graph: GraphModel, executor: ScriptedExecutor) -> ExecutionCoordinator {
  ExecutionCoordinator::new(
    SharedGraph::new(graph),
    Arc::new(executor),
    Variables::new(),
  )
}

#[tokio::test]
async fn test_http_success_fills_response_node() {
  let executor = ScriptedExecutor::fixed(
    vec![ExecutionResult::success(
      "req",
      json!({ "status": 200, "data": { "msg": "ok" } }),
    )],
    vars(json!({})),
  );
  let coordinator = coordinator(http_graph(), executor);

  let report = coordinator.run(&Environment::new()).await.unwrap();
  assert_eq!(report.outcome, RunOutcome::AllSucceeded);

  let graph = coordinator.graph().snapshot().await;
  assert_eq!(
    data_of(&graph, "res"),
    json!({ "status": 200, "response": { "msg": "ok" } })
  );
  assert_eq!(data_of(&graph, "dbg"), json!({}));
  assert!(
    graph
      .node("req")
      .unwrap()
      .execution_result
      .as_ref()
      .unwrap()
      .is_success()
  );
}

#[tokio::test]
async fn test_http_error_routes_to_failure_edge() {
  let executor = ScriptedExecutor::fixed(
    vec![ExecutionResult::error("req", "connection refused")],
    vars(json!({})),
  );
  let coordinator = coordinator(http_graph(), executor);

  let report = coordinator.run(&Environment::new()).await.unwrap();
  assert_eq!(
    report.outcome,
    RunOutcome::PartialFailure {
      failed: vec!["req".to_string()],
      first_error: "connection refused".to_string(),
    }
  );

  let graph = coordinator.graph().snapshot().await;
  assert_eq!(data_of(&graph, "res"), json!({}));
  assert_eq!(
    data_of(&graph, "dbg"),
    json!({ "input": { "error": "connection refused" } })
  );
  assert_eq!(report.propagation.applied.len(), 1);
  assert_eq!(report.propagation.applied[0].edge_id, "ko");
}

fn condition_graph() -> GraphModel {
  let mut graph = GraphModel::new();
  graph
    .add_node(Node::new(
      "cond",
      NodeData::Condition(ConditionData {
        condition: ComparisonOperator::GreaterThan,
        input: Some(json!(5)),
        target_value: Some(json!(3)),
        extra: Default::default(),
      }),
    ))
    .unwrap();
  graph
    .add_node(Node::of_kind("yes", NodeKind::Display))
    .unwrap();
  graph
    .add_node(Node::of_kind("no", NodeKind::Display))
    .unwrap();
  graph
    .add_edge(Edge::new("t", "cond", "yes").from_handle("true"))
    .unwrap();
  graph
    .add_edge(Edge::new("f", "cond", "no").from_handle("false"))
    .unwrap();
  graph
}

#[tokio::test]
async fn test_condition_routes_true_branch() {
  let executor = ScriptedExecutor::fixed(
    vec![ExecutionResult::success("cond", json!({ "input": 5 }))],
    vars(json!({})),
  );
  let coordinator = coordinator(condition_graph(), executor);
  coordinator.run(&Environment::new()).await.unwrap();

  let graph = coordinator.graph().snapshot().await;
  assert_eq!(data_of(&graph, "yes"), json!({ "input": { "input": 5 } }));
  assert_eq!(data_of(&graph, "no"), json!({}));
}

#[tokio::test]
async fn test_backend_boolean_overrides_payload() {
  let executor = ScriptedExecutor::fixed(
    vec![ExecutionResult::success(
      "cond",
      json!({ "result": false, "input": 5 }),
    )],
    vars(json!({})),
  );
  let coordinator = coordinator(condition_graph(), executor);
  coordinator.run(&Environment::new()).await.unwrap();

  let graph = coordinator.graph().snapshot().await;
  assert_eq!(data_of(&graph, "yes"), json!({}));
  assert_eq!(
    data_of(&graph, "no"),
    json!({ "input": { "result": false, "input": 5 } })
  );
}

#[tokio::test]
async fn test_absent_nodes_keep_previous_annotation() {
  let mut graph = http_graph();
  graph
    .set_execution_result("dbg", ExecutionResult::success("dbg", json!("earlier")))
    .unwrap();

  let executor = ScriptedExecutor::fixed(
    vec![ExecutionResult::success("req", json!({ "status": 204 }))],
    vars(json!({})),
  );
  let coordinator = coordinator(graph, executor);
  coordinator.run(&Environment::new()).await.unwrap();

  let graph = coordinator.graph().snapshot().await;
  let dbg = graph.node("dbg").unwrap();
  assert_eq!(
    dbg.execution_result.as_ref().unwrap().output,
    json!("earlier")
  );
  assert!(graph.node("res").unwrap().execution_result.is_none());
}

#[tokio::test]
async fn test_variables_replaced_each_run() {
  let executor = ScriptedExecutor::new({
    let calls = std::sync::atomic::AtomicUsize::new(0);
    move |_: &Flow| {
      let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
      let variables = if n == 0 {
        vars(json!({ "token": "abc", "count": 1 }))
      } else {
        vars(json!({ "count": 2 }))
      };
      Ok(common::response(vec![], variables))
    }
  });
  let coordinator = coordinator(http_graph(), executor);

  coordinator.run(&Environment::new()).await.unwrap();
  assert_eq!(coordinator.variables().get("token"), Some(json!("abc")));

  coordinator.run(&Environment::new()).await.unwrap();
  assert_eq!(coordinator.variables().get("token"), None);
  assert_eq!(coordinator.variables().get("count"), Some(json!(2)));
}

#[tokio::test]
async fn test_malformed_response_applies_nothing() {
  let executor = ScriptedExecutor::fixed(
    vec![
      ExecutionResult::success("req", json!({ "status": 200, "data": 1 })),
      ExecutionResult::success("ghost", json!(null)),
    ],
    vars(json!({ "token": "new" })),
  );
  let before = http_graph();
  let coordinator = coordinator(before.clone(), executor);

  let err = coordinator.run(&Environment::new()).await.unwrap_err();
  assert!(matches!(err, EngineError::ExecutionFailed { .. }));
  assert_eq!(coordinator.graph().snapshot().await, before);
  assert!(coordinator.variables().is_empty());
  assert!(!coordinator.is_running());
}

#[tokio::test]
async fn test_unreachable_backend() {
  let executor = ScriptedExecutor::new(|_| {
    Err(ExecutorError::Unreachable {
      program: "runner".to_string(),
      source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
    })
  });
  let coordinator = coordinator(http_graph(), executor);

  let err = coordinator.run(&Environment::new()).await.unwrap_err();
  let EngineError::ExecutionFailed { reason } = &err else {
    panic!("unexpected error: {:?}", err);
  };
  assert!(reason.contains("unreachable"));
}

#[tokio::test]
async fn test_second_run_is_rejected_while_in_flight() {
  let gate = Arc::new(Notify::new());
  let executor = ScriptedExecutor::fixed(
    vec![ExecutionResult::success("req", json!({ "status": 200 }))],
    vars(json!({})),
  )
  .gated(gate.clone());
  let entered = executor.entered.clone();
  let coordinator = coordinator(http_graph(), executor);
  let env = Environment::new();

  let first = coordinator.run(&env);
  let second = async {
    entered.notified().await;
    let rejected = coordinator.run(&env).await;
    gate.notify_one();
    rejected
  };
  let (first, second) = tokio::join!(first, second);

  assert!(first.is_ok());
  assert!(matches!(second, Err(EngineError::RunInProgress)));

  // The flag is released afterwards.
  gate.notify_one();
  assert!(coordinator.run(&env).await.is_ok());
}

#[tokio::test]
async fn test_runs_are_independent() {
  let executor = ScriptedExecutor::fixed(
    vec![ExecutionResult::success(
      "req",
      json!({ "status": 200, "data": [1] }),
    )],
    vars(json!({})),
  );
  let coordinator = coordinator(http_graph(), executor);
  let env = Environment::new();

  let first = coordinator.run(&env).await.unwrap();
  let after_first = coordinator.graph().snapshot().await;
  let second = coordinator.run(&env).await.unwrap();

  assert_ne!(first.run_id, second.run_id);
  assert_eq!(first.response, second.response);
  assert_eq!(coordinator.graph().snapshot().await, after_first);
}

#[tokio::test]
async fn test_notifier_sees_run_lifecycle() {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let executor = ScriptedExecutor::fixed(
    vec![ExecutionResult::error("req", "boom")],
    vars(json!({})),
  );
  let coordinator = ExecutionCoordinator::with_notifier(
    SharedGraph::new(http_graph()),
    Arc::new(executor),
    Variables::new(),
    ChannelNotifier::new(tx),
  );

  let report = coordinator.run(&Environment::new()).await.unwrap();

  match rx.recv().await.unwrap() {
    RunEvent::RunStarted { run_id, node_count } => {
      assert_eq!(run_id, report.run_id);
      assert_eq!(node_count, 3);
    }
    other => panic!("unexpected event {:?}", other),
  }
  match rx.recv().await.unwrap() {
    RunEvent::RunCompleted { outcome, .. } => assert!(!outcome.is_success()),
    other => panic!("unexpected event {:?}", other),
  }
}

#[tokio::test]
async fn test_propagation_is_idempotent() {
  let mut graph = http_graph();
  graph
    .add_node(Node::of_kind("show", NodeKind::Tabulize))
    .unwrap();
  graph
    .add_edge(Edge::new("body", "req", "show").from_handle("success"))
    .unwrap();

  let results = common::response(
    vec![ExecutionResult::success(
      "req",
      json!({ "status": 201, "data": [{ "id": 1 }] }),
    )],
    vars(json!({})),
  )
  .results;

  let engine = PropagationEngine::default();
  let first_report = engine.propagate(&mut graph, &results).unwrap();
  let once = graph.clone();
  let second_report = engine.propagate(&mut graph, &results).unwrap();

  assert_eq!(graph, once);
  assert_eq!(first_report, second_report);
  assert_eq!(data_of(&graph, "show"), json!({ "input": [{ "id": 1 }] }));
}
