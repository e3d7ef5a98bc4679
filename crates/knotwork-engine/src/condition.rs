//! Condition node evaluation.

use std::cmp::Ordering;

use knotwork_graph::{ComparisonOperator, ConditionData, ExecutionResult};
use serde_json::Value;

/// The boolean a condition node routes on.
///
/// A boolean `result` in the node's execution output wins. Otherwise the
/// node's own payload is evaluated. `None` means indeterminate.
pub fn resolve(data: &ConditionData, result: Option<&ExecutionResult>) -> Option<bool> {
  if let Some(result) = result
    && let Some(Value::Bool(b)) = result.output.get("result")
  {
    return Some(*b);
  }
  evaluate(data)
}

/// Compare the payload's `input` against its `targetValue`.
///
/// Returns `None` when either side is missing, null or an empty string.
pub fn evaluate(data: &ConditionData) -> Option<bool> {
  let left = present(data.input.as_ref())?;
  let right = present(data.target_value.as_ref())?;
  Some(compare(data.condition, left, right))
}

pub fn compare(operator: ComparisonOperator, left: &Value, right: &Value) -> bool {
  match operator {
    ComparisonOperator::Equal => loose_eq(left, right),
    ComparisonOperator::NotEqual => !loose_eq(left, right),
    ComparisonOperator::GreaterThan => order(left, right) == Ordering::Greater,
    ComparisonOperator::LessThan => order(left, right) == Ordering::Less,
    ComparisonOperator::Contains => contains(left, right),
  }
}

fn present(value: Option<&Value>) -> Option<&Value> {
  match value {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) if s.is_empty() => None,
    Some(v) => Some(v),
  }
}

fn as_number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }
}

fn as_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
  match (as_number(left), as_number(right)) {
    (Some(l), Some(r)) => l == r,
    _ => as_text(left) == as_text(right),
  }
}

fn order(left: &Value, right: &Value) -> Ordering {
  match (as_number(left), as_number(right)) {
    (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
    _ => as_text(left).cmp(&as_text(right)),
  }
}

fn contains(left: &Value, right: &Value) -> bool {
  match left {
    Value::Array(items) => items.iter().any(|item| loose_eq(item, right)),
    _ => as_text(left).contains(&as_text(right)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn condition(operator: ComparisonOperator, input: Value, target: Value) -> ConditionData {
    ConditionData {
      condition: operator,
      input: Some(input),
      target_value: Some(target),
      extra: Default::default(),
    }
  }

  #[test]
  fn test_greater_than_numbers() {
    let data = condition(ComparisonOperator::GreaterThan, json!(5), json!(3));
    assert_eq!(evaluate(&data), Some(true));
  }

  #[test]
  fn test_numeric_strings_compare_as_numbers() {
    // "10" < "9" as text, but not as numbers.
    let data = condition(ComparisonOperator::GreaterThan, json!("10"), json!("9"));
    assert_eq!(evaluate(&data), Some(true));

    let data = condition(ComparisonOperator::Equal, json!(200), json!("200"));
    assert_eq!(evaluate(&data), Some(true));
  }

  #[test]
  fn test_text_falls_back_to_lexicographic() {
    let data = condition(ComparisonOperator::LessThan, json!("apple"), json!("banana"));
    assert_eq!(evaluate(&data), Some(true));
  }

  #[test]
  fn test_contains() {
    let data = condition(ComparisonOperator::Contains, json!("hello world"), json!("world"));
    assert_eq!(evaluate(&data), Some(true));

    let data = condition(ComparisonOperator::Contains, json!([1, 2, 3]), json!("2"));
    assert_eq!(evaluate(&data), Some(true));

    let data = condition(ComparisonOperator::NotEqual, json!("a"), json!("a"));
    assert_eq!(evaluate(&data), Some(false));
  }

  #[test]
  fn test_missing_side_is_indeterminate() {
    let mut data = condition(ComparisonOperator::Equal, json!(1), json!(1));
    data.input = None;
    assert_eq!(evaluate(&data), None);

    let data = condition(ComparisonOperator::Equal, json!(1), json!(""));
    assert_eq!(evaluate(&data), None);
  }

  #[test]
  fn test_result_boolean_takes_precedence() {
    let data = condition(ComparisonOperator::Equal, json!(1), json!(2));
    let result = ExecutionResult::success("c", json!({ "result": true, "input": 1 }));
    assert_eq!(resolve(&data, Some(&result)), Some(true));

    let no_bool = ExecutionResult::success("c", json!({ "input": 1 }));
    assert_eq!(resolve(&data, Some(&no_bool)), Some(false));
  }
}
