//! Serde helpers for numeric fields that editors may save as strings.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
  Number(u64),
  Text(String),
}

/// Accepts `200`, `"200"`, `null` or a missing field.
pub fn optional_u16<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<NumberOrString>::deserialize(deserializer)?;
  let number = match raw {
    None => return Ok(None),
    Some(NumberOrString::Number(n)) => n,
    Some(NumberOrString::Text(s)) if s.trim().is_empty() => return Ok(None),
    Some(NumberOrString::Text(s)) => s
      .trim()
      .parse::<u64>()
      .map_err(|e| serde::de::Error::custom(format!("expected a number, got '{}': {}", s, e)))?,
  };
  u16::try_from(number)
    .map(Some)
    .map_err(|_| serde::de::Error::custom(format!("number out of range: {}", number)))
}
