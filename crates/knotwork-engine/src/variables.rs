//! Captured variables shared across runs.

use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

/// Process-wide variables captured by the backend (capture and counter
/// nodes).
///
/// Cloning shares the same underlying map. Only the coordinator replaces the
/// contents, and always wholesale after a successful run.
#[derive(Debug, Clone, Default)]
pub struct Variables {
  inner: Arc<RwLock<Map<String, Value>>>,
}

impl Variables {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, name: &str) -> Option<Value> {
    let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
    map.get(name).cloned()
  }

  pub fn snapshot(&self) -> Map<String, Value> {
    self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.read().unwrap_or_else(|e| e.into_inner()).is_empty()
  }

  pub fn clear(&self) {
    self.inner.write().unwrap_or_else(|e| e.into_inner()).clear();
  }

  pub(crate) fn replace(&self, variables: Map<String, Value>) {
    *self.inner.write().unwrap_or_else(|e| e.into_inner()) = variables;
  }
}
