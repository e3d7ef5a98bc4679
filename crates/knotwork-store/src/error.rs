use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("invalid flow name '{0}'")]
  InvalidName(String),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}
