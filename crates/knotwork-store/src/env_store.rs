use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use knotwork_graph::Environment;
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;

const ENV_FILE: &str = "env.json";

/// Key/value environment handed to the executor with every run.
#[async_trait]
pub trait EnvironmentStore: Send + Sync {
  /// Load the saved environment. A store that was never written is empty.
  async fn load_environment(&self) -> Result<Environment, StoreError>;

  /// Replace the saved environment.
  async fn save_environment(&self, env: &Environment) -> Result<(), StoreError>;
}

/// Environment kept as pretty-printed JSON in `{data_dir}/env.json`.
pub struct FsEnvironmentStore {
  path: PathBuf,
}

impl FsEnvironmentStore {
  pub fn new(data_dir: impl AsRef<Path>) -> Self {
    Self::at(data_dir.as_ref().join(ENV_FILE))
  }

  /// Use an explicit file path.
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

#[async_trait]
impl EnvironmentStore for FsEnvironmentStore {
  async fn load_environment(&self) -> Result<Environment, StoreError> {
    let content = match fs::read_to_string(&self.path).await {
      Ok(content) => content,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Environment::new()),
      Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&content)?)
  }

  async fn save_environment(&self, env: &Environment) -> Result<(), StoreError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(env)?;
    fs::write(&self.path, content).await?;
    debug!(path = %self.path.display(), keys = env.len(), "environment saved");
    Ok(())
  }
}
