use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use knotwork_graph::Flow;
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;

const TESTS_DIR: &str = "tests";

/// Saved flows, addressed by a name relative to the store.
#[async_trait]
pub trait FlowStore: Send + Sync {
  async fn save_flow(&self, name: &str, flow: &Flow) -> Result<(), StoreError>;

  async fn load_flow(&self, name: &str) -> Result<Flow, StoreError>;

  /// Names of every saved flow, sorted.
  async fn list_flows(&self) -> Result<Vec<String>, StoreError>;
}

/// Flows stored as JSON files.
///
/// ```text
/// {root}/
/// ├── login.json
/// └── tests/
///     └── smoke.json
/// ```
///
/// A name without an extension gets `.json` appended. Only the JSON shape is
/// checked on load; graph validation is left to the caller.
pub struct FsFlowStore {
  root: PathBuf,
}

impl FsFlowStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Resolve a flow name to its file, refusing names that escape the root.
  pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
    let relative = Path::new(name);
    let escapes = relative
      .components()
      .any(|c| !matches!(c, Component::Normal(_)));
    if name.is_empty() || escapes {
      return Err(StoreError::InvalidName(name.to_string()));
    }

    let mut path = self.root.join(relative);
    if path.extension().is_none() {
      path.set_extension("json");
    }
    Ok(path)
  }

  async fn scan(&self, dir: &Path, prefix: Option<&str>) -> Result<Vec<String>, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|s| s.to_str()) != Some("json")
        || !entry.file_type().await?.is_file()
      {
        continue;
      }
      let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        continue;
      };
      names.push(match prefix {
        Some(prefix) => format!("{}/{}", prefix, file_name),
        None => file_name.to_string(),
      });
    }
    Ok(names)
  }
}

#[async_trait]
impl FlowStore for FsFlowStore {
  async fn save_flow(&self, name: &str, flow: &Flow) -> Result<(), StoreError> {
    let path = self.path_for(name)?;
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(flow)?;
    fs::write(&path, content).await?;
    debug!(
      path = %path.display(),
      nodes = flow.nodes.len(),
      edges = flow.edges.len(),
      "flow saved"
    );
    Ok(())
  }

  async fn load_flow(&self, name: &str) -> Result<Flow, StoreError> {
    let path = self.path_for(name)?;
    let content = match fs::read_to_string(&path).await {
      Ok(content) => content,
      Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(path)),
      Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&content)?)
  }

  async fn list_flows(&self) -> Result<Vec<String>, StoreError> {
    let mut names = self.scan(&self.root, None).await?;
    names.extend(
      self
        .scan(&self.root.join(TESTS_DIR), Some(TESTS_DIR))
        .await?,
    );
    names.sort();
    Ok(names)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_path_for() {
    let store = FsFlowStore::new("/data/flows");
    assert_eq!(
      store.path_for("login").unwrap(),
      PathBuf::from("/data/flows/login.json")
    );
    assert_eq!(
      store.path_for("tests/smoke.json").unwrap(),
      PathBuf::from("/data/flows/tests/smoke.json")
    );
    assert!(matches!(
      store.path_for("../etc/passwd"),
      Err(StoreError::InvalidName(_))
    ));
    assert!(store.path_for("/abs.json").is_err());
    assert!(store.path_for("").is_err());
  }

  #[tokio::test]
  async fn test_load_missing() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsFlowStore::new(dir.path());
    assert!(matches!(
      store.load_flow("nope").await,
      Err(StoreError::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn test_list_skips_json_named_directories() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(dir.path().join("archive.json"))
      .await
      .unwrap();
    tokio::fs::write(dir.path().join("login.json"), r#"{"nodes":[],"edges":[]}"#)
      .await
      .unwrap();

    let store = FsFlowStore::new(dir.path());
    assert_eq!(store.list_flows().await.unwrap(), vec!["login.json"]);
  }

  #[tokio::test]
  async fn test_list_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsFlowStore::new(dir.path().join("absent"));
    assert!(store.list_flows().await.unwrap().is_empty());
  }
}
