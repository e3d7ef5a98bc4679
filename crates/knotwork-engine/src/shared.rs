//! A graph shared between the coordinator, the reactive watcher and callers.

use std::sync::Arc;

use knotwork_graph::GraphModel;
use tokio::sync::{RwLock, RwLockReadGuard, watch};

/// [`GraphModel`] behind an async lock, plus a revision counter.
///
/// Every call to [`SharedGraph::update`] bumps the revision after the write
/// lock is released, so subscribers always re-read a settled graph.
#[derive(Debug, Clone)]
pub struct SharedGraph {
  model: Arc<RwLock<GraphModel>>,
  revision: Arc<watch::Sender<u64>>,
}

impl SharedGraph {
  pub fn new(model: GraphModel) -> Self {
    let (revision, _) = watch::channel(0);
    Self {
      model: Arc::new(RwLock::new(model)),
      revision: Arc::new(revision),
    }
  }

  pub async fn read(&self) -> RwLockReadGuard<'_, GraphModel> {
    self.model.read().await
  }

  pub async fn snapshot(&self) -> GraphModel {
    self.model.read().await.clone()
  }

  /// Mutate the graph and notify subscribers.
  pub async fn update<R>(&self, f: impl FnOnce(&mut GraphModel) -> R) -> R {
    let out = {
      let mut model = self.model.write().await;
      f(&mut model)
    };
    self.revision.send_modify(|rev| *rev += 1);
    out
  }

  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.revision.subscribe()
  }

  pub fn revision(&self) -> u64 {
    *self.revision.borrow()
  }
}
