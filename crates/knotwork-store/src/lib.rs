//! Knotwork Store
//!
//! Filesystem persistence for the two things knotwork keeps between sessions:
//! the executor environment and saved flows.

mod env_store;
mod error;
mod flow_store;

pub use env_store::{EnvironmentStore, FsEnvironmentStore};
pub use error::StoreError;
pub use flow_store::{FlowStore, FsFlowStore};
