//! Knotwork Engine
//!
//! Runs knotwork flows against an external backend and folds the results back
//! into the graph.
//!
//! - [`ExecutionCoordinator`] performs batch runs: snapshot, round trip,
//!   stamping, then a [`PropagationEngine`] pass over every edge.
//! - [`HandleRouter`] decides which edges an executed node activates.
//! - [`ReactiveWatchLayer`] and its driver [`ReactiveWatcher`] re-run nodes
//!   whose upstream condition turns true, outside any batch run.
//!
//! The coordinator and the watcher never call each other. Both only read and
//! write the [`SharedGraph`].

mod condition;
mod coordinator;
mod error;
mod events;
mod executor;
mod propagation;
mod reactive;
mod router;
mod shared;
mod transfer;
mod variables;
mod watcher;

pub use condition::{compare, evaluate as evaluate_condition, resolve as resolve_condition};
pub use coordinator::{ExecutionCoordinator, RunReport};
pub use error::{EngineError, ExecutorError};
pub use events::{ChannelNotifier, NoopNotifier, RunEvent, RunNotifier, RunOutcome};
pub use executor::{CommandExecutor, CommandExecutorConfig, ExecutionResponse, FlowExecutor};
pub use propagation::{AppliedTransfer, Overwrite, PropagationEngine, PropagationReport};
pub use reactive::{ReactivePredicate, ReactiveWatchLayer, WatchPhase, upstream_condition_true};
pub use router::{Firing, HandleRouter, collection as loop_collection};
pub use shared::SharedGraph;
pub use transfer::{Transfer, TransferRegistry, TransferRule};
pub use variables::Variables;
pub use watcher::{ReactiveWatcher, apply_reactive_result};
