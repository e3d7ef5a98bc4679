//! Post-run edge walk.
//!
//! After a batch run the engine visits every edge in declaration order and
//! copies the payload of each active edge into its target node using the
//! transfer rule for the `(source kind, target kind)` pair. It holds no state
//! between passes, so running it twice over the same graph and results leaves
//! the graph exactly as one pass did.

use std::collections::HashMap;

use knotwork_graph::{ExecutionResult, GraphError, GraphModel};
use serde::Serialize;
use tracing::debug;

use crate::router::HandleRouter;
use crate::transfer::{Transfer, TransferRegistry};

/// An edge whose payload was written into its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedTransfer {
  pub edge_id: String,
  pub source: String,
  pub target: String,
}

/// A target written by more than one active edge in the same pass. The later
/// edge wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overwrite {
  pub target: String,
  pub replaced_edge: String,
  pub winning_edge: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
  pub applied: Vec<AppliedTransfer>,
  pub overwritten: Vec<Overwrite>,
}

#[derive(Debug, Clone, Default)]
pub struct PropagationEngine {
  registry: TransferRegistry,
}

impl PropagationEngine {
  pub fn new(registry: TransferRegistry) -> Self {
    Self { registry }
  }

  pub fn registry(&self) -> &TransferRegistry {
    &self.registry
  }

  /// Walk every edge and apply the transfers that fire for `results`.
  ///
  /// Nodes absent from `results` never send anything.
  pub fn propagate(
    &self,
    graph: &mut GraphModel,
    results: &HashMap<String, ExecutionResult>,
  ) -> Result<PropagationReport, GraphError> {
    let mut report = PropagationReport::default();
    let mut writers: HashMap<String, String> = HashMap::new();

    for index in 0..graph.edges().len() {
      let edge = graph.edges()[index].clone();

      let (Some(source), Some(target)) = (graph.node(&edge.source), graph.node(&edge.target))
      else {
        continue;
      };
      let Some(result) = results.get(&source.id) else {
        continue;
      };
      let Some(payload) = HandleRouter::fire(&edge, source, result).into_payload() else {
        continue;
      };
      let Some(rule) = self.registry.lookup(source.kind(), target.kind()) else {
        continue;
      };

      let transfer = Transfer {
        source_kind: source.kind(),
        payload: &payload,
      };
      let mut data = target.data.clone();
      if !rule(&transfer, &mut data) {
        continue;
      }
      graph.update_node_data(&edge.target, data)?;

      if let Some(previous) = writers.insert(edge.target.clone(), edge.id.clone()) {
        debug!(
          target_node = %edge.target,
          replaced_edge = %previous,
          edge_id = %edge.id,
          "propagation_overwrite"
        );
        report.overwritten.push(Overwrite {
          target: edge.target.clone(),
          replaced_edge: previous,
          winning_edge: edge.id.clone(),
        });
      }

      report.applied.push(AppliedTransfer {
        edge_id: edge.id,
        source: edge.source,
        target: edge.target,
      });
    }

    Ok(report)
  }
}
