//! Flow Terminator - closes a run after the batch is out
//!
//! Dual of the initiator: clears the cache so the next tick starts clean
//! and publishes a marker carrying identifiers only. The audit subsystem
//! joins those ids against persisted records later; the payloads
//! themselves never travel with the marker.

use crate::error::FlowError;
use kairos_bus::{Disposition, EventMessage, Worker, WorkerError};
use kairos_cache::StrategyCache;
use kairos_core::{ConnectorId, LinkKind, PlanBatch, RunMarker, WorkerId};

/// Per-strategy singleton that ends the run on the terminal batch event
pub struct FlowTerminator {
    id: WorkerId,
    marker_connector: ConnectorId,
}

impl FlowTerminator {
    pub fn new(id: impl Into<WorkerId>, marker_connector: impl Into<ConnectorId>) -> Self {
        Self {
            id: id.into(),
            marker_connector: marker_connector.into(),
        }
    }
}

impl Worker for FlowTerminator {
    fn id(&self) -> &WorkerId {
        &self.id
    }

    fn process(
        &mut self,
        event: &EventMessage,
        cache: &StrategyCache,
    ) -> Result<Disposition, WorkerError> {
        let batch = event
            .payload_as::<PlanBatch>()
            .ok_or_else(|| FlowError::MalformedTerminal(event.name.clone()))?;

        let anchor = cache.run_anchor()?;
        let marker = RunMarker {
            anchor,
            origin: event.causality.origin(),
            directive_id: Some(batch.directive_id),
            plan_ids: event.causality.ids_of_kind(LinkKind::Plan),
        };

        cache.clear();
        log::info!(
            "{}: {} completed, {} record(s), {} plan id(s) recorded",
            cache.strategy_id(),
            anchor,
            batch.records.len(),
            marker.plan_ids.len()
        );

        Ok(Disposition::publish(
            self.marker_connector.clone(),
            marker,
            event.causality.clone(),
        ))
    }
}
