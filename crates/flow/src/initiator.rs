//! Flow Initiator - begins a run on the external broadcast event
//!
//! The initiator is the only worker allowed to open a run. Its state
//! machine (idle -> run active -> idle) collapses into the synchronous
//! process call: the run opens before the trigger mapping is consulted,
//! and the "ready" edge is the adapter executing the returned envelope.

use crate::error::FlowError;
use kairos_bus::{Disposition, Emission, EventMessage, Worker, WorkerError};
use kairos_cache::StrategyCache;
use kairos_core::{ConnectorId, EventName, WorkerId};
use std::collections::HashMap;
use std::sync::Arc;

/// Static mapping from trigger event name to output connector
///
/// Configured, never computed at runtime; a trigger the map does not
/// know is a configuration error caught by bootstrap validation.
#[derive(Debug, Clone, Default)]
pub struct TriggerMap {
    map: HashMap<EventName, ConnectorId>,
}

impl TriggerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: map a trigger event to an output connector
    pub fn map(
        mut self,
        event: impl Into<EventName>,
        connector: impl Into<ConnectorId>,
    ) -> Self {
        self.map.insert(event.into(), connector.into());
        self
    }

    pub fn resolve(&self, event: &EventName) -> Option<&ConnectorId> {
        self.map.get(event)
    }

    /// All mapped trigger events, for bootstrap validation
    pub fn entries(&self) -> impl Iterator<Item = (&EventName, &ConnectorId)> {
        self.map.iter()
    }
}

/// Per-strategy singleton that turns the external tick into a run
pub struct FlowInitiator {
    id: WorkerId,
    triggers: TriggerMap,
}

impl FlowInitiator {
    pub fn new(id: impl Into<WorkerId>, triggers: TriggerMap) -> Self {
        Self {
            id: id.into(),
            triggers,
        }
    }

    pub fn triggers(&self) -> &TriggerMap {
        &self.triggers
    }
}

impl Worker for FlowInitiator {
    fn id(&self) -> &WorkerId {
        &self.id
    }

    fn process(
        &mut self,
        event: &EventMessage,
        cache: &StrategyCache,
    ) -> Result<Disposition, WorkerError> {
        // Open the run first, unconditionally; the reentrancy guard in
        // the cache is the authority on overlapping ticks.
        let anchor = cache.start_new_run(event.timestamp)?;
        log::info!("{}: {} triggered by {}", cache.strategy_id(), anchor, event.name);

        let connector = self
            .triggers
            .resolve(&event.name)
            .ok_or_else(|| FlowError::UnmappedTrigger(event.name.clone()))?;

        // Payload and chain forwarded untouched - lifecycle only.
        Ok(Disposition::Publish(Emission::forward(
            connector.clone(),
            Arc::clone(&event.payload),
            event.causality.clone(),
        )))
    }
}
