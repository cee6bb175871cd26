//! Runner errors

use kairos_bus::BusError;
use kairos_core::{ConnectorId, EventName, WorkerId};
use thiserror::Error;

/// Configuration problems caught before the first tick
///
/// None of these may ever surface mid-run; bootstrap refuses to build an
/// engine around them.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("worker {worker} declares connector {connector} but no publication is wired")]
    MissingPublication {
        worker: WorkerId,
        connector: ConnectorId,
    },

    #[error("initiator {worker} subscribes to {event} but has no trigger mapping for it")]
    MissingTrigger { worker: WorkerId, event: EventName },

    #[error("trigger for {event} names connector {connector}, which is not wired")]
    UnwiredTrigger {
        event: EventName,
        connector: ConnectorId,
    },

    #[error("subscription route names unregistered worker {0}")]
    UnknownWorker(WorkerId),

    #[error("worker {worker} requires {dto}, which no registered worker produces")]
    UnsatisfiableDependency { worker: WorkerId, dto: String },

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Runtime failure of one run
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("run failed: {0}")]
    Run(#[from] BusError),
}
