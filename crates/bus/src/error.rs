//! Bus and worker-boundary errors

use kairos_core::{ConnectorId, EventName, WorkerId};
use thiserror::Error;

/// Opaque error surfaced by a worker's process method
///
/// Workers belong to crates the bus knows nothing about; their typed
/// errors cross the worker/adapter boundary boxed, with the type preserved
/// for the supervisory layer to downcast if it needs to.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct WorkerError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl WorkerError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self(err.into())
    }

    /// Borrow the underlying error for downcasting
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl From<kairos_cache::CacheError> for WorkerError {
    fn from(err: kairos_cache::CacheError) -> Self {
        Self::new(err)
    }
}

/// Errors raised by the bus and the adapter layer
#[derive(Error, Debug)]
pub enum BusError {
    #[error("strategy-scoped {0} requires a scope id")]
    MissingScopeId(EventName),

    #[error("no publication wired for worker {worker}, connector {connector}")]
    UnwiredConnector {
        worker: WorkerId,
        connector: ConnectorId,
    },

    #[error("worker {worker} has no subscription routes")]
    UnroutedWorker { worker: WorkerId },

    #[error("worker {worker} failed on {event}: {source}")]
    Worker {
        worker: WorkerId,
        event: EventName,
        #[source]
        source: WorkerError,
    },
}

pub type Result<T> = std::result::Result<T, BusError>;
