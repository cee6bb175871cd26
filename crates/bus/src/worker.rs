//! Worker contract - the disposition envelope
//!
//! Workers are stateless with respect to transport: they read the event
//! and the cache, and answer with what should happen next. The adapter is
//! the only code that turns that answer into bus operations, so worker
//! logic stays testable without a bus in sight.

use crate::error::WorkerError;
use crate::event::{EventMessage, Payload};
use kairos_core::{CausalityChain, ConnectorId, WorkerId};
use kairos_cache::StrategyCache;
use std::any::Any;
use std::sync::Arc;

/// One event a worker wants published, named by logical connector
///
/// The connector is resolved to a concrete event name and scope by the
/// static wiring; workers never see event names. The payload exists by
/// construction - there is no way to build a publish envelope without one.
pub struct Emission {
    pub connector: ConnectorId,
    pub payload: Payload,
    /// Chain to stamp on the outgoing event; extend it when contributing
    /// an id, forward the incoming chain unchanged otherwise
    pub causality: CausalityChain,
}

impl Emission {
    pub fn new<T: Any + Send + Sync>(
        connector: impl Into<ConnectorId>,
        payload: T,
        causality: CausalityChain,
    ) -> Self {
        Self {
            connector: connector.into(),
            payload: Arc::new(payload),
            causality,
        }
    }

    /// Forward an already-shared payload without re-wrapping it
    pub fn forward(
        connector: impl Into<ConnectorId>,
        payload: Payload,
        causality: CausalityChain,
    ) -> Self {
        Self {
            connector: connector.into(),
            payload,
            causality,
        }
    }
}

/// The three-way outcome contract every worker returns
pub enum Disposition {
    /// Nothing to publish; the pipeline proceeds through static wiring
    Continue,
    /// Exactly one event must be emitted
    Publish(Emission),
    /// Terminate this flow branch; no further propagation
    Stop,
}

impl Disposition {
    /// Shorthand for a single-emission publish
    pub fn publish<T: Any + Send + Sync>(
        connector: impl Into<ConnectorId>,
        payload: T,
        causality: CausalityChain,
    ) -> Self {
        Disposition::Publish(Emission::new(connector, payload, causality))
    }
}

impl std::fmt::Debug for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Continue => write!(f, "Continue"),
            Disposition::Publish(e) => write!(f, "Publish({})", e.connector),
            Disposition::Stop => write!(f, "Stop"),
        }
    }
}

/// A pipeline worker
///
/// One fixed entry point per worker, selected by static wiring rather
/// than by reflected handler names. Implementations hold their own state
/// and are driven single-threaded within a strategy instance.
pub trait Worker: Send {
    /// Stable identifier, matching wiring and capability declarations
    fn id(&self) -> &WorkerId;

    /// Handle one event and answer with a disposition
    fn process(
        &mut self,
        event: &EventMessage,
        cache: &StrategyCache,
    ) -> Result<Disposition, WorkerError>;
}
