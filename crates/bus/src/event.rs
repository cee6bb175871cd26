//! Event message and scoping

use chrono::{DateTime, Utc};
use kairos_core::{CausalityChain, EventId, EventName, StrategyId};
use std::any::Any;
use std::sync::Arc;

/// Opaque payload forwarded by the bus without inspection
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Visibility breadth of a published event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Delivered to every platform-scoped subscriber
    Platform,
    /// Delivered only to subscribers registered for the same strategy id
    Strategy,
}

/// One event as it travels the bus
#[derive(Clone)]
pub struct EventMessage {
    pub name: EventName,
    pub scope: Scope,
    pub scope_id: Option<StrategyId>,
    /// Unique id of this occurrence
    pub event_id: EventId,
    /// The point in time the triggering tick describes
    pub timestamp: DateTime<Utc>,
    pub causality: CausalityChain,
    pub payload: Payload,
}

impl EventMessage {
    /// Build a platform-scoped event
    pub fn platform<T: Any + Send + Sync>(
        name: impl Into<EventName>,
        timestamp: DateTime<Utc>,
        causality: CausalityChain,
        payload: T,
    ) -> Self {
        Self {
            name: name.into(),
            scope: Scope::Platform,
            scope_id: None,
            event_id: EventId::generate(),
            timestamp,
            causality,
            payload: Arc::new(payload),
        }
    }

    /// Build a strategy-scoped event
    pub fn strategy<T: Any + Send + Sync>(
        name: impl Into<EventName>,
        scope_id: impl Into<StrategyId>,
        timestamp: DateTime<Utc>,
        causality: CausalityChain,
        payload: T,
    ) -> Self {
        Self {
            name: name.into(),
            scope: Scope::Strategy,
            scope_id: Some(scope_id.into()),
            event_id: EventId::generate(),
            timestamp,
            causality,
            payload: Arc::new(payload),
        }
    }

    /// Downcast the payload to a concrete DTO type
    pub fn payload_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.payload).downcast::<T>().ok()
    }
}

impl std::fmt::Debug for EventMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventMessage")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("scope_id", &self.scope_id)
            .field("event_id", &self.event_id)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}
