//! Identifier newtypes used across the pipeline
//!
//! String-keyed ids get newtype wrappers so they can't be mixed up in
//! wiring tables or map keys. Generated ids (events) wrap a UUID.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new id
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id! {
    /// Identifies one strategy instance (the unit of state isolation)
    StrategyId
}

string_id! {
    /// Identifies a worker within a strategy's pipeline
    WorkerId
}

string_id! {
    /// Logical output port of a worker, resolved to an event name by wiring
    ConnectorId
}

string_id! {
    /// Name of a bus event (the routing key for publish/subscribe)
    EventName
}

string_id! {
    /// Identifies one trade leg tracked through planning
    TradeId
}

/// Unique identifier for a bus event occurrence
///
/// Stamped on the external event at the edge and carried as the origin of
/// every causality chain spawned from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generate a fresh event id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
