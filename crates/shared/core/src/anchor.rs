//! Run Anchor - the point in time a run describes
//!
//! Every cache entry and plan produced during one tick describes the same
//! instant. The anchor is created once per tick by the flow initiator and
//! is read-only afterward; two runs are the same run iff their anchors are
//! equal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable identity of the currently active run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAnchor {
    timestamp: DateTime<Utc>,
}

impl RunAnchor {
    /// Anchor a run to the given point in time
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp }
    }

    /// The point in time this run describes
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl std::fmt::Display for RunAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run@{}", self.timestamp.to_rfc3339())
    }
}
