//! Aggregation errors
//!
//! All of these are fatal for the current run and recoverable at the
//! next tick; none are retried or swallowed. An unexpected trade id in
//! particular signals an upstream wiring or directive-construction bug
//! and must reach the supervisory layer.

use kairos_bus::WorkerError;
use kairos_core::{EventName, PlanSlot, RunAnchor, TradeId};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("second planning directive for {anchor}")]
    Reentrant { anchor: RunAnchor },

    #[error("invalid directive {directive_id}: {reason}")]
    InvalidDirective { directive_id: Uuid, reason: String },

    #[error("plan for untracked trade {trade_id}")]
    UnexpectedTrade { trade_id: TradeId },

    #[error("{slot} plan for trade {trade_id} was not requested")]
    UnexpectedSlot { trade_id: TradeId, slot: PlanSlot },

    #[error("duplicate {slot} plan for trade {trade_id}")]
    DuplicateSlot { trade_id: TradeId, slot: PlanSlot },

    #[error("plan for trade {trade_id} arrived before any directive")]
    PlanWithoutDirective { trade_id: TradeId },

    #[error("event {0} carried neither a directive nor a plan")]
    MalformedEvent(EventName),
}

impl From<AggregatorError> for WorkerError {
    fn from(err: AggregatorError) -> Self {
        WorkerError::new(err)
    }
}
