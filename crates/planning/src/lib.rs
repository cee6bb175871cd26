//! Kairos Planning Aggregation
//!
//! The fan-in coordinator of the pipeline: a planning directive fixes the
//! set of trades being planned, parallel planners fill entry/size/exit
//! slots in any order, the sequential planner answers per-trade
//! execution requests, and the aggregator emits exactly one batch when
//! every tracked trade has every expected slot.

pub mod aggregator;
pub mod error;

pub use aggregator::{AggregatorConfig, PlanningAggregator};
pub use error::AggregatorError;
