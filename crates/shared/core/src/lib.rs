//! Kairos Core Domain
//!
//! Pure domain types for the Kairos pipeline core.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod anchor;
pub mod causality;
pub mod identifiers;
pub mod plan;
pub mod tick;

// Re-export commonly used types at crate root
pub use anchor::RunAnchor;
pub use causality::{CausalityChain, CausalityLink, LinkKind};
pub use identifiers::{ConnectorId, EventId, EventName, StrategyId, TradeId, WorkerId};
pub use plan::{
    AggregatedDirective, DirectiveTargets, PlanBatch, PlanSlot, PlanSlotSet, PlanningDirective,
    RunMarker, SequentialPlanRequest, TradePlan,
};
pub use tick::MarketTick;
