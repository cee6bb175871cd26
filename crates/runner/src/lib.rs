//! Kairos Runner - Pipeline Orchestration
//!
//! Ties the orchestration core together and runs it:
//!
//! - **Bootstrap**: validates wiring, triggers, and the dependency graph
//!   before the first tick is processed
//! - **Strategy Engine**: one bus + cache + bound worker set per
//!   strategy instance, with forced cleanup on failed runs
//! - **Platform**: fans external ticks out to per-strategy tasks
//! - **Feeds**: immutable rolling-window snapshots and a seeded tick
//!   simulator for demos and tests
//! - **Audit**: in-memory recorder for run markers, queryable by id
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │    Tick Feed     │
//!                  └────────┬─────────┘
//!                           │ broadcast (platform scope)
//!          ┌────────────────┼────────────────┐
//!          ▼                ▼                ▼
//!  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//!  │ Strategy A   │  │ Strategy B   │  │ Strategy C   │
//!  │ engine/task  │  │ engine/task  │  │ engine/task  │
//!  │  bus+cache   │  │  bus+cache   │  │  bus+cache   │
//!  └──────┬───────┘  └──────────────┘  └──────────────┘
//!         │ run markers
//!         ▼
//!  ┌──────────────┐
//!  │ Audit Log    │
//!  └──────────────┘
//! ```

pub mod audit;
pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod feed;
pub mod platform;

// Re-export main types
pub use audit::AuditRecorder;
pub use bootstrap::StrategyDefinition;
pub use engine::{ExternalTick, RunStats, StrategyEngine};
pub use error::{BootstrapError, EngineError};
pub use feed::{RollingWindowFeed, SharedWindow, TickFeedConfig, TickFeedSimulator};
pub use platform::Platform;
