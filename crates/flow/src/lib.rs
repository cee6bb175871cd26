//! Kairos Flow Lifecycle
//!
//! The pair of workers that open and close every run:
//!
//! - [`FlowInitiator`] receives the platform-broadcast external event,
//!   anchors a new run in the cache, and republishes the payload
//!   unchanged as the strategy-scoped "ready" event. Pure lifecycle - it
//!   never transforms business data.
//! - [`FlowTerminator`] receives the terminal batch event, clears the
//!   cache, and publishes an identifier-only marker for the audit
//!   subsystem.

pub mod error;
pub mod initiator;
pub mod terminator;

pub use error::FlowError;
pub use initiator::{FlowInitiator, TriggerMap};
pub use terminator::FlowTerminator;
