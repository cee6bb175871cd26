//! Kairos Event Bus
//!
//! Scoped publish/subscribe broker plus the worker-side contract that
//! keeps worker logic off the transport:
//!
//! - **EventBus**: dumb broadcast with PLATFORM and STRATEGY scoping.
//!   A publish call synchronously drains every matching subscriber in
//!   registration order before it returns; handlers may publish again,
//!   which recursively drains the rest of the graph (the super-step).
//!   No filtering by payload content - typed discrimination happens in
//!   subscriber code via downcast.
//! - **Worker / Disposition**: workers never touch the bus. They return a
//!   three-way envelope (continue / publish / stop) and the adapter turns
//!   it into bus operations.
//! - **WiringConfig / EventAdapter**: static wiring maps worker connectors
//!   to event names and event names to worker handlers; the adapter is the
//!   only code that executes envelopes.

pub mod adapter;
pub mod bus;
pub mod error;
pub mod event;
pub mod wiring;
pub mod worker;

pub use adapter::EventAdapter;
pub use bus::{EventBus, Handler, SubscriptionId};
pub use error::{BusError, Result, WorkerError};
pub use event::{EventMessage, Payload, Scope};
pub use wiring::{OutputRoute, SubscriptionRoute, WiringConfig};
pub use worker::{Disposition, Emission, Worker};
