//! Kairos Strategy Cache
//!
//! The per-strategy, per-run result store. Workers write the DTOs they
//! produce during one tick; downstream workers read back exactly the set
//! they declared as required. The cache is anchored to a single point in
//! time and lives for exactly one run:
//!
//! - `start_new_run` opens the run and fails on any reentrancy
//! - worker writes overwrite by DTO type, no merge semantics
//! - `clear` drops everything so the next tick starts clean
//!
//! Entries are keyed by DTO *type*, so a producer and its consumers agree
//! on the key by construction rather than by convention.

pub mod capability;
pub mod cache;
pub mod error;

pub use cache::{RequiredDtos, StrategyCache};
pub use capability::{CapabilityRegistry, DtoSpec, WorkerCapabilities};
pub use error::{CacheError, Result};
