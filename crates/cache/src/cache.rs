//! The per-run cache itself

use crate::capability::CapabilityRegistry;
use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use kairos_core::{RunAnchor, StrategyId, WorkerId};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct CacheEntry {
    /// Type name of the stored DTO, kept for logging
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct CacheState {
    anchor: Option<RunAnchor>,
    entries: HashMap<TypeId, CacheEntry>,
}

/// Point-in-time result store for one strategy instance
///
/// Exclusively owned and mutated by the strategy's own worker set during
/// one run; shared among them behind an `Arc`. The interior mutex is never
/// contended across strategy instances because each instance has its own
/// cache.
pub struct StrategyCache {
    strategy_id: StrategyId,
    registry: Arc<CapabilityRegistry>,
    state: Mutex<CacheState>,
}

impl StrategyCache {
    pub fn new(strategy_id: impl Into<StrategyId>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            registry,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new run anchored at `timestamp`
    ///
    /// Fails with [`CacheError::RunAlreadyActive`] while any run is open,
    /// whether the incoming anchor matches the active one or not: a
    /// duplicate trigger for the same tick is as much a wiring bug as an
    /// overlapping tick, and neither may proceed on stale state.
    pub fn start_new_run(&self, timestamp: DateTime<Utc>) -> Result<RunAnchor> {
        let mut state = self.state();
        let incoming = RunAnchor::new(timestamp);

        if let Some(active) = state.anchor {
            return Err(CacheError::RunAlreadyActive {
                strategy_id: self.strategy_id.clone(),
                active,
                incoming,
            });
        }

        state.anchor = Some(incoming);
        log::debug!("{}: run opened at {}", self.strategy_id, incoming);
        Ok(incoming)
    }

    /// The anchor of the currently active run
    pub fn run_anchor(&self) -> Result<RunAnchor> {
        self.state().anchor.ok_or(CacheError::NoActiveRun {
            strategy_id: self.strategy_id.clone(),
        })
    }

    /// True while a run is open
    pub fn is_active(&self) -> bool {
        self.state().anchor.is_some()
    }

    /// Store a result DTO, overwriting any prior value of the same type
    pub fn put_result<T: Any + Send + Sync>(&self, producer: &WorkerId, value: T) -> Result<()> {
        let mut state = self.state();
        if state.anchor.is_none() {
            return Err(CacheError::NoActiveRun {
                strategy_id: self.strategy_id.clone(),
            });
        }

        let name = std::any::type_name::<T>();
        let replaced = state
            .entries
            .insert(
                TypeId::of::<T>(),
                CacheEntry {
                    name,
                    value: Arc::new(value),
                },
            )
            .is_some();

        if replaced {
            log::debug!("{}: {} overwrote {}", self.strategy_id, producer, name);
        }
        Ok(())
    }

    /// Fetch exactly the DTO set the named consumer declared as required
    ///
    /// Fails with [`CacheError::MissingDependency`] on the first declared
    /// dependency that is absent; never returns a partial set.
    pub fn required_dtos(&self, consumer: &WorkerId) -> Result<RequiredDtos> {
        let capabilities = self
            .registry
            .get(consumer)
            .ok_or_else(|| CacheError::UnknownWorker(consumer.clone()))?;

        let state = self.state();
        let mut entries = HashMap::with_capacity(capabilities.requires.len());

        for spec in &capabilities.requires {
            match state.entries.get(&spec.type_id()) {
                Some(entry) => {
                    entries.insert(spec.type_id(), Arc::clone(&entry.value));
                }
                None => {
                    return Err(CacheError::MissingDependency {
                        consumer: consumer.clone(),
                        dto: spec.name().to_string(),
                    });
                }
            }
        }

        Ok(RequiredDtos { entries })
    }

    /// Drop all entries and the anchor; no-op when idle
    ///
    /// A populated run being discarded is worth knowing about: incomplete
    /// aggregation state is lost at the tick boundary, so the discard is
    /// logged with the abandoned anchor.
    pub fn clear(&self) {
        let mut state = self.state();
        match state.anchor.take() {
            Some(anchor) if !state.entries.is_empty() => {
                let names: Vec<_> = state.entries.values().map(|e| e.name).collect();
                log::warn!(
                    "{}: cleared {} with {} entries still cached: {}",
                    self.strategy_id,
                    anchor,
                    names.len(),
                    names.join(", ")
                );
            }
            Some(anchor) => log::debug!("{}: cleared {}", self.strategy_id, anchor),
            None => {}
        }
        state.entries.clear();
    }
}

/// The resolved dependency set handed to a consumer
pub struct RequiredDtos {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for RequiredDtos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequiredDtos")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl RequiredDtos {
    /// Typed accessor for one of the declared dependencies
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
