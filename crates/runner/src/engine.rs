//! Strategy Engine - one strategy instance's pipeline at runtime
//!
//! Owns the instance's bus and cache, binds the worker set through the
//! adapter, and dispatches external ticks. Each dispatch is one
//! super-step: the platform-scoped publish drains the whole subscriber
//! graph synchronously before returning. A failed run always leaves the
//! cache cleared so the next tick starts clean.

use crate::bootstrap::StrategyDefinition;
use crate::error::{BootstrapError, EngineError};
use kairos_bus::{EventAdapter, EventBus, EventMessage, Payload, Scope, Worker};
use kairos_cache::StrategyCache;
use kairos_core::{CausalityChain, EventId, EventName, StrategyId};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};

/// One external event as delivered by the platform
#[derive(Clone)]
pub struct ExternalTick {
    pub name: EventName,
    pub timestamp: DateTime<Utc>,
    pub payload: Payload,
}

impl ExternalTick {
    pub fn new<T: std::any::Any + Send + Sync>(
        name: impl Into<EventName>,
        timestamp: DateTime<Utc>,
        payload: T,
    ) -> Self {
        Self {
            name: name.into(),
            timestamp,
            payload: Arc::new(payload),
        }
    }
}

/// Per-engine run counters
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    /// Ticks dispatched into the pipeline
    pub ticks: u64,
    /// Runs aborted by an error (cache force-cleared)
    pub failed_runs: u64,
}

/// A bootstrapped strategy instance
pub struct StrategyEngine {
    strategy_id: StrategyId,
    bus: Arc<EventBus>,
    cache: Arc<StrategyCache>,
    stats: Mutex<RunStats>,
}

impl StrategyEngine {
    /// Validate the definition and bind the worker set
    ///
    /// Workers are handed over as trait objects; binding subscribes each
    /// one per the wiring. Any configuration hole fails here, before any
    /// tick is processed.
    pub fn bootstrap(
        definition: StrategyDefinition,
        workers: Vec<Arc<Mutex<dyn Worker>>>,
    ) -> Result<Self, BootstrapError> {
        definition.validate()?;

        let bus = Arc::new(EventBus::new());
        let cache = Arc::new(StrategyCache::new(
            definition.strategy_id.clone(),
            Arc::new(definition.registry),
        ));
        let adapter = EventAdapter::new(
            definition.strategy_id.clone(),
            Arc::clone(&bus),
            Arc::new(definition.wiring),
            Arc::clone(&cache),
        );

        for worker in workers {
            adapter.bind(worker)?;
        }

        Ok(Self {
            strategy_id: definition.strategy_id,
            bus,
            cache,
            stats: Mutex::new(RunStats::default()),
        })
    }

    pub fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn cache(&self) -> &Arc<StrategyCache> {
        &self.cache
    }

    pub fn stats(&self) -> RunStats {
        *self
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one tick through the pipeline
    ///
    /// Publishes the external event at platform scope on this instance's
    /// bus and drains the super-step. On error the cache is force-cleared
    /// (no half-populated state may cross a tick boundary) and the error
    /// propagates to the caller.
    pub fn dispatch(&self, tick: &ExternalTick) -> Result<(), EngineError> {
        let origin = EventId::generate();
        let event = EventMessage {
            name: tick.name.clone(),
            scope: Scope::Platform,
            scope_id: None,
            event_id: origin,
            timestamp: tick.timestamp,
            causality: CausalityChain::root(origin),
            payload: Arc::clone(&tick.payload),
        };

        let result = self.bus.publish(&event);
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.ticks += 1;

        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                stats.failed_runs += 1;
                drop(stats);
                log::error!("{}: run aborted: {err}", self.strategy_id);
                self.cache.clear();
                Err(EngineError::Run(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_bus::{Disposition, WiringConfig, WorkerError};
    use kairos_cache::{CapabilityRegistry, WorkerCapabilities};
    use kairos_core::WorkerId;
    use kairos_flow::{FlowError, TriggerMap};

    /// Worker that fails every time, to exercise forced cleanup
    struct Faulty {
        id: WorkerId,
    }

    impl Worker for Faulty {
        fn id(&self) -> &WorkerId {
            &self.id
        }

        fn process(
            &mut self,
            event: &EventMessage,
            cache: &StrategyCache,
        ) -> Result<Disposition, WorkerError> {
            cache.start_new_run(event.timestamp)?;
            Err(FlowError::UnmappedTrigger(event.name.clone()).into())
        }
    }

    fn definition() -> StrategyDefinition {
        let mut registry = CapabilityRegistry::new();
        registry.register("faulty", WorkerCapabilities::new());
        StrategyDefinition {
            strategy_id: StrategyId::from("s1"),
            wiring: WiringConfig::new().subscribe("faulty", "tick", Scope::Platform),
            registry,
            triggers: TriggerMap::new(),
            initiator: WorkerId::from("faulty-init-unused"),
        }
    }

    #[test]
    fn test_failed_run_clears_cache_and_counts() {
        let engine = StrategyEngine::bootstrap(
            definition(),
            vec![Arc::new(Mutex::new(Faulty {
                id: WorkerId::from("faulty"),
            }))],
        )
        .unwrap();

        let tick = ExternalTick::new("tick", Utc::now(), ());
        assert!(engine.dispatch(&tick).is_err());

        // The worker opened a run before failing; dispatch cleaned it up
        assert!(!engine.cache().is_active());
        let stats = engine.stats();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.failed_runs, 1);

        // Next tick starts clean and fails the same way, not with a
        // reentrancy violation
        let err = engine.dispatch(&tick).unwrap_err();
        assert!(err.to_string().contains("no trigger mapping"));
    }

    #[test]
    fn test_bootstrap_refuses_invalid_definition() {
        let mut def = definition();
        def.wiring = def.wiring.subscribe("ghost", "tick", Scope::Platform);

        assert!(matches!(
            StrategyEngine::bootstrap(def, Vec::new()),
            Err(BootstrapError::UnknownWorker(_))
        ));
    }
}
