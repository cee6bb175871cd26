//! Platform - concurrent strategy instances behind one tick source
//!
//! Strategy instances are isolated: each owns its bus and cache and is
//! driven single-threaded by its own task. The platform's only job is
//! fan-out - broadcasting external ticks to every registered instance -
//! and bookkeeping. A slow strategy never blocks another.

use crate::engine::{ExternalTick, RunStats, StrategyEngine};
use dashmap::DashMap;
use kairos_core::StrategyId;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Registry and tick fan-out for a set of strategy engines
pub struct Platform {
    engines: DashMap<StrategyId, Arc<StrategyEngine>>,
    tick_tx: broadcast::Sender<ExternalTick>,
}

impl Platform {
    pub fn new(channel_capacity: usize) -> Self {
        let (tick_tx, _) = broadcast::channel(channel_capacity);
        Self {
            engines: DashMap::new(),
            tick_tx,
        }
    }

    /// Register an engine and spawn its dispatch task
    ///
    /// The task drains the tick channel and runs one super-step per
    /// tick. Run failures are logged and counted on the engine; the
    /// task keeps going - state resets at the next tick by design.
    pub fn spawn(&self, engine: Arc<StrategyEngine>) -> JoinHandle<()> {
        self.engines
            .insert(engine.strategy_id().clone(), Arc::clone(&engine));
        let mut rx = self.tick_tx.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(tick) => {
                        if let Err(err) = engine.dispatch(&tick) {
                            log::error!("{}: {err}", engine.strategy_id());
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("{}: dropped {missed} tick(s)", engine.strategy_id());
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Broadcast one external tick to every registered engine
    pub fn broadcast(&self, tick: ExternalTick) -> usize {
        self.tick_tx.send(tick).unwrap_or(0)
    }

    pub fn engine(&self, id: &StrategyId) -> Option<Arc<StrategyEngine>> {
        self.engines.get(id).map(|e| Arc::clone(&e))
    }

    /// Run counters across every registered engine
    pub fn stats(&self) -> Vec<(StrategyId, RunStats)> {
        self.engines
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stats()))
            .collect()
    }

    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }
}
