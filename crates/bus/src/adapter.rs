//! Event adapter - executes worker envelopes as bus operations
//!
//! One adapter per strategy instance. Binding a worker subscribes a
//! closure for every wiring route that names it; the closure drives the
//! worker's process method and then executes the returned disposition.
//! Workers therefore never hold a bus reference, and the scope id on
//! everything they publish is stamped here, from the instance identity.

use crate::bus::{EventBus, Handler, SubscriptionId};
use crate::error::{BusError, Result};
use crate::event::{EventMessage, Scope};
use crate::wiring::WiringConfig;
use crate::worker::{Disposition, Worker};
use kairos_cache::StrategyCache;
use kairos_core::{EventId, StrategyId, WorkerId};
use std::sync::{Arc, Mutex, PoisonError};

/// Binds workers to the bus according to static wiring
pub struct EventAdapter {
    strategy_id: StrategyId,
    bus: Arc<EventBus>,
    wiring: Arc<WiringConfig>,
    cache: Arc<StrategyCache>,
}

impl EventAdapter {
    pub fn new(
        strategy_id: impl Into<StrategyId>,
        bus: Arc<EventBus>,
        wiring: Arc<WiringConfig>,
        cache: Arc<StrategyCache>,
    ) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            bus,
            wiring,
            cache,
        }
    }

    /// Subscribe `worker` to every route that names it
    ///
    /// A worker with no subscription routes is a wiring hole, reported
    /// loudly here at bootstrap rather than silently dropping events
    /// at runtime.
    pub fn bind(&self, worker: Arc<Mutex<dyn Worker>>) -> Result<Vec<SubscriptionId>> {
        let worker_id = worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .id()
            .clone();

        let routes: Vec<_> = self
            .wiring
            .subscriptions()
            .iter()
            .filter(|r| r.worker == worker_id)
            .cloned()
            .collect();

        if routes.is_empty() {
            return Err(BusError::UnroutedWorker { worker: worker_id });
        }

        let mut ids = Vec::with_capacity(routes.len());
        for route in routes {
            let scope_id = match route.scope {
                Scope::Platform => None,
                Scope::Strategy => Some(self.strategy_id.clone()),
            };
            let handler = self.make_handler(worker_id.clone(), Arc::clone(&worker));
            ids.push(self.bus.subscribe(route.event, route.scope, scope_id, handler)?);
            log::debug!("{}: bound worker {}", self.strategy_id, worker_id);
        }
        Ok(ids)
    }

    fn make_handler(&self, worker_id: WorkerId, worker: Arc<Mutex<dyn Worker>>) -> Handler {
        let bus = Arc::clone(&self.bus);
        let wiring = Arc::clone(&self.wiring);
        let cache = Arc::clone(&self.cache);
        let strategy_id = self.strategy_id.clone();

        Arc::new(move |event| {
            // Release the worker before executing the envelope so a
            // published follow-up event can reach other workers.
            let disposition = {
                let mut guard = worker.lock().unwrap_or_else(PoisonError::into_inner);
                guard
                    .process(event, &cache)
                    .map_err(|source| BusError::Worker {
                        worker: worker_id.clone(),
                        event: event.name.clone(),
                        source,
                    })?
            };

            match disposition {
                Disposition::Continue => Ok(()),
                Disposition::Stop => {
                    log::debug!("{}: {} stopped flow on {}", strategy_id, worker_id, event.name);
                    Ok(())
                }
                Disposition::Publish(emission) => {
                    let route = wiring
                        .output_route(&worker_id, &emission.connector)
                        .ok_or_else(|| BusError::UnwiredConnector {
                            worker: worker_id.clone(),
                            connector: emission.connector.clone(),
                        })?;
                    let out = EventMessage {
                        name: route.event.clone(),
                        scope: route.scope,
                        scope_id: match route.scope {
                            Scope::Platform => None,
                            Scope::Strategy => Some(strategy_id.clone()),
                        },
                        event_id: EventId::generate(),
                        timestamp: event.timestamp,
                        causality: emission.causality,
                        payload: emission.payload,
                    };
                    bus.publish(&out)
                }
            }
        })
    }
}
