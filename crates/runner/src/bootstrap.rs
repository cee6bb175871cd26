//! Bootstrap validation - prove the configuration before the first tick
//!
//! Everything static about a strategy's pipeline is checked here:
//! publication wiring for every declared connector, trigger mappings for
//! every initiator subscription, registration for every routed worker,
//! and satisfiability of the declared DTO dependency graph. A pipeline
//! that passes cannot hit a configuration error mid-run.

use crate::error::BootstrapError;
use kairos_bus::WiringConfig;
use kairos_cache::CapabilityRegistry;
use kairos_flow::TriggerMap;
use kairos_core::{StrategyId, WorkerId};
use std::any::TypeId;
use std::collections::HashSet;

/// The full static description of one strategy's pipeline
pub struct StrategyDefinition {
    pub strategy_id: StrategyId,
    pub wiring: WiringConfig,
    pub registry: CapabilityRegistry,
    pub triggers: TriggerMap,
    /// The flow initiator's worker id, for trigger validation
    pub initiator: WorkerId,
}

impl StrategyDefinition {
    /// Run every bootstrap check; the first failure aborts
    pub fn validate(&self) -> Result<(), BootstrapError> {
        self.check_publications()?;
        self.check_triggers()?;
        self.check_subscriptions()?;
        self.check_dependency_graph()?;
        log::info!(
            "{}: bootstrap validated ({} worker(s), {} subscription route(s))",
            self.strategy_id,
            self.registry.len(),
            self.wiring.subscriptions().len()
        );
        Ok(())
    }

    /// Every connector a worker may name must resolve
    fn check_publications(&self) -> Result<(), BootstrapError> {
        for (worker, capabilities) in self.registry.iter() {
            for connector in &capabilities.connectors {
                if self.wiring.output_route(worker, connector).is_none() {
                    return Err(BootstrapError::MissingPublication {
                        worker: worker.clone(),
                        connector: connector.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Every initiator subscription needs a trigger mapping, and every
    /// mapped connector needs wiring
    fn check_triggers(&self) -> Result<(), BootstrapError> {
        for route in self.wiring.subscriptions() {
            if route.worker == self.initiator && self.triggers.resolve(&route.event).is_none() {
                return Err(BootstrapError::MissingTrigger {
                    worker: self.initiator.clone(),
                    event: route.event.clone(),
                });
            }
        }
        for (event, connector) in self.triggers.entries() {
            if self.wiring.output_route(&self.initiator, connector).is_none() {
                return Err(BootstrapError::UnwiredTrigger {
                    event: event.clone(),
                    connector: connector.clone(),
                });
            }
        }
        Ok(())
    }

    /// Subscription routes may only name registered workers
    fn check_subscriptions(&self) -> Result<(), BootstrapError> {
        for route in self.wiring.subscriptions() {
            if self.registry.get(&route.worker).is_none() {
                return Err(BootstrapError::UnknownWorker(route.worker.clone()));
            }
        }
        Ok(())
    }

    /// Every required DTO type must be produced by some worker
    ///
    /// The cache still enforces this at the point of use; catching an
    /// unsatisfiable graph here turns a mid-run failure into a refusal
    /// to start.
    fn check_dependency_graph(&self) -> Result<(), BootstrapError> {
        let produced: HashSet<TypeId> = self
            .registry
            .iter()
            .flat_map(|(_, caps)| caps.produces.iter().map(|spec| spec.type_id()))
            .collect();

        for (worker, capabilities) in self.registry.iter() {
            for spec in &capabilities.requires {
                if !produced.contains(&spec.type_id()) {
                    return Err(BootstrapError::UnsatisfiableDependency {
                        worker: worker.clone(),
                        dto: spec.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
