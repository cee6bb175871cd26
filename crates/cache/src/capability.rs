//! Worker capability declarations
//!
//! Each worker declares which DTO types it requires and produces, plus the
//! output connectors it may publish on. The registry is consumed twice:
//! at bootstrap (wiring and dependency-graph validation) and at runtime
//! (the cache's declared-dependency lookup).

use kairos_core::{ConnectorId, WorkerId};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Identifies one DTO type in a capability declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DtoSpec {
    type_id: TypeId,
    name: &'static str,
}

impl DtoSpec {
    /// Describe the DTO type `T`
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Human-readable type name, for diagnostics and error messages
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// What one worker consumes, produces, and publishes
#[derive(Debug, Clone, Default)]
pub struct WorkerCapabilities {
    /// DTO types this worker reads from the cache
    pub requires: Vec<DtoSpec>,
    /// DTO types this worker writes into the cache
    pub produces: Vec<DtoSpec>,
    /// Output connectors this worker may name in a publish envelope
    pub connectors: Vec<ConnectorId>,
}

impl WorkerCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: declare a required DTO type
    pub fn requires<T: Any>(mut self) -> Self {
        self.requires.push(DtoSpec::of::<T>());
        self
    }

    /// Builder: declare a produced DTO type
    pub fn produces<T: Any>(mut self) -> Self {
        self.produces.push(DtoSpec::of::<T>());
        self
    }

    /// Builder: declare an output connector
    pub fn with_connector(mut self, connector: impl Into<ConnectorId>) -> Self {
        self.connectors.push(connector.into());
        self
    }
}

/// Capability declarations for every worker of one strategy
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    workers: HashMap<WorkerId, WorkerCapabilities>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a worker's declarations
    pub fn register(&mut self, worker: impl Into<WorkerId>, capabilities: WorkerCapabilities) {
        self.workers.insert(worker.into(), capabilities);
    }

    pub fn get(&self, worker: &WorkerId) -> Option<&WorkerCapabilities> {
        self.workers.get(worker)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WorkerId, &WorkerCapabilities)> {
        self.workers.iter()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
