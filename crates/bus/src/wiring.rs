//! Static wiring configuration
//!
//! Two tables, both fixed before the first tick:
//!
//! - publications: `(worker, connector) -> (event name, scope)`
//! - subscriptions: `(event name, scope) -> worker`
//!
//! The tables are configuration, not computation: bootstrap validation
//! (see the runner crate) proves every connector a worker may name
//! resolves, so resolution can never fail mid-run.

use crate::event::Scope;
use kairos_core::{ConnectorId, EventName, WorkerId};
use std::collections::HashMap;

/// Where one worker connector publishes to
#[derive(Debug, Clone)]
pub struct OutputRoute {
    pub event: EventName,
    pub scope: Scope,
}

/// One worker's subscription to one event
#[derive(Debug, Clone)]
pub struct SubscriptionRoute {
    pub event: EventName,
    pub scope: Scope,
    pub worker: WorkerId,
}

/// The full wiring of one strategy's pipeline
#[derive(Debug, Clone, Default)]
pub struct WiringConfig {
    publications: HashMap<(WorkerId, ConnectorId), OutputRoute>,
    subscriptions: Vec<SubscriptionRoute>,
}

impl WiringConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: route a worker's connector to an event
    pub fn publish(
        mut self,
        worker: impl Into<WorkerId>,
        connector: impl Into<ConnectorId>,
        event: impl Into<EventName>,
        scope: Scope,
    ) -> Self {
        self.publications.insert(
            (worker.into(), connector.into()),
            OutputRoute {
                event: event.into(),
                scope,
            },
        );
        self
    }

    /// Builder: subscribe a worker to an event
    pub fn subscribe(
        mut self,
        worker: impl Into<WorkerId>,
        event: impl Into<EventName>,
        scope: Scope,
    ) -> Self {
        self.subscriptions.push(SubscriptionRoute {
            event: event.into(),
            scope,
            worker: worker.into(),
        });
        self
    }

    /// Resolve a worker connector to its output route
    pub fn output_route(&self, worker: &WorkerId, connector: &ConnectorId) -> Option<&OutputRoute> {
        self.publications.get(&(worker.clone(), connector.clone()))
    }

    /// All subscription routes, in declaration order
    pub fn subscriptions(&self) -> &[SubscriptionRoute] {
        &self.subscriptions
    }

    /// All publication routes
    pub fn publications(&self) -> impl Iterator<Item = (&(WorkerId, ConnectorId), &OutputRoute)> {
        self.publications.iter()
    }
}
