//! The scoped broadcast broker

use crate::error::{BusError, Result};
use crate::event::{EventMessage, Scope};
use kairos_core::{EventName, StrategyId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned by subscribe, used to unsubscribe at teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscriber callback invoked synchronously during publish
pub type Handler = Arc<dyn Fn(&EventMessage) -> Result<()> + Send + Sync>;

struct Subscription {
    id: u64,
    name: EventName,
    scope: Scope,
    scope_id: Option<StrategyId>,
    handler: Handler,
}

impl Subscription {
    fn matches(&self, event: &EventMessage) -> bool {
        if self.name != event.name || self.scope != event.scope {
            return false;
        }
        match self.scope {
            Scope::Platform => true,
            Scope::Strategy => self.scope_id == event.scope_id,
        }
    }
}

/// Scoped publish/subscribe broker
///
/// Pure broadcast: every matching subscriber is invoked in registration
/// order before `publish` returns; there is no payload filtering and no
/// reordering. The subscription table is mutated only at bootstrap and
/// teardown, never concurrently with dispatch, so dispatch snapshots the
/// matching handlers and runs them without holding the table lock -
/// which is what lets a handler publish follow-up events mid-dispatch.
pub struct EventBus {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn table(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a handler for `(name, scope)`; strategy scope requires an id
    pub fn subscribe(
        &self,
        name: impl Into<EventName>,
        scope: Scope,
        scope_id: Option<StrategyId>,
        handler: Handler,
    ) -> Result<SubscriptionId> {
        let name = name.into();
        if scope == Scope::Strategy && scope_id.is_none() {
            return Err(BusError::MissingScopeId(name));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.table().push(Subscription {
            id,
            name,
            scope,
            scope_id,
            handler,
        });
        Ok(SubscriptionId(id))
    }

    /// Remove a subscription; unknown ids are ignored
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.table().retain(|s| s.id != id.0);
    }

    /// Deliver `event` to every matching subscriber, in registration order
    ///
    /// The first handler error aborts the remaining deliveries of this
    /// publish and propagates to the caller - run-fatal semantics; the
    /// supervisory layer decides what to do with the run.
    pub fn publish(&self, event: &EventMessage) -> Result<()> {
        if event.scope == Scope::Strategy && event.scope_id.is_none() {
            return Err(BusError::MissingScopeId(event.name.clone()));
        }

        let handlers: Vec<Handler> = self
            .table()
            .iter()
            .filter(|s| s.matches(event))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        log::trace!(
            "publish {} ({:?}) -> {} subscriber(s)",
            event.name,
            event.scope,
            handlers.len()
        );

        for handler in handlers {
            handler(event)?;
        }
        Ok(())
    }

    /// Number of registered subscriptions (bootstrap diagnostics)
    pub fn subscription_count(&self) -> usize {
        self.table().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kairos_core::{CausalityChain, EventId};
    use std::sync::atomic::AtomicUsize;

    fn event(name: &str, scope: Scope, scope_id: Option<&str>) -> EventMessage {
        EventMessage {
            name: EventName::from(name),
            scope,
            scope_id: scope_id.map(StrategyId::from),
            event_id: EventId::generate(),
            timestamp: Utc::now(),
            causality: CausalityChain::root(EventId::generate()),
            payload: Arc::new(()),
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Handler {
        let log = Arc::clone(log);
        Arc::new(move |_| {
            log.lock().unwrap().push(tag);
            Ok(())
        })
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe("e", Scope::Platform, None, recorder(&log, "first"))
            .unwrap();
        bus.subscribe("e", Scope::Platform, None, recorder(&log, "second"))
            .unwrap();
        bus.subscribe("e", Scope::Platform, None, recorder(&log, "third"))
            .unwrap();

        bus.publish(&event("e", Scope::Platform, None)).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_idempotent_broadcast_same_set_same_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe("e", Scope::Platform, None, recorder(&log, "a"))
            .unwrap();
        bus.subscribe("e", Scope::Platform, None, recorder(&log, "b"))
            .unwrap();

        let msg = event("e", Scope::Platform, None);
        bus.publish(&msg).unwrap();
        bus.publish(&msg).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn test_strategy_scope_isolates_by_id() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "e",
            Scope::Strategy,
            Some(StrategyId::from("alpha")),
            recorder(&log, "alpha"),
        )
        .unwrap();
        bus.subscribe(
            "e",
            Scope::Strategy,
            Some(StrategyId::from("beta")),
            recorder(&log, "beta"),
        )
        .unwrap();

        bus.publish(&event("e", Scope::Strategy, Some("alpha")))
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["alpha"]);
    }

    #[test]
    fn test_scope_kind_must_match() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe("e", Scope::Platform, None, recorder(&log, "platform"))
            .unwrap();

        // Same event name at strategy scope does not reach platform subscribers
        bus.publish(&event("e", Scope::Strategy, Some("alpha")))
            .unwrap();

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_strategy_publish_requires_scope_id() {
        let bus = EventBus::new();
        let err = bus.publish(&event("e", Scope::Strategy, None)).unwrap_err();
        assert!(matches!(err, BusError::MissingScopeId(_)));
    }

    #[test]
    fn test_strategy_subscribe_requires_scope_id() {
        let bus = EventBus::new();
        let err = bus
            .subscribe("e", Scope::Strategy, None, Arc::new(|_| Ok(())))
            .unwrap_err();
        assert!(matches!(err, BusError::MissingScopeId(_)));
    }

    #[test]
    fn test_handler_may_publish_recursively() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let relay_bus = Arc::clone(&bus);
        let relay_log = Arc::clone(&log);
        bus.subscribe(
            "outer",
            Scope::Platform,
            None,
            Arc::new(move |e| {
                relay_log.lock().unwrap().push("outer");
                let inner = EventMessage {
                    name: EventName::from("inner"),
                    ..e.clone()
                };
                relay_bus.publish(&inner)
            }),
        )
        .unwrap();
        bus.subscribe("inner", Scope::Platform, None, recorder(&log, "inner"))
            .unwrap();

        bus.publish(&event("outer", Scope::Platform, None)).unwrap();

        // The inner publish drained before the outer one returned
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_error_aborts_remaining_deliveries() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        bus.subscribe(
            "e",
            Scope::Platform,
            None,
            Arc::new(|e| {
                Err(BusError::UnwiredConnector {
                    worker: kairos_core::WorkerId::from("w"),
                    connector: kairos_core::ConnectorId::from(e.name.as_str()),
                })
            }),
        )
        .unwrap();
        let tail_calls = Arc::clone(&calls);
        bus.subscribe(
            "e",
            Scope::Platform,
            None,
            Arc::new(move |_| {
                tail_calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();

        assert!(bus.publish(&event("e", Scope::Platform, None)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_removes_delivery() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = bus
            .subscribe("e", Scope::Platform, None, recorder(&log, "gone"))
            .unwrap();
        bus.subscribe("e", Scope::Platform, None, recorder(&log, "kept"))
            .unwrap();
        bus.unsubscribe(id);

        bus.publish(&event("e", Scope::Platform, None)).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["kept"]);
    }
}
