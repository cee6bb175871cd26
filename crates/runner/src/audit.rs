//! Audit recorder - collects run markers for later reconstruction
//!
//! The terminator publishes identifier-only markers; this recorder keeps
//! them queryable by directive id or originating event so the causal
//! history of any order can be walked back after the fact. Persistence
//! is a downstream concern - markers serialize cleanly when it arrives.

use kairos_bus::{EventBus, EventMessage, Scope, SubscriptionId};
use kairos_core::{EventId, EventName, RunMarker, StrategyId};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// In-memory store of completed-run markers
#[derive(Clone, Default)]
pub struct AuditRecorder {
    markers: Arc<Mutex<Vec<RunMarker>>>,
}

impl AuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe this recorder to a marker event on `bus`
    pub fn attach(
        &self,
        bus: &EventBus,
        event: impl Into<EventName>,
        scope: Scope,
        scope_id: Option<StrategyId>,
    ) -> kairos_bus::Result<SubscriptionId> {
        let markers = Arc::clone(&self.markers);
        bus.subscribe(
            event,
            scope,
            scope_id,
            Arc::new(move |message: &EventMessage| {
                match message.payload_as::<RunMarker>() {
                    Some(marker) => markers
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((*marker).clone()),
                    None => log::warn!("audit: {} carried no run marker", message.name),
                }
                Ok(())
            }),
        )
    }

    /// All recorded markers, in completion order
    pub fn markers(&self) -> Vec<RunMarker> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Marker for a given directive id
    pub fn by_directive(&self, directive_id: Uuid) -> Option<RunMarker> {
        self.markers()
            .into_iter()
            .find(|m| m.directive_id == Some(directive_id))
    }

    /// Markers descending from a given external event
    pub fn by_origin(&self, origin: EventId) -> Vec<RunMarker> {
        self.markers()
            .into_iter()
            .filter(|m| m.origin == origin)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Serialize the recorded markers (journal export)
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.markers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kairos_core::{CausalityChain, RunAnchor};

    fn marker(directive_id: Uuid, origin: EventId) -> RunMarker {
        RunMarker {
            anchor: RunAnchor::new(Utc::now()),
            origin,
            directive_id: Some(directive_id),
            plan_ids: vec![Uuid::new_v4()],
        }
    }

    #[test]
    fn test_recorder_collects_and_queries_markers() {
        let bus = EventBus::new();
        let recorder = AuditRecorder::new();
        recorder
            .attach(&bus, "run.recorded", Scope::Platform, None)
            .unwrap();

        let origin = EventId::generate();
        let directive_id = Uuid::new_v4();
        let event = EventMessage::platform(
            "run.recorded",
            Utc::now(),
            CausalityChain::root(origin),
            marker(directive_id, origin),
        );
        bus.publish(&event).unwrap();

        assert_eq!(recorder.count(), 1);
        assert!(recorder.by_directive(directive_id).is_some());
        assert_eq!(recorder.by_origin(origin).len(), 1);
        assert!(recorder.by_directive(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_marker_export_serializes() {
        let recorder = AuditRecorder::new();
        recorder
            .markers
            .lock()
            .unwrap()
            .push(marker(Uuid::new_v4(), EventId::generate()));

        let json = recorder.export_json().unwrap();
        assert!(json.contains("plan_ids"));
    }
}
