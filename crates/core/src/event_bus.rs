//! Event sink trait — fan-out point for analytics events.
//!
//! The Outcome Recorder persists every event through the store and then
//! hands it to an `Arc<dyn EventSink>` for export (ClickHouse batch
//! writer in production, capture sink in tests).

use crate::types::{AnalyticsEvent, ChannelKind, EventStatus, EventType};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: AnalyticsEvent);
}

/// No-op sink for tests and deployments without an analytics backend.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: AnalyticsEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().expect("event sink mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event sink mutex poisoned").len()
    }

    pub fn count_type(&self, event_type: EventType) -> usize {
        self.events
            .lock()
            .expect("event sink mutex poisoned")
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: AnalyticsEvent) {
        self.events.lock().expect("event sink mutex poisoned").push(event);
    }
}

/// Convenience builder for `AnalyticsEvent` with minimal boilerplate.
pub fn make_event(
    event_type: EventType,
    campaign_id: Uuid,
    candidate_id: Option<Uuid>,
    channel: Option<ChannelKind>,
    status: EventStatus,
    metadata: serde_json::Value,
) -> AnalyticsEvent {
    AnalyticsEvent {
        event_id: Uuid::new_v4(),
        campaign_id,
        candidate_id,
        event_type,
        channel,
        status,
        metadata,
        timestamp: Utc::now(),
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
