//! Outcome recorder — the single write path for analytics events and
//! campaign counter rollups.
//!
//! Events are append-only; counter updates are additive merges. A
//! failed write is logged and reported as `DegradedWrite` so callers
//! can surface a warning, but it never aborts an in-progress send.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use outreach_core::event_bus::EventSink;
use outreach_core::types::{AnalyticsEvent, CounterDeltas};
use outreach_core::{OutreachError, OutreachResult};
use outreach_store::Store;

pub struct OutcomeRecorder {
    store: Arc<dyn Store>,
    sink: Arc<dyn EventSink>,
}

impl OutcomeRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            sink: outreach_core::event_bus::noop_sink(),
        }
    }

    /// Attach an export sink (ClickHouse batch writer, capture sink in
    /// tests). Events reach the sink even when the store write fails.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Append one event to the analytics log.
    pub fn record(&self, event: AnalyticsEvent) -> OutreachResult<()> {
        let persisted = self.store.append_event(event.clone());
        self.sink.emit(event);

        match persisted {
            Ok(()) => {
                metrics::counter!("recorder.events").increment(1);
                Ok(())
            }
            Err(e) => {
                metrics::counter!("recorder.degraded_writes").increment(1);
                warn!(error = %e, "Analytics event not persisted");
                Err(OutreachError::DegradedWrite(format!(
                    "analytics event not persisted: {}",
                    e
                )))
            }
        }
    }

    /// Additive counter merge into the campaign row.
    pub fn add_counters(&self, campaign_id: &Uuid, deltas: &CounterDeltas) -> OutreachResult<()> {
        if deltas.is_empty() {
            return Ok(());
        }
        self.store
            .add_campaign_counters(campaign_id, deltas)
            .map_err(|e| {
                metrics::counter!("recorder.degraded_writes").increment(1);
                warn!(campaign_id = %campaign_id, error = %e, "Counter update not persisted");
                OutreachError::DegradedWrite(format!("counter update not persisted: {}", e))
            })
    }
}
