//! Asynchronous ClickHouse exporter that batches analytics events.
//! Uses a channel-based architecture for non-blocking event submission.

use outreach_core::config::ClickHouseConfig;
use outreach_core::event_bus::EventSink;
use outreach_core::types::AnalyticsEvent;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Event sink with a background batch writer. `emit` never blocks; a
/// full queue drops the event with a warning.
pub struct ClickHouseExporter {
    sender: mpsc::Sender<AnalyticsEvent>,
}

impl ClickHouseExporter {
    /// Create the exporter and spawn the background writer.
    pub async fn new(config: &ClickHouseConfig) -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel::<AnalyticsEvent>(100_000);

        let writer = BatchWriter::new(config).await?;
        let batch_size = config.batch_size;
        let flush_interval = std::time::Duration::from_millis(config.flush_interval_ms);

        tokio::spawn(async move {
            writer.run(receiver, batch_size, flush_interval).await;
        });

        info!("Analytics exporter initialized with ClickHouse backend");

        Ok(Self { sender })
    }
}

impl EventSink for ClickHouseExporter {
    fn emit(&self, event: AnalyticsEvent) {
        if let Err(e) = self.sender.try_send(event) {
            metrics::counter!("analytics.dropped").increment(1);
            warn!("Analytics event dropped: {}", e);
        } else {
            metrics::counter!("analytics.queued").increment(1);
        }
    }
}

/// Background writer that batches events and flushes to ClickHouse.
struct BatchWriter {
    client: clickhouse::Client,
}

impl BatchWriter {
    async fn new(config: &ClickHouseConfig) -> anyhow::Result<Self> {
        let client = clickhouse::Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        Self::ensure_schema(&client).await?;

        Ok(Self { client })
    }

    async fn ensure_schema(client: &clickhouse::Client) -> anyhow::Result<()> {
        client
            .query(
                "CREATE TABLE IF NOT EXISTS outreach_events (
                    event_id UUID,
                    campaign_id UUID,
                    candidate_id Nullable(UUID),
                    event_type String,
                    channel Nullable(String),
                    status String,
                    metadata String,
                    timestamp DateTime64(3)
                ) ENGINE = MergeTree()
                ORDER BY (timestamp, event_type, campaign_id)
                PARTITION BY toYYYYMM(timestamp)
                TTL timestamp + INTERVAL 365 DAY",
            )
            .execute()
            .await?;

        info!("ClickHouse schema verified");
        Ok(())
    }

    async fn run(
        self,
        mut receiver: mpsc::Receiver<AnalyticsEvent>,
        batch_size: usize,
        flush_interval: std::time::Duration,
    ) {
        let mut buffer: Vec<AnalyticsEvent> = Vec::with_capacity(batch_size);
        let mut interval = tokio::time::interval(flush_interval);

        loop {
            tokio::select! {
                Some(event) = receiver.recv() => {
                    buffer.push(event);
                    if buffer.len() >= batch_size {
                        self.flush(&mut buffer).await;
                    }
                }
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        self.flush(&mut buffer).await;
                    }
                }
            }
        }
    }

    async fn flush(&self, buffer: &mut Vec<AnalyticsEvent>) {
        let count = buffer.len();
        debug!(count = count, "Flushing analytics batch to ClickHouse");

        let mut json_rows = Vec::with_capacity(buffer.len());
        for e in buffer.iter() {
            if let Ok(json) = serde_json::to_string(e) {
                json_rows.push(json);
            }
        }

        if json_rows.is_empty() {
            buffer.clear();
            return;
        }

        let insert_sql = format!(
            "INSERT INTO outreach_events FORMAT JSONEachRow {}",
            json_rows.join("\n")
        );

        match self.client.query(&insert_sql).execute().await {
            Ok(_) => {
                metrics::counter!("analytics.flushed").increment(count as u64);
                debug!(count = count, "Analytics batch flushed successfully");
            }
            Err(e) => {
                metrics::counter!("analytics.flush_errors").increment(1);
                error!(error = %e, count = count, "Failed to flush analytics batch");
            }
        }

        buffer.clear();
    }
}
