//! Outreach Engine — multi-channel admissions outreach platform.
//!
//! Main entry point that wires the store, channel senders, orchestrator,
//! and API server together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use outreach_analytics::{ClickHouseExporter, OutcomeRecorder};
use outreach_api::ApiServer;
use outreach_channels::{
    ChannelSender, EmailSender, ResendTransport, RetellVoiceTransport, TwilioWhatsAppTransport,
    VoiceSender, WhatsAppSender,
};
use outreach_core::config::AppConfig;
use outreach_core::types::ChannelKind;
use outreach_orchestrator::{HeuristicAdvisor, Orchestrator};
use outreach_store::{MemoryStore, Store};

#[derive(Parser, Debug)]
#[command(name = "outreach-engine")]
#[command(about = "Multi-channel admissions outreach platform")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "OUTREACH__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "OUTREACH__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Inter-channel pacing delay in seconds (overrides config)
    #[arg(long, env = "OUTREACH__ORCHESTRATOR__CHANNEL_DELAY_SECS")]
    channel_delay: Option<u64>,

    /// Seed a demo campaign with sample candidates
    #[arg(long, default_value_t = false)]
    demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outreach_engine=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Outreach Engine starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(delay) = cli.channel_delay {
        config.orchestrator.channel_delay_secs = delay;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        channel_delay_secs = config.orchestrator.channel_delay_secs,
        "Configuration loaded"
    );

    // Initialize the store
    let store = Arc::new(MemoryStore::new());
    if cli.demo {
        let campaign_id = store.seed_demo();
        info!(campaign_id = %campaign_id, "Demo campaign seeded");
    }
    let store: Arc<dyn Store> = store;

    // Initialize the outcome recorder, with a ClickHouse exporter when
    // one is configured.
    let mut recorder = OutcomeRecorder::new(store.clone());
    if config.clickhouse.enabled {
        match ClickHouseExporter::new(&config.clickhouse).await {
            Ok(exporter) => {
                recorder = recorder.with_sink(Arc::new(exporter));
                info!(url = %config.clickhouse.url, "ClickHouse export enabled");
            }
            Err(e) => {
                error!(error = %e, "Failed to initialize ClickHouse exporter, events stay local");
            }
        }
    }
    let recorder = Arc::new(recorder);

    // Channel senders. Missing provider credentials are fatal.
    let transport_timeout = Duration::from_millis(config.orchestrator.transport_timeout_ms);
    let mut senders: HashMap<ChannelKind, Arc<dyn ChannelSender>> = HashMap::new();

    let email_transport = Arc::new(ResendTransport::new(&config.email)?);
    senders.insert(
        ChannelKind::Email,
        Arc::new(
            EmailSender::new(email_transport, store.clone(), recorder.clone())
                .with_call_timeout(transport_timeout),
        ),
    );

    let whatsapp_transport = Arc::new(TwilioWhatsAppTransport::new(&config.whatsapp)?);
    senders.insert(
        ChannelKind::Whatsapp,
        Arc::new(
            WhatsAppSender::new(whatsapp_transport, store.clone(), recorder.clone())
                .with_call_timeout(transport_timeout),
        ),
    );

    let voice_transport = Arc::new(RetellVoiceTransport::new(&config.voice)?);
    senders.insert(
        ChannelKind::Voice,
        Arc::new(
            VoiceSender::new(voice_transport, store.clone(), recorder.clone())
                .with_call_timeout(transport_timeout),
        ),
    );

    // Orchestrator with the coverage-based advisor.
    let mut orchestrator = Orchestrator::new(store.clone(), recorder.clone());
    for sender in senders.values() {
        orchestrator = orchestrator.with_sender(sender.clone());
    }
    if config.advisor.enabled {
        orchestrator = orchestrator.with_advisor(
            Arc::new(HeuristicAdvisor),
            Duration::from_millis(config.advisor.timeout_ms),
        );
    }
    let orchestrator = Arc::new(orchestrator);

    // Start API server
    let api_server = ApiServer::new(config.clone(), orchestrator, store, senders);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Outreach Engine is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
