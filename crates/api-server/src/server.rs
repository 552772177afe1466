//! HTTP server wiring and the Prometheus metrics listener.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use outreach_channels::ChannelSender;
use outreach_core::config::AppConfig;
use outreach_core::types::ChannelKind;
use outreach_orchestrator::Orchestrator;
use outreach_store::Store;

use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;

pub struct ApiServer {
    config: AppConfig,
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn Store>,
    senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn Store>,
        senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            store,
            senders,
        }
    }

    /// Start the HTTP REST server. Runs until the process exits.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState {
            orchestrator: self.orchestrator.clone(),
            store: self.store.clone(),
            senders: self.senders.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
            default_channel_delay: Duration::from_secs(self.config.orchestrator.channel_delay_secs),
            run_timeout: Duration::from_secs(self.config.orchestrator.run_timeout_secs),
        };

        let app = Router::new()
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            // Campaign execution
            .route("/v1/campaigns/execute", post(rest::handle_execute))
            .route("/v1/campaigns/:id", get(rest::handle_get_campaign))
            .route("/v1/campaigns/:id/events", get(rest::handle_campaign_events))
            .route("/v1/channels/:channel/send", post(rest::handle_channel_send))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
