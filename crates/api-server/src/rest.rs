//! REST API handlers for campaign execution and operational endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use outreach_channels::ChannelSender;
use outreach_core::types::{
    AnalyticsEvent, Campaign, CandidateOutcome, ChannelKind, ExecutionResult,
};
use outreach_core::OutreachError;
use outreach_orchestrator::{OrchestrationRequest, Orchestrator};
use outreach_store::Store;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn Store>,
    pub senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
    pub node_id: String,
    pub start_time: Instant,
    pub default_channel_delay: Duration,
    /// Zero means no run deadline.
    pub run_timeout: Duration,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecuteRequest {
    pub campaign_id: Uuid,
    /// Channel order override; omitted means the campaign's enabled list.
    #[serde(default)]
    pub channels: Option<Vec<ChannelKind>>,
    /// Candidate subset; omitted means every candidate of the campaign.
    #[serde(default)]
    pub candidate_ids: Option<Vec<Uuid>>,
    /// Pacing delay override in seconds.
    #[serde(default)]
    pub delay_between_channels_secs: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChannelSendRequest {
    pub campaign_id: Uuid,
    #[serde(default)]
    pub candidate_ids: Option<Vec<Uuid>>,
    /// Message override; omitted means the campaign's template for the
    /// channel.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChannelSendResponse {
    pub success: bool,
    pub channel: ChannelKind,
    pub total: u64,
    /// Successful attempts. For the voice channel this counts calls
    /// placed; the field name is uniform across channels.
    pub sent: u64,
    pub failed: u64,
    pub results: Vec<CandidateOutcome>,
}

/// POST /v1/campaigns/execute — Run a campaign across its channels.
///
/// Business failures (unknown campaign, invalid parameters) come back
/// as HTTP 200 with `success: false` so that callers can distinguish
/// them from infrastructure faults.
#[utoipa::path(
    post,
    path = "/v1/campaigns/execute",
    tag = "Campaigns",
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Run finished, or failed a business check", body = ExecuteResponse),
        (status = 500, description = "Infrastructure failure", body = ErrorResponse),
    )
)]
pub async fn handle_execute(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, (StatusCode, Json<ErrorResponse>)> {
    let delay = request
        .delay_between_channels_secs
        .map(Duration::from_secs)
        .unwrap_or(state.default_channel_delay);

    let mut run = OrchestrationRequest::new(request.campaign_id);
    run.channels = request.channels;
    run.candidate_ids = request.candidate_ids;
    run.delay_between_channels = delay;
    if !state.run_timeout.is_zero() {
        run.deadline = Some(tokio::time::Instant::now() + state.run_timeout);
    }

    match state.orchestrator.execute(run).await {
        Ok(result) => {
            metrics::counter!("api.executions").increment(1);
            Ok(Json(ExecuteResponse {
                success: true,
                result: Some(result),
                error: None,
            }))
        }
        Err(e) if e.is_business() => {
            warn!(campaign_id = %request.campaign_id, error = %e, "Execution rejected");
            metrics::counter!("api.validation_errors").increment(1);
            Ok(Json(ExecuteResponse {
                success: false,
                result: None,
                error: Some(e.to_string()),
            }))
        }
        Err(e) => {
            error!(campaign_id = %request.campaign_id, error = %e, "Execution failed");
            metrics::counter!("api.errors").increment(1);
            Err(internal_error())
        }
    }
}

/// POST /v1/channels/{channel}/send — Run a single channel batch.
#[utoipa::path(
    post,
    path = "/v1/channels/{channel}/send",
    tag = "Channels",
    params(
        ("channel" = String, Path, description = "Channel name: email, whatsapp, or voice"),
    ),
    request_body = ChannelSendRequest,
    responses(
        (status = 200, description = "Batch finished", body = ChannelSendResponse),
        (status = 400, description = "Unknown channel or invalid request", body = ErrorResponse),
        (status = 404, description = "Campaign not found", body = ErrorResponse),
        (status = 500, description = "Infrastructure failure", body = ErrorResponse),
    )
)]
pub async fn handle_channel_send(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(request): Json<ChannelSendRequest>,
) -> Result<Json<ChannelSendResponse>, (StatusCode, Json<ErrorResponse>)> {
    let channel: ChannelKind = channel.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "unknown_channel".to_string(),
                message: format!("unknown channel '{}'", channel),
            }),
        )
    })?;

    let sender = state.senders.get(&channel).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "channel_unavailable".to_string(),
                message: format!("no sender configured for '{}'", channel.display_name()),
            }),
        )
    })?;

    let campaign = state
        .store
        .get_campaign(&request.campaign_id)
        .map_err(|e| storage_error(&e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "campaign_not_found".to_string(),
                    message: "Campaign not found".to_string(),
                }),
            )
        })?;

    let mut candidates = state
        .store
        .candidates_for_campaign(&campaign.id)
        .map_err(|e| storage_error(&e))?;
    if let Some(ids) = &request.candidate_ids {
        candidates.retain(|c| ids.contains(&c.id));
    }

    match sender
        .send_batch(&campaign, &candidates, request.message.as_deref())
        .await
    {
        Ok(report) => {
            metrics::counter!("api.channel_sends", "channel" => channel.display_name()).increment(1);
            Ok(Json(ChannelSendResponse {
                success: report.failed == 0,
                channel: report.channel,
                total: report.sent + report.failed,
                sent: report.sent,
                failed: report.failed,
                results: report.outcomes,
            }))
        }
        Err(e) => {
            error!(channel = ?channel, error = %e, "Channel batch failed");
            metrics::counter!("api.errors").increment(1);
            Err(internal_error())
        }
    }
}

/// GET /v1/campaigns/{id} — Fetch a campaign with its counters.
#[utoipa::path(
    get,
    path = "/v1/campaigns/{id}",
    tag = "Campaigns",
    params(
        ("id" = Uuid, Path, description = "Campaign identifier"),
    ),
    responses(
        (status = 200, description = "Campaign", body = Campaign),
        (status = 404, description = "Campaign not found"),
    )
)]
pub async fn handle_get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, StatusCode> {
    match state.store.get_campaign(&id) {
        Ok(Some(campaign)) => Ok(Json(campaign)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(campaign_id = %id, error = %e, "Campaign lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /v1/campaigns/{id}/events — Analytics events for a campaign.
#[utoipa::path(
    get,
    path = "/v1/campaigns/{id}/events",
    tag = "Campaigns",
    params(
        ("id" = Uuid, Path, description = "Campaign identifier"),
    ),
    responses(
        (status = 200, description = "Recorded events, oldest first", body = [AnalyticsEvent]),
    )
)]
pub async fn handle_campaign_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AnalyticsEvent>>, StatusCode> {
    match state.store.events_for_campaign(&id) {
        Ok(events) => Ok(Json(events)),
        Err(e) => {
            error!(campaign_id = %id, error = %e, "Event lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /health — Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses(
        (status = 200, description = "Service health", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe for Kubernetes.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Ready to accept traffic"),
        (status = 503, description = "Not ready"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.senders.is_empty() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /live — Liveness probe for Kubernetes.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses(
        (status = 200, description = "Process is alive"),
    )
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

fn internal_error() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "execution_failed".to_string(),
            message: "Internal processing error".to_string(),
        }),
    )
}

fn storage_error(e: &OutreachError) -> (StatusCode, Json<ErrorResponse>) {
    error!(error = %e, "Storage access failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "storage_failed".to_string(),
            message: "Internal storage error".to_string(),
        }),
    )
}
