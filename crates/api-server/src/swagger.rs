//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Outreach Engine API",
        version = "0.1.0",
        description = "Multi-channel admissions outreach platform.\n\nSequences email, WhatsApp, and voice campaigns with per-candidate outcome tracking.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Campaigns", description = "Campaign execution and analytics"),
        (name = "Channels", description = "Single-channel batch sends"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Campaigns
        crate::rest::handle_execute,
        crate::rest::handle_get_campaign,
        crate::rest::handle_campaign_events,
        // Channels
        crate::rest::handle_channel_send,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Domain types
        outreach_core::types::Campaign,
        outreach_core::types::CampaignStatus,
        outreach_core::types::Candidate,
        outreach_core::types::ChannelKind,
        outreach_core::types::AnalyticsEvent,
        outreach_core::types::EventType,
        outreach_core::types::EventStatus,
        outreach_core::types::ExecutionResult,
        outreach_core::types::ChannelRun,
        outreach_core::types::ChannelRunStatus,
        outreach_core::types::CandidateOutcome,
        outreach_core::types::OutcomeStatus,
        outreach_core::types::RunSummary,
        // Request/response types
        crate::rest::ExecuteRequest,
        crate::rest::ExecuteResponse,
        crate::rest::ChannelSendRequest,
        crate::rest::ChannelSendResponse,
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;
