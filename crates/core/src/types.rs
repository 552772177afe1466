use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Delivery channels available to a campaign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    Whatsapp,
    Voice,
}

impl ChannelKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ChannelKind::Email => "Email",
            ChannelKind::Whatsapp => "WhatsApp",
            ChannelKind::Voice => "Voice",
        }
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = crate::error::OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ChannelKind::Email),
            "whatsapp" => Ok(ChannelKind::Whatsapp),
            "voice" => Ok(ChannelKind::Voice),
            other => Err(crate::error::OutreachError::Validation(format!(
                "unknown channel '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Completed,
    Paused,
}

/// An outreach campaign targeting a set of prospective students.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
    /// Channels enabled for this campaign, in delivery order.
    pub channels: Vec<ChannelKind>,
    pub email_template: Option<String>,
    pub whatsapp_template: Option<String>,
    pub voice_script: Option<String>,
    /// Rollup counters — only ever incremented, via additive merge.
    pub candidates_count: u64,
    pub messages_sent: u64,
    pub calls_made: u64,
    pub responses_received: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(name: impl Into<String>, channels: Vec<ChannelKind>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: CampaignStatus::Draft,
            channels,
            email_template: None,
            whatsapp_template: None,
            voice_script: None,
            candidates_count: 0,
            messages_sent: 0,
            calls_made: 0,
            responses_received: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stored message template for the given channel, if any.
    pub fn template_for(&self, channel: ChannelKind) -> Option<&str> {
        match channel {
            ChannelKind::Email => self.email_template.as_deref(),
            ChannelKind::Whatsapp => self.whatsapp_template.as_deref(),
            ChannelKind::Voice => self.voice_script.as_deref(),
        }
    }
}

/// A prospective student targeted by a campaign.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Candidate {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    /// Digits-only, normalized at construction.
    pub phone: Option<String>,
    pub email_sent: bool,
    pub whatsapp_sent: bool,
    pub voice_called: bool,
    /// Most recent channel event, free-form.
    pub status: String,
    /// Mutated by downstream reply processing; read-only here.
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(
        campaign_id: Uuid,
        name: impl Into<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            name: name.into(),
            email,
            phone: phone.as_deref().and_then(normalize_phone),
            email_sent: false,
            whatsapp_sent: false,
            voice_called: false,
            status: "new".to_string(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Contact field required to reach this candidate on the given channel.
    pub fn contact_for(&self, channel: ChannelKind) -> Option<&str> {
        match channel {
            ChannelKind::Email => self.email.as_deref(),
            ChannelKind::Whatsapp | ChannelKind::Voice => self.phone.as_deref(),
        }
    }
}

/// Strip a phone number down to its digits. Returns `None` when nothing
/// usable remains.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EmailSent,
    WhatsappSent,
    CallMade,
    CampaignOrchestrated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Success,
    Failed,
}

/// Append-only analytics record. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsEvent {
    pub event_id: Uuid,
    pub campaign_id: Uuid,
    pub candidate_id: Option<Uuid>,
    pub event_type: EventType,
    pub channel: Option<ChannelKind>,
    pub status: EventStatus,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Additive counter updates applied to a campaign row.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CounterDeltas {
    pub messages_sent: u64,
    pub calls_made: u64,
    pub responses_received: u64,
}

impl CounterDeltas {
    pub fn messages(n: u64) -> Self {
        Self {
            messages_sent: n,
            ..Default::default()
        }
    }

    pub fn calls(n: u64) -> Self {
        Self {
            calls_made: n,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages_sent == 0 && self.calls_made == 0 && self.responses_received == 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Sent,
    Failed,
}

/// Result of one send attempt for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CandidateOutcome {
    pub candidate_id: Uuid,
    pub status: OutcomeStatus,
    pub provider_ref: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRunStatus {
    Completed,
    Failed,
}

/// One channel's batch within an orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChannelRun {
    pub channel: ChannelKind,
    pub status: ChannelRunStatus,
    pub sent: u64,
    pub failed: u64,
    pub error: Option<String>,
    pub outcomes: Vec<CandidateOutcome>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct RunSummary {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
}

/// Transient result of a single orchestration run. Only its persisted
/// side effects (counters and events) outlive the response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExecutionResult {
    pub campaign_id: Uuid,
    pub channels: Vec<ChannelRun>,
    pub summary: RunSummary,
    /// True when the run deadline expired before all channels started.
    pub partial: bool,
    /// Degraded writes and other non-fatal notes.
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
