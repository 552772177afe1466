//! Common channel-sender contract.

use async_trait::async_trait;
use outreach_core::types::{Campaign, Candidate, CandidateOutcome, ChannelKind, OutcomeStatus};
use outreach_core::OutreachResult;
use uuid::Uuid;

/// Outcome of one channel's batch. Per-candidate failures are captured
/// in `outcomes`, never raised; `Err` from `send_batch` means the
/// channel as a whole could not run.
#[derive(Debug, Clone)]
pub struct ChannelBatchReport {
    pub channel: ChannelKind,
    pub sent: u64,
    pub failed: u64,
    pub outcomes: Vec<CandidateOutcome>,
    /// Degraded writes observed while recording this batch.
    pub warnings: Vec<String>,
}

impl ChannelBatchReport {
    pub fn new(channel: ChannelKind) -> Self {
        Self {
            channel,
            sent: 0,
            failed: 0,
            outcomes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push_sent(&mut self, candidate_id: Uuid, provider_ref: String) {
        self.sent += 1;
        self.outcomes.push(CandidateOutcome {
            candidate_id,
            status: OutcomeStatus::Sent,
            provider_ref: Some(provider_ref),
            error: None,
        });
    }

    pub fn push_failed(&mut self, candidate_id: Uuid, error: String) {
        self.failed += 1;
        self.outcomes.push(CandidateOutcome {
            candidate_id,
            status: OutcomeStatus::Failed,
            provider_ref: None,
            error: Some(error),
        });
    }
}

/// One send attempt per candidate via an external transport. The three
/// production instances are email, WhatsApp, and voice.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Process the batch, one transport attempt per candidate, no
    /// retries. One candidate's failure never stops the remainder.
    async fn send_batch(
        &self,
        campaign: &Campaign,
        candidates: &[Candidate],
        template: Option<&str>,
    ) -> OutreachResult<ChannelBatchReport>;
}
