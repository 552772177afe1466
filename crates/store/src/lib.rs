//! Storage seam for campaigns, candidates, and the analytics event log.
//!
//! Counter updates are additive merges, never absolute overwrites, so
//! overlapping orchestration runs of the same campaign cannot lose
//! updates.

pub mod memory;

pub use memory::MemoryStore;

use outreach_core::types::{
    AnalyticsEvent, Campaign, CampaignStatus, Candidate, ChannelKind, CounterDeltas,
};
use outreach_core::OutreachResult;
use uuid::Uuid;

pub trait Store: Send + Sync {
    fn put_campaign(&self, campaign: Campaign) -> OutreachResult<()>;
    fn get_campaign(&self, id: &Uuid) -> OutreachResult<Option<Campaign>>;
    fn set_campaign_status(&self, id: &Uuid, status: CampaignStatus) -> OutreachResult<()>;

    /// Additive merge of counters into the campaign row. Must be atomic
    /// relative to concurrent callers.
    fn add_campaign_counters(&self, id: &Uuid, deltas: &CounterDeltas) -> OutreachResult<()>;

    fn put_candidate(&self, candidate: Candidate) -> OutreachResult<()>;
    fn get_candidate(&self, id: &Uuid) -> OutreachResult<Option<Candidate>>;
    fn candidates_for_campaign(&self, campaign_id: &Uuid) -> OutreachResult<Vec<Candidate>>;

    /// Record a successful delivery on the candidate row: set the
    /// channel-specific flag and the free-form status label.
    fn mark_channel_sent(
        &self,
        candidate_id: &Uuid,
        channel: ChannelKind,
        status_label: &str,
    ) -> OutreachResult<()>;

    /// Append to the write-once analytics log.
    fn append_event(&self, event: AnalyticsEvent) -> OutreachResult<()>;
    fn events_for_campaign(&self, campaign_id: &Uuid) -> OutreachResult<Vec<AnalyticsEvent>>;
}
