//! In-memory store backed by DashMap. Counter merges run under the
//! shard lock of `get_mut`, which makes them atomic with respect to
//! concurrent orchestration runs.

use std::sync::Mutex;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use outreach_core::types::{
    AnalyticsEvent, Campaign, CampaignStatus, Candidate, ChannelKind, CounterDeltas,
};
use outreach_core::{OutreachError, OutreachResult};

use crate::Store;

#[derive(Default)]
pub struct MemoryStore {
    campaigns: DashMap<Uuid, Campaign>,
    candidates: DashMap<Uuid, Candidate>,
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one demo campaign with a handful of candidates. Returns the
    /// campaign id. Used by the binary's `--demo` flag.
    pub fn seed_demo(&self) -> Uuid {
        let mut campaign = Campaign::new(
            "Fall 2027 Intake",
            vec![ChannelKind::Email, ChannelKind::Whatsapp, ChannelKind::Voice],
        );
        campaign.status = CampaignStatus::Active;
        campaign.email_template =
            Some("Hi {{name}}, your application to {{campaign}} caught our eye.".to_string());
        let campaign_id = campaign.id;

        let seeds: [(&str, Option<&str>, Option<&str>); 4] = [
            ("Priya Sharma", Some("priya@example.edu"), Some("+1 555 010 2345")),
            ("Diego Alvarez", Some("diego@example.edu"), Some("+52 55 0102 3456")),
            ("Mei Lin", Some("mei@example.edu"), None),
            ("Kwame Mensah", None, Some("+233 55 010 2345")),
        ];

        campaign.candidates_count = seeds.len() as u64;
        self.campaigns.insert(campaign_id, campaign);

        for (name, email, phone) in seeds {
            let candidate = Candidate::new(
                campaign_id,
                name,
                email.map(str::to_string),
                phone.map(str::to_string),
            );
            self.candidates.insert(candidate.id, candidate);
        }

        info!(campaign_id = %campaign_id, "Seeded demo campaign");
        campaign_id
    }

    fn events_lock(&self) -> OutreachResult<std::sync::MutexGuard<'_, Vec<AnalyticsEvent>>> {
        self.events
            .lock()
            .map_err(|_| OutreachError::Storage("event log mutex poisoned".to_string()))
    }
}

impl Store for MemoryStore {
    fn put_campaign(&self, campaign: Campaign) -> OutreachResult<()> {
        debug!(campaign_id = %campaign.id, name = %campaign.name, "Storing campaign");
        self.campaigns.insert(campaign.id, campaign);
        Ok(())
    }

    fn get_campaign(&self, id: &Uuid) -> OutreachResult<Option<Campaign>> {
        Ok(self.campaigns.get(id).map(|r| r.clone()))
    }

    fn set_campaign_status(&self, id: &Uuid, status: CampaignStatus) -> OutreachResult<()> {
        let mut entry = self
            .campaigns
            .get_mut(id)
            .ok_or_else(|| OutreachError::NotFound(format!("campaign {}", id)))?;
        entry.status = status;
        entry.updated_at = Utc::now();
        Ok(())
    }

    fn add_campaign_counters(&self, id: &Uuid, deltas: &CounterDeltas) -> OutreachResult<()> {
        let mut entry = self
            .campaigns
            .get_mut(id)
            .ok_or_else(|| OutreachError::NotFound(format!("campaign {}", id)))?;
        entry.messages_sent += deltas.messages_sent;
        entry.calls_made += deltas.calls_made;
        entry.responses_received += deltas.responses_received;
        entry.updated_at = Utc::now();
        Ok(())
    }

    fn put_candidate(&self, candidate: Candidate) -> OutreachResult<()> {
        self.candidates.insert(candidate.id, candidate);
        Ok(())
    }

    fn get_candidate(&self, id: &Uuid) -> OutreachResult<Option<Candidate>> {
        Ok(self.candidates.get(id).map(|r| r.clone()))
    }

    fn candidates_for_campaign(&self, campaign_id: &Uuid) -> OutreachResult<Vec<Candidate>> {
        let mut out: Vec<Candidate> = self
            .candidates
            .iter()
            .filter(|r| r.value().campaign_id == *campaign_id)
            .map(|r| r.value().clone())
            .collect();
        // Stable order for callers and tests.
        out.sort_by_key(|c| c.created_at);
        Ok(out)
    }

    fn mark_channel_sent(
        &self,
        candidate_id: &Uuid,
        channel: ChannelKind,
        status_label: &str,
    ) -> OutreachResult<()> {
        let mut entry = self
            .candidates
            .get_mut(candidate_id)
            .ok_or_else(|| OutreachError::NotFound(format!("candidate {}", candidate_id)))?;
        match channel {
            ChannelKind::Email => entry.email_sent = true,
            ChannelKind::Whatsapp => entry.whatsapp_sent = true,
            ChannelKind::Voice => entry.voice_called = true,
        }
        entry.status = status_label.to_string();
        Ok(())
    }

    fn append_event(&self, event: AnalyticsEvent) -> OutreachResult<()> {
        self.events_lock()?.push(event);
        Ok(())
    }

    fn events_for_campaign(&self, campaign_id: &Uuid) -> OutreachResult<Vec<AnalyticsEvent>> {
        Ok(self
            .events_lock()?
            .iter()
            .filter(|e| e.campaign_id == *campaign_id)
            .cloned()
            .collect())
    }
}
