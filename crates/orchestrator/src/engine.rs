//! Campaign orchestration engine.
//!
//! Channels run strictly sequentially with a pacing delay between
//! batches; the delay avoids simultaneous multi-channel contact and
//! respects downstream provider rate limits. After the campaign load
//! succeeds, the engine never returns `Err` — per-channel and
//! per-candidate failures are captured in the result.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use outreach_analytics::OutcomeRecorder;
use outreach_channels::{ChannelBatchReport, ChannelSender};
use outreach_core::event_bus::make_event;
use outreach_core::types::{
    Campaign, CampaignStatus, Candidate, ChannelKind, ChannelRun, ChannelRunStatus, EventStatus,
    EventType, ExecutionResult, RunSummary,
};
use outreach_core::{OutreachError, OutreachResult};
use outreach_store::Store;

use crate::advisor::{ChannelPlan, StrategyAdvisor};

const DEFAULT_ADVISOR_TIMEOUT: Duration = Duration::from_secs(3);

/// One orchestration run.
#[derive(Debug, Clone)]
pub struct OrchestrationRequest {
    pub campaign_id: Uuid,
    /// Channel order for this run; `None` uses the campaign's enabled
    /// list.
    pub channels: Option<Vec<ChannelKind>>,
    /// Target subset; `None` targets every candidate of the campaign.
    pub candidate_ids: Option<Vec<Uuid>>,
    pub delay_between_channels: Duration,
    /// Past this point no new channel is started and the result is
    /// marked partial.
    pub deadline: Option<Instant>,
}

impl OrchestrationRequest {
    pub fn new(campaign_id: Uuid) -> Self {
        Self {
            campaign_id,
            channels: None,
            candidate_ids: None,
            delay_between_channels: Duration::ZERO,
            deadline: None,
        }
    }
}

pub struct Orchestrator {
    store: Arc<dyn Store>,
    recorder: Arc<OutcomeRecorder>,
    senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
    advisor: Option<Arc<dyn StrategyAdvisor>>,
    advisor_timeout: Duration,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, recorder: Arc<OutcomeRecorder>) -> Self {
        Self {
            store,
            recorder,
            senders: HashMap::new(),
            advisor: None,
            advisor_timeout: DEFAULT_ADVISOR_TIMEOUT,
        }
    }

    pub fn with_sender(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(sender.kind(), sender);
        self
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn StrategyAdvisor>, timeout: Duration) -> Self {
        self.advisor = Some(advisor);
        self.advisor_timeout = timeout;
        self
    }

    /// Execute one orchestration run. Fails only on lookup/validation
    /// problems before any channel has started.
    pub async fn execute(&self, request: OrchestrationRequest) -> OutreachResult<ExecutionResult> {
        let started_at = Utc::now();

        if let Some(channels) = &request.channels {
            validate_channels(channels)?;
        }

        // Fatal lookups, before any side effect.
        let campaign = self
            .store
            .get_campaign(&request.campaign_id)?
            .ok_or_else(|| OutreachError::NotFound("Campaign not found".to_string()))?;
        let all_candidates = self.store.candidates_for_campaign(&request.campaign_id)?;
        let candidates = resolve_subset(all_candidates, request.candidate_ids.as_deref());

        let mut channels = match request.channels {
            Some(channels) => channels,
            None => {
                let channels = campaign.channels.clone();
                validate_channels(&channels)?;
                channels
            }
        };
        let mut delay = request.delay_between_channels;

        // Best-effort advisory pass; never blocks the run.
        if let Some(plan) = self.consult_advisor(&campaign, &candidates).await {
            if let Some(suggested) = plan.channels {
                if validate_channels(&suggested).is_ok() {
                    info!(campaign_id = %campaign.id, channels = ?suggested, "Applying advised channel order");
                    channels = suggested;
                }
            }
            if let Some(suggested_delay) = plan.delay {
                delay = suggested_delay;
            }
        }

        info!(
            campaign_id = %campaign.id,
            channels = ?channels,
            candidates = candidates.len(),
            delay_secs = delay.as_secs(),
            "Starting orchestration run"
        );
        metrics::counter!("orchestrator.runs").increment(1);

        let mut runs: Vec<ChannelRun> = Vec::with_capacity(channels.len());
        let mut warnings: Vec<String> = Vec::new();
        let mut partial = false;

        for (i, &channel) in channels.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                // Cancellable pacing wait: never sleep past the deadline.
                let wake = Instant::now() + delay;
                match request.deadline {
                    Some(deadline) if wake >= deadline => {
                        tokio::time::sleep_until(deadline).await;
                    }
                    _ => tokio::time::sleep_until(wake).await,
                }
            }

            if let Some(deadline) = request.deadline {
                if Instant::now() >= deadline {
                    warn!(campaign_id = %campaign.id, channel = ?channel, "Run deadline reached, skipping remaining channels");
                    metrics::counter!("orchestrator.partial_runs").increment(1);
                    partial = true;
                    break;
                }
            }

            runs.push(self.run_channel(channel, &campaign, &candidates, &mut warnings).await);
        }

        let summary = summarize(&runs);

        // Finalization writes are non-fatal.
        if let Err(e) = self
            .store
            .set_campaign_status(&campaign.id, CampaignStatus::Completed)
        {
            warn!(campaign_id = %campaign.id, error = %e, "Campaign status not persisted");
            warnings.push(e.to_string());
        }

        if let Err(e) = self.recorder.record(make_event(
            EventType::CampaignOrchestrated,
            campaign.id,
            None,
            None,
            EventStatus::Success,
            serde_json::json!({
                "total": summary.total,
                "success": summary.success,
                "failed": summary.failed,
                "partial": partial,
            }),
        )) {
            warnings.push(e.to_string());
        }

        info!(
            campaign_id = %campaign.id,
            total = summary.total,
            success = summary.success,
            failed = summary.failed,
            partial = partial,
            "Orchestration run finished"
        );

        Ok(ExecutionResult {
            campaign_id: campaign.id,
            channels: runs,
            summary,
            partial,
            warnings,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn run_channel(
        &self,
        channel: ChannelKind,
        campaign: &Campaign,
        candidates: &[Candidate],
        warnings: &mut Vec<String>,
    ) -> ChannelRun {
        let Some(sender) = self.senders.get(&channel) else {
            warn!(channel = ?channel, "No sender registered for channel");
            return failed_run(channel, "no sender registered for channel".to_string());
        };

        match sender.send_batch(campaign, candidates, None).await {
            Ok(report) => {
                warnings.extend(report.warnings.iter().cloned());
                completed_run(report)
            }
            Err(e) => {
                // One channel's total failure must not abort the rest.
                warn!(channel = ?channel, error = %e, "Channel batch failed");
                metrics::counter!("orchestrator.channel_failures").increment(1);
                failed_run(channel, e.to_string())
            }
        }
    }

    async fn consult_advisor(
        &self,
        campaign: &Campaign,
        candidates: &[Candidate],
    ) -> Option<ChannelPlan> {
        let advisor = self.advisor.as_ref()?;
        match tokio::time::timeout(self.advisor_timeout, advisor.suggest(campaign, candidates))
            .await
        {
            Ok(Ok(plan)) => Some(plan),
            Ok(Err(e)) => {
                // Advisor unavailability is not an error.
                info!(campaign_id = %campaign.id, error = %e, "Advisor unavailable, using caller parameters");
                None
            }
            Err(_) => {
                info!(campaign_id = %campaign.id, "Advisor timed out, using caller parameters");
                None
            }
        }
    }
}

fn validate_channels(channels: &[ChannelKind]) -> OutreachResult<()> {
    if channels.is_empty() {
        return Err(OutreachError::Validation(
            "channel list must not be empty".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for &ch in channels {
        if !seen.insert(ch) {
            return Err(OutreachError::Validation(format!(
                "duplicate channel '{}'",
                ch.display_name()
            )));
        }
    }
    Ok(())
}

fn resolve_subset(all: Vec<Candidate>, ids: Option<&[Uuid]>) -> Vec<Candidate> {
    match ids {
        Some(ids) => {
            let wanted: HashSet<&Uuid> = ids.iter().collect();
            all.into_iter().filter(|c| wanted.contains(&c.id)).collect()
        }
        None => all,
    }
}

fn summarize(runs: &[ChannelRun]) -> RunSummary {
    let success: u64 = runs.iter().map(|r| r.sent).sum();
    let failed: u64 = runs.iter().map(|r| r.failed).sum();
    RunSummary {
        total: success + failed,
        success,
        failed,
    }
}

fn completed_run(report: ChannelBatchReport) -> ChannelRun {
    ChannelRun {
        channel: report.channel,
        status: ChannelRunStatus::Completed,
        sent: report.sent,
        failed: report.failed,
        error: None,
        outcomes: report.outcomes,
    }
}

fn failed_run(channel: ChannelKind, error: String) -> ChannelRun {
    ChannelRun {
        channel,
        status: ChannelRunStatus::Failed,
        sent: 0,
        failed: 0,
        error: Some(error),
        outcomes: Vec::new(),
    }
}
