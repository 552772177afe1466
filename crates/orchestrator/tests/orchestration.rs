//! End-to-end orchestration runs against the in-memory store with
//! scripted transports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use uuid::Uuid;

use outreach_analytics::OutcomeRecorder;
use outreach_channels::{
    ChannelBatchReport, ChannelSender, EmailSender, EmailTransport, WhatsAppSender,
    WhatsAppTransport,
};
use outreach_core::event_bus::{capture_sink, CaptureSink};
use outreach_core::types::{
    AnalyticsEvent, Campaign, CampaignStatus, Candidate, ChannelKind, ChannelRunStatus,
    CounterDeltas, EventType, OutcomeStatus,
};
use outreach_core::{OutreachError, OutreachResult};
use outreach_orchestrator::{
    ChannelPlan, NoopAdvisor, OrchestrationRequest, Orchestrator, StrategyAdvisor,
};
use outreach_store::{MemoryStore, Store};

struct ScriptedEmail {
    fail_for: Vec<String>,
}

#[async_trait]
impl EmailTransport for ScriptedEmail {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> anyhow::Result<String> {
        if self.fail_for.iter().any(|f| f == to) {
            anyhow::bail!("mailbox unavailable for {}", to);
        }
        Ok(format!("re_{}", Uuid::new_v4()))
    }
}

struct OkWhatsApp;

#[async_trait]
impl WhatsAppTransport for OkWhatsApp {
    async fn send(&self, _to: &str, _body: &str) -> anyhow::Result<String> {
        Ok(format!("SM{}", Uuid::new_v4().simple()))
    }
}

/// Whole-channel outage: the sender itself errors before any attempt.
struct DownChannel(ChannelKind);

#[async_trait]
impl ChannelSender for DownChannel {
    fn kind(&self) -> ChannelKind {
        self.0
    }

    async fn send_batch(
        &self,
        _campaign: &Campaign,
        _candidates: &[Candidate],
        _template: Option<&str>,
    ) -> outreach_core::OutreachResult<ChannelBatchReport> {
        Err(OutreachError::Transport("provider outage".to_string()))
    }
}

/// Store whose analytics writes always fail; everything else delegates.
struct BrokenAnalyticsStore(MemoryStore);

impl Store for BrokenAnalyticsStore {
    fn put_campaign(&self, c: Campaign) -> OutreachResult<()> {
        self.0.put_campaign(c)
    }
    fn get_campaign(&self, id: &Uuid) -> OutreachResult<Option<Campaign>> {
        self.0.get_campaign(id)
    }
    fn set_campaign_status(&self, id: &Uuid, s: CampaignStatus) -> OutreachResult<()> {
        self.0.set_campaign_status(id, s)
    }
    fn add_campaign_counters(&self, _: &Uuid, _: &CounterDeltas) -> OutreachResult<()> {
        Err(OutreachError::Storage("counters offline".into()))
    }
    fn put_candidate(&self, c: Candidate) -> OutreachResult<()> {
        self.0.put_candidate(c)
    }
    fn get_candidate(&self, id: &Uuid) -> OutreachResult<Option<Candidate>> {
        self.0.get_candidate(id)
    }
    fn candidates_for_campaign(&self, id: &Uuid) -> OutreachResult<Vec<Candidate>> {
        self.0.candidates_for_campaign(id)
    }
    fn mark_channel_sent(&self, id: &Uuid, ch: ChannelKind, s: &str) -> OutreachResult<()> {
        self.0.mark_channel_sent(id, ch, s)
    }
    fn append_event(&self, _: AnalyticsEvent) -> OutreachResult<()> {
        Err(OutreachError::Storage("event log offline".into()))
    }
    fn events_for_campaign(&self, id: &Uuid) -> OutreachResult<Vec<AnalyticsEvent>> {
        self.0.events_for_campaign(id)
    }
}

struct SlowAdvisor;

#[async_trait]
impl StrategyAdvisor for SlowAdvisor {
    async fn suggest(
        &self,
        _campaign: &Campaign,
        _candidates: &[Candidate],
    ) -> anyhow::Result<ChannelPlan> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ChannelPlan::default())
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    sink: Arc<CaptureSink>,
    recorder: Arc<OutcomeRecorder>,
    campaign: Campaign,
    candidates: Vec<Candidate>,
}

/// Campaign with three candidates, all reachable by phone; the second
/// one's mailbox can be scripted to bounce.
fn fixture(channels: Vec<ChannelKind>) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let sink = capture_sink();
    let recorder =
        Arc::new(OutcomeRecorder::new(store.clone() as Arc<dyn Store>).with_sink(sink.clone()));

    let mut campaign = Campaign::new("Fall Intake", channels);
    campaign.status = CampaignStatus::Active;
    store.put_campaign(campaign.clone()).unwrap();

    let mut candidates = Vec::new();
    for (name, email) in [("Asha", "asha@x.edu"), ("Bola", "bola@x.edu"), ("Chen", "chen@x.edu")] {
        let c = Candidate::new(
            campaign.id,
            name,
            Some(email.to_string()),
            Some("+1 555 0100".to_string()),
        );
        store.put_candidate(c.clone()).unwrap();
        candidates.push(c);
    }

    Fixture { store, sink, recorder, campaign, candidates }
}

fn email_sender(f: &Fixture, fail_for: Vec<String>) -> Arc<dyn ChannelSender> {
    Arc::new(EmailSender::new(
        Arc::new(ScriptedEmail { fail_for }),
        f.store.clone(),
        f.recorder.clone(),
    ))
}

fn whatsapp_sender(f: &Fixture) -> Arc<dyn ChannelSender> {
    Arc::new(WhatsAppSender::new(
        Arc::new(OkWhatsApp),
        f.store.clone(),
        f.recorder.clone(),
    ))
}

#[tokio::test]
async fn test_two_channel_run_with_one_bounce() {
    let f = fixture(vec![ChannelKind::Email, ChannelKind::Whatsapp]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone())
        .with_sender(email_sender(&f, vec!["bola@x.edu".into()]))
        .with_sender(whatsapp_sender(&f));

    let result = orchestrator
        .execute(OrchestrationRequest::new(f.campaign.id))
        .await
        .unwrap();

    assert_eq!(result.channels.len(), 2);
    let email = &result.channels[0];
    assert_eq!(email.channel, ChannelKind::Email);
    assert_eq!(email.sent, 2);
    assert_eq!(email.failed, 1);
    let whatsapp = &result.channels[1];
    assert_eq!(whatsapp.sent, 3);
    assert_eq!(whatsapp.failed, 0);

    assert_eq!(result.summary.total, 6);
    assert_eq!(result.summary.success, 5);
    assert_eq!(result.summary.failed, 1);
    assert!(!result.partial);

    // One event per attempt plus the run-level event.
    assert_eq!(f.sink.count_type(EventType::EmailSent), 3);
    assert_eq!(f.sink.count_type(EventType::WhatsappSent), 3);
    assert_eq!(f.sink.count_type(EventType::CampaignOrchestrated), 1);

    let refreshed = f.store.get_campaign(&f.campaign.id).unwrap().unwrap();
    assert_eq!(refreshed.status, CampaignStatus::Completed);
    assert_eq!(refreshed.messages_sent, 5);
    assert_eq!(refreshed.calls_made, 0);
}

#[tokio::test]
async fn test_unknown_campaign_is_not_found_with_no_side_effects() {
    let f = fixture(vec![ChannelKind::Email]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone())
        .with_sender(email_sender(&f, vec![]));

    let err = orchestrator
        .execute(OrchestrationRequest::new(Uuid::new_v4()))
        .await
        .unwrap_err();

    assert!(matches!(err, OutreachError::NotFound(_)));
    assert_eq!(f.sink.count(), 0);
}

#[tokio::test]
async fn test_empty_channel_list_is_rejected() {
    let f = fixture(vec![ChannelKind::Email]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone());

    let mut request = OrchestrationRequest::new(f.campaign.id);
    request.channels = Some(vec![]);
    let err = orchestrator.execute(request).await.unwrap_err();
    assert!(matches!(err, OutreachError::Validation(_)));

    let mut request = OrchestrationRequest::new(f.campaign.id);
    request.channels = Some(vec![ChannelKind::Email, ChannelKind::Email]);
    let err = orchestrator.execute(request).await.unwrap_err();
    assert!(matches!(err, OutreachError::Validation(_)));
}

#[tokio::test]
async fn test_channel_outage_does_not_abort_the_run() {
    let f = fixture(vec![ChannelKind::Whatsapp, ChannelKind::Email]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone())
        .with_sender(Arc::new(DownChannel(ChannelKind::Whatsapp)))
        .with_sender(email_sender(&f, vec![]));

    let result = orchestrator
        .execute(OrchestrationRequest::new(f.campaign.id))
        .await
        .unwrap();

    assert_eq!(result.channels[0].status, ChannelRunStatus::Failed);
    assert!(result.channels[0].error.as_deref().unwrap().contains("outage"));
    assert_eq!(result.channels[1].status, ChannelRunStatus::Completed);
    assert_eq!(result.channels[1].sent, 3);
    assert_eq!(result.summary.success, 3);
}

#[tokio::test]
async fn test_unregistered_channel_is_reported_failed() {
    let f = fixture(vec![ChannelKind::Email, ChannelKind::Voice]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone())
        .with_sender(email_sender(&f, vec![]));

    let result = orchestrator
        .execute(OrchestrationRequest::new(f.campaign.id))
        .await
        .unwrap();

    assert_eq!(result.channels[1].channel, ChannelKind::Voice);
    assert_eq!(result.channels[1].status, ChannelRunStatus::Failed);
    assert_eq!(result.summary.success, 3);
}

#[tokio::test]
async fn test_candidate_subset_limits_the_run() {
    let f = fixture(vec![ChannelKind::Email]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone())
        .with_sender(email_sender(&f, vec![]));

    let mut request = OrchestrationRequest::new(f.campaign.id);
    request.candidate_ids = Some(vec![f.candidates[0].id, Uuid::new_v4()]);
    let result = orchestrator.execute(request).await.unwrap();

    assert_eq!(result.summary.total, 1);
    assert_eq!(result.summary.success, 1);
    assert_eq!(f.sink.count_type(EventType::EmailSent), 1);
}

#[tokio::test(start_paused = true)]
async fn test_inter_channel_delay_is_applied_between_batches_only() {
    let f = fixture(vec![ChannelKind::Email, ChannelKind::Whatsapp]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone())
        .with_sender(email_sender(&f, vec![]))
        .with_sender(whatsapp_sender(&f));

    let mut request = OrchestrationRequest::new(f.campaign.id);
    request.delay_between_channels = Duration::from_secs(5);

    let started = Instant::now();
    let result = orchestrator.execute(request).await.unwrap();
    let elapsed = started.elapsed();

    // One gap for two channels, none before the first or after the last.
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(10));
    assert_eq!(result.summary.success, 6);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_marks_run_partial() {
    let f = fixture(vec![ChannelKind::Email, ChannelKind::Whatsapp]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone())
        .with_sender(email_sender(&f, vec![]))
        .with_sender(whatsapp_sender(&f));

    let mut request = OrchestrationRequest::new(f.campaign.id);
    request.delay_between_channels = Duration::from_secs(30);
    request.deadline = Some(Instant::now() + Duration::from_secs(10));

    let result = orchestrator.execute(request).await.unwrap();

    assert!(result.partial);
    assert_eq!(result.channels.len(), 1);
    assert_eq!(result.channels[0].channel, ChannelKind::Email);
    assert_eq!(result.summary.success, 3);
    assert_eq!(f.sink.count_type(EventType::WhatsappSent), 0);
}

#[tokio::test(start_paused = true)]
async fn test_advisor_timeout_does_not_block_the_run() {
    let f = fixture(vec![ChannelKind::Email]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone())
        .with_sender(email_sender(&f, vec![]))
        .with_advisor(Arc::new(SlowAdvisor), Duration::from_secs(3));

    let result = orchestrator
        .execute(OrchestrationRequest::new(f.campaign.id))
        .await
        .unwrap();

    assert_eq!(result.summary.success, 3);
    assert!(!result.partial);
}

#[tokio::test]
async fn test_degraded_analytics_writes_surface_as_warnings() {
    let inner = MemoryStore::new();
    let mut campaign = Campaign::new("Fall Intake", vec![ChannelKind::Email]);
    campaign.status = CampaignStatus::Active;
    inner.put_campaign(campaign.clone()).unwrap();
    let candidates: Vec<Candidate> = [("Asha", "asha@x.edu"), ("Bola", "bola@x.edu"), ("Chen", "chen@x.edu")]
        .iter()
        .map(|(name, email)| {
            let c = Candidate::new(campaign.id, *name, Some(email.to_string()), None);
            inner.put_candidate(c.clone()).unwrap();
            c
        })
        .collect();

    let store = Arc::new(BrokenAnalyticsStore(inner));
    let sink = capture_sink();
    let recorder =
        Arc::new(OutcomeRecorder::new(store.clone() as Arc<dyn Store>).with_sink(sink.clone()));

    let orchestrator = Orchestrator::new(store.clone(), recorder.clone()).with_sender(Arc::new(
        EmailSender::new(Arc::new(ScriptedEmail { fail_for: vec![] }), store.clone(), recorder),
    ));

    let result = orchestrator
        .execute(OrchestrationRequest::new(campaign.id))
        .await
        .unwrap();

    // The run still completes with every send intact.
    assert_eq!(result.channels[0].status, ChannelRunStatus::Completed);
    assert_eq!(result.summary.success, 3);
    assert!(result.channels[0]
        .outcomes
        .iter()
        .all(|o| o.status == OutcomeStatus::Sent));

    // Every failed persistence left a note: one per event, one for the
    // batch counter update, one for the run-level event.
    assert!(!result.warnings.is_empty());
    assert!(result.warnings.iter().any(|w| w.contains("event not persisted")));
    assert!(result.warnings.iter().any(|w| w.contains("counter update not persisted")));

    // Events still reached the export sink despite the store failures.
    assert_eq!(sink.count_type(EventType::EmailSent), 3);
    assert_eq!(sink.count_type(EventType::CampaignOrchestrated), 1);

    // Delivery flags and status write paths were untouched.
    for candidate in &candidates {
        assert!(store.get_candidate(&candidate.id).unwrap().unwrap().email_sent);
    }
    let refreshed = store.get_campaign(&campaign.id).unwrap().unwrap();
    assert_eq!(refreshed.status, CampaignStatus::Completed);
}

#[tokio::test]
async fn test_noop_advisor_keeps_caller_parameters() {
    let f = fixture(vec![ChannelKind::Whatsapp, ChannelKind::Email]);
    let orchestrator = Orchestrator::new(f.store.clone(), f.recorder.clone())
        .with_sender(email_sender(&f, vec![]))
        .with_sender(whatsapp_sender(&f))
        .with_advisor(Arc::new(NoopAdvisor), Duration::from_secs(3));

    let result = orchestrator
        .execute(OrchestrationRequest::new(f.campaign.id))
        .await
        .unwrap();

    assert_eq!(result.channels[0].channel, ChannelKind::Whatsapp);
    assert_eq!(result.channels[1].channel, ChannelKind::Email);
}
