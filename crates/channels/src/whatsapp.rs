//! WhatsApp channel sender (Twilio messaging API).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use outreach_core::config::WhatsAppProviderConfig;
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

/// One outbound WhatsApp message attempt.
#[async_trait]
pub trait WhatsAppTransport: Send + Sync {
    async fn send(&self, to_phone: &str, body: &str) -> anyhow::Result<String>;
}

/// Twilio WhatsApp provider.
#[derive(Debug)]
pub struct TwilioWhatsAppTransport {
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioWhatsAppTransport {
    pub fn new(config: &WhatsAppProviderConfig) -> OutreachResult<Self> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(OutreachError::Config(
                "whatsapp provider account_sid/auth_token is not set".to_string(),
            ));
        }
        Ok(Self {
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        })
    }
}

#[async_trait]
impl WhatsAppTransport for TwilioWhatsAppTransport {
    /// In production: POST to /2010-04-01/Accounts/{sid}/Messages.json
    async fn send(&self, to_phone: &str, body: &str) -> anyhow::Result<String> {
        debug!(
            to = to_phone,
            from = %self.from_number,
            account = %self.account_sid,
            token_len = self.auth_token.len(),
            body_len = body.len(),
            "Sending WhatsApp message"
        );
        metrics::counter!("whatsapp.sends").increment(1);
        Ok(format!("SM{}", Uuid::new_v4().simple()))
    }
}

pub struct WhatsAppSender {
    transport: Arc<dyn WhatsAppTransport>,
    store: Arc<dyn Store>,
    recorder: Arc<OutcomeRecorder>,
    call_timeout: Duration,
}

impl WhatsAppSender {
    pub fn new(
        transport: Arc<dyn WhatsAppTransport>,
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
impl ChannelSender for WhatsAppSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Whatsapp
    }

    async fn send_batch(
        &self,
        campaign: &Campaign,
        candidates: &[Candidate],
        template: Option<&str>,
    ) -> OutreachResult<ChannelBatchReport> {
        let mut report = ChannelBatchReport::new(ChannelKind::Whatsapp);

        for candidate in candidates {
            let attempt = match candidate.phone.as_deref() {
                Some(to) => {
                    let body = templates::resolve_message(
                        template,
                        campaign,
                        candidate,
                        ChannelKind::Whatsapp,
                    );
                    match tokio::time::timeout(self.call_timeout, self.transport.send(to, &body))
                        .await
                    {
                        Ok(Ok(provider_ref)) => Ok(provider_ref),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(_) => Err(format!(
                            "whatsapp send timed out after {:?}",
                            self.call_timeout
                        )),
                    }
                }
                None => Err("candidate has no phone number".to_string()),
            };

            let (status, metadata) = match &attempt {
                Ok(provider_ref) => {
                    if let Err(e) = self.store.mark_channel_sent(
                        &candidate.id,
                        ChannelKind::Whatsapp,
                        "whatsapp_sent",
                    ) {
                        warn!(candidate_id = %candidate.id, error = %e, "Delivery flag not persisted");
                        report.warnings.push(e.to_string());
                    }
                    report.push_sent(candidate.id, provider_ref.clone());
                    (EventStatus::Success, serde_json::json!({"provider_ref": provider_ref}))
                }
                Err(error) => {
                    debug!(candidate_id = %candidate.id, error = %error, "WhatsApp attempt failed");
                    report.push_failed(candidate.id, error.clone());
                    (EventStatus::Failed, serde_json::json!({"error": error}))
                }
            };

            if let Err(e) = self.recorder.record(make_event(
                EventType::WhatsappSent,
                campaign.id,
                Some(candidate.id),
                Some(ChannelKind::Whatsapp),
                status,
                metadata,
            )) {
                report.warnings.push(e.to_string());
            }
        }

        if let Err(e) = self
            .recorder
            .add_counters(&campaign.id, &CounterDeltas::messages(report.sent))
        {
            report.warnings.push(e.to_string());
        }

        metrics::counter!("whatsapp.batch_sent").increment(report.sent);
        metrics::counter!("whatsapp.batch_failed").increment(report.failed);
        Ok(report)
    }
}
