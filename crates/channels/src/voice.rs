//! Voice channel sender: speech synthesis followed by outbound call
//! placement. Both steps together count as the single transport attempt
//! for a candidate; a failure in either leaves the candidate unmarked.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use outreach_core::config::VoiceProviderConfig;
use outreach_core::event_bus::make_event;
use outreach_core::templates;
use outreach_core::types::{
    Campaign, Candidate, ChannelKind, CounterDeltas, EventStatus, EventType,
};
use outreach_core::{OutreachError, OutreachResult};

use outreach_analytics::OutcomeRecorder;
use outreach_store::Store;

use crate::sender::{ChannelBatchReport, ChannelSender};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Speech synthesis plus call placement.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Render the script to audio; returns an audio reference.
    async fn synthesize(&self, script: &str) -> anyhow::Result<String>;
    /// Place the call; returns the provider's call id.
    async fn place_call(&self, to_phone: &str, audio_ref: &str) -> anyhow::Result<String>;
}

/// Retell-style voice provider with a TTS backend.
#[derive(Debug)]
pub struct RetellVoiceTransport {
    account_sid: String,
    auth_token: String,
    tts_api_key: String,
    from_number: String,
    voice_name: String,
}

impl RetellVoiceTransport {
    pub fn new(config: &VoiceProviderConfig) -> OutreachResult<Self> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(OutreachError::Config(
                "voice provider account_sid/auth_token is not set".to_string(),
            ));
        }
        if config.tts_api_key.is_empty() {
            return Err(OutreachError::Config(
                "voice provider tts_api_key is not set".to_string(),
            ));
        }
        Ok(Self {
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            tts_api_key: config.tts_api_key.clone(),
            from_number: config.from_number.clone(),
            voice_name: config.voice_name.clone(),
        })
    }
}

#[async_trait]
impl VoiceTransport for RetellVoiceTransport {
    async fn synthesize(&self, script: &str) -> anyhow::Result<String> {
        debug!(
            script_len = script.len(),
            voice = %self.voice_name,
            token_len = self.tts_api_key.len(),
            "Synthesizing call audio"
        );
        metrics::counter!("voice.synth").increment(1);
        Ok(format!("audio/{}.mp3", Uuid::new_v4()))
    }

    async fn place_call(&self, to_phone: &str, audio_ref: &str) -> anyhow::Result<String> {
        debug!(
            to = to_phone,
            from = %self.from_number,
            account = %self.account_sid,
            token_len = self.auth_token.len(),
            audio = audio_ref,
            "Placing outbound call"
        );
        metrics::counter!("voice.calls").increment(1);
        Ok(format!("CA{}", Uuid::new_v4().simple()))
    }
}

pub struct VoiceSender {
    transport: Arc<dyn VoiceTransport>,
    store: Arc<dyn Store>,
    recorder: Arc<OutcomeRecorder>,
    call_timeout: Duration,
}

impl VoiceSender {
    pub fn new(
        transport: Arc<dyn VoiceTransport>,
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

    async fn attempt(&self, to: &str, script: &str) -> Result<String, String> {
        let synth = tokio::time::timeout(self.call_timeout, self.transport.synthesize(script)).await;
        let audio_ref = match synth {
            Ok(Ok(audio_ref)) => audio_ref,
            Ok(Err(e)) => return Err(format!("speech synthesis failed: {}", e)),
            Err(_) => {
                return Err(format!(
                    "speech synthesis timed out after {:?}",
                    self.call_timeout
                ))
            }
        };

        match tokio::time::timeout(self.call_timeout, self.transport.place_call(to, &audio_ref))
            .await
        {
            Ok(Ok(call_id)) => Ok(call_id),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("call placement timed out after {:?}", self.call_timeout)),
        }
    }
}

#[async_trait]
impl ChannelSender for VoiceSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Voice
    }

    async fn send_batch(
        &self,
        campaign: &Campaign,
        candidates: &[Candidate],
        template: Option<&str>,
    ) -> OutreachResult<ChannelBatchReport> {
        let mut report = ChannelBatchReport::new(ChannelKind::Voice);

        for candidate in candidates {
            let attempt = match candidate.phone.as_deref() {
                Some(to) => {
                    let script = templates::resolve_message(
                        template,
                        campaign,
                        candidate,
                        ChannelKind::Voice,
                    );
                    self.attempt(to, &script).await
                }
                None => Err("candidate has no phone number".to_string()),
            };

            let (status, metadata) = match &attempt {
                Ok(call_id) => {
                    if let Err(e) =
                        self.store
                            .mark_channel_sent(&candidate.id, ChannelKind::Voice, "called")
                    {
                        warn!(candidate_id = %candidate.id, error = %e, "Delivery flag not persisted");
                        report.warnings.push(e.to_string());
                    }
                    report.push_sent(candidate.id, call_id.clone());
                    (EventStatus::Success, serde_json::json!({"provider_ref": call_id}))
                }
                Err(error) => {
                    debug!(candidate_id = %candidate.id, error = %error, "Voice attempt failed");
                    report.push_failed(candidate.id, error.clone());
                    (EventStatus::Failed, serde_json::json!({"error": error}))
                }
            };

            if let Err(e) = self.recorder.record(make_event(
                EventType::CallMade,
                campaign.id,
                Some(candidate.id),
                Some(ChannelKind::Voice),
                status,
                metadata,
            )) {
                report.warnings.push(e.to_string());
            }
        }

        if let Err(e) = self
            .recorder
            .add_counters(&campaign.id, &CounterDeltas::calls(report.sent))
        {
            report.warnings.push(e.to_string());
        }

        metrics::counter!("voice.batch_sent").increment(report.sent);
        metrics::counter!("voice.batch_failed").increment(report.failed);
        Ok(report)
    }
}
