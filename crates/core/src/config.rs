use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `OUTREACH__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub email: EmailProviderConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppProviderConfig,
    #[serde(default)]
    pub voice: VoiceProviderConfig,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Pacing delay between consecutive channel batches.
    #[serde(default = "default_channel_delay_secs")]
    pub channel_delay_secs: u64,
    /// Per-transport-call timeout.
    #[serde(default = "default_transport_timeout_ms")]
    pub transport_timeout_ms: u64,
    /// Overall run deadline; 0 disables it.
    #[serde(default)]
    pub run_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default = "default_advisor_enabled")]
    pub enabled: bool,
    /// The advisor is best-effort; past this it is treated as unavailable.
    #[serde(default = "default_advisor_timeout_ms")]
    pub timeout_ms: u64,
}

/// Outbound email provider (Resend-style HTTP API).
#[derive(Debug, Clone, Deserialize)]
pub struct EmailProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

/// WhatsApp messaging provider (Twilio-style account credentials).
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppProviderConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_whatsapp_from")]
    pub from_number: String,
}

/// Voice provider: speech synthesis plus outbound call placement.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceProviderConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub tts_api_key: String,
    #[serde(default = "default_voice_from")]
    pub from_number: String,
    #[serde(default = "default_voice_name")]
    pub voice_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouseConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_clickhouse_url")]
    pub url: String,
    #[serde(default = "default_clickhouse_db")]
    pub database: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_channel_delay_secs() -> u64 {
    5
}
fn default_transport_timeout_ms() -> u64 {
    15_000
}
fn default_advisor_enabled() -> bool {
    true
}
fn default_advisor_timeout_ms() -> u64 {
    3000
}
fn default_from_email() -> String {
    "admissions@outreach.example.edu".to_string()
}
fn default_from_name() -> String {
    "Admissions Office".to_string()
}
fn default_whatsapp_from() -> String {
    "whatsapp:+15550100000".to_string()
}
fn default_voice_from() -> String {
    "+15550100000".to_string()
}
fn default_voice_name() -> String {
    "en-US-Neural2-F".to_string()
}
fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}
fn default_clickhouse_db() -> String {
    "outreach".to_string()
}
fn default_batch_size() -> usize {
    1000
}
fn default_flush_interval_ms() -> u64 {
    1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_delay_secs: default_channel_delay_secs(),
            transport_timeout_ms: default_transport_timeout_ms(),
            run_timeout_secs: 0,
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: default_advisor_enabled(),
            timeout_ms: default_advisor_timeout_ms(),
        }
    }
}

impl Default for EmailProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

impl Default for WhatsAppProviderConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: default_whatsapp_from(),
        }
    }
}

impl Default for VoiceProviderConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            tts_api_key: String::new(),
            from_number: default_voice_from(),
            voice_name: default_voice_name(),
        }
    }
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_clickhouse_url(),
            database: default_clickhouse_db(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            advisor: AdvisorConfig::default(),
            email: EmailProviderConfig::default(),
            whatsapp: WhatsAppProviderConfig::default(),
            voice: VoiceProviderConfig::default(),
            clickhouse: ClickHouseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("OUTREACH")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.http_port, 8080);
        assert_eq!(cfg.orchestrator.channel_delay_secs, 5);
        assert_eq!(cfg.advisor.timeout_ms, 3000);
        assert!(cfg.email.api_key.is_empty());
        assert!(!cfg.clickhouse.enabled);
    }
}
