//! MathShorts configuration system.
//!
//! Everything the original scripts hardcoded is a config default here:
//! the approval window, sweep cadence, per-call timeouts, the retry
//! schedule, the language set, and the slot cron table.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MathShortsError, Result};
use crate::types::{Grade, TimeSlot};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathShortsConfig {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Default for MathShortsConfig {
    fn default() -> Self {
        Self {
            content: ContentConfig::default(),
            generator: GeneratorConfig::default(),
            voice: VoiceConfig::default(),
            approval: ApprovalConfig::default(),
            notify: NotifyConfig::default(),
            publish: PublishConfig::default(),
            schedule: ScheduleConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl MathShortsConfig {
    /// Load config from the default path (~/.mathshorts/config.toml),
    /// falling back to defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MathShortsError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| MathShortsError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the MathShorts home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mathshorts")
    }
}

/// What content gets produced each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Languages every bundle fans out to.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_grade")]
    pub grade: Grade,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_languages() -> Vec<String> {
    ["ko", "en", "zh", "ja", "es"].iter().map(|s| s.to_string()).collect()
}
fn default_grade() -> Grade {
    Grade::Grade1
}
fn default_topic() -> String {
    "일차방정식".into()
}
fn default_region() -> String {
    "asia".into()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            grade: default_grade(),
            topic: default_topic(),
            region: default_region(),
        }
    }
}

/// Problem-generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_generator_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_generator_model")]
    pub model: String,
    #[serde(default = "default_generator_max_tokens")]
    pub max_tokens: u32,
    /// Per-call ceiling; a timed-out call counts as a failure.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    /// Total attempts for retryable provider errors.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed backoff unit: attempt N waits N × this many seconds.
    #[serde(default = "default_backoff_unit")]
    pub backoff_unit_secs: u64,
}

fn default_generator_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".into()
}
fn default_generator_model() -> String {
    "claude-3-sonnet-20240229".into()
}
fn default_generator_max_tokens() -> u32 {
    1500
}
fn default_generation_timeout() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_unit() -> u64 {
    3
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_generator_endpoint(),
            model: default_generator_model(),
            max_tokens: default_generator_max_tokens(),
            timeout_secs: default_generation_timeout(),
            max_attempts: default_max_attempts(),
            backoff_unit_secs: default_backoff_unit(),
        }
    }
}

/// Text-to-speech provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,
    /// Where synthesized audio files land.
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,
    #[serde(default = "default_narration_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f32,
}

fn default_tts_endpoint() -> String {
    "https://texttospeech.googleapis.com/v1/text:synthesize".into()
}
fn default_audio_dir() -> String {
    "~/.mathshorts/audio".into()
}
fn default_narration_timeout() -> u64 {
    30
}
fn default_speaking_rate() -> f32 {
    0.9
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_tts_endpoint(),
            audio_dir: default_audio_dir(),
            timeout_secs: default_narration_timeout(),
            speaking_rate: default_speaking_rate(),
        }
    }
}

/// Approval gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Pending tickets auto-approve this long after submission.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// How often the deadline sweep runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Durable ticket store; survives restarts.
    #[serde(default = "default_ticket_db")]
    pub db_path: String,
}

fn default_window_secs() -> u64 {
    7200
}
fn default_sweep_interval() -> u64 {
    180
}
fn default_ticket_db() -> String {
    "~/.mathshorts/tickets.db".into()
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval(),
            db_path: default_ticket_db(),
        }
    }
}

/// Notification side channel — all targets are best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailNotifyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramNotifyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookNotifyConfig>,
    /// Base URL the approve/reject links in notifications point at.
    #[serde(default = "default_approval_base_url")]
    pub approval_base_url: String,
}

fn default_approval_base_url() -> String {
    "http://localhost:3000".into()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            email: None,
            telegram: None,
            webhook: None,
            approval_base_url: default_approval_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailNotifyConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Recipient reviewer address.
    pub to: String,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramNotifyConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookNotifyConfig {
    pub url: String,
}

/// Video publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_publish_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_publish_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_channel_tag")]
    pub channel_tag: String,
}

fn default_publish_endpoint() -> String {
    "https://upload.example.com/v1/videos".into()
}
fn default_publish_timeout() -> u64 {
    60
}
fn default_channel_tag() -> String {
    "mathshorts".into()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_publish_endpoint(),
            timeout_secs: default_publish_timeout(),
            channel_tag: default_channel_tag(),
        }
    }
}

/// One cadence entry: fire `slot` whenever `cron` matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub cron: String,
    pub slot: TimeSlot,
}

/// Slot cadence. The schedule is configuration, not logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_schedule_entries")]
    pub entries: Vec<ScheduleEntry>,
    /// How often the engine checks for due slots.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
}

fn default_schedule_entries() -> Vec<ScheduleEntry> {
    vec![
        ScheduleEntry {
            cron: "0 6 * * 1-5".into(),
            slot: TimeSlot::Morning,
        },
        ScheduleEntry {
            cron: "0 12 * * 1-5".into(),
            slot: TimeSlot::Lunch,
        },
    ]
}
fn default_tick_interval() -> u64 {
    30
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            entries: default_schedule_entries(),
            tick_interval_secs: default_tick_interval(),
        }
    }
}

/// Inbound HTTP surface for the approval decision endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Expand a leading `~` against the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_observed_constants() {
        let config = MathShortsConfig::default();
        assert_eq!(config.approval.window_secs, 7200);
        assert_eq!(config.generator.timeout_secs, 30);
        assert_eq!(config.voice.timeout_secs, 30);
        assert_eq!(config.publish.timeout_secs, 60);
        assert_eq!(config.generator.max_attempts, 3);
        assert_eq!(config.generator.backoff_unit_secs, 3);
        assert_eq!(config.content.languages.len(), 5);
        assert_eq!(config.schedule.entries.len(), 2);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = MathShortsConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: MathShortsConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.content.topic, "일차방정식");
        assert_eq!(parsed.schedule.entries[0].cron, "0 6 * * 1-5");
        assert_eq!(parsed.schedule.entries[1].slot, TimeSlot::Lunch);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: MathShortsConfig = toml::from_str(
            r#"
            [approval]
            window_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(parsed.approval.window_secs, 60);
        assert_eq!(parsed.approval.sweep_interval_secs, 180);
        assert_eq!(parsed.content.region, "asia");
    }

    #[test]
    fn test_expand_tilde() {
        assert!(!expand_tilde("~/x/y").to_string_lossy().starts_with('~'));
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}
