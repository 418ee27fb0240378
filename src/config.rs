//! Configuration types for odds-watch
//!
//! Every tunable has a default matching production usage, so a partial (or
//! missing) config file still yields a working monitor.

use crate::alert::AlertPolicy;
use crate::classify::ClassifierConfig;
use crate::ingest::SourceConfig;
use crate::signal::InterestConfig;
use chrono::Duration as ChronoDuration;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub interest: InterestConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub classify: ClassifySection,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Candidate event selection
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Prematch lookahead window in hours
    #[serde(default = "default_hours")]
    pub hours: u32,

    /// Only events of this sport; `None` accepts everything
    #[serde(default = "default_sport_id")]
    pub sport_id: Option<i64>,

    /// Drop e-sports/virtual fixtures by name heuristics
    #[serde(default = "default_true")]
    pub skip_virtual: bool,
}

fn default_hours() -> u32 {
    12
}
fn default_sport_id() -> Option<i64> {
    Some(1)
}
fn default_true() -> bool {
    true
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            hours: default_hours(),
            sport_id: default_sport_id(),
            skip_virtual: true,
        }
    }
}

/// Storage collaborator endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Max snapshot rows per table fetch
    #[serde(default = "default_table_limit")]
    pub table_limit: u32,
    /// Retries for a failed table fetch
    #[serde(default = "default_table_retries")]
    pub table_retries: u32,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    3
}
fn default_read_timeout_secs() -> u64 {
    10
}
fn default_table_limit() -> u32 {
    2000
}
fn default_table_retries() -> u32 {
    1
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            table_limit: default_table_limit(),
            table_retries: default_table_retries(),
        }
    }
}

impl SourceSection {
    pub fn to_source_config(&self) -> SourceConfig {
        SourceConfig {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            table_limit: self.table_limit,
            table_retries: self.table_retries,
        }
    }
}

/// Anti-spam policy
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    /// Per-signal cooldown (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,

    /// Pending line-move confirmation TTL (seconds)
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: i64,

    /// Reverse line-move suppression window (seconds)
    #[serde(default = "default_reverse_suppress_secs")]
    pub reverse_suppress_secs: i64,

    /// Hard cap on alerts per poll cycle
    #[serde(default = "default_max_per_cycle")]
    pub max_per_cycle: u32,

    /// Surface cross-line moves (via pending confirmation)
    #[serde(default = "default_true")]
    pub allow_crossline: bool,

    /// First run only records baselines
    #[serde(default = "default_true")]
    pub warmup: bool,

    /// Persisted state file
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_cooldown_secs() -> i64 {
    300
}
fn default_pending_ttl_secs() -> i64 {
    300
}
fn default_reverse_suppress_secs() -> i64 {
    1800
}
fn default_max_per_cycle() -> u32 {
    8
}
fn default_state_path() -> PathBuf {
    PathBuf::from("odds_watch_state.json")
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            pending_ttl_secs: default_pending_ttl_secs(),
            reverse_suppress_secs: default_reverse_suppress_secs(),
            max_per_cycle: default_max_per_cycle(),
            allow_crossline: true,
            warmup: true,
            state_path: default_state_path(),
        }
    }
}

impl AlertsConfig {
    pub fn to_policy(&self) -> AlertPolicy {
        AlertPolicy {
            cooldown: ChronoDuration::seconds(self.cooldown_secs),
            pending_ttl: ChronoDuration::seconds(self.pending_ttl_secs),
            reverse_suppress: ChronoDuration::seconds(self.reverse_suppress_secs),
            warmup: self.warmup,
        }
    }
}

/// Poll scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// A cycle exceeding this budget finishes its in-flight event and stops
    /// starting new ones
    #[serde(default = "default_cycle_budget_secs")]
    pub cycle_budget_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    10
}
fn default_cycle_budget_secs() -> u64 {
    120
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            cycle_budget_secs: default_cycle_budget_secs(),
        }
    }
}

/// Classifier cache tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifySection {
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: i64,
    #[serde(default = "default_detail_ttl_secs")]
    pub detail_ttl_secs: i64,
}

fn default_catalog_ttl_secs() -> i64 {
    600
}
fn default_detail_ttl_secs() -> i64 {
    300
}

impl Default for ClassifySection {
    fn default() -> Self {
        Self {
            catalog_ttl_secs: default_catalog_ttl_secs(),
            detail_ttl_secs: default_detail_ttl_secs(),
        }
    }
}

impl ClassifySection {
    pub fn to_classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            catalog_ttl: ChronoDuration::seconds(self.catalog_ttl_secs),
            detail_ttl: ChronoDuration::seconds(self.detail_ttl_secs),
        }
    }
}

/// Alert delivery
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Environment variable holding the bot token
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,
    /// Environment variable holding the chat id
    #[serde(default = "default_chat_id_env")]
    pub chat_id_env: String,
    #[serde(default = "default_title")]
    pub title: String,
    /// Public dashboard base URL for message links
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Deliver without a notification sound
    #[serde(default)]
    pub silent: bool,
}

fn default_bot_token_env() -> String {
    "TG_BOT_TOKEN".to_string()
}
fn default_chat_id_env() -> String {
    "TG_CHAT_ID".to_string()
}
fn default_title() -> String {
    "ODDS RADAR".to_string()
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_bot_token_env(),
            chat_id_env: default_chat_id_env(),
            title: default_title(),
            public_base_url: None,
            silent: false,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_metrics_port() -> u16 {
    9090
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.events.hours, 12);
        assert_eq!(config.alerts.cooldown_secs, 300);
        assert_eq!(config.alerts.max_per_cycle, 8);
        assert_eq!(config.interest.min_drop_pct, dec!(11.0));
        assert_eq!(config.schedule.poll_interval_secs, 10);
        assert!(config.alerts.allow_crossline);
    }

    #[test]
    fn test_partial_config_overrides() {
        let toml = r#"
            [events]
            hours = 24

            [interest]
            min_drop_pct = 15.0
            use_ticks = false

            [alerts]
            cooldown_secs = 600
            allow_crossline = false

            [delivery]
            title = "TEST RADAR"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.events.hours, 24);
        assert_eq!(config.interest.min_drop_pct, dec!(15.0));
        assert!(!config.interest.use_ticks);
        assert_eq!(config.alerts.cooldown_secs, 600);
        assert!(!config.alerts.allow_crossline);
        assert_eq!(config.delivery.title, "TEST RADAR");
        // untouched sections keep defaults
        assert_eq!(config.source.table_limit, 2000);
    }

    #[test]
    fn test_interest_ladders_are_data() {
        let toml = r#"
            [interest]
            drop_ladder = [
                { up_to = 2.0, value = 5.0 },
                { up_to = 10.0, value = 15.0 },
            ]
            drop_ladder_tail = 40.0
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.interest.drop_ladder.len(), 2);
        assert_eq!(config.interest.drop_ladder[0].value, dec!(5.0));
        assert_eq!(config.interest.drop_ladder_tail, dec!(40.0));
    }

    #[test]
    fn test_policy_conversion() {
        let config = AlertsConfig::default();
        let policy = config.to_policy();
        assert_eq!(policy.cooldown, ChronoDuration::seconds(300));
        assert_eq!(policy.reverse_suppress, ChronoDuration::seconds(1800));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
