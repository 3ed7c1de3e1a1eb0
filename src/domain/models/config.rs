//! Engine configuration model.

use serde::{Deserialize, Serialize};

/// Main configuration structure for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Number of worker tasks draining the automation task queue.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the shared engine event channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Per-integration pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Action execution policy.
    #[serde(default)]
    pub actions: ActionConfig,

    /// Upper bound on one discovery run, in seconds.
    #[serde(default = "default_discovery_timeout_secs")]
    pub discovery_timeout_secs: u64,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Capacity of each pipeline's raw-bytes channel.
    #[serde(default = "default_raw_channel_capacity")]
    pub raw_channel_capacity: usize,

    /// Aggregator flush period in milliseconds.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActionConfig {
    /// Deadline for a single service-call attempt, in milliseconds.
    #[serde(default = "default_action_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts per action, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// One of: json, pretty.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling file output; stdout only when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
}

const fn default_workers() -> usize {
    5
}

const fn default_event_channel_capacity() -> usize {
    256
}

const fn default_raw_channel_capacity() -> usize {
    100
}

const fn default_flush_interval_ms() -> u64 {
    300
}

const fn default_action_timeout_ms() -> u64 {
    5_000
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff_ms() -> u64 {
    500
}

fn default_database_path() -> String {
    "hearth.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            event_channel_capacity: default_event_channel_capacity(),
            pipeline: PipelineConfig::default(),
            actions: ActionConfig::default(),
            discovery_timeout_secs: default_discovery_timeout_secs(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_channel_capacity: default_raw_channel_capacity(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_action_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

const fn default_discovery_timeout_secs() -> u64 {
    30
}
