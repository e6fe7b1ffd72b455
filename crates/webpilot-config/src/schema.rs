//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub recovery: RecoveryConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub driver: DriverConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Execution engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whole-run deadline.
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u64,

    /// Driver timeout for nodes without their own `timeout`.
    #[serde(default = "default_node_timeout")]
    pub default_node_timeout_ms: u64,

    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: u64,

    /// Capacity of the live event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Events kept for polling clients.
    #[serde(default = "default_event_history")]
    pub event_history: usize,

    /// Executions whose DOM snapshots are kept.
    #[serde(default = "default_snapshot_retention")]
    pub snapshot_retention: usize,

    #[serde(default = "default_trace_log_limit")]
    pub trace_log_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: default_max_duration(),
            default_node_timeout_ms: default_node_timeout(),
            max_loop_iterations: default_max_loop_iterations(),
            event_buffer: default_event_buffer(),
            event_history: default_event_history(),
            snapshot_retention: default_snapshot_retention(),
            trace_log_limit: default_trace_log_limit(),
        }
    }
}

impl EngineConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    pub fn default_node_timeout(&self) -> Duration {
        Duration::from_millis(self.default_node_timeout_ms)
    }
}

fn default_max_duration() -> u64 {
    600
}

fn default_node_timeout() -> u64 {
    30_000
}

fn default_max_loop_iterations() -> u64 {
    1000
}

fn default_event_buffer() -> usize {
    256
}

fn default_event_history() -> usize {
    512
}

fn default_snapshot_retention() -> usize {
    16
}

fn default_trace_log_limit() -> usize {
    2000
}

/// Recovery pipeline switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Minimum timeout written to nodes touched by a fix.
    #[serde(default = "default_timeout_floor")]
    pub timeout_floor_ms: u64,

    #[serde(default = "default_true")]
    pub dom_enabled: bool,

    #[serde(default = "default_true")]
    pub llm_enabled: bool,

    #[serde(default = "default_true")]
    pub rules_enabled: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            timeout_floor_ms: default_timeout_floor(),
            dom_enabled: true,
            llm_enabled: true,
            rules_enabled: true,
        }
    }
}

fn default_timeout_floor() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

/// LLM provider used by the LLM-assisted fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            base_url: None,
            model: default_model(),
        }
    }
}

impl LlmConfig {
    /// API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Automation driver selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_driver_kind")]
    pub kind: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: default_driver_kind(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Driver kinds the binary knows how to build.
pub const DRIVER_KINDS: &[&str] = &["http"];

fn default_driver_kind() -> String {
    "http".to_string()
}

fn default_user_agent() -> String {
    "webpilot/0.1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory. Defaults to `~/.webpilot/logs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Effective log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".webpilot")
                .join("logs")
        })
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
