//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `DEEPSEARCH_*` environment variables (nested keys use `__`, for example
//! `DEEPSEARCH_AGENT__BASE_URL`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [models]
//! query_generator_model = "gemini-2.5-flash-preview-05-20"
//! reflection_model = "gemini-2.5-flash-preview-05-20"
//! answer_model = "gemini-2.5-pro-preview-05-06"
//!
//! [agent]
//! base_url = "http://127.0.0.1:2024"
//! assistant_id = "agent"
//! request_timeout_secs = 900
//! spawn_server = false
//! spawn_command = ["uv", "run", "langgraph", "dev", "--no-browser"]
//! startup_delay_secs = 3
//!
//! [invocation]
//! timeout_secs = 600
//! max_concurrent_runs = 8
//!
//! [http]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{RunConfiguration, FLASH_MODEL, PRO_MODEL};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "DEEPSEARCH";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "deepsearch.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Models handed to the agent for each phase
    #[serde(default)]
    pub models: ModelConfig,

    /// Where and how to reach the research agent
    #[serde(default)]
    pub agent: AgentConfig,

    /// Worker execution limits
    #[serde(default)]
    pub invocation: InvocationConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Per-phase model identifiers
///
/// Defaults honour the bare `QUERY_GENERATOR_MODEL`, `REFLECTION_MODEL`
/// and `ANSWER_MODEL` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_query_generator_model")]
    pub query_generator_model: String,

    #[serde(default = "default_reflection_model")]
    pub reflection_model: String,

    #[serde(default = "default_answer_model")]
    pub answer_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            query_generator_model: default_query_generator_model(),
            reflection_model: default_reflection_model(),
            answer_model: default_answer_model(),
        }
    }
}

impl ModelConfig {
    /// The run configuration passed to every agent invocation
    pub fn run_configuration(&self) -> RunConfiguration {
        RunConfiguration {
            query_generator_model: self.query_generator_model.clone(),
            reflection_model: self.reflection_model.clone(),
            answer_model: self.answer_model.clone(),
        }
    }
}

fn env_or(var: &str, fallback: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn default_query_generator_model() -> String {
    env_or("QUERY_GENERATOR_MODEL", FLASH_MODEL)
}

fn default_reflection_model() -> String {
    env_or("REFLECTION_MODEL", FLASH_MODEL)
}

fn default_answer_model() -> String {
    env_or("ANSWER_MODEL", PRO_MODEL)
}

/// Research agent connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the LangGraph API server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Graph / assistant to run
    #[serde(default = "default_assistant_id")]
    pub assistant_id: String,

    /// HTTP timeout for a single run request (none by default)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Start a local LangGraph dev server before serving
    #[serde(default)]
    pub spawn_server: bool,

    /// Command used to start the LangGraph dev server
    #[serde(default = "default_spawn_command")]
    pub spawn_command: Vec<String>,

    /// Seconds to wait for the spawned server to come up
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            assistant_id: default_assistant_id(),
            request_timeout_secs: None,
            spawn_server: false,
            spawn_command: default_spawn_command(),
            startup_delay_secs: default_startup_delay(),
        }
    }
}

impl AgentConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:2024".to_string()
}

fn default_assistant_id() -> String {
    "agent".to_string()
}

fn default_spawn_command() -> Vec<String> {
    ["uv", "run", "langgraph", "dev", "--no-browser"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_startup_delay() -> u64 {
    3
}

/// Limits for agent runs dispatched to the worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationConfig {
    /// Wall-clock limit for one agent run, in seconds
    #[serde(default = "default_invocation_timeout")]
    pub timeout_secs: u64,

    /// Maximum agent runs executing at once
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_invocation_timeout(),
            max_concurrent_runs: default_max_concurrent_runs(),
        }
    }
}

impl InvocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_invocation_timeout() -> u64 {
    600
}

fn default_max_concurrent_runs() -> usize {
    8
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl HttpConfig {
    /// `host:port` bind address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(" ")
                .with_list_parse_key("agent.spawn_command"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Find a config file in the default locations
///
/// Checks `./deepsearch.toml`, then `<config dir>/gemini-deepsearch-mcp/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent.base_url, "http://127.0.0.1:2024");
        assert_eq!(config.agent.assistant_id, "agent");
        assert!(!config.agent.spawn_server);
        assert_eq!(config.agent.spawn_command[0], "uv");
        assert_eq!(config.invocation.timeout_secs, 600);
        assert_eq!(config.invocation.max_concurrent_runs, 8);
        assert_eq!(config.http.addr(), "127.0.0.1:8000");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deepsearch.toml");

        let toml_content = r#"
[models]
query_generator_model = "gen-model"
reflection_model = "reflect-model"
answer_model = "answer-model"

[agent]
base_url = "http://agent.internal:8123"
request_timeout_secs = 120
spawn_server = true
spawn_command = ["langgraph", "dev"]

[invocation]
timeout_secs = 30
max_concurrent_runs = 2

[http]
host = "0.0.0.0"
port = 9000

[logging]
level = "debug"
format = "json"
"#;
        std::fs::write(&path, toml_content).unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(
            config.models.run_configuration(),
            RunConfiguration {
                query_generator_model: "gen-model".to_string(),
                reflection_model: "reflect-model".to_string(),
                answer_model: "answer-model".to_string(),
            }
        );
        assert_eq!(config.agent.base_url, "http://agent.internal:8123");
        assert_eq!(config.agent.request_timeout(), Some(Duration::from_secs(120)));
        assert!(config.agent.spawn_server);
        assert_eq!(config.agent.spawn_command, vec!["langgraph", "dev"]);
        assert_eq!(config.agent.assistant_id, "agent");
        assert_eq!(config.invocation.timeout(), Duration::from_secs(30));
        assert_eq!(config.invocation.max_concurrent_runs, 2);
        assert_eq!(config.http.addr(), "0.0.0.0:9000");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[http]\nport = 8123\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.http.port, 8123);
        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.invocation, InvocationConfig::default());
    }

    #[test]
    fn test_config_file_nonexistent() {
        let path = PathBuf::from("/nonexistent/deepsearch.toml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_to_toml_round_trips_through_loader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("written.toml");

        let mut config = Config::default();
        config.http.port = 7777;
        config.agent.request_timeout_secs = Some(45);
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.http.port, 7777);
        assert_eq!(loaded.agent.request_timeout_secs, Some(45));
    }
}
