//! Configuration
//!
//! Typed view of `config/config.yaml` plus the secrets read from the environment.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const DEFAULT_ACTIVE_JQL: &str =
    "assignee=currentUser() AND statusCategory != Done ORDER BY created DESC";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_in_progress_status")]
    pub in_progress_status: String,
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            in_progress_status: default_in_progress_status(),
            sample_rows: default_sample_rows(),
            llm: LlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            base_url: default_llm_base_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_jql")]
    pub jql: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            jql: default_jql(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_in_progress_status() -> String {
    "In Progress".to_string()
}

fn default_sample_rows() -> usize {
    10
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_jql() -> String {
    DEFAULT_ACTIVE_JQL.to_string()
}

fn default_batch_size() -> u32 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<String> {
    Some("data_analyzer.log".to_string())
}

impl Config {
    /// Reads and validates the YAML file. `DATABASE_URL` in the environment
    /// takes precedence over `database.url`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut config = Self::from_yaml(&raw)?;
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                config.database.url = url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses YAML text without consulting the environment or validating.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| AgentError::Config(format!("Invalid configuration: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        let llm = &self.agent.llm;
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(AgentError::Config(format!(
                "agent.llm.temperature must be between 0.0 and 2.0, got {}",
                llm.temperature
            )));
        }
        if llm.max_tokens == 0 {
            return Err(AgentError::Config(
                "agent.llm.max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.agent.sample_rows == 0 {
            return Err(AgentError::Config(
                "agent.sample_rows must be greater than 0".to_string(),
            ));
        }
        if !(1..=100).contains(&self.tracker.batch_size) {
            return Err(AgentError::Config(format!(
                "tracker.batch_size must be between 1 and 100, got {}",
                self.tracker.batch_size
            )));
        }
        if self.database.url.trim().is_empty() {
            return Err(AgentError::Config(
                "database.url is empty and DATABASE_URL is not set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Credentials that never live in the YAML file.
#[derive(Clone)]
pub struct Secrets {
    pub openai_api_key: String,
    pub jira_base_url: String,
    pub jira_user_email: String,
    pub jira_api_token: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("jira_base_url", &self.jira_base_url)
            .field("jira_user_email", &self.jira_user_email)
            .finish_non_exhaustive()
    }
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openai_api_key: required_env("OPENAI_API_KEY")?,
            jira_base_url: required_env("JIRA_BASE_URL")?,
            jira_user_email: required_env("JIRA_USER_EMAIL")?,
            jira_api_token: required_env("JIRA_API_TOKEN")?,
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(AgentError::Config(format!(
            "Missing required environment variable {}",
            name
        ))),
    }
}
