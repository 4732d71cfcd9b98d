//! Configuration loading, validation, and management for AgentLoop.
//!
//! Loads configuration from `~/.agentloop/config.toml` (or the file named by
//! `AGENTLOOP_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use agentloop_core::gateway::LlmConfig;
use agentloop_core::registry::DEFAULT_TOOL_LIMIT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "AGENTLOOP_CONFIG";

/// The root configuration structure.
///
/// Maps directly to `~/.agentloop/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway connection settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Engine defaults applied to every agent
    #[serde(default)]
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Ceiling for tools without an explicit limit
    #[serde(default = "default_tool_limit")]
    pub default_tool_limit: u32,

    /// Model turns allowed before a run is abandoned
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Per-tool ceilings, by tool name
    #[serde(default)]
    pub tool_limits: BTreeMap<String, u32>,
}

fn default_tool_limit() -> u32 {
    DEFAULT_TOOL_LIMIT
}
fn default_max_turns() -> u32 {
    25
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            default_tool_limit: default_tool_limit(),
            max_turns: default_max_turns(),
            tool_limits: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.agentloop/config.toml),
    /// or from `$AGENTLOOP_CONFIG` when set.
    ///
    /// Environment overrides:
    /// - `AGENTLOOP_API_KEY`, then `OPENAI_API_KEY` (only when the file has no key)
    /// - `OPENAI_MODEL`, `OPENAI_BASE_URL`, `OPENAI_MAX_TOKENS`,
    ///   `OPENAI_TEMPERATURE`, `OPENAI_TIMEOUT_SECONDS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_path());
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.llm.api_key.is_none() {
            self.llm.api_key = var("AGENTLOOP_API_KEY").or_else(|| var("OPENAI_API_KEY"));
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(value) = var("OPENAI_MAX_TOKENS") {
            self.llm.max_tokens = Some(parse_env("OPENAI_MAX_TOKENS", &value)?);
        }
        if let Some(value) = var("OPENAI_TEMPERATURE") {
            self.llm.temperature = parse_env("OPENAI_TEMPERATURE", &value)?;
        }
        if let Some(value) = var("OPENAI_TIMEOUT_SECONDS") {
            self.llm.timeout_secs = parse_env("OPENAI_TIMEOUT_SECONDS", &value)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentloop")
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("llm.model cannot be empty".into()));
        }
        if !(self.llm.base_url.starts_with("http://") || self.llm.base_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "llm.base_url must be an http(s) URL, got '{}'",
                self.llm.base_url
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "llm.timeout_secs must be > 0".into(),
            ));
        }
        if self.llm.max_tokens == Some(0) {
            return Err(ConfigError::ValidationError(
                "llm.max_tokens must be > 0".into(),
            ));
        }
        if self.agent.default_tool_limit == 0 {
            return Err(ConfigError::ValidationError(
                "agent.default_tool_limit must be > 0".into(),
            ));
        }
        if self.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be > 0".into(),
            ));
        }
        if let Some((tool, _)) = self.agent.tool_limits.iter().find(|(_, limit)| **limit == 0) {
            return Err(ConfigError::ValidationError(format!(
                "agent.tool_limits.{tool} must be > 0"
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        ConfigError::ValidationError(format!("{name} has invalid value '{value}': {e}"))
    })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
