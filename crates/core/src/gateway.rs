//! LLM gateway trait: the abstraction over model backends.
//!
//! The engine depends only on these two operations; transport, retries
//! and vendor-specific mapping belong to the implementation.
//!
//! Implementations: OpenAI-compatible (`agentloop-providers`), scripted
//! mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::ToolDefinition;

/// The core gateway trait.
///
/// Calls may take seconds; the engine aborts them by dropping the future
/// when a run is cancelled.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// A human-readable name for this gateway (e.g., "openai").
    fn name(&self) -> &str;

    /// A free-form turn. The returned message has role `Assistant`, may
    /// carry tool calls, and has `is_final` set from the provider's own
    /// finish signal.
    async fn call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError>;

    /// Constrained decoding against `schema`; returns the raw JSON text.
    async fn call_for_structured_output(
        &self,
        messages: &[Message],
        schema: &serde_json::Value,
    ) -> Result<String, ProviderError>;
}

/// Which backend family a gateway talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            other => Err(ProviderError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Connection settings for a gateway.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4.1".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field(
                "api_key",
                &if self.api_key.is_some() { "[REDACTED]" } else { "None" },
            )
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
