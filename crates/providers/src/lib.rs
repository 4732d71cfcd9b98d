//! LLM gateway implementations for AgentLoop.
//!
//! All gateways implement the `agentloop_core::LlmGateway` trait.
//! [`create_gateway`] picks the implementation from configuration.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatGateway;

use agentloop_core::error::ProviderError;
use agentloop_core::gateway::{LlmConfig, LlmGateway, LlmProvider};
use std::sync::Arc;

/// Build the gateway selected by `config.provider`.
pub fn create_gateway(config: &LlmConfig) -> Result<Arc<dyn LlmGateway>, ProviderError> {
    match config.provider {
        LlmProvider::OpenAi => Ok(Arc::new(OpenAiCompatGateway::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_openai_gateway() {
        let config = LlmConfig {
            api_key: Some("sk-test".into()),
            ..LlmConfig::default()
        };
        let gateway = create_gateway(&config).unwrap();
        assert_eq!(gateway.name(), "openai");
    }

    #[test]
    fn requires_api_key() {
        assert!(matches!(
            create_gateway(&LlmConfig::default()),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
