//! Remote-model integration.
//!
//! The agent treats the remote model as an optional pure request/response
//! function: if no credential is configured, the local rules engine answers
//! instead and nothing here is constructed.

pub mod anthropic;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use provider::*;

use std::sync::Arc;

use crate::error::LlmError;

/// Configuration for creating a provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create a provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(AnthropicProvider::new(
        config.api_key.clone(),
        &config.model,
    )))
}

/// Build a provider from the environment, if a credential is present.
///
/// Absence of `ANTHROPIC_API_KEY` is not an error — it selects the local
/// rules engine.
pub fn provider_from_env() -> Option<Arc<dyn LlmProvider>> {
    let api_key = std::env::var("ANTHROPIC_API_KEY").ok()?;
    let model = std::env::var("GUIDE_AGENT_MODEL")
        .unwrap_or_else(|_| "claude-3-5-haiku-latest".to_string());
    let config = LlmConfig {
        api_key: secrecy::SecretString::from(api_key),
        model,
    };
    create_provider(&config).ok()
}
