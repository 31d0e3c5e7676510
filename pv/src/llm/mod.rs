//! LLM client module for PrahaVerse
//!
//! Provides chat-completion requests and the `CompletionClient` wrapper the
//! pipeline stages and request handlers use.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod completion;
mod error;
mod openai;
mod types;

#[cfg(test)]
pub use client::mock;
pub use client::LlmClient;
pub use completion::CompletionClient;
pub use error::LlmError;
pub use openai::{GENERIC_API_ERROR, OpenAIClient};
pub use types::{
    CompletionOptions, CompletionRequest, CompletionResponse, ContentPart, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
    ImageUrl, MessageContent, TokenUsage,
};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Only "openai" is supported.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::InvalidRequest(format!(
                "Unknown LLM provider: '{}'. Supported: openai",
                other
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "acme".to_string(),
            ..Default::default()
        };
        let err = create_client(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }

    #[test]
    #[serial]
    fn test_create_client_missing_key() {
        let config = LlmConfig {
            api_key_env: "PV_TEST_CREATE_CLIENT_KEY".to_string(),
            ..Default::default()
        };
        unsafe { std::env::remove_var("PV_TEST_CREATE_CLIENT_KEY") };
        let err = create_client(&config).err().unwrap();
        assert!(matches!(err, LlmError::MissingApiKey(ref env) if env == "PV_TEST_CREATE_CLIENT_KEY"));
    }
}
