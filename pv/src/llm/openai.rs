//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for OpenAI's Chat Completions API.
//! Requests are sent once; there is no retry or backoff.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, TokenUsage};
use crate::config::LlmConfig;

/// Generic message used when the remote error body carries none
pub const GENERIC_API_ERROR: &str = "Completion request failed";

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl OpenAIClient {
    /// Create a new client from configuration
    ///
    /// Fails with `MissingApiKey` when the configured environment variable is unset.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config
            .api_key()
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        Self::new(
            api_key,
            &config.base_url,
            &config.model,
            config.max_tokens,
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Create a client with explicit settings
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: model.to_string(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens,
        })
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let model = request.model.as_deref().unwrap_or(&self.model);
        debug!(%model, max_tokens = %request.options.max_tokens, "build_request_body: called");

        let max_tokens = request.options.max_tokens.min(self.max_tokens);

        // GPT-5.x and o1/o3 models use max_completion_tokens instead of max_tokens
        let uses_completion_tokens = model.starts_with("gpt-5") || model.starts_with("o1") || model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.options.temperature,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// Parse the OpenAI API response
    fn parse_response(&self, api_response: OpenAIResponse) -> CompletionResponse {
        debug!(choice_count = %api_response.choices.len(), "parse_response: called");
        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty());

        let usage = api_response.usage.unwrap_or_default();

        CompletionResponse {
            content,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, "complete: called");

        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "complete: network error");
                LlmError::Network(e)
            })?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        if !(200..300).contains(&status) {
            debug!(%status, "complete: API error");
            return Err(LlmError::from_api_body(status, &text, GENERIC_API_ERROR));
        }

        let api_response: OpenAIResponse = serde_json::from_str(&text)?;
        let parsed = self.parse_response(api_response);
        debug!(
            has_content = %parsed.content.is_some(),
            input_tokens = %parsed.usage.input_tokens,
            output_tokens = %parsed.usage.output_tokens,
            "complete: success"
        );
        Ok(parsed)
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionOptions, ContentPart};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new("sk-test", &server.uri(), "gpt-4o", 1000, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_request_body() {
        let client = OpenAIClient::new("k", "https://api.openai.com/", "gpt-4o", 1000, Duration::from_secs(1)).unwrap();
        let req = CompletionRequest::new("You are a historian.", "Tell me about Prague.");
        let body = client.build_request_body(&req);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are a historian.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Tell me about Prague.");
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("max_completion_tokens").is_none());
        assert_eq!(client.base_url, "https://api.openai.com");
    }

    #[test]
    fn test_build_request_body_model_override_and_caps() {
        let client = OpenAIClient::new("k", "https://x", "gpt-4o", 500, Duration::from_secs(1)).unwrap();
        let req = CompletionRequest::new("s", "u").with_model("o3-mini").with_options(CompletionOptions {
            max_tokens: 4000,
            temperature: 0.1,
        });
        let body = client.build_request_body(&req);

        assert_eq!(body["model"], "o3-mini");
        assert_eq!(body["max_completion_tokens"], 500);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_build_request_body_multimodal() {
        let client = OpenAIClient::new("k", "https://x", "gpt-4o", 1000, Duration::from_secs(1)).unwrap();
        let req = CompletionRequest::new("s", "")
            .with_parts(vec![ContentPart::text("Compose"), ContentPart::image_url("data:image/png;base64,AA")]);
        let body = client.build_request_body(&req);

        let content = &body["messages"][1]["content"];
        assert!(content.is_array());
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,AA");
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o", "temperature": 0.7})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "Day 1: Old Town"}},
                    {"message": {"role": "assistant", "content": "ignored"}}
                ],
                "usage": {"prompt_tokens": 12, "completion_tokens": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client_for(&server)
            .complete(CompletionRequest::new("system", "user"))
            .await
            .unwrap();

        assert_eq!(resp.content.as_deref(), Some("Day 1: Old Town"));
        assert_eq!(resp.usage.input_tokens, 12);
        assert_eq!(resp.usage.output_tokens, 5);
    }

    #[tokio::test]
    async fn test_complete_empty_choices_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let resp = client_for(&server)
            .complete(CompletionRequest::new("system", "user"))
            .await
            .unwrap();
        assert!(resp.content.is_none());
    }

    #[tokio::test]
    async fn test_complete_relays_remote_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached", "type": "requests"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new("system", "user"))
            .await
            .unwrap_err();

        match err {
            LlmError::ApiError { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("Expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_malformed_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new("system", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Json(_)));
    }
}
