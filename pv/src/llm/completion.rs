//! CompletionClient - the text completion capability every stage uses
//!
//! Wraps an `LlmClient` with the soft-failure policy: a successful response
//! without content becomes a caller-chosen fallback string instead of an error.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{CompletionOptions, CompletionRequest, ContentPart, LlmClient, LlmError};

/// Text completion over a shared `LlmClient`
#[derive(Clone)]
pub struct CompletionClient {
    llm: Arc<dyn LlmClient>,
}

impl CompletionClient {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Complete a system/user prompt pair
    ///
    /// Returns `fallback` when the remote answers successfully but with no content.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
        model: Option<&str>,
        fallback: &str,
    ) -> Result<String, LlmError> {
        debug!(
            system_len = system_prompt.len(),
            user_len = user_prompt.len(),
            ?model,
            "CompletionClient::complete: called"
        );
        let mut request = CompletionRequest::new(system_prompt, user_prompt).with_options(options);
        if let Some(model) = model {
            request = request.with_model(model);
        }
        self.send(request, fallback).await
    }

    /// Complete a system prompt with a multimodal user message
    pub async fn complete_parts(
        &self,
        system_prompt: &str,
        parts: Vec<ContentPart>,
        options: CompletionOptions,
        fallback: &str,
    ) -> Result<String, LlmError> {
        debug!(part_count = parts.len(), "CompletionClient::complete_parts: called");
        let request = CompletionRequest::new(system_prompt, String::new())
            .with_parts(parts)
            .with_options(options);
        self.send(request, fallback).await
    }

    async fn send(&self, request: CompletionRequest, fallback: &str) -> Result<String, LlmError> {
        if request.system_prompt.trim().is_empty() {
            return Err(LlmError::InvalidRequest("system prompt must not be empty".to_string()));
        }

        let response = self.llm.complete(request).await?;
        match response.content {
            Some(text) if !text.is_empty() => Ok(text),
            _ => {
                warn!(%fallback, "CompletionClient::send: remote returned no content, using fallback");
                Ok(fallback.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{MockLlmClient, MockReply};

    #[tokio::test]
    async fn test_complete_returns_text() {
        let mock = Arc::new(MockLlmClient::texts(&["Charles Bridge"]));
        let client = CompletionClient::new(mock.clone());

        let text = client
            .complete("sys", "user", CompletionOptions::default(), None, "No history generated.")
            .await
            .unwrap();
        assert_eq!(text, "Charles Bridge");

        let req = &mock.requests()[0];
        assert_eq!(req.system_prompt, "sys");
        assert_eq!(req.user.as_text(), Some("user"));
        assert_eq!(req.model, None);
    }

    #[tokio::test]
    async fn test_complete_empty_content_uses_fallback() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::Empty, MockReply::text("")]));
        let client = CompletionClient::new(mock);

        for _ in 0..2 {
            let text = client
                .complete("sys", "user", CompletionOptions::default(), None, "No itinerary generated.")
                .await
                .unwrap();
            assert_eq!(text, "No itinerary generated.");
        }
    }

    #[tokio::test]
    async fn test_complete_propagates_remote_error() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        }]));
        let client = CompletionClient::new(mock);

        let err = client
            .complete("sys", "user", CompletionOptions::default(), Some("gpt-4"), "fallback")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_empty_system_prompt_never_reaches_remote() {
        let mock = Arc::new(MockLlmClient::texts(&["unused"]));
        let client = CompletionClient::new(mock.clone());

        let err = client
            .complete("", "user", CompletionOptions::default(), None, "fallback")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_parts_sends_parts() {
        let mock = Arc::new(MockLlmClient::texts(&["prompt"]));
        let client = CompletionClient::new(mock.clone());

        let text = client
            .complete_parts(
                "director",
                vec![ContentPart::text("compose"), ContentPart::image_url("data:image/png;base64,AA")],
                CompletionOptions::default(),
                "No prompt generated.",
            )
            .await
            .unwrap();
        assert_eq!(text, "prompt");
        assert!(mock.requests()[0].user.as_text().is_none());
    }
}
