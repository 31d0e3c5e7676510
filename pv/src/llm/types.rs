//! Chat-completion request/response types
//!
//! These model the OpenAI Chat Completions API: one system message and one
//! user message per request. Every stage call is independent.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default response budget for every stage
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default sampling temperature for every stage
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Sampling options for one completion call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model override; the client's configured model is used when None
    pub model: Option<String>,

    /// System prompt (rendered from a prompt template)
    pub system_prompt: String,

    /// The single user message
    pub user: MessageContent,

    pub options: CompletionOptions,
}

impl CompletionRequest {
    /// Create a text-only request with default options
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            system_prompt: system_prompt.into(),
            user: MessageContent::Text(user_prompt.into()),
            options: CompletionOptions::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the user message with structured content parts
    pub fn with_parts(mut self, parts: Vec<ContentPart>) -> Self {
        debug!(part_count = %parts.len(), "CompletionRequest::with_parts: called");
        self.user = MessageContent::Parts(parts);
        self
    }
}

/// User message content - either plain text or multimodal parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Get text content if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(_) => None,
        }
    }
}

/// One part of a multimodal user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// An image part; `url` may be an https URL or a data URL
    pub fn image_url(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Text of the first choice, if the remote returned any
    pub content: Option<String>,

    /// Token usage reported by the remote
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// A response carrying the given text
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            usage: TokenUsage::default(),
        }
    }

    /// A successful response with no content
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Token usage for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = CompletionRequest::new("system", "user");
        assert_eq!(req.model, None);
        assert_eq!(req.user.as_text(), Some("user"));
        assert_eq!(req.options.max_tokens, 1000);
        assert!((req.options.temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_with_model_and_parts() {
        let req = CompletionRequest::new("system", "ignored")
            .with_model("gpt-4")
            .with_parts(vec![ContentPart::text("hi"), ContentPart::image_url("data:image/png;base64,AAAA")]);
        assert_eq!(req.model.as_deref(), Some("gpt-4"));
        assert!(req.user.as_text().is_none());
    }

    #[test]
    fn test_content_part_serializes_openai_shape() {
        let parts = vec![ContentPart::text("Describe"), ContentPart::image_url("https://img/a.png")];
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json[0]["type"], "text");
        assert_eq!(json[0]["text"], "Describe");
        assert_eq!(json[1]["type"], "image_url");
        assert_eq!(json[1]["image_url"]["url"], "https://img/a.png");
    }

    #[test]
    fn test_message_content_untagged() {
        let text = serde_json::to_value(MessageContent::Text("plain".to_string())).unwrap();
        assert_eq!(text, serde_json::json!("plain"));
    }
}
