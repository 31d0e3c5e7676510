//! LLM error types

use thiserror::Error;

/// Errors that can occur during completion calls
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API key not configured (set {0})")]
    MissingApiKey(String),
}

impl LlmError {
    /// Build an API error from a non-success response body
    ///
    /// Uses the provider's `{"error": {"message": ..}}` text when present,
    /// otherwise the given generic message.
    pub fn from_api_body(status: u16, body: &str, generic: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| generic.to_string());
        LlmError::ApiError { status, message }
    }

    /// Remote HTTP status, if the remote answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error came from the remote service rather than local setup
    pub fn is_remote(&self) -> bool {
        !matches!(self, LlmError::MissingApiKey(_) | LlmError::InvalidRequest(_))
    }
}
