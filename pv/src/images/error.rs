//! Image client error types

use thiserror::Error;

/// Errors raised by image generation and editing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("API key not configured (set {0})")]
    MissingApiKey(String),
}

impl ImageError {
    /// Build an API error from a non-success response body
    pub fn from_api_body(status: u16, body: &str, generic: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| generic.to_string());
        ImageError::ApiError { status, message }
    }
}
