//! API error type and its HTTP mapping
//!
//! Every handler failure ends up here and leaves as `{"error": message}`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::images::ImageError;
use crate::llm::{GENERIC_API_ERROR, LlmError};
use crate::prompts::PromptError;
use crate::stages::StageError;

/// Message used when the remote could not be reached at all
pub const TRANSPORT_FAILURE: &str = "Failed to process request";

/// Message used when no API credential is configured
pub const MISSING_API_KEY: &str = "OpenAI API key is not configured";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    Validation(String),

    /// The remote service failed; its status is relayed when there is one (else 500)
    #[error("{message}")]
    Remote { status: Option<u16>, message: String },

    /// A pipeline stage failed (502)
    #[error("{0}")]
    Upstream(String),

    /// Missing credential or other setup problem (500)
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Remote { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Configuration(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Replace the client's generic remote message with an endpoint-specific one
    pub fn or_generic(self, generic: &str) -> Self {
        match self {
            ApiError::Remote { status, message } if message == GENERIC_API_ERROR => ApiError::Remote {
                status,
                message: generic.to_string(),
            },
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "Request failed");
        } else {
            warn!(%status, error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ApiError { status, message } => ApiError::Remote {
                status: Some(status),
                message,
            },
            LlmError::MissingApiKey(_) => ApiError::Configuration(MISSING_API_KEY.to_string()),
            LlmError::InvalidRequest(message) => ApiError::Internal(message),
            LlmError::Network(e) => {
                warn!(error = %e, "Completion transport failure");
                ApiError::Remote {
                    status: None,
                    message: TRANSPORT_FAILURE.to_string(),
                }
            }
            other => {
                warn!(error = %other, "Malformed completion response");
                ApiError::Remote {
                    status: None,
                    message: TRANSPORT_FAILURE.to_string(),
                }
            }
        }
    }
}

impl From<StageError> for ApiError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::Completion { source, .. } => source.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PromptError> for ApiError {
    fn from(err: PromptError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InvalidImage(message) => ApiError::Validation(message),
            ImageError::MissingApiKey(_) => ApiError::Configuration(MISSING_API_KEY.to_string()),
            ImageError::ApiError { status, message } => {
                warn!(%status, %message, "Image API failure");
                ApiError::Remote { status: None, message }
            }
            ImageError::Network(e) => {
                warn!(error = %e, "Image transport failure");
                ApiError::Remote {
                    status: None,
                    message: TRANSPORT_FAILURE.to_string(),
                }
            }
            ImageError::InvalidResponse(message) => ApiError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::Configuration("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let relayed = ApiError::Remote {
            status: Some(429),
            message: "slow down".into(),
        };
        assert_eq!(relayed.status(), StatusCode::TOO_MANY_REQUESTS);
        let unrelayed = ApiError::Remote {
            status: None,
            message: "x".into(),
        };
        assert_eq!(unrelayed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bogus = ApiError::Remote {
            status: Some(200),
            message: "x".into(),
        };
        assert_eq!(bogus.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: ApiError = LlmError::ApiError {
            status: 401,
            message: "Incorrect API key provided".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Incorrect API key provided");

        let err: ApiError = LlmError::InvalidResponse("garbage".into()).into();
        assert_eq!(err.to_string(), TRANSPORT_FAILURE);

        let err: ApiError = LlmError::MissingApiKey("OPENAI_API_KEY".into()).into();
        assert_eq!(err.to_string(), MISSING_API_KEY);
    }

    #[test]
    fn test_or_generic_only_replaces_generic_message() {
        let generic: ApiError = LlmError::from_api_body(500, "not json", GENERIC_API_ERROR).into();
        let err = generic.or_generic("Error retrieving historical information");
        assert_eq!(err.to_string(), "Error retrieving historical information");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let specific: ApiError = LlmError::from_api_body(400, r#"{"error":{"message":"bad model"}}"#, GENERIC_API_ERROR).into();
        assert_eq!(specific.or_generic("other").to_string(), "bad model");
    }

    #[test]
    fn test_image_error_conversion() {
        let err: ApiError = ImageError::ApiError {
            status: 400,
            message: "Invalid image file".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Invalid image file");

        let err: ApiError = ImageError::InvalidImage("unsupported type image/gif".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = ImageError::InvalidResponse("No image was generated".into()).into();
        assert_eq!(err.to_string(), "No image was generated");

        let err: ApiError = ImageError::MissingApiKey("OPENAI_API_KEY".into()).into();
        assert_eq!(err.to_string(), MISSING_API_KEY);
    }
}
