//! API error responses.
//!
//! Every failure the caller can observe maps to one variant with a fixed
//! status and a fixed `{"error": "..."}` body. Internal detail is logged, not
//! returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::GatewayError;
use serde_json::json;
use tracing::error;

/// Body for rejected prompts
pub const VALIDATION_MESSAGE: &str = "Prompt parameter is required";
/// Body for a failed generation call
pub const UPSTREAM_MESSAGE: &str = "Ollama API failed";
/// Body for any other failure
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";
/// Body when the engine is switched off
pub const DISABLED_MESSAGE: &str = "Intelligence engine is disabled";

/// Caller-visible errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or blank prompt (400)
    Validation,
    /// Generation service answered with a non-200 status (502)
    UpstreamGeneration {
        /// Upstream status, for logs
        status: u16,
    },
    /// Unexpected failure before streaming (500)
    Internal {
        /// Cause, for logs
        cause: String,
    },
    /// Engine switched off (403)
    Disabled,
}

impl ApiError {
    /// Create an internal error
    pub fn internal(cause: impl Into<String>) -> Self {
        Self::Internal {
            cause: cause.into(),
        }
    }

    /// HTTP status code
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::UpstreamGeneration { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Disabled => StatusCode::FORBIDDEN,
        }
    }

    /// Fixed message placed in the response body
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Validation => VALIDATION_MESSAGE,
            Self::UpstreamGeneration { .. } => UPSTREAM_MESSAGE,
            Self::Internal { .. } => INTERNAL_MESSAGE,
            Self::Disabled => DISABLED_MESSAGE,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpstreamGeneration { status } => {
                write!(f, "{} (upstream status {status})", self.message())
            }
            Self::Internal { cause } => write!(f, "{}: {cause}", self.message()),
            Self::Validation | Self::Disabled => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation { .. } => Self::Validation,
            GatewayError::UpstreamStatus { status } => Self::UpstreamGeneration { status },
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal { cause } = &self {
            error!(cause = %cause, "Request failed");
        }
        let body = Json(json!({ "error": self.message() }));
        (self.status_code(), body).into_response()
    }
}
