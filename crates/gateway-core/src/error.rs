//! Error types for the gateway.

use crate::types::GatewayOutcome;
use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised by the gateway pipeline
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller input was rejected before any outbound call
    #[error("Validation error: {message}")]
    Validation {
        /// Error message
        message: String,
        /// Offending parameter, if known
        field: Option<String>,
    },

    /// The generation service answered with a non-success status
    #[error("Generation service returned HTTP {status}")]
    UpstreamStatus {
        /// Upstream HTTP status code
        status: u16,
    },

    /// A backend could not be reached or did not answer in time
    #[error("Upstream {service} unavailable: {message}")]
    Upstream {
        /// Logical service name ("context", "generation")
        service: &'static str,
        /// Error message
        message: String,
    },

    /// The generation stream broke after bytes were relayed
    #[error("Stream interrupted after {lines_relayed} lines: {message}")]
    MidStream {
        /// Lines already delivered to the caller
        lines_relayed: u64,
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Any other unexpected failure
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl GatewayError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>, field: Option<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field,
        }
    }

    /// Create an upstream availability error
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }

    /// Create a mid-stream error
    pub fn mid_stream(lines_relayed: u64, message: impl Into<String>) -> Self {
        Self::MidStream {
            lines_relayed,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Terminal outcome this error produces
    #[must_use]
    pub fn outcome(&self) -> GatewayOutcome {
        match self {
            Self::Validation { .. } => GatewayOutcome::ValidationFailure,
            Self::UpstreamStatus { status } => {
                GatewayOutcome::UpstreamGenerationFailure { status: *status }
            }
            Self::Upstream { .. }
            | Self::MidStream { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => GatewayOutcome::InternalFailure {
                cause: self.to_string(),
            },
        }
    }
}
