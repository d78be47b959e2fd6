//! Per-request domain types.
//!
//! Every value here lives for a single request. Nothing is shared across
//! requests except configuration and the pooled HTTP client, which live in
//! other crates.

use crate::error::GatewayError;
use serde::Serialize;
use std::fmt;

/// A caller-supplied prompt, guaranteed non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Validate and trim raw caller input.
    ///
    /// # Errors
    /// Returns [`GatewayError::Validation`] when the input is missing or
    /// contains only whitespace.
    pub fn parse(raw: Option<&str>) -> Result<Self, GatewayError> {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return Err(GatewayError::validation(
                "Prompt parameter is required",
                Some("prompt".to_string()),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the query text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the query in characters
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of the best-effort context retrieval stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextResult {
    /// Retrieved, non-empty context text
    Present(String),
    /// No usable context (service unavailable, malformed, or empty)
    Absent,
}

impl ContextResult {
    /// Build a result from an optional field, collapsing empty text to `Absent`.
    #[must_use]
    pub fn from_field(field: Option<String>) -> Self {
        match field {
            Some(text) if !text.is_empty() => Self::Present(text),
            _ => Self::Absent,
        }
    }

    /// Whether context was retrieved
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Borrow the context text, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Present(text) => Some(text),
            Self::Absent => None,
        }
    }

    /// Label used for logs and metrics
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Present(_) => "present",
            Self::Absent => "absent",
        }
    }
}

/// The final prompt text sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentedPrompt {
    text: String,
    augmented: bool,
}

impl AugmentedPrompt {
    pub(crate) fn augmented(text: String) -> Self {
        Self {
            text,
            augmented: true,
        }
    }

    pub(crate) fn plain(query: &Query) -> Self {
        Self {
            text: query.as_str().to_string(),
            augmented: false,
        }
    }

    /// Borrow the prompt text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether retrieved context was embedded into the prompt
    #[must_use]
    pub fn is_augmented(&self) -> bool {
        self.augmented
    }

    /// Consume into the prompt text
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

/// Terminal result of one gateway request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GatewayOutcome {
    /// The upstream stream was relayed to completion
    StreamedSuccess,
    /// The generation service answered with a non-200 status before streaming
    UpstreamGenerationFailure {
        /// Upstream HTTP status code
        status: u16,
    },
    /// The caller input was rejected
    ValidationFailure,
    /// Any other failure
    InternalFailure {
        /// Human-readable cause, for logs only
        cause: String,
    },
}

impl GatewayOutcome {
    /// Label used for logs and metrics
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::StreamedSuccess => "success",
            Self::UpstreamGenerationFailure { .. } => "upstream_generation_failure",
            Self::ValidationFailure => "validation_failure",
            Self::InternalFailure { .. } => "internal_failure",
        }
    }
}
