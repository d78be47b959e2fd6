//! # Gateway Core
//!
//! Core types, prompt assembly, and error handling for the RAG inference gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Validated request input ([`Query`])
//! - Retrieval and generation stage results ([`ContextResult`], [`AugmentedPrompt`])
//! - Terminal request outcomes ([`GatewayOutcome`])
//! - Error types and handling ([`GatewayError`])

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod prompt;
pub mod types;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult};
pub use prompt::{PromptAssembler, DEFAULT_PERSONA};
pub use types::{AugmentedPrompt, ContextResult, GatewayOutcome, Query};
