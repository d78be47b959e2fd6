//! # Gateway Providers
//!
//! Outbound adapters for the RAG inference gateway.
//!
//! This crate talks to the two backends the gateway depends on:
//! - [`HttpClient`]: pooled outbound HTTP with buffered and streaming modes
//! - [`HttpContextRetriever`]: best-effort context retrieval
//! - [`OllamaRelay`]: streamed generation relayed line by line
//! - [`BackendProbe`]: reachability checks for the health endpoint

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod generation;
pub mod http;
pub mod probe;

// Re-export main types
pub use context::{ContextSource, HttpContextRetriever};
pub use generation::{relay_lines, GenerationSource, OllamaRelay, RelayStream};
pub use http::{
    BufferedResponse, HttpClient, HttpError, LineRead, LineStream, StreamingResponse,
    DEFAULT_MAX_LINE_BYTES,
};
pub use probe::{base_url, BackendHealth, BackendProbe};
