//! # Gateway Telemetry
//!
//! Observability for the RAG inference gateway.
//!
//! This crate provides:
//! - Structured logging through `tracing-subscriber`
//! - Prometheus metrics for request outcomes, stage latency and relayed lines

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

// Re-export main types
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use metrics::{Metrics, MetricsConfig, MetricsError, Stage};
