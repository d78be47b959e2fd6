//! # Gateway Server
//!
//! HTTP surface of the retrieval-augmented inference gateway.
//!
//! This crate provides:
//! - The generate route, which validates the prompt, retrieves context,
//!   assembles the augmented prompt and relays the NDJSON generation stream
//! - A backend health probe on the same route
//! - Prometheus metrics
//! - Request id propagation and the engine on/off gate
//! - Graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod orchestrator;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

// Re-export main types
pub use error::ApiError;
pub use orchestrator::Orchestrator;
pub use routes::create_router;
pub use server::{Server, ServerConfig};
pub use shutdown::shutdown_signal;
pub use state::{AppState, AppStateBuilder};
