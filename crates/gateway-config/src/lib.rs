//! # Gateway Config
//!
//! Configuration management for the RAG inference gateway.
//!
//! Configuration is resolved once at startup, in this order:
//! 1. Built-in defaults
//! 2. An optional YAML, TOML or JSON file
//! 3. Environment variable overrides
//!
//! The result is validated before the gateway starts and is never reloaded
//! while requests are in flight.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

// Re-export main types
pub use config::{
    ContextConfig, GatewayConfig, GatewaySwitch, GenerationConfig, HealthConfig, HttpConfig,
    LoggingSettings, NotifierConfig, ServerConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{
    apply_overrides, config_path, load_config, load_config_from_file, CONFIG_PATH_ENV,
};
