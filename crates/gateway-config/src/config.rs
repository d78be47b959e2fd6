//! Configuration types.

use crate::error::{ConfigError, ConfigResult};
use gateway_core::DEFAULT_PERSONA;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Root gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound HTTP server settings
    #[validate(nested)]
    pub server: ServerConfig,

    /// Generation (Ollama) service settings
    #[validate(nested)]
    pub generation: GenerationConfig,

    /// Context retrieval service settings
    #[validate(nested)]
    pub context: ContextConfig,

    /// Shared outbound HTTP client settings
    pub http: HttpConfig,

    /// Backend reachability probe settings
    pub health: HealthConfig,

    /// Engine on/off switch
    pub gateway: GatewaySwitch,

    /// Change notifier settings
    #[validate(nested)]
    pub notifier: NotifierConfig,

    /// Logging settings
    pub logging: LoggingSettings,
}

impl GatewayConfig {
    /// Run field validation plus the cross-field rules.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] describing the first violated rule.
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        check_http_url("generation.url", &self.generation.url)?;
        check_http_url("context.url", &self.context.url)?;
        if self.notifier.enabled {
            check_http_url("notifier.endpoint", &self.notifier.endpoint)?;
        }

        if !self.server.route_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "server.route_path must start with '/', got {}",
                self.server.route_path
            )));
        }

        for (name, timeout) in [
            ("http.connect_timeout", self.http.connect_timeout),
            ("context.timeout", self.context.timeout),
            ("generation.timeout", self.generation.timeout),
            ("health.timeout", self.health.timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::Validation(format!("{name} must be non-zero")));
            }
        }

        if self.http.max_line_bytes == 0 {
            return Err(ConfigError::Validation(
                "http.max_line_bytes must be non-zero".to_string(),
            ));
        }

        if self.http.connect_timeout >= self.context.timeout
            || self.http.connect_timeout >= self.generation.timeout
        {
            return Err(ConfigError::Validation(
                "http.connect_timeout must be shorter than the context and generation timeouts"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn check_http_url(field: &str, value: &str) -> ConfigResult<()> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Validation(format!("{field} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}

/// Inbound HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    #[validate(length(min = 1))]
    pub host: String,
    /// Bind port
    #[validate(range(min = 1))]
    pub port: u16,
    /// Path serving generation (POST) and health (GET)
    #[validate(length(min = 1))]
    pub route_path: String,
    /// Maximum accepted request body in bytes
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            route_path: "/generate".to_string(),
            body_limit: 1024 * 1024,
        }
    }
}

/// Generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GenerationConfig {
    /// Full URL of the generation endpoint
    #[validate(url)]
    pub url: String,
    /// Model name sent with each request
    #[validate(length(min = 1))]
    pub model: String,
    /// Instruction line placed in front of retrieved context
    #[validate(length(min = 1))]
    pub persona: String,
    /// Time budget for response headers and for each streamed line
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/api/generate".to_string(),
            model: "llama3.1".to_string(),
            persona: DEFAULT_PERSONA.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Context retrieval service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ContextConfig {
    /// Full URL of the context endpoint
    #[validate(url)]
    pub url: String,
    /// End-to-end time budget for one context call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/api/v1/context".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Shared outbound HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP/TLS connection establishment budget
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// How long idle pooled connections are kept
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Duration,
    /// Maximum idle pooled connections per host
    pub pool_max_idle_per_host: usize,
    /// Longest streamed line held in memory before the stream is failed
    pub max_line_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            max_line_bytes: 1024 * 1024,
        }
    }
}

/// Backend reachability probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Budget for each probe
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
        }
    }
}

/// Engine on/off switch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySwitch {
    /// When false every gateway request is rejected with 403
    pub enabled: bool,
}

impl Default for GatewaySwitch {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Change notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NotifierConfig {
    /// Enable change notifications
    pub enabled: bool,
    /// Enrichment endpoint receiving change events
    pub endpoint: String,
    /// Local directory to watch, mapped onto `/content`
    pub watch_root: Option<String>,
    /// Pending event capacity before new events are dropped
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
    /// Budget for one delivery
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:8000/enrich".to_string(),
            watch_root: None,
            queue_capacity: 1024,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive (overridden by `RUST_LOG`)
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
