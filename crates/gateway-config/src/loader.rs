//! Configuration loading.
//!
//! Resolution order is defaults, then an optional file, then environment
//! overrides. Validation runs last.

use crate::config::GatewayConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

/// Load, override and validate the gateway configuration.
///
/// `path` takes precedence over [`CONFIG_PATH_ENV`]. Without either, built-in
/// defaults are used.
pub async fn load_config(path: Option<&Path>) -> ConfigResult<GatewayConfig> {
    let mut config = match config_path(path) {
        Some(path) => load_config_from_file(&path).await?,
        None => {
            debug!("No config file given, using defaults");
            GatewayConfig::default()
        }
    };

    apply_overrides(&mut config, |var| std::env::var(var).ok())?;
    config.validate_all()?;
    Ok(config)
}

/// File [`load_config`] reads: `explicit` if given, else [`CONFIG_PATH_ENV`]
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
}

/// Parse a configuration file, choosing the format by extension.
///
/// `.yaml`/`.yml`, `.toml` and `.json` are recognised. The result is not
/// validated.
pub async fn load_config_from_file(path: &Path) -> ConfigResult<GatewayConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let config: GatewayConfig = match extension.as_str() {
        "yaml" | "yml" => {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::parse(path, e))?
        }
        "toml" => toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))?,
        "json" => serde_json::from_str(&content).map_err(|e| ConfigError::parse(path, e))?,
        other => {
            return Err(ConfigError::parse(
                path,
                format!("unsupported config format '{other}'"),
            ))
        }
    };

    debug!(path = %path.display(), "Parsed configuration file");
    Ok(config)
}

/// Apply environment overrides through `lookup`.
///
/// Taking the lookup as a closure keeps tests free of process-wide state.
pub fn apply_overrides<F>(config: &mut GatewayConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("GATEWAY_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("GATEWAY_PORT") {
        config.server.port = port
            .parse()
            .map_err(|_| ConfigError::env("GATEWAY_PORT", format!("'{port}' is not a port")))?;
    }
    if let Some(route) = lookup("GATEWAY_ROUTE") {
        config.server.route_path = route;
    }
    if let Some(enabled) = lookup("GATEWAY_ENABLED") {
        config.gateway.enabled = parse_bool("GATEWAY_ENABLED", &enabled)?;
    }
    if let Some(url) = lookup("OLLAMA_URL") {
        config.generation.url = url;
    }
    if let Some(model) = lookup("OLLAMA_MODEL") {
        config.generation.model = model;
    }
    if let Some(url) = lookup("CONTEXT_URL") {
        config.context.url = url;
    }
    if let Some(url) = lookup("ENRICHMENT_URL") {
        config.notifier.endpoint = url;
    }
    if let Some(enabled) = lookup("NOTIFIER_ENABLED") {
        config.notifier.enabled = parse_bool("NOTIFIER_ENABLED", &enabled)?;
    }
    if let Some(root) = lookup("NOTIFIER_WATCH_ROOT") {
        config.notifier.watch_root = Some(root);
    }
    if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("GATEWAY_LOG_JSON") {
        config.logging.json = parse_bool("GATEWAY_LOG_JSON", &json)?;
    }
    Ok(())
}

fn parse_bool(var: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::env(var, format!("'{other}' is not a boolean"))),
    }
}
