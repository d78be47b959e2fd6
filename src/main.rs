//! # RAG Inference Gateway
//!
//! Accepts a prompt, enriches it with context from a retrieval service and
//! relays the streamed answer of an Ollama-compatible generation API.
//!
//! ## Usage
//!
//! ```bash
//! # Start with default configuration
//! rag-inference-gateway
//!
//! # Start with custom config file
//! rag-inference-gateway --config /path/to/gateway.yaml
//!
//! # Print the resolved configuration and exit
//! rag-inference-gateway --config gateway.toml --check-config
//!
//! # Start with environment overrides
//! GATEWAY_PORT=9000 OLLAMA_URL=http://gpu-box:11434/api/generate rag-inference-gateway
//! ```

use clap::Parser;
use gateway_config::{config_path, load_config, ConfigResult, GatewayConfig};
use gateway_notifier::{ChangeNotifier, ContentWatcher};
use gateway_server::{AppState, Server, ServerConfig};
use gateway_telemetry::{init_logging, LoggingConfig};
use std::path::PathBuf;
use tracing::{error, info};

/// Retrieval-augmented inference gateway
#[derive(Parser, Debug)]
#[command(name = "rag-inference-gateway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON). Falls back to `GATEWAY_CONFIG`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    check_config: bool,
}

impl Cli {
    /// Load configuration and apply command-line overrides last
    async fn resolve_config(&self) -> ConfigResult<GatewayConfig> {
        let mut config = load_config(self.config.as_deref()).await?;
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        config.validate_all()?;
        Ok(config)
    }

    /// Report where the configuration came from once logging is up
    fn log_config_source(&self) {
        match config_path(self.config.as_deref()) {
            Some(path) => info!(path = %path.display(), "Loaded configuration file"),
            None => info!("No config file given, using defaults"),
        }
    }
}

/// Application entry point
#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match cli.resolve_config().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if cli.check_config {
        match serde_yaml::to_string(&config) {
            Ok(rendered) => {
                println!("{rendered}");
                return;
            }
            Err(e) => {
                eprintln!("Failed to render configuration: {e}");
                std::process::exit(1);
            }
        }
    }

    let logging = LoggingConfig::new()
        .with_level(config.logging.level.clone())
        .with_json(config.logging.json);
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting RAG inference gateway"
    );
    cli.log_config_source();

    // Run the application
    if let Err(e) = run(config).await {
        error!(error = %e, "Application failed");
        std::process::exit(1);
    }
}

/// Main application logic
async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        route = %config.server.route_path,
        context_url = %config.context.url,
        generation_url = %config.generation.url,
        model = %config.generation.model,
        enabled = config.gateway.enabled,
        "Configuration loaded"
    );

    let notifier = ChangeNotifier::start(&config.notifier, &config.http)?;
    let watcher = match &config.notifier.watch_root {
        Some(root) if notifier.is_enabled() => {
            Some(ContentWatcher::start(root, notifier.handle())?)
        }
        _ => None,
    };

    let server_config = ServerConfig::new()
        .with_host(config.server.host.clone())
        .with_port(config.server.port);
    let state = AppState::from_config(config)?;

    // Run server
    let served = Server::new(server_config, state).run().await;

    if let Some(watcher) = watcher {
        watcher.stop().await;
    }
    notifier.shutdown().await;

    served?;
    Ok(())
}
