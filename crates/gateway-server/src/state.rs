//! Shared application state.

use crate::orchestrator::Orchestrator;
use gateway_config::GatewayConfig;
use gateway_core::{GatewayError, GatewayResult, PromptAssembler};
use gateway_providers::{
    BackendProbe, ContextSource, GenerationSource, HttpClient, HttpContextRetriever, OllamaRelay,
};
use gateway_telemetry::{Metrics, MetricsConfig};
use std::sync::Arc;

/// State shared by every request. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Resolved configuration
    pub config: Arc<GatewayConfig>,
    /// Request pipeline
    pub orchestrator: Arc<Orchestrator>,
    /// Backend reachability probe
    pub probe: Arc<BackendProbe>,
    /// Prometheus metrics
    pub metrics: Metrics,
}

impl AppState {
    /// Start building application state
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// Build state with HTTP-backed sources from configuration
    pub fn from_config(config: GatewayConfig) -> GatewayResult<Self> {
        Self::builder().config(config).build()
    }
}

/// Builder for [`AppState`]
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<GatewayConfig>,
    context: Option<Arc<dyn ContextSource>>,
    generation: Option<Arc<dyn GenerationSource>>,
    metrics: Option<Metrics>,
}

impl AppStateBuilder {
    /// Set the configuration
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the HTTP context retriever
    #[must_use]
    pub fn context_source(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.context = Some(source);
        self
    }

    /// Replace the HTTP generation relay
    #[must_use]
    pub fn generation_source(mut self, source: Arc<dyn GenerationSource>) -> Self {
        self.generation = Some(source);
        self
    }

    /// Use an existing metrics registry
    #[must_use]
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the state.
    ///
    /// The shared HTTP client is created here, once.
    pub fn build(self) -> GatewayResult<AppState> {
        let config = self.config.unwrap_or_default();
        let client = Arc::new(
            HttpClient::new(&config.http).map_err(|e| GatewayError::configuration(e.to_string()))?,
        );

        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Metrics::new(&MetricsConfig::default())
                .map_err(|e| GatewayError::internal(e.to_string()))?,
        };

        let context: Arc<dyn ContextSource> = match self.context {
            Some(source) => source,
            None => Arc::new(HttpContextRetriever::new(client.clone(), &config.context)),
        };
        let generation: Arc<dyn GenerationSource> = match self.generation {
            Some(source) => source,
            None => Arc::new(OllamaRelay::new(client.clone(), &config.generation)),
        };

        let probe = BackendProbe::new(
            client,
            &config.context.url,
            &config.generation.url,
            config.health.timeout,
        );

        let orchestrator = Orchestrator::new(
            context,
            generation,
            PromptAssembler::new(config.generation.persona.clone()),
            config.generation.model.clone(),
            metrics.clone(),
        );

        Ok(AppState {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            probe: Arc::new(probe),
            metrics,
        })
    }
}
