//! Prometheus metrics.
//!
//! Each [`Metrics`] owns its own registry, so tests and multiple gateway
//! instances in one process never collide.

use gateway_core::{ContextResult, GatewayOutcome};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;
use thiserror::Error;

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Prefix for every metric name
    pub namespace: String,
    /// Histogram buckets for stage durations, in seconds
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "gateway".to_string(),
            duration_buckets: vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
                300.0,
            ],
        }
    }
}

/// Timed pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Context retrieval call
    Context,
    /// Generation request until response headers
    FirstByte,
    /// Whole request, ending when the relay finishes
    Total,
}

impl Stage {
    /// Label value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::FirstByte => "first_byte",
            Self::Total => "total",
        }
    }
}

/// Metrics errors
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    /// Encoded output was not UTF-8
    #[error("Metrics output is not valid UTF-8")]
    Encoding,
}

/// Gateway metrics
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    context_fetches: IntCounterVec,
    stage_duration: HistogramVec,
    relayed_lines: IntCounter,
    midstream_failures: IntCounter,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create and register all metrics
    ///
    /// # Errors
    /// Returns error if a metric cannot be registered
    pub fn new(config: &MetricsConfig) -> Result<Self, MetricsError> {
        let registry = Registry::new();
        let ns = config.namespace.as_str();

        let requests = IntCounterVec::new(
            Opts::new("requests_total", "Gateway requests by terminal outcome").namespace(ns),
            &["outcome"],
        )?;
        let context_fetches = IntCounterVec::new(
            Opts::new("context_fetch_total", "Context retrievals by result").namespace(ns),
            &["result"],
        )?;
        let stage_duration = HistogramVec::new(
            HistogramOpts::new("stage_duration_seconds", "Duration of pipeline stages")
                .namespace(ns)
                .buckets(config.duration_buckets.clone()),
            &["stage"],
        )?;
        let relayed_lines = IntCounter::with_opts(
            Opts::new("relayed_lines_total", "Generation lines relayed to callers").namespace(ns),
        )?;
        let midstream_failures = IntCounter::with_opts(
            Opts::new(
                "midstream_failures_total",
                "Generation streams that broke after relaying started",
            )
            .namespace(ns),
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(context_fetches.clone()))?;
        registry.register(Box::new(stage_duration.clone()))?;
        registry.register(Box::new(relayed_lines.clone()))?;
        registry.register(Box::new(midstream_failures.clone()))?;

        Ok(Self {
            registry,
            requests,
            context_fetches,
            stage_duration,
            relayed_lines,
            midstream_failures,
        })
    }

    /// Count a terminal request outcome
    pub fn record_outcome(&self, outcome: &GatewayOutcome) {
        self.requests.with_label_values(&[outcome.label()]).inc();
    }

    /// Count a context retrieval result
    pub fn record_context(&self, result: &ContextResult) {
        self.context_fetches
            .with_label_values(&[result.label()])
            .inc();
    }

    /// Observe a stage duration
    pub fn observe_stage(&self, stage: Stage, elapsed: Duration) {
        self.stage_duration
            .with_label_values(&[stage.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    /// Count one relayed line
    pub fn record_relayed_line(&self) {
        self.relayed_lines.inc();
    }

    /// Count a broken generation stream
    pub fn record_midstream_failure(&self) {
        self.midstream_failures.inc();
    }

    /// Render all metrics in the Prometheus text format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn gather(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|_| MetricsError::Encoding)
    }
}
