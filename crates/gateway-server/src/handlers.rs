//! HTTP request handlers for the gateway API.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use gateway_core::{GatewayError, GatewayOutcome};
use gateway_providers::{BackendHealth, RelayStream};
use gateway_telemetry::{Metrics, Stage};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::{
    error::ApiError,
    extractors::{PromptParam, RequestId},
    state::AppState,
};

/// Content type of the relayed generation stream
pub const NDJSON: &str = "application/x-ndjson";

/// Generate endpoint.
///
/// Runs the pipeline and streams the generation lines back as NDJSON. Errors
/// before the first line map to a fixed JSON error body.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn generate(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    PromptParam(prompt): PromptParam,
) -> Response {
    let started = Instant::now();

    match state.orchestrator.run(prompt.as_deref()).await {
        Ok(stream) => {
            let body = Body::from_stream(relay_body(stream, state.metrics.clone(), started));
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, NDJSON),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response()
        }
        Err(err) => {
            let outcome = err.outcome();
            state.metrics.record_outcome(&outcome);
            state.metrics.observe_stage(Stage::Total, started.elapsed());
            match &outcome {
                GatewayOutcome::ValidationFailure => warn!(error = %err, "Rejected request"),
                _ => error!(
                    error = %err,
                    total_ms = started.elapsed().as_millis() as u64,
                    "Generation failed before streaming"
                ),
            }
            ApiError::from(err).into_response()
        }
    }
}

/// Records the outcome of a relay that ends without reaching the end of the
/// upstream stream, such as when the caller disconnects.
struct RelayGuard {
    metrics: Metrics,
    started: Instant,
    lines: u64,
    finished: bool,
}

impl RelayGuard {
    fn finish(&mut self, outcome: &GatewayOutcome) {
        self.finished = true;
        self.metrics.record_outcome(outcome);
        self.metrics.observe_stage(Stage::Total, self.started.elapsed());
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(lines = self.lines, "Caller disconnected before the stream completed");
            self.finish(&GatewayOutcome::InternalFailure {
                cause: "caller disconnected".to_string(),
            });
        }
    }
}

/// Wrap the relay with per-line metrics and final outcome logging.
///
/// A mid-stream failure is passed on as a body error, which aborts the
/// chunked response so the caller sees a truncated stream instead of a clean
/// end.
fn relay_body(
    mut stream: RelayStream,
    metrics: Metrics,
    started: Instant,
) -> impl futures::Stream<Item = Result<bytes::Bytes, GatewayError>> + Send + 'static {
    async_stream::stream! {
        let mut guard = RelayGuard {
            metrics,
            started,
            lines: 0,
            finished: false,
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(line) => {
                    guard.lines += 1;
                    guard.metrics.record_relayed_line();
                    yield Ok(line);
                }
                Err(err) => {
                    guard.metrics.record_midstream_failure();
                    guard.finish(&err.outcome());
                    error!(
                        error = %err,
                        lines = guard.lines,
                        total_ms = started.elapsed().as_millis() as u64,
                        "Generation stream interrupted"
                    );
                    yield Err(err);
                    break;
                }
            }
        }

        if !guard.finished {
            guard.finish(&GatewayOutcome::StreamedSuccess);
            info!(
                lines = guard.lines,
                total_ms = started.elapsed().as_millis() as u64,
                "Generation relayed"
            );
        }
    }
}

/// Backend health endpoint
#[instrument(skip_all)]
pub async fn backend_health(State(state): State<AppState>) -> Json<BackendHealth> {
    let health = state.probe.check().await;
    info!(python = health.python, ollama = health.ollama, "Backend health checked");
    Json(health)
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.gather() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => ApiError::internal(e.to_string()).into_response(),
    }
}
