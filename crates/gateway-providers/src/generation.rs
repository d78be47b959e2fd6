//! Streamed generation relay.
//!
//! The generation service answers with one JSON object per line. Each line
//! is handed downstream with a `\n` terminator as soon as it is read. The
//! relay is pull-based: the next upstream read only happens when the
//! consumer asks for the next item, and dropping the stream drops the
//! upstream connection.

use crate::http::{HttpClient, HttpError, LineRead, LineStream};
use async_stream::stream;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::BoxStream;
use gateway_config::GenerationConfig;
use gateway_core::{AugmentedPrompt, GatewayError, GatewayResult};
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

/// Newline-terminated lines relayed from the generation service.
///
/// An `Err` item means the upstream stream broke after the lines before it
/// were delivered; nothing follows it.
pub type RelayStream = BoxStream<'static, Result<Bytes, GatewayError>>;

/// A service that produces a streamed generation for a prompt
#[async_trait]
pub trait GenerationSource: Send + Sync {
    /// Start a streamed generation.
    ///
    /// Fails before any line is produced with
    /// [`GatewayError::UpstreamStatus`] when the service answers with a
    /// status other than 200, or [`GatewayError::Upstream`] when it cannot be
    /// reached.
    async fn generate_stream(
        &self,
        prompt: &AugmentedPrompt,
        model: &str,
    ) -> GatewayResult<RelayStream>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Relay for an Ollama-compatible `/api/generate` endpoint
#[derive(Debug, Clone)]
pub struct OllamaRelay {
    client: Arc<HttpClient>,
    url: String,
    timeout: Duration,
}

impl OllamaRelay {
    /// Create a relay from configuration
    #[must_use]
    pub fn new(client: Arc<HttpClient>, config: &GenerationConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl GenerationSource for OllamaRelay {
    #[instrument(
        skip(self, prompt),
        fields(prompt_chars = prompt.as_str().len(), augmented = prompt.is_augmented())
    )]
    async fn generate_stream(
        &self,
        prompt: &AugmentedPrompt,
        model: &str,
    ) -> GatewayResult<RelayStream> {
        let start = Instant::now();
        let body = GenerateRequest {
            model,
            prompt: prompt.as_str(),
            stream: true,
        };
        let request = self.client.post_json(&self.url, &body);

        let response = self
            .client
            .send_streaming(request, self.timeout)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to reach generation service");
                GatewayError::upstream("generation", e.to_string())
            })?;

        let generation_ms = start.elapsed().as_millis() as u64;
        if response.status != StatusCode::OK {
            error!(
                status = response.status.as_u16(),
                generation_ms, "Generation service failed"
            );
            return Err(GatewayError::UpstreamStatus {
                status: response.status.as_u16(),
            });
        }

        info!(generation_ms, model, "Generation stream started");
        Ok(relay_lines(response.lines))
    }
}

/// Turn a line source into a relay stream.
///
/// Every line, empty ones included, is re-terminated with `\n`. A read error
/// ends the stream with [`GatewayError::MidStream`].
pub fn relay_lines(mut lines: LineStream) -> RelayStream {
    let relay = stream! {
        let mut relayed: u64 = 0;
        loop {
            match lines.next_line().await {
                Ok(LineRead::Line(line)) => {
                    relayed += 1;
                    yield Ok::<Bytes, GatewayError>(terminate(&line));
                }
                Ok(LineRead::EndOfStream) => {
                    debug!(lines = relayed, "Generation stream finished");
                    break;
                }
                Err(e) => {
                    yield Err(mid_stream(relayed, &e));
                    break;
                }
            }
        }
    };
    Box::pin(relay)
}

fn terminate(line: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(line.len() + 1);
    out.extend_from_slice(line);
    out.put_u8(b'\n');
    out.freeze()
}

fn mid_stream(relayed: u64, err: &HttpError) -> GatewayError {
    GatewayError::mid_stream(relayed, err.to_string())
}
