//! Outbound HTTP adapter.
//!
//! One [`HttpClient`] is built at startup and shared by every request. Calls
//! are made in one of two modes:
//!
//! - [`HttpClient::send_buffered`]: the whole body is read as text and the
//!   timeout covers the entire exchange.
//! - [`HttpClient::send_streaming`]: the body is exposed as a forward-only
//!   [`LineStream`]. The timeout covers header arrival and then each line
//!   read, so a stream that keeps producing output is never cut off.

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use gateway_config::HttpConfig;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Outbound HTTP failures
#[derive(Debug, Error)]
pub enum HttpError {
    /// The connection could not be established
    #[error("Connection failed: {message}")]
    Connect {
        /// Error message
        message: String,
    },

    /// The call exceeded its time budget
    #[error("Timed out after {after:?}")]
    Timeout {
        /// Budget that was exceeded
        after: Duration,
    },

    /// The request failed in transit
    #[error("Transport error: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// The response body could not be read
    #[error("Body read failed: {message}")]
    Body {
        /// Error message
        message: String,
    },

    /// A streamed line grew past the configured limit
    #[error("Line exceeds {limit} bytes")]
    LineTooLong {
        /// Limit in bytes
        limit: usize,
    },
}

impl HttpError {
    fn from_reqwest(err: &reqwest::Error, budget: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { after: budget }
        } else if err.is_connect() {
            Self::Connect {
                message: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            Self::Body {
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }

    /// Whether the call never reached the server
    #[must_use]
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Body text
    pub body: String,
}

/// A response whose body is still being received
pub struct StreamingResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Line source over the body
    pub lines: LineStream,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Result of one [`LineStream::next_line`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// One line without its terminator
    Line(Bytes),
    /// The body is exhausted; returned for every read after the end
    EndOfStream,
}

/// Default cap on a single streamed line
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Forward-only line reader over a response body.
///
/// Only the current partial line is held in memory, up to `max_line_bytes`.
pub struct LineStream {
    chunks: BoxStream<'static, Result<Bytes, HttpError>>,
    buffer: BytesMut,
    // Bytes of `buffer` already known to contain no `\n`
    scanned: usize,
    idle_timeout: Duration,
    max_line_bytes: usize,
    exhausted: bool,
}

impl LineStream {
    /// Wrap a chunk stream, bounding each read by `idle_timeout`
    pub fn new(
        chunks: BoxStream<'static, Result<Bytes, HttpError>>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            chunks,
            buffer: BytesMut::new(),
            scanned: 0,
            idle_timeout,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            exhausted: false,
        }
    }

    /// Set the longest line accepted before reads fail
    #[must_use]
    pub fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    /// Read the next line.
    ///
    /// Lines are split on `\n` with a trailing `\r` removed. A final line
    /// without a terminator is still returned. After the end every call
    /// yields [`LineRead::EndOfStream`]. A line longer than the configured
    /// limit fails with [`HttpError::LineTooLong`].
    pub async fn next_line(&mut self) -> Result<LineRead, HttpError> {
        loop {
            if let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
                let pos = self.scanned + offset;
                self.scanned = 0;
                if pos > self.max_line_bytes {
                    return Err(HttpError::LineTooLong {
                        limit: self.max_line_bytes,
                    });
                }
                let mut line = self.buffer.split_to(pos + 1);
                line.truncate(pos);
                return Ok(LineRead::Line(strip_cr(line)));
            }
            self.scanned = self.buffer.len();

            if self.buffer.len() > self.max_line_bytes {
                return Err(HttpError::LineTooLong {
                    limit: self.max_line_bytes,
                });
            }

            if self.exhausted {
                if self.buffer.is_empty() {
                    return Ok(LineRead::EndOfStream);
                }
                self.scanned = 0;
                let rest = self.buffer.split();
                return Ok(LineRead::Line(strip_cr(rest)));
            }

            match tokio::time::timeout(self.idle_timeout, self.chunks.next()).await {
                Err(_) => {
                    return Err(HttpError::Timeout {
                        after: self.idle_timeout,
                    })
                }
                Ok(None) => self.exhausted = true,
                Ok(Some(Ok(chunk))) => {
                    trace!(bytes = chunk.len(), "Received body chunk");
                    self.buffer.extend_from_slice(&chunk);
                }
                Ok(Some(Err(e))) => return Err(e),
            }
        }
    }
}

fn strip_cr(mut line: BytesMut) -> Bytes {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line.freeze()
}

/// Shared, connection-pooled outbound HTTP client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_line_bytes: usize,
}

impl HttpClient {
    /// Build the client from configuration
    ///
    /// # Errors
    /// Returns error if the underlying client cannot be created
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| HttpError::Transport {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            max_line_bytes: config.max_line_bytes,
        })
    }

    /// Start a JSON POST request
    pub fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> RequestBuilder {
        self.client.post(url).json(body)
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send a request and read the whole body within `timeout`
    pub async fn send_buffered(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<BufferedResponse, HttpError> {
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| HttpError::from_reqwest(&e, timeout))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::from_reqwest(&e, timeout))?;
            Ok::<_, HttpError>(BufferedResponse { status, body })
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| HttpError::Timeout { after: timeout })?
    }

    /// Send a request and return as soon as headers arrive
    pub async fn send_streaming(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<StreamingResponse, HttpError> {
        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| HttpError::Timeout { after: timeout })?
            .map_err(|e| HttpError::from_reqwest(&e, timeout))?;

        let status = response.status();
        let chunks = response
            .bytes_stream()
            .map_err(move |e| HttpError::from_reqwest(&e, timeout))
            .boxed();

        Ok(StreamingResponse {
            status,
            lines: LineStream::new(chunks, timeout).with_max_line_bytes(self.max_line_bytes),
        })
    }
}
