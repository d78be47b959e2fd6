//! Context retrieval.
//!
//! Retrieval is best-effort: every failure collapses to
//! [`ContextResult::Absent`] and generation proceeds without context.

use crate::http::HttpClient;
use async_trait::async_trait;
use gateway_config::ContextConfig;
use gateway_core::{ContextResult, Query};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Source of retrieved context for a query
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Retrieve context for `query`. Never fails.
    async fn retrieve(&self, query: &Query) -> ContextResult;
}

#[derive(Debug, Serialize)]
struct ContextRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct ContextResponse {
    #[serde(default)]
    context: Option<String>,
}

/// Context source backed by the retrieval service's HTTP API
#[derive(Debug, Clone)]
pub struct HttpContextRetriever {
    client: Arc<HttpClient>,
    url: String,
    timeout: Duration,
}

impl HttpContextRetriever {
    /// Create a retriever from configuration
    #[must_use]
    pub fn new(client: Arc<HttpClient>, config: &ContextConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout,
        }
    }

    fn parse(body: &str) -> ContextResult {
        match serde_json::from_str::<ContextResponse>(body) {
            Ok(response) => ContextResult::from_field(response.context),
            Err(e) => {
                warn!(error = %e, "Context service returned malformed JSON");
                ContextResult::Absent
            }
        }
    }
}

#[async_trait]
impl ContextSource for HttpContextRetriever {
    #[instrument(skip(self, query), fields(query_chars = query.char_len()))]
    async fn retrieve(&self, query: &Query) -> ContextResult {
        let start = Instant::now();
        let request = self.client.post_json(
            &self.url,
            &ContextRequest {
                query: query.as_str(),
            },
        );

        let result = match self.client.send_buffered(request, self.timeout).await {
            Ok(response) if response.status == StatusCode::OK => {
                Self::parse(&response.body)
            }
            Ok(response) => {
                warn!(
                    status = response.status.as_u16(),
                    "Context service returned non-200 status"
                );
                ContextResult::Absent
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch context");
                ContextResult::Absent
            }
        };

        let context_ms = start.elapsed().as_millis() as u64;
        info!(context_ms, result = result.label(), "Context fetch finished");
        if let ContextResult::Present(text) = &result {
            debug!(context_chars = text.chars().count(), "Context retrieved");
        }
        result
    }
}
