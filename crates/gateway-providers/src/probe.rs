//! Backend reachability probes.

use crate::http::HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Reachability of the two backends, as reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    /// Context (retrieval) service
    pub python: bool,
    /// Generation service
    pub ollama: bool,
}

/// Strip the path, query and fragment from an endpoint URL.
///
/// `http://localhost:8000/api/v1/context` becomes `http://localhost:8000/`.
/// Returns `None` for URLs without a host.
#[must_use]
pub fn base_url(endpoint: &str) -> Option<String> {
    let url = Url::parse(endpoint).ok()?;
    url.host_str()?;
    let mut base = url;
    base.set_path("/");
    base.set_query(None);
    base.set_fragment(None);
    Some(base.to_string())
}

/// Probes the context and generation base URLs
#[derive(Debug, Clone)]
pub struct BackendProbe {
    client: Arc<HttpClient>,
    context_base: Option<String>,
    generation_base: Option<String>,
    timeout: Duration,
}

impl BackendProbe {
    /// Create a probe for the given endpoint URLs
    #[must_use]
    pub fn new(
        client: Arc<HttpClient>,
        context_url: &str,
        generation_url: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            context_base: base_url(context_url),
            generation_base: base_url(generation_url),
            timeout,
        }
    }

    /// Probe both backends concurrently
    pub async fn check(&self) -> BackendHealth {
        let (python, ollama) = tokio::join!(
            self.reachable(self.context_base.as_deref()),
            self.reachable(self.generation_base.as_deref()),
        );
        BackendHealth { python, ollama }
    }

    async fn reachable(&self, base: Option<&str>) -> bool {
        let Some(base) = base else {
            return false;
        };

        match self.client.send_buffered(self.client.get(base), self.timeout).await {
            Ok(response) => {
                let status = response.status.as_u16();
                debug!(url = base, status, "Backend probe answered");
                (200..500).contains(&status)
            }
            Err(e) => {
                debug!(url = base, error = %e, "Backend probe failed");
                false
            }
        }
    }
}
