//! Test helper utilities for integration tests

use crate::mock_providers::{MockContextService, MockGenerationService};
use futures::StreamExt;
use gateway_config::GatewayConfig;
use gateway_server::{AppState, Server, ServerConfig};
use once_cell::sync::Lazy;
use reqwest::{Client, Response};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Gateway configuration pointing at the given backend URLs, with short
/// timeouts suited to tests
pub fn test_config(context_url: &str, generation_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.context.url = context_url.to_string();
    config.generation.url = generation_url.to_string();
    config.context.timeout = Duration::from_secs(2);
    config.generation.timeout = Duration::from_secs(5);
    config.health.timeout = Duration::from_secs(1);
    config.http.connect_timeout = Duration::from_millis(500);
    config
}

/// Relayed body as seen by a streaming client
#[derive(Debug, Default)]
pub struct StreamCapture {
    /// Bytes received before the stream ended
    pub text: String,
    /// Whether the stream ended with a transport error
    pub aborted: bool,
}

impl StreamCapture {
    /// Complete lines received
    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }
}

/// Running gateway bound to a local port
pub struct TestServer {
    /// The server address
    pub addr: SocketAddr,
    /// HTTP client for making requests
    pub client: Client,
    /// Base URL for the server
    pub base_url: String,
    /// Route the gateway answers on
    pub route: String,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Start the gateway with `config`
    pub async fn start(config: GatewayConfig) -> Self {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");
        let route = config.server.route_path.clone();
        let state = AppState::from_config(config).expect("Failed to build state");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        // Spawn the server
        tokio::spawn(async move {
            Server::new(ServerConfig::new(), state)
                .run_with_listener(listener, async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create client");

        Self {
            addr,
            client,
            base_url: format!("http://{addr}"),
            route,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Start the gateway in front of the two mock services
    pub async fn with_backends(
        context: &MockContextService,
        generation: &MockGenerationService,
    ) -> Self {
        Self::start(test_config(&context.url(), &generation.url())).await
    }

    /// Get the full URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Probe backend health on the gateway route
    pub async fn health(&self) -> Response {
        self.get(&self.route).await
    }

    /// POST a prompt as a form field
    pub async fn generate(&self, prompt: &str) -> Response {
        self.client
            .post(self.url(&self.route))
            .form(&[("prompt", prompt)])
            .send()
            .await
            .expect("Request failed")
    }

    /// POST a prompt in the query string
    pub async fn generate_query(&self, prompt: &str) -> Response {
        self.client
            .post(self.url(&self.route))
            .query(&[("prompt", prompt)])
            .send()
            .await
            .expect("Request failed")
    }

    /// POST with no prompt at all
    pub async fn generate_empty(&self) -> Response {
        self.client
            .post(self.url(&self.route))
            .send()
            .await
            .expect("Request failed")
    }

    /// POST a prompt and collect the streamed body, noting an abort
    pub async fn generate_streaming(&self, prompt: &str) -> (u16, StreamCapture) {
        let response = self.generate(prompt).await;
        let status = response.status().as_u16();

        let mut capture = StreamCapture::default();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => capture.text.push_str(&String::from_utf8_lossy(&bytes)),
                Err(_) => {
                    capture.aborted = true;
                    break;
                }
            }
        }

        (status, capture)
    }

    /// Parse response body as JSON
    pub async fn json_body(response: Response) -> Value {
        response.json().await.expect("Failed to parse JSON")
    }

    /// Shutdown the test server
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Assert that a response has the expected status code
pub fn assert_status(response: &Response, expected: u16) {
    assert_eq!(
        response.status().as_u16(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Wait for a condition to be true with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_points_at_backends() {
        let config = test_config("http://127.0.0.1:1/ctx", "http://127.0.0.1:2/gen");
        assert_eq!(config.context.url, "http://127.0.0.1:1/ctx");
        assert_eq!(config.generation.url, "http://127.0.0.1:2/gen");
        assert!(config.validate_all().is_ok());
    }

    #[tokio::test]
    async fn test_server_serves_metrics() {
        let server = TestServer::start(test_config(
            "http://127.0.0.1:1/ctx",
            "http://127.0.0.1:1/gen",
        ))
        .await;

        let response = server.get("/metrics").await;
        assert_status(&response, 200);
    }

    #[tokio::test]
    async fn test_wait_for() {
        assert!(wait_for(|| async { true }, Duration::from_millis(100)).await);
        assert!(!wait_for(|| async { false }, Duration::from_millis(100)).await);
    }
}
