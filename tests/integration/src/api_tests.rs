//! API endpoint integration tests
//!
//! Status codes, headers and the fixed error bodies of the gateway route,
//! plus the health and metrics endpoints.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use serde_json::json;

/// A request without a prompt is rejected before any backend call
#[tokio::test]
async fn test_missing_prompt_is_400() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.expect_no_calls().await;
    generation.expect_no_calls().await;
    let server = TestServer::with_backends(&context, &generation).await;

    let response = server.generate_empty().await;
    assert_status(&response, 400);
    assert_eq!(
        TestServer::json_body(response).await,
        json!({"error": "Prompt parameter is required"})
    );
}

/// Whitespace-only prompts count as missing
#[tokio::test]
async fn test_blank_prompt_is_400() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.expect_no_calls().await;
    generation.expect_no_calls().await;
    let server = TestServer::with_backends(&context, &generation).await;

    for prompt in ["", "   ", "\t\n"] {
        let response = server.generate(prompt).await;
        assert_status(&response, 400);
    }
}

/// The prompt may also be sent in the query string
#[tokio::test]
async fn test_prompt_in_query_string() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_no_context().await;
    generation.mock_stream(&generation_lines(&["ok"])).await;
    let server = TestServer::with_backends(&context, &generation).await;

    let response = server.generate_query(SAMPLE_QUERY).await;
    assert_status(&response, 200);
    assert_eq!(context.queries().await, vec![SAMPLE_QUERY.to_string()]);
}

/// Streaming responses are NDJSON and carry a request id
#[tokio::test]
async fn test_stream_headers() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_no_context().await;
    generation.mock_stream(&generation_lines(&["hi"])).await;
    let server = TestServer::with_backends(&context, &generation).await;

    let response = server
        .client
        .post(server.url("/generate"))
        .header("x-request-id", "req-e2e-1")
        .form(&[("prompt", "hello")])
        .send()
        .await
        .unwrap();

    assert_status(&response, 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/x-ndjson"
    );
    assert_eq!(response.headers()["x-request-id"].to_str().unwrap(), "req-e2e-1");
}

/// A non-200 generation answer becomes a 502 with a fixed body
#[tokio::test]
async fn test_generation_error_is_502() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_no_context().await;
    generation.mock_error(404, "{\"error\":\"model 'llama3.1' not found\"}").await;
    let server = TestServer::with_backends(&context, &generation).await;

    let response = server.generate(SAMPLE_QUERY).await;
    assert_status(&response, 502);
    assert_eq!(
        TestServer::json_body(response).await,
        json!({"error": "Ollama API failed"})
    );
}

/// An unreachable generation service is an internal error
#[tokio::test]
async fn test_generation_unreachable_is_500() {
    let context = MockContextService::new().await;
    context.mock_no_context().await;
    let server =
        TestServer::start(test_config(&context.url(), "http://127.0.0.1:1/api/generate")).await;

    let response = server.generate(SAMPLE_QUERY).await;
    assert_status(&response, 500);
    assert_eq!(
        TestServer::json_body(response).await,
        json!({"error": "Internal Server Error"})
    );
}

/// Health reports each backend separately
#[tokio::test]
async fn test_health_endpoint() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_root(404).await;
    generation.mock_root(200).await;
    let server = TestServer::with_backends(&context, &generation).await;

    let response = server.health().await;
    assert_status(&response, 200);
    assert_eq!(
        TestServer::json_body(response).await,
        json!({"python": true, "ollama": true})
    );
}

/// A backend answering 5xx or not at all is reported down
#[tokio::test]
async fn test_health_endpoint_backend_down() {
    let context = MockContextService::new().await;
    context.mock_root(503).await;
    let server =
        TestServer::start(test_config(&context.url(), "http://127.0.0.1:1/api/generate")).await;

    let response = server.health().await;
    assert_status(&response, 200);
    assert_eq!(
        TestServer::json_body(response).await,
        json!({"python": false, "ollama": false})
    );
}

/// The disabled engine answers 403 on both methods
#[tokio::test]
async fn test_disabled_engine() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.expect_no_calls().await;
    generation.expect_no_calls().await;

    let mut config = test_config(&context.url(), &generation.url());
    config.gateway.enabled = false;
    let server = TestServer::start(config).await;

    let response = server.generate(SAMPLE_QUERY).await;
    assert_status(&response, 403);
    assert_eq!(
        TestServer::json_body(response).await,
        json!({"error": "Intelligence engine is disabled"})
    );

    let response = server.health().await;
    assert_status(&response, 403);

    // Metrics stay available
    assert_status(&server.get("/metrics").await, 200);
}

/// Metrics count outcomes
#[tokio::test]
async fn test_metrics_count_outcomes() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_context(SAMPLE_CONTEXT).await;
    generation.mock_stream(&generation_lines(&["a", "b", "c"])).await;
    let server = TestServer::with_backends(&context, &generation).await;

    let (status, _) = server.generate_streaming(SAMPLE_QUERY).await;
    assert_eq!(status, 200);
    assert_status(&server.generate_empty().await, 400);

    let metrics = server.get("/metrics").await.text().await.unwrap();
    assert!(metrics.contains("gateway_requests_total{outcome=\"success\"} 1"));
    assert!(metrics.contains("gateway_requests_total{outcome=\"validation_failure\"} 1"));
    assert!(metrics.contains("gateway_context_fetch_total{result=\"present\"} 1"));
    assert!(metrics.contains("gateway_relayed_lines_total 3"));
}

/// Unknown paths are 404
#[tokio::test]
async fn test_unknown_path() {
    let server = TestServer::start(test_config(
        "http://127.0.0.1:1/ctx",
        "http://127.0.0.1:1/gen",
    ))
    .await;

    assert_status(&server.get("/v1/chat/completions").await, 404);
}
