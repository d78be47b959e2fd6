//! End-to-end integration tests
//!
//! Complete flows from caller through context retrieval and prompt assembly
//! to the relayed generation stream.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use futures::StreamExt;
use gateway_config::NotifierConfig;
use gateway_notifier::{ChangeEvent, ChangeKind, ChangeNotifier, ContentWatcher, SubmitOutcome};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Context is retrieved for the trimmed query and embedded in the prompt
#[tokio::test]
async fn test_e2e_augmented_generation() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_context(SAMPLE_CONTEXT).await;
    let lines = generation_lines(&["Try", " the", " Bali", " camp."]);
    generation.mock_stream(&lines).await;
    let server = TestServer::with_backends(&context, &generation).await;

    let (status, capture) = server
        .generate_streaming(&format!("  {SAMPLE_QUERY}  "))
        .await;

    assert_eq!(status, 200);
    assert!(!capture.aborted);
    assert_eq!(capture.text, ndjson_body(&lines));
    assert_eq!(response_text(&capture.text), "Try the Bali camp.");

    assert_eq!(context.queries().await, vec![SAMPLE_QUERY.to_string()]);

    let requests = generation.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "llama3.1");
    assert_eq!(requests[0]["stream"], true);
    let prompt = requests[0]["prompt"].as_str().unwrap();
    assert!(prompt.contains(SAMPLE_CONTEXT));
    assert!(prompt.contains(SAMPLE_QUERY));
}

/// A failing context service degrades to the raw query
#[tokio::test]
async fn test_e2e_context_failure_degrades() {
    for status in [404, 500, 503] {
        let context = MockContextService::new().await;
        let generation = MockGenerationService::new().await;
        context.mock_error(status).await;
        generation.mock_stream(&generation_lines(&["ok"])).await;
        let server = TestServer::with_backends(&context, &generation).await;

        let (code, capture) = server.generate_streaming(SAMPLE_QUERY).await;
        assert_eq!(code, 200, "context status {status}");
        assert_eq!(capture.lines().len(), 1);
        assert_eq!(generation.prompts().await, vec![SAMPLE_QUERY.to_string()]);
    }
}

/// Null context and an unreachable service both send the raw query
#[tokio::test]
async fn test_e2e_absent_context() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_no_context().await;
    generation.mock_stream(&generation_lines(&["ok"])).await;
    let server = TestServer::with_backends(&context, &generation).await;

    server.generate_streaming(SAMPLE_QUERY).await;
    assert_eq!(generation.prompts().await, vec![SAMPLE_QUERY.to_string()]);

    let generation = MockGenerationService::new().await;
    generation.mock_stream(&generation_lines(&["ok"])).await;
    let server =
        TestServer::start(test_config("http://127.0.0.1:1/api/v1/context", &generation.url()))
            .await;

    let (status, _) = server.generate_streaming(SAMPLE_QUERY).await;
    assert_eq!(status, 200);
    assert_eq!(generation.prompts().await, vec![SAMPLE_QUERY.to_string()]);
}

/// A context service slower than its budget is skipped
#[tokio::test]
async fn test_e2e_slow_context_is_skipped() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_slow(SAMPLE_CONTEXT, Duration::from_secs(5)).await;
    generation.mock_stream(&generation_lines(&["ok"])).await;

    let mut config = test_config(&context.url(), &generation.url());
    config.context.timeout = Duration::from_millis(600);
    let server = TestServer::start(config).await;

    let (status, _) = server.generate_streaming(SAMPLE_QUERY).await;
    assert_eq!(status, 200);
    assert_eq!(generation.prompts().await, vec![SAMPLE_QUERY.to_string()]);
}

/// Many lines arrive complete and in order
#[tokio::test]
async fn test_e2e_long_stream_order() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_no_context().await;

    let tokens: Vec<String> = (0..500).map(|i| format!("t{i} ")).collect();
    let token_refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let lines = generation_lines(&token_refs);
    generation.mock_stream(&lines).await;
    let server = TestServer::with_backends(&context, &generation).await;

    let (status, capture) = server.generate_streaming("count").await;
    assert_eq!(status, 200);
    assert_eq!(capture.lines(), lines.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(capture.text.ends_with('\n'));
}

/// A generation stream that breaks mid-way truncates the caller's stream
#[tokio::test]
async fn test_e2e_mid_stream_failure() {
    let context = MockContextService::new().await;
    context.mock_no_context().await;
    let lines = generation_lines(&["partial", " answer"]);
    let upstream = BrokenGenerationService::start(lines.clone()).await;
    let server = TestServer::start(test_config(&context.url(), &upstream.url())).await;

    let (status, capture) = server.generate_streaming(SAMPLE_QUERY).await;

    assert_eq!(status, 200);
    assert!(capture.aborted);
    assert_eq!(capture.text, ndjson_body(&lines));

    let metrics = server.get("/metrics").await.text().await.unwrap();
    assert!(metrics.contains("gateway_midstream_failures_total 1"));
}

/// Each line reaches the caller while the upstream is still holding the next
#[tokio::test]
async fn test_e2e_lines_are_flushed_as_they_arrive() {
    let context = MockContextService::new().await;
    context.mock_no_context().await;
    let first = generation_line("Hold", false);
    let second = generation_line(" on", true);
    let upstream = GatedGenerationService::start(first.clone(), second.clone()).await;
    let server = TestServer::start(test_config(&context.url(), &upstream.url())).await;

    let response = server.generate(SAMPLE_QUERY).await;
    assert_status(&response, 200);
    let mut body = response.bytes_stream();

    let chunk = tokio::time::timeout(Duration::from_secs(3), body.next())
        .await
        .expect("first line was held back until the stream completed")
        .expect("stream ended early")
        .expect("stream failed");
    assert_eq!(String::from_utf8_lossy(&chunk), format!("{first}\n"));

    upstream.release();
    let mut rest = String::new();
    while let Some(chunk) = body.next().await {
        rest.push_str(&String::from_utf8_lossy(&chunk.expect("stream failed")));
    }
    assert_eq!(rest, format!("{second}\n"));
}

/// A caller that hangs up closes the upstream connection
#[tokio::test]
async fn test_e2e_caller_disconnect_closes_upstream() {
    let context = MockContextService::new().await;
    context.mock_no_context().await;
    let upstream =
        EndlessGenerationService::start(generation_line("more", false), Duration::from_millis(20))
            .await;
    let server = TestServer::start(test_config(&context.url(), &upstream.url())).await;

    let response = server.generate(SAMPLE_QUERY).await;
    assert_status(&response, 200);
    let mut body = response.bytes_stream();
    assert!(body.next().await.expect("stream ended early").is_ok());
    drop(body);

    assert!(
        wait_for(|| async { upstream.is_closed() }, Duration::from_secs(5)).await,
        "upstream body still open after the caller left"
    );
    let produced = upstream.produced();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(upstream.produced(), produced);

    assert!(
        wait_for(
            || async {
                server
                    .get("/metrics")
                    .await
                    .text()
                    .await
                    .unwrap_or_default()
                    .contains("gateway_stage_duration_seconds_count{stage=\"total\"} 1")
            },
            Duration::from_secs(2),
        )
        .await
    );
}

/// Concurrent callers get their own streams
#[tokio::test]
async fn test_e2e_concurrent_requests() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_context(SAMPLE_CONTEXT).await;
    let lines = generation_lines(&["a", "b", "c"]);
    generation.mock_stream(&lines).await;
    let server = TestServer::with_backends(&context, &generation).await;

    let results = futures::future::join_all(
        (0..8).map(|i| {
            let server = &server;
            async move { server.generate_streaming(&format!("question {i}")).await }
        }),
    )
    .await;

    for (status, capture) in results {
        assert_eq!(status, 200);
        assert_eq!(capture.text, ndjson_body(&lines));
    }
    assert_eq!(generation.requests().await.len(), 8);
}

/// A custom route path replaces the default
#[tokio::test]
async fn test_e2e_custom_route() {
    let context = MockContextService::new().await;
    let generation = MockGenerationService::new().await;
    context.mock_no_context().await;
    generation.mock_stream(&generation_lines(&["ok"])).await;

    let mut config = test_config(&context.url(), &generation.url());
    config.server.route_path = "/bin/ollama/generate".to_string();
    let server = TestServer::start(config).await;

    let response = server.generate(SAMPLE_QUERY).await;
    assert_status(&response, 200);
    assert_status(&server.get("/generate").await, 404);
}

/// File changes under the watch root reach the enrichment endpoint
#[tokio::test(flavor = "multi_thread")]
async fn test_e2e_content_change_notification() {
    let enrichment = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/enrich"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&enrichment)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = NotifierConfig {
        enabled: true,
        endpoint: format!("{}/enrich", enrichment.uri()),
        ..NotifierConfig::default()
    };
    let notifier =
        ChangeNotifier::start(&config, &gateway_config::HttpConfig::default()).unwrap();

    assert_eq!(
        notifier.submit(ChangeEvent::new("/content/wknd/jcr:system/x", ChangeKind::Changed)),
        SubmitOutcome::Filtered
    );

    let watcher = ContentWatcher::start(dir.path(), notifier.handle()).unwrap();
    std::fs::write(dir.path().join("adventures.html"), "<h1>Surf</h1>").unwrap();

    let server = &enrichment;
    let delivered = wait_for(
        || async {
            server
                .received_requests()
                .await
                .unwrap_or_default()
                .iter()
                .filter_map(|r| serde_json::from_slice::<serde_json::Value>(&r.body).ok())
                .any(|body| body["path"] == "/content/adventures.html")
        },
        Duration::from_secs(5),
    )
    .await;

    watcher.stop().await;
    let stats = notifier.shutdown().await;

    assert!(delivered, "change event was not delivered");
    assert!(stats.delivered >= 1);
}
