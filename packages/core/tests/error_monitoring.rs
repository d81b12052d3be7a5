//! Monitoring webhook delivery from the error pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use elkkana_portal::config::FeatureFlags;
use elkkana_portal::handler::{ErrorHandler, WebhookMonitoringSink};
use elkkana_portal::navigation::RecordingNavigator;
use elkkana_portal::session::MemorySessionStorage;

fn handler(error_tracking: bool, sink_url: String) -> ErrorHandler {
    ErrorHandler::new(
        FeatureFlags {
            detailed_diagnostics: false,
            error_tracking,
        },
        10,
        Arc::new(MemorySessionStorage::new()),
        Arc::new(RecordingNavigator::default()),
    )
    .with_monitoring_sink(Arc::new(WebhookMonitoringSink::new(sink_url)))
}

/// Wait for the detached report task to reach the server.
async fn received(server: &MockServer, expected: usize) -> Vec<wiremock::Request> {
    for _ in 0..50 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.len() >= expected {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.received_requests().await.unwrap_or_default()
}

#[tokio::test]
async fn classified_error_is_posted_when_tracking_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/errors"))
        .and(body_partial_json(json!({
            "service": "elkkana-portal",
            "error": { "type": "server", "severity": "error" }
        })))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let handler = handler(true, format!("{}/errors", server.uri()));
    handler
        .handle(json!({ "message": "Upstream unavailable", "code": 503 }))
        .await;

    let requests = received(&server, 1).await;
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["error"]["message"], "Upstream unavailable");
}

#[tokio::test]
async fn rejected_report_does_not_reenter_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let handler = handler(true, server.uri());
    handler.handle("Profile save failed").await;
    received(&server, 1).await;

    assert_eq!(handler.total_recorded().await, 1);
}

#[tokio::test]
async fn nothing_is_posted_when_tracking_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let handler = handler(false, server.uri());
    handler.handle("Profile save failed").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(handler.history().await.len(), 1);
}
