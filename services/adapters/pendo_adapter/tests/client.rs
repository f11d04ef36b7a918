//! Client behaviour against a mocked Pendo API

use mockito::{Matcher, Server, ServerGuard};
use pendo_adapter::{PendoAdapterConfig, PendoClient, PendoError, RetryPolicy};
use serde_json::json;
use std::time::Duration;
use types::{EntityKind, GuideEventKind, TimeWindow, MS_PER_DAY};

fn client_for(server: &ServerGuard) -> PendoClient {
    let config = PendoAdapterConfig {
        api_key: "0123456789-test-key".to_string(),
        base_url: server.url(),
        rate_limit_per_minute: 6000,
        ..Default::default()
    };

    PendoClient::new(config)
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        })
}

#[tokio::test]
async fn test_list_sends_integration_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/guide")
        .match_header("x-pendo-integration-key", "0123456789-test-key")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {"id": "g1", "name": "Welcome", "state": "public", "steps": [{"id": "s1"}]},
                {"name": "broken, no id"}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let guides = client.list_guides().await.unwrap();

    mock.assert_async().await;
    assert_eq!(guides.items.len(), 1);
    assert_eq!(guides.skipped, 1);
    assert_eq!(guides.items[0].0.id, "g1");
    assert_eq!(guides.items[0].1["name"], "Welcome");
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/api/v1/feature")
        .with_status(503)
        .with_body("upstream busy")
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.list(EntityKind::Feature).await.unwrap_err();

    failing.assert_async().await;
    match err {
        PendoError::Http { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "HTTP 503: upstream busy");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/page")
        .with_status(401)
        .with_body(r#"{"message":"invalid integration key"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.list(EntityKind::Page).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, PendoError::Unauthorized { status: 401, ref message } if message == "invalid integration key"));
}

#[tokio::test]
async fn test_non_array_list_is_decode_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v1/report")
        .with_status(200)
        .with_body(r#"{"unexpected": true}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.list(EntityKind::Report).await.unwrap_err();
    assert!(matches!(err, PendoError::Decode { .. }));
}

#[tokio::test]
async fn test_guide_events_aggregation() {
    let mut server = Server::new_async().await;
    let window = TimeWindow {
        first_day: 100 * MS_PER_DAY,
        days: 7,
    };

    let mock = server
        .mock("POST", "/api/v1/aggregation")
        .match_body(Matcher::PartialJson(json!({
            "response": {"mimeType": "application/json"},
            "request": {"pipeline": [{"source": {
                "guideEvents": {"guideId": "g1"},
                "timeSeries": {"period": "dayRange", "first": 100 * MS_PER_DAY, "count": 7}
            }}]}
        })))
        .with_status(200)
        .with_body(
            json!({"results": [
                {"guideId": "g1", "guideStepId": "s1", "visitorId": "v1",
                 "type": "guideSeen", "browserTime": 100 * MS_PER_DAY + 5},
                {"guideId": "g1", "guideStepId": "s1", "visitorId": "v1",
                 "type": "guideAdvanced", "browserTime": 100 * MS_PER_DAY + 9}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let events = client.guide_events("g1", window).await.unwrap();

    mock.assert_async().await;
    assert_eq!(events.skipped, 0);
    assert_eq!(events.items.len(), 2);
    assert_eq!(events.items[1].kind, GuideEventKind::Advanced);
}

#[tokio::test]
async fn test_feature_usage_aggregation() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/aggregation")
        .match_body(Matcher::PartialJson(json!({
            "request": {"pipeline": [{"source": {"featureEvents": null}}]}
        })))
        .with_status(200)
        .with_body(
            json!({"results": [
                {"featureId": "f1", "visitorId": "v1", "day": MS_PER_DAY,
                 "numEvents": 4, "rageClickCount": 1}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let usage = client
        .feature_events(TimeWindow {
            first_day: MS_PER_DAY,
            days: 1,
        })
        .await
        .unwrap();

    assert_eq!(usage.items.len(), 1);
    assert_eq!(usage.items[0].target_id, "f1");
    assert_eq!(usage.items[0].rage_clicks, 1);
}

#[tokio::test]
async fn test_api_status_masks_key() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v1/guide")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let client = client_for(&server);
    let status = client.api_status().await;

    assert!(status.connected);
    assert_eq!(status.api_key_prefix.as_deref(), Some("0123456789..."));
    assert_eq!(status.working_endpoints.len(), 6);
    assert_eq!(status.base_url, server.url());
}

#[tokio::test]
async fn test_connection_failure_reported_as_false() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v1/guide")
        .with_status(403)
        .create_async()
        .await;

    let client = client_for(&server);
    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn test_data_overview_samples_first_item() {
    let mut server = Server::new_async().await;
    for (path, body) in [
        ("/api/v1/guide", json!([{"id": "g1"}, {"id": "g2"}])),
        ("/api/v1/feature", json!([{"id": "f1"}])),
        ("/api/v1/page", json!([])),
        ("/api/v1/report", json!([{"id": "r1"}])),
    ] {
        server
            .mock("GET", path)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;
    }

    let client = client_for(&server);
    let overview = client.data_overview().await;

    assert!(overview.error.is_none());
    let guides = overview.summary(EntityKind::Guide).unwrap();
    assert_eq!(guides.count, 2);
    assert_eq!(guides.sample.as_ref().unwrap()["id"], "g1");
    assert!(overview.summary(EntityKind::Page).unwrap().sample.is_none());
}

#[tokio::test]
async fn test_data_overview_reports_errors() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v1/guide")
        .with_status(400)
        .with_body(r#"{"message":"bad request"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let overview = client.data_overview().await;

    assert!(overview.entities.is_empty());
    assert!(overview.error.unwrap().contains("bad request"));
}

#[test]
fn test_empty_key_rejected() {
    let err = PendoClient::new(PendoAdapterConfig::default()).unwrap_err();
    assert!(matches!(err, PendoError::Configuration(_)));
}

#[tokio::test]
async fn test_rate_limit_honours_retry_after() {
    let mut server = Server::new_async().await;
    let limited = server
        .mock("GET", "/api/v1/page")
        .with_status(429)
        .with_header("retry-after", "0")
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/api/v1/page")
        .with_status(200)
        .with_body(json!([{"id": "p1", "name": "Home"}]).to_string())
        .expect(1)
        .create_async()
        .await;

    // Backoff alone would wait 30s; the header says retry immediately
    let client = client_for(&server).with_retry_policy(RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_secs(30),
        max_delay: Duration::from_secs(60),
    });

    let pages = tokio::time::timeout(Duration::from_secs(5), client.list_pages())
        .await
        .expect("Retry-After: 0 should skip the backoff")
        .unwrap();

    limited.assert_async().await;
    ok.assert_async().await;
    assert_eq!(pages.items.len(), 1);
    assert_eq!(pages.items[0].0.id, "p1");
}

#[tokio::test]
async fn test_metadata_schemas() {
    let mut server = Server::new_async().await;
    let guide_schema = server
        .mock("GET", "/api/v1/metadata/schema/guide")
        .with_status(200)
        .with_body(json!({"agent": {"name": {"Type": "string"}}}).to_string())
        .create_async()
        .await;
    let visitor_schema = server
        .mock("GET", "/api/v1/metadata/schema/visitor")
        .with_status(200)
        .with_body(json!({"auto": {"lastvisit": {"Type": "time"}}}).to_string())
        .create_async()
        .await;

    let client = client_for(&server);

    let guide = client.guide_schema().await.unwrap();
    assert_eq!(guide["agent"]["name"]["Type"], "string");

    let visitor = client.visitor_schema().await.unwrap();
    assert_eq!(visitor["auto"]["lastvisit"]["Type"], "time");

    guide_schema.assert_async().await;
    visitor_schema.assert_async().await;
}
