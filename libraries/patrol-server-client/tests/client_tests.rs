//! Tests for the patrol server client.
//!
//! These tests use mock servers to verify client behavior without
//! requiring a real server connection.

use chrono::Utc;
use patrol_core::{
    ItemKind, NetworkState, QueueId, QueueItem, ReachabilityProbe, RemoteDelivery,
};
use patrol_server_client::{ClientConfig, HttpReachability, PatrolApiClient, ServerClientError};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn item(id: i64, kind: ItemKind) -> QueueItem {
    QueueItem {
        id: QueueId::new(id),
        kind,
        payload: serde_json::json!({ "patrolId": "patrol-1", "tagId": "04:AA" }),
        created_at: Utc::now(),
        attempts: 0,
        last_error: None,
        dead_lettered_at: None,
    }
}

/// A local address nothing listens on
fn closed_port_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn client(server: &MockServer) -> PatrolApiClient {
    let config = ClientConfig::new(server.uri()).with_device_id("device-9");
    PatrolApiClient::new(config).unwrap()
}

// =============================================================================
// Delivery Tests
// =============================================================================

mod delivery {
    use super::*;

    #[tokio::test]
    async fn test_checkpoint_posts_with_idempotency_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/checkpoints"))
            .and(header("Idempotency-Key", "device-9:7"))
            .and(body_partial_json(serde_json::json!({
                "queueId": 7,
                "kind": "checkpoint",
                "payload": { "patrolId": "patrol-1" }
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .deliver(&item(7, ItemKind::Checkpoint))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_scan_log_uses_its_own_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/scan-logs"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).deliver(&item(3, ItemKind::ScanLog)).await.unwrap();
    }

    #[tokio::test]
    async fn test_bearer_token_sent_when_configured() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/checkpoints"))
            .and(header("Authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig::new(server.uri()).with_token("secret-token");
        PatrolApiClient::new(config)
            .unwrap()
            .deliver(&item(1, ItemKind::Checkpoint))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_auth_header_without_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        client(&server).deliver(&item(1, ItemKind::Checkpoint)).await.unwrap();
    }

    #[tokio::test]
    async fn test_conflict_means_already_delivered() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string("duplicate"))
            .mount(&server)
            .await;

        assert!(client(&server).deliver(&item(5, ItemKind::Checkpoint)).await.is_ok());
    }
}

// =============================================================================
// Failure Classification Tests
// =============================================================================

mod classification {
    use super::*;

    async fn deliver_with_status(status: u16) -> patrol_core::DeliveryError {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        client(&server)
            .deliver(&item(1, ItemKind::Checkpoint))
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_server_errors_are_transient() {
        for status in [500, 502, 503] {
            assert!(!deliver_with_status(status).await.is_permanent(), "{status}");
        }
    }

    #[tokio::test]
    async fn test_throttling_is_transient() {
        assert!(!deliver_with_status(429).await.is_permanent());
        assert!(!deliver_with_status(408).await.is_permanent());
    }

    #[tokio::test]
    async fn test_validation_rejection_is_permanent() {
        let err = deliver_with_status(422).await;
        assert!(err.is_permanent());
        assert!(err.message().contains("422"));
        assert!(err.message().contains("nope"));

        assert!(deliver_with_status(400).await.is_permanent());
        assert!(deliver_with_status(404).await.is_permanent());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let client = PatrolApiClient::new(ClientConfig::new(closed_port_uri())).unwrap();
        let err = client.deliver(&item(1, ItemKind::Checkpoint)).await.unwrap_err();
        assert!(!err.is_permanent());
    }

    #[tokio::test]
    async fn test_submit_exposes_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        match client(&server).submit(&item(1, ItemKind::Checkpoint)).await {
            Err(ServerClientError::ServerError { status, .. }) => assert_eq!(status, 403),
            other => panic!("Expected ServerError, got {other:?}"),
        }
    }
}

// =============================================================================
// Reachability Tests
// =============================================================================

mod reachability {
    use super::*;

    #[tokio::test]
    async fn test_healthy_server_is_online() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = HttpReachability::new(&server.uri(), Duration::from_secs(2)).unwrap();
        assert_eq!(probe.probe().await, NetworkState::ONLINE);
    }

    #[tokio::test]
    async fn test_unhealthy_server_is_connected_but_unreachable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = HttpReachability::new(&server.uri(), Duration::from_secs(2)).unwrap();
        assert_eq!(probe.probe().await, NetworkState::new(true, false));
    }

    #[tokio::test]
    async fn test_slow_server_is_connected_but_unreachable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let probe = HttpReachability::new(&server.uri(), Duration::from_millis(300)).unwrap();
        assert_eq!(probe.probe().await, NetworkState::new(true, false));
    }

    #[tokio::test]
    async fn test_no_server_is_offline() {
        let probe = HttpReachability::new(&closed_port_uri(), Duration::from_secs(2)).unwrap();
        assert_eq!(probe.probe().await, NetworkState::OFFLINE);
    }
}
