//! API Integration Tests
//!
//! Drives the router end to end against the in-process ledger.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use timelock_api::{create_router, create_test_router, ApiConfig, AppState};
use timelock_gateway::{GatewayConfig, LocalSimLedger, TransactionGateway};
use timelock_service::{EscrowConfig, EscrowLifecycleService};
use timelock_types::{AccountAddress, Drops};

const BUYER: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
const SELLER: &str = "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe";

fn setup() -> (LocalSimLedger, Router) {
    let sim = LocalSimLedger::new();
    sim.fund(&AccountAddress::parse(BUYER).unwrap(), "sBuyer", Drops::new(1_000_000_000));
    sim.fund(&AccountAddress::parse(SELLER).unwrap(), "sSeller", Drops::new(1_000_000_000));

    let gateway = TransactionGateway::local_sim(
        sim.clone(),
        GatewayConfig {
            poll_interval: Duration::from_millis(5),
            ..GatewayConfig::default()
        },
    );
    let config = EscrowConfig::from_settings("local-sim", BUYER, "sBuyer", SELLER, "sSeller").unwrap();
    let service = EscrowLifecycleService::new(Arc::new(gateway), config);
    let state = Arc::new(AppState::new(Arc::new(service)));

    (sim, create_test_router(state))
}

/// Test helper to make a request and get JSON response
async fn json_request(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body = match body {
        Some(json_body) => Body::from(serde_json::to_vec(&json_body).unwrap()),
        None => Body::empty(),
    };
    raw_request(router, method, uri, body).await
}

async fn raw_request(router: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(body)
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!(null));

    (status, json)
}

async fn create(router: &Router, refund_window: i64) -> i64 {
    let (status, body) = json_request(
        router,
        "POST",
        "/api/escrow/create",
        Some(json!({ "amount": 10, "invoiceId": "INV-1700000000000", "refundWindowSeconds": refund_window })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["escrowSequence"].as_i64().unwrap()
}

// =============================================================================
// Health
// =============================================================================

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_network() {
        let (_sim, router) = setup();

        for uri in ["/health", "/api/health"] {
            let (status, body) = json_request(&router, "GET", uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "ok");
            assert_eq!(body["network"], "local-sim");
            assert_eq!(body["connected"], false);
            assert!(body["timestamp"].is_string());
        }
    }

    #[tokio::test]
    async fn test_health_shows_connection_after_use() {
        let (_sim, router) = setup();
        create(&router, 120).await;

        let (_, body) = json_request(&router, "GET", "/health", None).await;
        assert_eq!(body["connected"], true);
    }
}

// =============================================================================
// Escrow lifecycle
// =============================================================================

mod escrow {
    use super::*;

    #[tokio::test]
    async fn test_create_escrow() {
        let (_sim, router) = setup();

        let (status, body) = json_request(
            &router,
            "POST",
            "/api/escrow/create",
            Some(json!({ "amount": 10, "invoiceId": "INV-1700000000000", "refundWindowSeconds": 120 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let hash = body["txHash"].as_str().unwrap();
        assert_eq!(hash.len(), 64);
        assert!(body["explorerUrl"].as_str().unwrap().contains(hash));
        assert!(body["escrowSequence"].as_i64().unwrap() > 0);
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_escrow_routes_served_without_api_prefix() {
        let (sim, router) = setup();

        let (status, body) = json_request(
            &router,
            "POST",
            "/escrow/create",
            Some(json!({ "amount": 10, "invoiceId": "INV-1", "refundWindowSeconds": 120 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        let sequence = body["escrowSequence"].as_i64().unwrap();

        sim.advance(Duration::from_secs(11));
        let (status, body) = json_request(
            &router,
            "POST",
            "/escrow/finish",
            Some(json!({ "escrowSequence": sequence })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], true);

        // Same contract for cancel: an unknown escrow is a ledger rejection, not a 404.
        let (status, body) = json_request(
            &router,
            "POST",
            "/escrow/cancel",
            Some(json!({ "escrowSequence": sequence })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_premature_finish_is_500() {
        let (_sim, router) = setup();
        let sequence = create(&router, 120).await;

        let (status, body) = json_request(
            &router,
            "POST",
            "/api/escrow/finish",
            Some(json!({ "escrowSequence": sequence })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("tecNO_PERMISSION"));
    }

    #[tokio::test]
    async fn test_finish_after_grace_period() {
        let (sim, router) = setup();
        let sequence = create(&router, 120).await;
        sim.advance(Duration::from_secs(11));

        let (status, body) = json_request(
            &router,
            "POST",
            "/api/escrow/finish",
            Some(json!({ "escrowSequence": sequence })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["txHash"].is_string());
        assert!(body.get("escrowSequence").is_none());
    }

    #[tokio::test]
    async fn test_cancel_after_refund_window() {
        let (sim, router) = setup();
        let sequence = create(&router, 30).await;
        sim.advance(Duration::from_secs(31));

        let (status, body) = json_request(
            &router,
            "POST",
            "/api/escrow/cancel",
            Some(json!({ "escrowSequence": sequence })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        // Already refunded.
        let (status, body) = json_request(
            &router,
            "POST",
            "/api/escrow/cancel",
            Some(json!({ "escrowSequence": sequence })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("tecNO_TARGET"));
    }
}

// =============================================================================
// Validation
// =============================================================================

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_invalid_amount() {
        let (_sim, router) = setup();

        for amount in [json!(0), json!(-1)] {
            let (status, body) = json_request(
                &router,
                "POST",
                "/api/escrow/create",
                Some(json!({ "amount": amount, "invoiceId": "INV-1", "refundWindowSeconds": 120 })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert!(body["error"].as_str().unwrap().starts_with("Invalid amount"));
        }
    }

    #[tokio::test]
    async fn test_invalid_refund_window() {
        let (_sim, router) = setup();

        let (status, body) = json_request(
            &router,
            "POST",
            "/api/escrow/create",
            Some(json!({ "amount": 10, "invoiceId": "INV-1", "refundWindowSeconds": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid refund window"));
    }

    #[tokio::test]
    async fn test_missing_sequence() {
        let (_sim, router) = setup();

        for uri in ["/api/escrow/finish", "/api/escrow/cancel"] {
            let (status, body) = json_request(&router, "POST", uri, Some(json!({}))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Escrow sequence required");

            let (status, _) =
                json_request(&router, "POST", uri, Some(json!({ "escrowSequence": 0 }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (_sim, router) = setup();

        let (status, body) =
            raw_request(&router, "POST", "/api/escrow/create", Body::from("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}

// =============================================================================
// Ledger failures
// =============================================================================

mod ledger {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_ledger_is_502() {
        let (sim, router) = setup();
        sim.set_offline(true);

        let (status, body) = json_request(
            &router,
            "POST",
            "/api/escrow/create",
            Some(json!({ "amount": 10, "invoiceId": "INV-1", "refundWindowSeconds": 120 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_full_router_serves_requests() {
        let sim = LocalSimLedger::new();
        let gateway = TransactionGateway::local_sim(sim, GatewayConfig::default());
        let config =
            EscrowConfig::from_settings("local-sim", BUYER, "sBuyer", SELLER, "sSeller").unwrap();
        let service = EscrowLifecycleService::new(Arc::new(gateway), config);
        let router = create_router(Arc::new(AppState::new(Arc::new(service))), ApiConfig::default());

        let (status, body) = json_request(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
