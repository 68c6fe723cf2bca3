//! Integration tests for the claim, release and completion lifecycle.

use axum::http::StatusCode;
use serde_json::json;

use neighbourly_core::ClaimPolicy;
use neighbourly_integration_tests::{TestApp, request_body};

#[tokio::test]
async fn test_claim_unclaim_complete_flow() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;

    let id = alice.create_request(&request_body(None)).await;

    let claim = bob.post("/fulfil-request", &json!({"order_id": id})).await;
    assert_eq!(claim.status, StatusCode::OK);
    assert_eq!(claim.body, json!({"success": true, "order_id": id}));

    let commitments = bob.get("/my-commitments").await;
    assert_eq!(commitments.body[0]["id"], id);
    assert_eq!(commitments.body[0]["fulfilled"], 2);
    assert_eq!(commitments.body[0]["requester_email"], "alice@example.com");

    // Claimed requests disappear from the browse list.
    assert_eq!(bob.get("/available-requests").await.body, json!([]));

    let release = bob.post("/unfulfil-request", &json!({"order_id": id})).await;
    assert_eq!(release.status, StatusCode::OK);
    assert_eq!(release.body, json!({"success": true}));
    assert_eq!(bob.get("/available-requests").await.body[0]["id"], id);

    bob.post("/fulfil-request", &json!({"order_id": id})).await;
    let done = bob
        .post("/complete-commitment", &json!({"order_id": id}))
        .await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.body, json!({"success": true}));

    assert_eq!(alice.get("/deliver-personal-order").await.body, json!([]));
    assert_eq!(bob.get("/my-commitments").await.body, json!([]));
}

#[tokio::test]
async fn test_order_id_as_string() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;

    let id = alice.create_request(&request_body(None)).await;

    let claim = bob
        .post("/fulfil-request", &json!({"order_id": id.to_string()}))
        .await;
    assert_eq!(claim.status, StatusCode::OK);
    assert_eq!(claim.body["order_id"], id);
}

#[tokio::test]
async fn test_missing_or_unknown_order_id() {
    let app = TestApp::new();
    let bob = app.sign_in("bob@example.com").await;

    for path in ["/fulfil-request", "/unfulfil-request", "/complete-commitment"] {
        let missing = bob.post(path, &json!({})).await;
        assert_eq!(missing.status, StatusCode::BAD_REQUEST, "{path}");

        let unknown = bob.post(path, &json!({"order_id": 999})).await;
        assert_eq!(unknown.status, StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn test_only_claimant_may_release_or_complete() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;
    let carol = app.sign_in("carol@example.com").await;

    let id = alice.create_request(&request_body(None)).await;
    bob.post("/fulfil-request", &json!({"order_id": id})).await;

    for caller in [&alice, &carol] {
        let release = caller
            .post("/unfulfil-request", &json!({"order_id": id}))
            .await;
        assert_eq!(release.status, StatusCode::FORBIDDEN);

        let complete = caller
            .post("/complete-commitment", &json!({"order_id": id}))
            .await;
        assert_eq!(complete.status, StatusCode::FORBIDDEN);
    }

    // Still claimed by bob.
    assert_eq!(bob.get("/my-commitments").await.body[0]["id"], id);
}

#[tokio::test]
async fn test_reclaim_by_claimant_is_idempotent() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;

    let id = alice.create_request(&request_body(None)).await;
    for _ in 0..2 {
        let claim = bob.post("/fulfil-request", &json!({"order_id": id})).await;
        assert_eq!(claim.status, StatusCode::OK);
    }
}

// ============================================================================
// Claim policy
// ============================================================================

#[tokio::test]
async fn test_reject_policy_refuses_second_claimant_and_owner() {
    let app = TestApp::with_policy(ClaimPolicy::Reject);
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;
    let carol = app.sign_in("carol@example.com").await;

    let id = alice.create_request(&request_body(None)).await;

    let own = alice.post("/fulfil-request", &json!({"order_id": id})).await;
    assert_eq!(own.status, StatusCode::FORBIDDEN);

    bob.post("/fulfil-request", &json!({"order_id": id})).await;
    let second = carol.post("/fulfil-request", &json!({"order_id": id})).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body, json!({"error": "Request already claimed"}));

    assert_eq!(bob.get("/my-commitments").await.body[0]["id"], id);
    assert_eq!(carol.get("/my-commitments").await.body, json!([]));
}

#[tokio::test]
async fn test_overwrite_policy_replaces_claimant() {
    let app = TestApp::with_policy(ClaimPolicy::Overwrite);
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;
    let carol = app.sign_in("carol@example.com").await;

    let id = alice.create_request(&request_body(None)).await;

    bob.post("/fulfil-request", &json!({"order_id": id})).await;
    let takeover = carol.post("/fulfil-request", &json!({"order_id": id})).await;
    assert_eq!(takeover.status, StatusCode::OK);

    assert_eq!(bob.get("/my-commitments").await.body, json!([]));
    assert_eq!(carol.get("/my-commitments").await.body[0]["id"], id);

    // The owner may claim their own request under this policy.
    let own = alice.post("/fulfil-request", &json!({"order_id": id})).await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(alice.get("/my-commitments").await.body[0]["id"], id);
}
