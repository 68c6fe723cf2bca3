//! Integration tests for creating, browsing and deleting help requests.

use axum::http::StatusCode;
use serde_json::{Value, json};

use neighbourly_integration_tests::{TestApp, request_body};

fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_request_returns_full_view() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;

    let id = alice.create_request(&request_body(Some("2026-05-03"))).await;

    let mine = alice.get("/deliver-personal-order").await;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(
        mine.body,
        json!([{
            "id": id,
            "message": "Need groceries",
            "account_id": 1,
            "lat": "51.5074",
            "lng": "-0.1278",
            "address": "10 High Street, London",
            "collectionTime": "1430",
            "collectionDate": "2026-05-03",
            "items": [
                {"name": "Bread", "quantity": 2},
                {"name": "Milk", "quantity": 1}
            ],
            "fulfilled": null
        }])
    );
}

#[tokio::test]
async fn test_create_request_accepts_numeric_coordinates_and_blank_date() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;

    let mut body = request_body(Some(""));
    body["lat"] = json!(53.4808);
    body["lng"] = json!(-2.2426);
    alice.create_request(&body).await;

    let mine = alice.get("/deliver-personal-order").await;
    assert_eq!(mine.body[0]["lat"], "53.4808");
    assert_eq!(mine.body[0]["collectionDate"], Value::Null);
}

#[tokio::test]
async fn test_create_request_validation() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;

    let mut missing_message = request_body(None);
    missing_message["message"] = json!("   ");
    let mut bad_lat = request_body(None);
    bad_lat["lat"] = json!("91");
    let mut bad_date = request_body(None);
    bad_date["collectionDate"] = json!("next tuesday");
    let mut missing_time = request_body(None);
    missing_time
        .as_object_mut()
        .unwrap()
        .remove("collectionTime");

    for body in [missing_message, bad_lat, bad_date, missing_time] {
        let response = alice.post("/create-request", &body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response.body["error"].is_string());
    }

    let malformed = alice.post_raw("/create-request", "{not json").await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let check = alice.get("/check-order").await;
    assert_eq!(check.body, json!({"exists": false}));
}

// ============================================================================
// Browse
// ============================================================================

#[tokio::test]
async fn test_available_excludes_expired_and_claimed() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;

    let yesterday = alice.create_request(&request_body(Some("2026-04-30"))).await;
    let today = alice.create_request(&request_body(Some("2026-05-01"))).await;
    let undated = alice.create_request(&request_body(None)).await;
    let claimed = alice.create_request(&request_body(Some("2026-06-01"))).await;

    let claim = bob.post("/fulfil-request", &json!({"order_id": claimed})).await;
    assert_eq!(claim.status, StatusCode::OK);

    let available = bob.get("/available-requests").await;
    assert_eq!(available.status, StatusCode::OK);
    assert_eq!(ids(&available.body), vec![today, undated]);

    // The owner still sees everything they created, expired or not.
    let mine = alice.get("/deliver-personal-order").await;
    assert_eq!(ids(&mine.body), vec![yesterday, today, undated, claimed]);
}

#[tokio::test]
async fn test_overview_combines_claims_and_available() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;

    let first = alice.create_request(&request_body(None)).await;
    let second = alice.create_request(&request_body(None)).await;
    bob.post("/fulfil-request", &json!({"order_id": first})).await;

    let overview = bob.get("/requests").await;
    assert_eq!(overview.status, StatusCode::OK);
    assert_eq!(overview.body["claimed"][0]["id"], first);
    assert_eq!(overview.body["claimed"][0]["requester_email"], "alice@example.com");
    assert_eq!(ids(&overview.body["available"]), vec![second]);
}

#[tokio::test]
async fn test_check_order_reflects_ownership() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;

    alice.create_request(&request_body(None)).await;

    assert_eq!(alice.get("/check-order").await.body, json!({"exists": true}));
    assert_eq!(bob.get("/check-order").await.body, json!({"exists": false}));
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_own_request_by_id() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;

    let id = alice.create_request(&request_body(None)).await;

    let forbidden = bob.delete(&format!("/requests/{id}")).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let deleted = alice.delete(&format!("/requests/{id}")).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body, json!({"success": true}));

    let again = alice.delete(&format!("/requests/{id}")).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let bad_id = alice.delete("/requests/abc").await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_owner_may_delete_claimed_request() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;

    let id = alice.create_request(&request_body(None)).await;
    bob.post("/fulfil-request", &json!({"order_id": id})).await;

    let deleted = alice.delete(&format!("/requests/{id}")).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(bob.get("/my-commitments").await.body, json!([]));
}

#[tokio::test]
async fn test_completed_request_deletes_lowest_id() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;

    let first = alice.create_request(&request_body(None)).await;
    let second = alice.create_request(&request_body(None)).await;

    let response = alice.get("/completed-request").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"success": true, "id": first}));

    let mine = alice.get("/deliver-personal-order").await;
    assert_eq!(ids(&mine.body), vec![second]);

    alice.get("/completed-request").await;
    let none_left = alice.get("/completed-request").await;
    assert_eq!(none_left.status, StatusCode::NOT_FOUND);
}
