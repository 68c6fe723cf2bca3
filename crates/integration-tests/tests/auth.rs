//! Integration tests for sign-in, session status and the service surface.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use neighbourly_integration_tests::{
    Client, FRONTEND_URL, ISSUER_URL, TestApp, profile, request_body,
};

/// Value of a query parameter in a redirect URL.
fn query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
}

// ============================================================================
// Authentication required
// ============================================================================

#[tokio::test]
async fn test_protected_routes_return_json_401() {
    let app = TestApp::new();
    let anonymous = app.anonymous();

    for path in [
        "/requests",
        "/available-requests",
        "/deliver-personal-order",
        "/check-order",
        "/my-commitments",
        "/completed-request",
        "/messages/1",
        "/my-chats",
        "/account",
    ] {
        let response = anonymous.get(path).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(response.body, json!({"error": "Unauthorized"}), "{path}");
    }

    for path in [
        "/create-request",
        "/fulfil-request",
        "/unfulfil-request",
        "/complete-commitment",
        "/send-message",
    ] {
        let response = anonymous.post(path, &json!({"order_id": 1})).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{path}");
    }

    let delete = anonymous.delete("/requests/1").await;
    assert_eq!(delete.status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Session status
// ============================================================================

#[tokio::test]
async fn test_check_auth_anonymous() {
    let app = TestApp::new();
    let response = app.anonymous().get("/check-auth").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"authenticated": false}));
}

#[tokio::test]
async fn test_check_auth_and_account_when_signed_in() {
    let app = TestApp::new();
    let mut user = profile("sam@example.com");
    user.name = None;
    user.picture = Some("https://cdn.example.com/sam.png".to_string());
    let sam = app.sign_in_as(user).await;

    let status = sam.get("/check-auth").await;
    assert_eq!(
        status.body,
        json!({
            "authenticated": true,
            "email": "sam@example.com",
            "name": "sam",
            "picture": "https://cdn.example.com/sam.png"
        })
    );

    let account = sam.get("/account").await;
    assert_eq!(account.status, StatusCode::OK);
    assert_eq!(
        account.body,
        json!([{
            "email": "sam@example.com",
            "nickname": "sam",
            "verified": true,
            "picture": "https://cdn.example.com/sam.png"
        }])
    );
}

// ============================================================================
// Identity provider flow
// ============================================================================

#[tokio::test]
async fn test_login_redirects_to_provider_with_state() {
    let app = TestApp::new();
    let response = app.anonymous().get("/login").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let location = response.location().unwrap();
    assert!(location.starts_with(&format!("{ISSUER_URL}/authorize?")));
    assert_eq!(query_param(location, "client_id").unwrap(), "neighbourly-web");
    assert_eq!(
        query_param(location, "redirect_uri").unwrap(),
        "http%3A%2F%2Flocalhost%3A3000%2Fcallback"
    );
    assert_eq!(query_param(location, "state").unwrap().len(), 32);
    assert!(response.session_cookie().is_some());
}

#[tokio::test]
async fn test_callback_rejects_mismatched_state() {
    let app = TestApp::new();
    let mut browser = app.anonymous();

    let login = browser.get("/login").await;
    browser.remember(&login);

    let callback = browser.get("/callback?code=abc&state=forged").await;
    assert_eq!(callback.status, StatusCode::SEE_OTHER);
    assert_eq!(
        callback.location().unwrap(),
        format!("{FRONTEND_URL}/?error=invalid_state")
    );

    // Still signed out.
    let status = browser.get("/check-auth").await;
    assert_eq!(status.body["authenticated"], false);
}

#[tokio::test]
async fn test_callback_reports_provider_errors() {
    let app = TestApp::new();
    let browser = app.anonymous();

    let denied = browser
        .post_form("/callback", "error=access_denied&error_description=User+cancelled")
        .await;
    assert_eq!(denied.status, StatusCode::SEE_OTHER);
    assert_eq!(
        denied.location().unwrap(),
        format!("{FRONTEND_URL}/?error=access_denied")
    );

    let no_code = browser.get("/callback?state=abc").await;
    assert_eq!(
        no_code.location().unwrap(),
        format!("{FRONTEND_URL}/?error=missing_code")
    );
}

/// Run `/login` then `/callback` against the stub provider.
async fn sign_in_through_provider(app: &TestApp) -> (Client, String) {
    let mut browser = app.anonymous();
    let login = browser.get("/login").await;
    browser.remember(&login);
    let state = query_param(login.location().unwrap(), "state").unwrap();

    let callback = browser
        .get(&format!("/callback?code=abc&state={state}"))
        .await;
    browser.remember(&callback);
    (browser, callback.location().unwrap().to_string())
}

#[tokio::test]
async fn test_callback_signs_in_verified_profile() {
    let app = TestApp::with_provider(json!({
        "sub": "auth0|1",
        "email": "alice@example.com",
        "email_verified": true,
        "name": "Alice"
    }))
    .await;

    let (browser, location) = sign_in_through_provider(&app).await;
    assert_eq!(location, format!("{FRONTEND_URL}/makerequest"));

    let status = browser.get("/check-auth").await;
    assert_eq!(status.body["authenticated"], true);
    assert_eq!(status.body["email"], "alice@example.com");
}

#[tokio::test]
async fn test_callback_rejects_unverified_email() {
    let app = TestApp::with_provider(json!({
        "sub": "auth0|2",
        "email": "alice@example.com",
        "email_verified": false
    }))
    .await;

    let (browser, location) = sign_in_through_provider(&app).await;
    assert_eq!(location, format!("{FRONTEND_URL}/?error=unverified_email"));
    assert_eq!(browser.get("/check-auth").await.body["authenticated"], false);
}

#[tokio::test]
async fn test_unverified_session_cannot_reach_account_data() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    let id = alice.create_request(&request_body(None)).await;

    let mut impostor = profile("alice@example.com");
    impostor.email_verified = false;
    let impostor = app.sign_in_as(impostor).await;

    let messages = impostor.get(&format!("/messages/{id}")).await;
    assert_eq!(messages.status, StatusCode::UNAUTHORIZED);
    let delete = impostor.delete(&format!("/requests/{id}")).await;
    assert_eq!(delete.status, StatusCode::UNAUTHORIZED);
    assert_eq!(impostor.get("/check-auth").await.body["authenticated"], false);

    // Alice's request is untouched.
    let mine = alice.get("/deliver-personal-order").await;
    assert_eq!(mine.body[0]["id"], id);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new();
    let alice = app.sign_in("alice@example.com").await;
    assert_eq!(alice.get("/check-auth").await.body["authenticated"], true);

    let logout = alice.get("/logout").await;
    assert_eq!(logout.status, StatusCode::SEE_OTHER);
    let location = logout.location().unwrap();
    assert!(location.starts_with(&format!("{ISSUER_URL}/v2/logout?")));
    assert_eq!(
        query_param(location, "post_logout_redirect_uri").unwrap(),
        "http%3A%2F%2Flocalhost%3A5173"
    );

    assert_eq!(alice.get("/check-auth").await.body["authenticated"], false);
}

// ============================================================================
// Service surface
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let client = app.anonymous();

    let status = client.get("/").await;
    assert_eq!(status.body, json!({"status": "healthy"}));

    let live = client.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    let ready = client.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_every_response_has_request_id() {
    let app = TestApp::new();
    let client = app.anonymous();

    let generated = client.get("/health").await;
    assert_eq!(generated.header("x-request-id").unwrap().len(), 36);

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-1234")
        .body(Body::empty())
        .unwrap();
    let echoed = client.send(request).await;
    assert_eq!(echoed.header("x-request-id"), Some("edge-1234"));
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend_with_credentials() {
    let app = TestApp::new();
    let client = app.anonymous();

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/create-request")
        .header(header::ORIGIN, FRONTEND_URL)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = client.send(preflight).await;

    assert!(response.status.is_success());
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some(FRONTEND_URL)
    );
    assert_eq!(
        response.header("access-control-allow-credentials"),
        Some("true")
    );

    let foreign = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = client.send(foreign).await;
    assert_eq!(response.header("access-control-allow-origin"), None);
}
