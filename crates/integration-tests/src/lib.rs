//! Integration test harness for Neighbourly.
//!
//! Drives the real axum router in-process with `tower::ServiceExt::oneshot`.
//! Help requests live in the server's `MemoryStore`, sessions in
//! `tower_sessions::MemoryStore`, and time is pinned with a `FixedClock`, so
//! no database, identity provider or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p neighbourly-integration-tests
//! ```
//!
//! # Signing in
//!
//! The identity provider is not contacted. [`TestApp::sign_in`] posts a
//! profile to a test-only route that writes it into the session exactly as
//! the `/callback` handler does, and returns the session cookie.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::{MemoryStore as SessionMemoryStore, Session};

use neighbourly_core::{ClaimPolicy, Email, FixedClock};
use neighbourly_server::config::{AppConfig, OidcConfig, SentryConfig};
use neighbourly_server::db::MemoryStore;
use neighbourly_server::identity::{OidcClient, ProviderMetadata};
use neighbourly_server::middleware::{session_layer, set_current_user};
use neighbourly_server::models::SessionUser;
use neighbourly_server::state::AppState;

/// Instant every test runs at.
pub const NOW: &str = "2026-05-01T09:00:00Z";

/// Frontend origin used by the test configuration.
pub const FRONTEND_URL: &str = "http://localhost:5173";

/// Identity provider issuer used by the test configuration.
pub const ISSUER_URL: &str = "https://id.neighbourly.test";

/// Route used by [`TestApp::sign_in`].
const SIGN_IN_PATH: &str = "/__test/sign-in";

/// Server configuration that never touches the environment.
#[must_use]
pub fn test_config(claim_policy: ClaimPolicy) -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        frontend_url: FRONTEND_URL.to_string(),
        extra_cors_origins: vec![],
        claim_policy,
        oidc: OidcConfig {
            issuer_url: ISSUER_URL.to_string(),
            client_id: "neighbourly-web".to_string(),
            client_secret: SecretString::from("kT9#vQ2!mZ7$wL4@"),
        },
        sentry: SentryConfig::default(),
    }
}

/// Provider endpoints, preloaded so discovery never runs.
#[must_use]
pub fn provider_metadata() -> ProviderMetadata {
    ProviderMetadata {
        issuer: ISSUER_URL.to_string(),
        authorization_endpoint: format!("{ISSUER_URL}/authorize"),
        token_endpoint: format!("{ISSUER_URL}/oauth/token"),
        userinfo_endpoint: format!("{ISSUER_URL}/userinfo"),
        end_session_endpoint: Some(format!("{ISSUER_URL}/v2/logout")),
    }
}

/// The fixed test instant.
#[must_use]
pub fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(NOW)
        .unwrap()
        .with_timezone(&Utc)
}

/// A profile as the identity provider would report it.
#[must_use]
pub fn profile(email: &str) -> SessionUser {
    let local = email.split('@').next().unwrap_or(email);
    SessionUser {
        email: Email::parse(email).unwrap(),
        name: Some(format!("{local} tester")),
        nickname: Some(local.to_string()),
        picture: None,
        email_verified: true,
    }
}

async fn sign_in_handler(session: Session, Json(user): Json<SessionUser>) -> StatusCode {
    match set_current_user(&session, &user).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// A response header as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The redirect target.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header(header::LOCATION.as_str())
    }

    /// The `name=value` part of the session cookie, if one was set.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.header(header::SET_COOKIE.as_str())
            .and_then(|c| c.split(';').next())
            .map(str::to_string)
    }
}

/// The application under test.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
    store: MemoryStore,
}

impl TestApp {
    /// An app with the default claim policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(ClaimPolicy::default())
    }

    /// An app with an explicit claim policy.
    #[must_use]
    pub fn with_policy(claim_policy: ClaimPolicy) -> Self {
        Self::build(claim_policy, provider_metadata())
    }

    /// An app whose identity provider is a local stub answering the token
    /// exchange with a fixed access token and userinfo with `profile`.
    pub async fn with_provider(profile: Value) -> Self {
        let provider = Router::new()
            .route(
                "/oauth/token",
                post(|| async { Json(serde_json::json!({"access_token": "stub-token"})) }),
            )
            .route("/userinfo", get(move || async move { Json(profile) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let issuer = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, provider).await });

        let metadata = ProviderMetadata {
            issuer: issuer.clone(),
            authorization_endpoint: format!("{issuer}/authorize"),
            token_endpoint: format!("{issuer}/oauth/token"),
            userinfo_endpoint: format!("{issuer}/userinfo"),
            end_session_endpoint: None,
        };
        Self::build(ClaimPolicy::default(), metadata)
    }

    fn build(claim_policy: ClaimPolicy, metadata: ProviderMetadata) -> Self {
        let config = test_config(claim_policy);
        let store = MemoryStore::new();
        let sessions = SessionMemoryStore::default();
        let oidc = OidcClient::with_metadata(&config.oidc, metadata);

        let sign_in = Router::new()
            .route(SIGN_IN_PATH, post(sign_in_handler))
            .layer(session_layer(sessions.clone(), &config));

        let state = AppState::with_parts(
            config.clone(),
            store.clone(),
            oidc,
            Arc::new(FixedClock(now())),
        );
        let router = neighbourly_server::app(state, session_layer(sessions, &config)).merge(sign_in);

        Self { router, store }
    }

    /// Direct access to the request store.
    #[must_use]
    pub const fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Sign in as `email` and return a client carrying the session cookie.
    pub async fn sign_in(&self, email: &str) -> Client {
        self.sign_in_as(profile(email)).await
    }

    /// Sign in with a full profile.
    pub async fn sign_in_as(&self, user: SessionUser) -> Client {
        let request = Request::builder()
            .method(Method::POST)
            .uri(SIGN_IN_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&user).unwrap()))
            .unwrap();
        let response = self.send(request).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);

        let cookie = response
            .session_cookie()
            .expect("sign-in should set a session cookie");

        Client {
            app: self.clone(),
            cookie: Some(cookie),
        }
    }

    /// A client without a session.
    #[must_use]
    pub fn anonymous(&self) -> Client {
        Client {
            app: self.clone(),
            cookie: None,
        }
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A browser session against the app.
#[derive(Clone)]
pub struct Client {
    app: TestApp,
    cookie: Option<String>,
}

impl Client {
    /// `GET path`.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    /// `POST path` with a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        self.request(Method::POST, path, Some(body.to_string())).await
    }

    /// `POST path` with a raw body sent as JSON.
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request(Method::POST, path, Some(body.to_string())).await
    }

    /// `POST path` with a urlencoded form body.
    pub async fn post_form(&self, path: &str, form: &str) -> TestResponse {
        let request = self
            .builder(Method::POST, path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.app.send(request).await
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(Method::DELETE, path, None).await
    }

    /// Send a hand-built request with this client's cookie attached.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let (mut parts, body) = request.into_parts();
        if let Some(cookie) = &self.cookie {
            parts.headers.insert(header::COOKIE, cookie.parse().unwrap());
        }
        self.app.send(Request::from_parts(parts, body)).await
    }

    /// Keep the session cookie a response set, as a browser would.
    pub fn remember(&mut self, response: &TestResponse) {
        if let Some(cookie) = response.session_cookie() {
            self.cookie = Some(cookie);
        }
    }

    fn builder(&self, method: Method, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn request(&self, method: Method, path: &str, body: Option<String>) -> TestResponse {
        let builder = self.builder(method, path);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.app.send(request).await
    }

    /// Create a request and return its id.
    pub async fn create_request(&self, body: &Value) -> i64 {
        let response = self.post("/create-request", body).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["id"].as_i64().unwrap()
    }
}

/// A valid create-request body with the given pickup date.
#[must_use]
pub fn request_body(collection_date: Option<&str>) -> Value {
    serde_json::json!({
        "message": "Need groceries",
        "lat": "51.5074",
        "lng": "-0.1278",
        "address": "10 High Street, London",
        "collectionTime": "1430",
        "collectionDate": collection_date,
        "items": [
            {"name": "Bread", "quantity": 2},
            {"name": "Milk", "quantity": 1}
        ]
    })
}
