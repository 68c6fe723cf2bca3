//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                        - Service status
//! GET    /health                  - Liveness
//! GET    /health/ready            - Readiness (store reachable)
//!
//! # Identity
//! GET    /login                   - Redirect to the identity provider
//! GET    /callback                - Provider callback (query)
//! POST   /callback                - Provider callback (form_post)
//! GET    /logout                  - Sign out
//! GET    /check-auth              - Who am I
//! GET    /account                 - Profile (requires auth)
//!
//! # Requests (requires auth)
//! GET    /requests                - Claimed-by-me and available
//! GET    /available-requests      - Open requests
//! GET    /deliver-personal-order  - Requests I created
//! GET    /check-order             - Do I have any request
//! POST   /create-request          - Create a request
//! POST   /fulfil-request          - Claim
//! GET    /my-commitments          - Requests I claimed
//! POST   /unfulfil-request        - Release a claim
//! POST   /complete-commitment     - Complete and delete
//! GET    /completed-request       - Delete my first request
//! DELETE /requests/{id}           - Delete my request
//!
//! # Chat (requires auth)
//! GET    /messages/{order_id}     - Thread for a request
//! POST   /send-message            - Post to a thread
//! GET    /my-chats                - Threads I take part in
//! ```

pub mod account;
pub mod auth;
pub mod chat;
pub mod requests;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;

use neighbourly_core::RequestId;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Unwrap a JSON body, reporting malformed input as `400`.
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Unwrap a numeric path segment as a request id.
pub(crate) fn path_id(segment: std::result::Result<Path<i64>, PathRejection>) -> Result<RequestId> {
    segment
        .map(|Path(id)| RequestId::new(id))
        .map_err(|_| AppError::BadRequest("Invalid request id".to_string()))
}

/// An `order_id` as clients send it: a number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderIdValue {
    Number(i64),
    Text(String),
}

impl OrderIdValue {
    /// Resolve to a request id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if a string value is not an integer.
    pub fn to_request_id(self) -> Result<RequestId> {
        match self {
            Self::Number(id) => Ok(RequestId::new(id)),
            Self::Text(raw) => raw
                .trim()
                .parse::<i64>()
                .map(RequestId::new)
                .map_err(|_| AppError::BadRequest(format!("Invalid order_id: {raw}"))),
        }
    }
}

/// Body of the claim, unclaim and complete endpoints.
#[derive(Debug, Deserialize)]
pub struct OrderIdBody {
    pub order_id: Option<OrderIdValue>,
}

impl OrderIdBody {
    /// The referenced request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if `order_id` is absent or malformed.
    pub fn order_id(self) -> Result<RequestId> {
        self.order_id
            .ok_or_else(|| AppError::BadRequest("order_id is required".to_string()))?
            .to_request_id()
    }
}

/// Service status.
async fn status() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Liveness check.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check: succeeds only if the store answers.
async fn readiness<S: Store>(State(state): State<AppState<S>>) -> impl IntoResponse {
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}

/// Identity provider routes.
fn identity_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/login", get(auth::login::<S>))
        .route(
            "/callback",
            get(auth::callback::<S>).post(auth::callback_form::<S>),
        )
        .route("/logout", get(auth::logout::<S>))
        .route("/check-auth", get(account::check_auth))
        .route("/account", get(account::profile))
}

/// Help request lifecycle routes.
fn request_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/requests", get(requests::overview::<S>))
        .route("/requests/{id}", delete(requests::delete::<S>))
        .route("/available-requests", get(requests::available::<S>))
        .route("/deliver-personal-order", get(requests::mine::<S>))
        .route("/check-order", get(requests::check_order::<S>))
        .route("/create-request", post(requests::create::<S>))
        .route("/fulfil-request", post(requests::claim::<S>))
        .route("/my-commitments", get(requests::commitments::<S>))
        .route("/unfulfil-request", post(requests::unclaim::<S>))
        .route("/complete-commitment", post(requests::complete::<S>))
        .route("/completed-request", get(requests::delete_first::<S>))
}

/// Chat routes.
fn chat_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/messages/{order_id}", get(chat::messages::<S>))
        .route("/send-message", post(chat::send::<S>))
        .route("/my-chats", get(chat::my_chats::<S>))
}

/// Create all API routes.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S>))
        .merge(identity_routes::<S>())
        .merge(request_routes::<S>())
        .merge(chat_routes::<S>())
}
