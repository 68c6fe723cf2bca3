//! Authentication extractors.
//!
//! The session holds the provider profile; the account row is looked up (or
//! provisioned on first visit) from its email on every authenticated request.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use neighbourly_core::Account;

use crate::db::Store;
use crate::error::{AppError, set_sentry_user};
use crate::models::{SessionUser, session_keys};
use crate::state::AppState;

/// The authenticated caller: session profile plus resolved account.
#[derive(Debug, Clone)]
pub struct CurrentAccount {
    pub account: Account,
    pub user: SessionUser,
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAccount(caller): RequireAccount) -> impl IntoResponse {
///     format!("Hello, {}!", caller.account.email)
/// }
/// ```
pub struct RequireAccount(pub CurrentAccount);

/// Error returned when authentication is required but absent.
#[derive(Debug)]
pub enum AuthRejection {
    /// No session, no user in it, or an unverified email.
    Unauthorized,
    /// The account could not be resolved.
    Failed(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            Self::Failed(err) => err.into_response(),
        }
    }
}

impl<S: Store> FromRequestParts<AppState<S>> for RequireAccount {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;

        let account = resolve_account(state, &user)
            .await
            .map_err(AuthRejection::Failed)?;

        Ok(Self(CurrentAccount { account, user }))
    }
}

/// Extractor that optionally resolves the signed-in user.
pub struct OptionalAccount(pub Option<CurrentAccount>);

impl<S: Store> FromRequestParts<AppState<S>> for OptionalAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let Some(user) = session_user(parts).await else {
            return Ok(Self(None));
        };
        let account = resolve_account(state, &user).await?;
        Ok(Self(Some(CurrentAccount { account, user })))
    }
}

async fn session_user(parts: &Parts) -> Option<SessionUser> {
    // Get the session from extensions (set by SessionManagerLayer)
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<SessionUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
        .filter(|user| user.email_verified)
}

async fn resolve_account<S: Store>(
    state: &AppState<S>,
    user: &SessionUser,
) -> Result<Account, AppError> {
    let account = state.store().find_or_create_account(&user.email).await?;
    set_sentry_user(&account.id, account.email.as_str());
    Ok(account)
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &SessionUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}
