//! `OpenID` Connect login, callback and logout.
//!
//! - Login: stores a CSRF `state` and redirects to the provider
//! - Callback: validates `state`, exchanges the code, stores the profile
//! - Logout: flushes the session and redirects through the provider's logout
//!
//! Failures redirect to `{frontend}/?error=<code>` so the web app can show
//! a message; they never render an error page from the API.

use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::db::Store;
use crate::error::clear_sentry_user;
use crate::identity::generate_state;
use crate::middleware::set_current_user;
use crate::models::{SessionUser, session_keys};
use crate::state::AppState;

/// Parameters the provider sends back to `/callback`.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

fn frontend_error<S: Store>(state: &AppState<S>, code: &str) -> Response {
    Redirect::to(&format!("{}/?error={code}", state.config().frontend_url)).into_response()
}

/// Start the login flow.
///
/// # Route
///
/// `GET /login`
pub async fn login<S: Store>(State(state): State<AppState<S>>, session: Session) -> Response {
    let oauth_state = generate_state();

    if let Err(e) = session.insert(session_keys::OIDC_STATE, &oauth_state).await {
        tracing::error!("Failed to store OAuth state in session: {}", e);
        return frontend_error(&state, "session");
    }

    let redirect_uri = state.config().callback_url();
    match state
        .oidc()
        .authorization_url(&redirect_uri, &oauth_state)
        .await
    {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            tracing::error!("Failed to build authorization URL: {}", e);
            frontend_error(&state, e.code())
        }
    }
}

/// Provider callback via query string.
///
/// # Route
///
/// `GET /callback`
pub async fn callback<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Response {
    complete_login(&state, &session, params).await
}

/// Provider callback via `response_mode=form_post`.
///
/// # Route
///
/// `POST /callback`
pub async fn callback_form<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Form(params): Form<CallbackParams>,
) -> Response {
    complete_login(&state, &session, params).await
}

async fn complete_login<S: Store>(
    state: &AppState<S>,
    session: &Session,
    params: CallbackParams,
) -> Response {
    // Check for OAuth errors from the provider
    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        tracing::warn!("OAuth error: {} - {}", error, description);
        return frontend_error(state, "access_denied");
    }

    let Some(code) = params.code else {
        tracing::warn!("OAuth callback missing code");
        return frontend_error(state, "missing_code");
    };

    // Verify state parameter (CSRF protection), one-time use
    let stored_state: Option<String> = session
        .remove(session_keys::OIDC_STATE)
        .await
        .ok()
        .flatten();
    if params.state.is_none() || stored_state != params.state {
        tracing::warn!("OAuth state mismatch");
        return frontend_error(state, "invalid_state");
    }

    let redirect_uri = state.config().callback_url();
    let profile = match state.oidc().exchange_code(&code, &redirect_uri).await {
        Ok(access_token) => state.oidc().user_info(&access_token).await,
        Err(e) => Err(e),
    };
    let profile = match profile {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!("Failed to complete OAuth login: {}", e);
            return frontend_error(state, e.code());
        }
    };

    let user = match SessionUser::from_user_info(profile) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(reason = e.code(), "Identity provider profile rejected");
            return frontend_error(state, e.code());
        }
    };

    // New session id on privilege change
    if let Err(e) = session.cycle_id().await {
        tracing::error!("Failed to cycle session id: {}", e);
        return frontend_error(state, "session");
    }
    if let Err(e) = set_current_user(session, &user).await {
        tracing::error!("Failed to store user in session: {}", e);
        return frontend_error(state, "session");
    }

    tracing::info!(email = %user.email, "User signed in");
    Redirect::to(&format!("{}/makerequest", state.config().frontend_url)).into_response()
}

/// Sign out.
///
/// # Route
///
/// `GET /logout`
pub async fn logout<S: Store>(State(state): State<AppState<S>>, session: Session) -> Response {
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }
    clear_sentry_user();

    let frontend = &state.config().frontend_url;
    match state.oidc().logout_url(frontend).await {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            tracing::warn!("Provider logout unavailable: {}", e);
            Redirect::to(frontend).into_response()
        }
    }
}
