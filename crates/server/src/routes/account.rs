//! Session status and profile handlers.

use axum::Json;
use serde::Serialize;

use crate::middleware::{OptionalAccount, RequireAccount};

/// Response for `GET /check-auth`.
#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Profile entry for `GET /account`.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub email: String,
    pub nickname: String,
    pub verified: bool,
    pub picture: String,
}

/// Whether the caller is signed in. Never rejects.
///
/// # Route
///
/// `GET /check-auth`
pub async fn check_auth(OptionalAccount(caller): OptionalAccount) -> Json<AuthStatus> {
    let status = caller.map_or(
        AuthStatus {
            authenticated: false,
            email: None,
            name: None,
            picture: None,
        },
        |caller| AuthStatus {
            authenticated: true,
            email: Some(caller.user.email.to_string()),
            name: Some(caller.user.display_name().to_owned()),
            picture: Some(caller.user.picture.clone().unwrap_or_default()),
        },
    );
    Json(status)
}

/// The signed-in user's profile, as a one-element list.
///
/// # Route
///
/// `GET /account`
pub async fn profile(RequireAccount(caller): RequireAccount) -> Json<Vec<Profile>> {
    let user = caller.user;
    Json(vec![Profile {
        email: user.email.to_string(),
        nickname: user.display_nickname().to_owned(),
        verified: user.email_verified,
        picture: user.picture.unwrap_or_default(),
    }])
}
