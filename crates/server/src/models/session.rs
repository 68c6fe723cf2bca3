//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use neighbourly_core::Email;

use crate::identity::UserInfo;

/// Why a provider profile cannot sign anyone in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// No email claim, or one that does not parse.
    MissingEmail,
    /// The provider has not verified the email.
    UnverifiedEmail,
}

impl ProfileError {
    /// Short code reported to the frontend as `?error=<code>`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingEmail => "missing_email",
            Self::UnverifiedEmail => "unverified_email",
        }
    }
}

/// Profile of the signed-in user, as reported by the identity provider.
///
/// Stored in the session at login; the account row is resolved from
/// `email` on each authenticated request. Accounts are keyed by email, so a
/// profile only authenticates while `email_verified` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: Email,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
}

impl SessionUser {
    /// Build from provider claims.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` unless the claims carry a well-formed email
    /// with `email_verified: true`.
    pub fn from_user_info(info: UserInfo) -> Result<Self, ProfileError> {
        let email = info
            .email
            .as_deref()
            .and_then(|raw| Email::parse(raw).ok())
            .ok_or(ProfileError::MissingEmail)?;
        if info.email_verified != Some(true) {
            return Err(ProfileError::UnverifiedEmail);
        }
        Ok(Self {
            email,
            name: info.name,
            nickname: info.nickname,
            picture: info.picture,
            email_verified: true,
        })
    }

    /// Name shown in the frontend header: name, then nickname, then `User`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.nickname.as_deref())
            .unwrap_or("User")
    }

    /// Nickname for the profile page: nickname, then name, then `User`.
    #[must_use]
    pub fn display_nickname(&self) -> &str {
        self.nickname
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("User")
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the signed-in user's profile.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the `OpenID` Connect `state` (CSRF protection).
    pub const OIDC_STATE: &str = "oidc_state";
}
