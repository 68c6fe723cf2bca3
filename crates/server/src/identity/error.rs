//! Identity provider error types.

use thiserror::Error;

/// Errors from the `OpenID` Connect flow.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider metadata could not be used.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// The provider rejected the authorization code.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The userinfo endpoint refused the access token.
    #[error("userinfo request failed: {0}")]
    UserInfo(String),

    /// A URL from configuration or metadata was malformed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl IdentityError {
    /// Short code reported to the frontend as `?error=<code>`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::Discovery(_) | Self::Url(_) => "provider_unavailable",
            Self::TokenExchange(_) => "token_exchange_failed",
            Self::UserInfo(_) => "userinfo_failed",
        }
    }
}
