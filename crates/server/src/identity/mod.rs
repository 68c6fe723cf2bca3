//! `OpenID` Connect client for the identity provider.
//!
//! # Flow
//!
//! 1. `GET /login` stores a random `state` in the session and redirects to
//!    [`OidcClient::authorization_url`]
//! 2. The provider redirects back to `/callback` with `code` and `state`
//! 3. [`OidcClient::exchange_code`] trades the code for an access token
//! 4. [`OidcClient::user_info`] fetches the profile stored in the session
//!
//! Provider metadata is discovered from
//! `{issuer}/.well-known/openid-configuration` on first use and cached for
//! the life of the process.

mod error;
mod types;

pub use error::IdentityError;
pub use types::{ProviderMetadata, UserInfo};

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use url::Url;

use crate::config::OidcConfig;
use types::TokenResponse;

/// Scopes requested at login.
const SCOPES: &str = "openid profile email";

/// Length of the CSRF `state` parameter.
const STATE_LENGTH: usize = 32;

/// Client for the configured `OpenID` Connect provider.
#[derive(Clone)]
pub struct OidcClient {
    inner: Arc<OidcClientInner>,
}

struct OidcClientInner {
    client: reqwest::Client,
    issuer_url: String,
    client_id: String,
    client_secret: SecretString,
    metadata: OnceCell<ProviderMetadata>,
}

impl std::fmt::Debug for OidcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcClient")
            .field("issuer_url", &self.inner.issuer_url)
            .field("client_id", &self.inner.client_id)
            .finish_non_exhaustive()
    }
}

impl OidcClient {
    /// Create a client; discovery happens lazily.
    #[must_use]
    pub fn new(config: &OidcConfig) -> Self {
        Self::build(config, OnceCell::new())
    }

    /// Create a client with already-known provider metadata.
    #[must_use]
    pub fn with_metadata(config: &OidcConfig, metadata: ProviderMetadata) -> Self {
        Self::build(config, OnceCell::from(metadata))
    }

    fn build(config: &OidcConfig, metadata: OnceCell<ProviderMetadata>) -> Self {
        Self {
            inner: Arc::new(OidcClientInner {
                client: reqwest::Client::new(),
                issuer_url: config.issuer_url.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                metadata,
            }),
        }
    }

    /// Provider metadata, fetched on first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the discovery document cannot be fetched or parsed.
    pub async fn metadata(&self) -> Result<&ProviderMetadata, IdentityError> {
        self.inner
            .metadata
            .get_or_try_init(|| async {
                let url = format!("{}/.well-known/openid-configuration", self.inner.issuer_url);
                debug!(%url, "Fetching provider metadata");

                let response = self.inner.client.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(IdentityError::Discovery(format!(
                        "{url} returned {}",
                        response.status()
                    )));
                }
                Ok::<_, IdentityError>(response.json::<ProviderMetadata>().await?)
            })
            .await
    }

    /// URL to send the browser to for login.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails or the endpoint is not a valid URL.
    pub async fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
    ) -> Result<String, IdentityError> {
        let metadata = self.metadata().await?;
        let url = Url::parse_with_params(
            &metadata.authorization_endpoint,
            &[
                ("response_type", "code"),
                ("client_id", self.inner.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", SCOPES),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::TokenExchange` if the provider rejects the code.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<String, IdentityError> {
        let metadata = self.metadata().await?;

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .inner
            .client
            .post(&metadata.token_endpoint)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::TokenExchange(text));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::UserInfo` if the provider refuses the token.
    #[instrument(skip_all)]
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, IdentityError> {
        let metadata = self.metadata().await?;

        let response = self
            .inner
            .client
            .get(&metadata.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::UserInfo(response.status().to_string()));
        }

        Ok(response.json().await?)
    }

    /// Where to send the browser after the local session is cleared.
    ///
    /// Uses the provider's `end_session_endpoint` when it advertises one,
    /// otherwise returns `return_to` unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails or the endpoint is not a valid URL.
    pub async fn logout_url(&self, return_to: &str) -> Result<String, IdentityError> {
        let metadata = self.metadata().await?;
        let Some(endpoint) = metadata.end_session_endpoint.as_deref() else {
            return Ok(return_to.to_owned());
        };

        let url = Url::parse_with_params(
            endpoint,
            &[
                ("client_id", self.inner.client_id.as_str()),
                ("post_logout_redirect_uri", return_to),
            ],
        )?;
        Ok(url.into())
    }
}

/// A random CSRF `state` value.
#[must_use]
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> OidcConfig {
        OidcConfig {
            issuer_url: "https://id.neighbourly.test".to_owned(),
            client_id: "nb-web".to_owned(),
            client_secret: SecretString::from("k9Vq2xLr7TmZ4pWc8NfJ3sYb6HdG1uEa"),
        }
    }

    fn metadata(end_session: Option<&str>) -> ProviderMetadata {
        ProviderMetadata {
            issuer: "https://id.neighbourly.test/".to_owned(),
            authorization_endpoint: "https://id.neighbourly.test/authorize".to_owned(),
            token_endpoint: "https://id.neighbourly.test/oauth/token".to_owned(),
            userinfo_endpoint: "https://id.neighbourly.test/userinfo".to_owned(),
            end_session_endpoint: end_session.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn test_authorization_url() {
        let client = OidcClient::with_metadata(&config(), metadata(None));
        let url = client
            .authorization_url("http://localhost:3000/callback", "abc123")
            .await
            .unwrap();
        let url = Url::parse(&url).unwrap();

        assert_eq!(url.path(), "/authorize");
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "nb-web");
        assert_eq!(params["redirect_uri"], "http://localhost:3000/callback");
        assert_eq!(params["scope"], "openid profile email");
        assert_eq!(params["state"], "abc123");
    }

    #[tokio::test]
    async fn test_logout_url_without_end_session() {
        let client = OidcClient::with_metadata(&config(), metadata(None));
        let url = client.logout_url("http://localhost:5173").await.unwrap();
        assert_eq!(url, "http://localhost:5173");
    }

    #[tokio::test]
    async fn test_logout_url_with_end_session() {
        let client = OidcClient::with_metadata(
            &config(),
            metadata(Some("https://id.neighbourly.test/oidc/logout")),
        );
        let url = Url::parse(&client.logout_url("http://localhost:5173").await.unwrap()).unwrap();
        assert_eq!(url.path(), "/oidc/logout");
        assert!(
            url.query_pairs()
                .any(|(k, v)| k == "post_logout_redirect_uri" && v == "http://localhost:5173")
        );
    }

    #[test]
    fn test_generate_state() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), STATE_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_userinfo_tolerates_missing_claims() {
        let info: UserInfo = serde_json::from_str(r#"{"sub":"auth0|1"}"#).unwrap();
        assert_eq!(info.email, None);
        assert_eq!(info.email_verified, None);
    }

    #[test]
    fn test_debug_hides_secret() {
        let client = OidcClient::new(&config());
        let debug = format!("{client:?}");
        assert!(debug.contains("nb-web"));
        assert!(!debug.contains("k9Vq2xLr7TmZ4pWc8NfJ3sYb6HdG1uEa"));
    }
}
