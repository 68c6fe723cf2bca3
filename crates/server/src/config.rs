//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `NEIGHBOURLY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `OIDC_ISSUER_URL` - `OpenID` Connect issuer (e.g., `https://tenant.eu.auth0.com`)
//! - `OIDC_CLIENT_ID` - OAuth client ID
//! - `OIDC_CLIENT_SECRET` - OAuth client secret (placeholder and entropy checked)
//!
//! ## Optional
//! - `NEIGHBOURLY_HOST` - Bind address (default: 127.0.0.1)
//! - `NEIGHBOURLY_PORT` - Listen port (default: `PORT`, then 3000)
//! - `NEIGHBOURLY_BASE_URL` - Public URL of this API (default: `http://localhost:3000`)
//! - `NEIGHBOURLY_FRONTEND_URL` - Web app URL (default: `http://localhost:5173`)
//! - `NEIGHBOURLY_CORS_ORIGINS` - Extra comma-separated CORS origins
//! - `NEIGHBOURLY_CLAIM_POLICY` - `reject` (default) or `overwrite`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use neighbourly_core::ClaimPolicy;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this API, without trailing slash
    pub base_url: String,
    /// Web app URL, without trailing slash
    pub frontend_url: String,
    /// Additional CORS origins besides the frontend
    pub extra_cors_origins: Vec<String>,
    /// Treatment of claims on already-claimed requests
    pub claim_policy: ClaimPolicy,
    /// Identity provider settings
    pub oidc: OidcConfig,
    /// Sentry error tracking settings
    pub sentry: SentryConfig,
}

/// `OpenID` Connect client configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct OidcConfig {
    /// Issuer URL, without trailing slash
    pub issuer_url: String,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
}

impl std::fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcConfig")
            .field("issuer_url", &self.issuer_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Sentry configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("NEIGHBOURLY_DATABASE_URL")?;
        let host = parse_env("NEIGHBOURLY_HOST", "127.0.0.1")?;
        let port = match get_optional_env("NEIGHBOURLY_PORT") {
            Some(_) => parse_env("NEIGHBOURLY_PORT", "3000")?,
            None => parse_env("PORT", "3000")?,
        };
        let base_url = trim_url(&get_env_or_default("NEIGHBOURLY_BASE_URL", "http://localhost:3000"));
        let frontend_url =
            trim_url(&get_env_or_default("NEIGHBOURLY_FRONTEND_URL", "http://localhost:5173"));
        let extra_cors_origins =
            parse_origin_list(&get_env_or_default("NEIGHBOURLY_CORS_ORIGINS", ""));
        let claim_policy = get_env_or_default("NEIGHBOURLY_CLAIM_POLICY", "reject")
            .parse::<ClaimPolicy>()
            .map_err(|e| ConfigError::InvalidEnvVar("NEIGHBOURLY_CLAIM_POLICY".to_string(), e))?;

        let oidc = OidcConfig::from_env()?;
        let sentry = SentryConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            frontend_url,
            extra_cors_origins,
            claim_policy,
            oidc,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the API is served over HTTPS (secure, cross-site cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Redirect URI registered with the identity provider.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.base_url)
    }

    /// Every origin allowed to make credentialed requests, frontend first.
    #[must_use]
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![self.frontend_url.clone()];
        for origin in &self.extra_cors_origins {
            if !origins.contains(origin) {
                origins.push(origin.clone());
            }
        }
        origins
    }
}

impl OidcConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            issuer_url: trim_url(&get_required_env("OIDC_ISSUER_URL")?),
            client_id: get_required_env("OIDC_CLIENT_ID")?,
            client_secret: get_validated_secret("OIDC_CLIENT_SECRET")?,
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (set by most PaaS postgres add-ons).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(trim_url)
        .filter(|origin| !origin.is_empty())
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the secret issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            database_url: SecretString::from("postgres://localhost/neighbourly"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            extra_cors_origins: vec![],
            claim_policy: ClaimPolicy::Reject,
            oidc: OidcConfig {
                issuer_url: "https://tenant.auth.test".to_string(),
                client_id: "client_id_value".to_string(),
                client_secret: SecretString::from("super_secret_client_secret"),
            },
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-client-secret", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").is_err());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_callback_url_and_security() {
        let mut config = config();
        assert_eq!(config.callback_url(), "http://localhost:3000/callback");
        assert!(!config.is_secure());

        config.base_url = "https://api.neighbourly.test".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_allowed_origins_deduplicates() {
        let mut config = config();
        config.extra_cors_origins =
            parse_origin_list("http://localhost:5174/, http://localhost:5173,,");
        assert_eq!(
            config.allowed_origins(),
            vec![
                "http://localhost:5173".to_string(),
                "http://localhost:5174".to_string()
            ]
        );
    }

    #[test]
    fn test_oidc_config_debug_redacts_secret() {
        let debug_output = format!("{:?}", config().oidc);
        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_client_secret"));
    }
}
