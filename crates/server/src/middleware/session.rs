//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The frontend
//! runs on a different origin, so over HTTPS the cookie is sent cross-site
//! (`SameSite=None; Secure`); plain-HTTP development falls back to `Lax`.

use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "nb_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// The session store, in the `neighbourly` schema.
///
/// # Errors
///
/// Returns an error if the schema or table name is rejected.
pub fn session_store(pool: &PgPool) -> Result<PostgresStore, String> {
    PostgresStore::new(pool.clone())
        .with_schema_name("neighbourly")?
        .with_table_name("session")
}

/// Wrap any session store in the configured session layer.
#[must_use]
pub fn session_layer<T: SessionStore>(store: T, config: &AppConfig) -> SessionManagerLayer<T> {
    let is_secure = config.is_secure();
    let same_site = if is_secure {
        SameSite::None
    } else {
        SameSite::Lax
    };

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(same_site)
        .with_http_only(true)
        .with_path("/")
}

/// Create the session layer with the `PostgreSQL` store.
///
/// The session table is created by `nb-cli migrate`.
///
/// # Errors
///
/// Returns an error if the session store cannot be configured.
pub fn create_session_layer(
    pool: &PgPool,
    config: &AppConfig,
) -> Result<SessionManagerLayer<PostgresStore>, String> {
    Ok(session_layer(session_store(pool)?, config))
}
