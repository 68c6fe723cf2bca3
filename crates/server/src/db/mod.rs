//! Persistence for accounts, help requests and chat messages.
//!
//! # Schema: `neighbourly`
//!
//! - `account` - One row per email seen by the API
//! - `help_request` - Requests with their current claimant
//! - `request_item` - Ordered item lines, deleted with their request
//! - `message` - Chat threads, deleted with their request
//! - `session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p neighbourly-cli -- migrate
//! ```
//!
//! # Stores
//!
//! Services are generic over [`Store`], so the same lifecycle code runs
//! against [`PgStore`] in production and [`MemoryStore`] in tests and local
//! demos. Claimant writes are compare-and-set: the caller passes the claimant
//! it observed and the write only lands if that is still current.

pub mod accounts;
pub mod memory;
pub mod messages;
pub mod requests;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use neighbourly_core::{
    Account, AccountId, Email, HelpRequest, Message, NewHelpRequest, RequestId,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Errors from schema setup.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("session store error: {0}")]
    SessionStore(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded migrations, then create the session table.
///
/// # Errors
///
/// Returns `MigrationError` if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    sqlx::migrate!("./migrations").run(pool).await?;

    crate::middleware::session::session_store(pool)
        .map_err(MigrationError::SessionStore)?
        .migrate()
        .await?;

    Ok(())
}

/// Account lookups and auto-provisioning.
pub trait AccountStore {
    /// Return the account for `email`, creating it if this is the first visit.
    fn find_or_create_account(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Account, RepositoryError>> + Send;

    /// Get an account by id.
    fn get_account(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Option<Account>, RepositoryError>> + Send;
}

/// Help request persistence.
pub trait RequestStore {
    /// Store a new, unclaimed request owned by `owner`.
    fn insert_request(
        &self,
        owner: AccountId,
        request: &NewHelpRequest,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<HelpRequest, RepositoryError>> + Send;

    /// Get a request with its items.
    fn get_request(
        &self,
        id: RequestId,
    ) -> impl Future<Output = Result<Option<HelpRequest>, RepositoryError>> + Send;

    /// Unclaimed requests whose pickup date is not before `today`, by id.
    fn list_open(
        &self,
        today: NaiveDate,
    ) -> impl Future<Output = Result<Vec<HelpRequest>, RepositoryError>> + Send;

    /// Requests created by `owner`, by id.
    fn list_owned_by(
        &self,
        owner: AccountId,
    ) -> impl Future<Output = Result<Vec<HelpRequest>, RepositoryError>> + Send;

    /// Requests currently claimed by `helper`, by id.
    fn list_claimed_by(
        &self,
        helper: AccountId,
    ) -> impl Future<Output = Result<Vec<HelpRequest>, RepositoryError>> + Send;

    /// The owner's request with the lowest id.
    fn first_owned_by(
        &self,
        owner: AccountId,
    ) -> impl Future<Output = Result<Option<HelpRequest>, RepositoryError>> + Send;

    /// Replace the claimant with `new` if it is still `expected`.
    ///
    /// Returns `false` when the request is gone or the claimant moved.
    fn set_claimant(
        &self,
        id: RequestId,
        expected: Option<AccountId>,
        new: Option<AccountId>,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete a request, its items and its thread. Returns `false` if absent.
    fn delete_request(
        &self,
        id: RequestId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete a request only while `helper` holds the claim.
    fn delete_claimed_by(
        &self,
        id: RequestId,
        helper: AccountId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Chat thread persistence.
pub trait MessageStore {
    /// Append to a request's thread.
    ///
    /// Returns `RepositoryError::NotFound` if the request no longer exists.
    fn insert_message(
        &self,
        request_id: RequestId,
        sender: &Email,
        content: &str,
        sent_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Message, RepositoryError>> + Send;

    /// The whole thread, oldest first (ties broken by id).
    fn list_messages(
        &self,
        request_id: RequestId,
    ) -> impl Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// The newest message in the thread.
    fn latest_message(
        &self,
        request_id: RequestId,
    ) -> impl Future<Output = Result<Option<Message>, RepositoryError>> + Send;
}

/// Connectivity check for readiness probes.
pub trait Readiness {
    /// Succeeds when the store can serve queries.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Everything the services need from persistence.
pub trait Store:
    AccountStore + RequestStore + MessageStore + Readiness + Clone + Send + Sync + 'static
{
}

impl<T> Store for T where
    T: AccountStore + RequestStore + MessageStore + Readiness + Clone + Send + Sync + 'static
{
}

/// `PostgreSQL`-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (readiness checks, sessions).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Readiness for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Parse an email read back from the database.
fn stored_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}
