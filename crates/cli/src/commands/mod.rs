//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use thiserror::Error;

use neighbourly_server::db::{MigrationError, RepositoryError};
use neighbourly_server::services::ServiceError;

/// Errors surfaced by any subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Invalid demo data: {0}")]
    DemoData(String),
}

/// Database URL from `NEIGHBOURLY_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// Only the database is needed here, so the server's full configuration
/// (identity provider, secrets) is not loaded.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("NEIGHBOURLY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("NEIGHBOURLY_DATABASE_URL"))
}
