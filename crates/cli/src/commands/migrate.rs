//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! nb-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `NEIGHBOURLY_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! server crate. The `tower-sessions` table is created afterwards in the
//! same `neighbourly` schema.

use tracing::info;

use neighbourly_server::db;

use super::{CommandError, database_url};

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running migrations...");
    db::run_migrations(&pool).await?;

    info!("Migrations complete!");
    Ok(())
}
