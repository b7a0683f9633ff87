//! Schema migrations, embedded from the workspace `migrations/sqlite/` at
//! compile time.
//!
//! Files are applied in `NNN_name.sql` order and tracked in
//! `_sqlx_migrations`. Applied files are checksummed: change the schema
//! with a new file, never by editing an old one.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Brings the schema up to date. Safe to call on every start.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(known = MIGRATOR.migrations.len(), "Applying storefront schema");

    MIGRATOR.run(pool).await?;

    info!("Storefront schema up to date");
    Ok(())
}

/// `(known, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let known = MIGRATOR.migrations.len();

    // Table is missing until the first run.
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((known, usize::try_from(applied).unwrap_or(0)))
}
