//! PostgreSQL persistence for Storyfill sessions.

pub mod pg_session_repository;

use sqlx::PgPool;
use sqlx::migrate::MigrateError;

/// Applies the embedded schema migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the applied history
/// does not match the embedded one.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
