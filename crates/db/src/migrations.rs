use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Number of embedded migrations not yet recorded as applied. A database that
/// was never migrated reports all of them.
pub async fn pending_count(pool: &DbPool) -> Result<usize, sqlx::Error> {
    let query = sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1");
    let applied: Vec<i64> = match query.fetch_all(pool).await {
        Ok(versions) => versions,
        Err(sqlx::Error::Database(error)) if error.message().contains("no such table") => {
            Vec::new()
        }
        Err(error) => return Err(error),
    };

    Ok(MIGRATOR.iter().filter(|migration| !applied.contains(&migration.version)).count())
}
