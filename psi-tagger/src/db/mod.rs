//! Database access for psi-tagger
//!
//! Image tag state lives in the shared `psi.db` in the root folder.

pub mod images;

use crate::error::TagResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for another process's write lock
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> TagResult<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(psi_common::Error::Io)?;
    }

    tracing::debug!(
        "Connecting to database: {} (busy_timeout={}ms)",
        db_path.display(),
        BUSY_TIMEOUT.as_millis()
    );

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create psi-tagger tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> TagResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            original_path TEXT PRIMARY KEY,
            small_path TEXT NOT NULL,
            skippers TEXT NOT NULL DEFAULT '[]',
            taggers TEXT NOT NULL DEFAULT '{}',
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (images)");

    Ok(())
}
