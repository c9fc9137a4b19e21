//! Image tag state persistence
//!
//! Skippers and taggers are stored as JSON columns. Values keep their JSON
//! types, so a boolean tag reads back as a boolean.
//!
//! Every change to an existing image goes through [`update_image`], which
//! re-reads the row inside a `BEGIN IMMEDIATE` transaction. Two processes
//! tagging the same image therefore serialize on the SQLite write lock
//! instead of overwriting each other's taggers.

use crate::error::{TagError, TagResult};
use crate::models::{Image, ImageRecord};
use crate::store::TagStore;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqliteRow};
use sqlx::{Executor, Row, SqlitePool};

/// Insert or replace one image record
pub async fn save_image<'e, E>(executor: E, record: &ImageRecord) -> TagResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    // Serialize before touching the database
    let skippers = serde_json::to_string(&record.skippers)?;
    let taggers = serde_json::to_string(&record.taggers)?;
    let updated_at = psi_common::time::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO images (original_path, small_path, skippers, taggers, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(original_path) DO UPDATE SET
            small_path = excluded.small_path,
            skippers = excluded.skippers,
            taggers = excluded.taggers,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&record.original_path)
    .bind(&record.small_path)
    .bind(&skippers)
    .bind(&taggers)
    .bind(&updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Insert a new image
///
/// # Errors
/// [`TagError::DuplicateImage`] if a row with the same original path exists.
pub async fn insert_image(pool: &SqlitePool, image: &Image) -> TagResult<()> {
    let record = image.snapshot();
    let skippers = serde_json::to_string(&record.skippers)?;
    let taggers = serde_json::to_string(&record.taggers)?;
    let updated_at = psi_common::time::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        INSERT INTO images (original_path, small_path, skippers, taggers, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(original_path) DO NOTHING
        "#,
    )
    .bind(&record.original_path)
    .bind(&record.small_path)
    .bind(&skippers)
    .bind(&taggers)
    .bind(&updated_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(TagError::DuplicateImage(record.original_path));
    }
    Ok(())
}

/// Load one image record
pub async fn load_image<'e, E>(executor: E, original_path: &str) -> TagResult<Option<ImageRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT original_path, small_path, skippers, taggers
        FROM images
        WHERE original_path = ?
        "#,
    )
    .bind(original_path)
    .fetch_optional(executor)
    .await?;

    row.map(|row| record_from_row(&row)).transpose()
}

/// Load every image record, ordered by original path
pub async fn load_all(pool: &SqlitePool) -> TagResult<Vec<ImageRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT original_path, small_path, skippers, taggers
        FROM images
        ORDER BY original_path
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Apply `f` to the stored image and write it back, holding the write lock
///
/// The row is read after the lock is taken, so `f` always sees every change
/// committed before it.
///
/// # Errors
/// [`TagError::UnknownImage`] if the image is not in the database.
pub async fn update_image<T>(
    pool: &SqlitePool,
    original_path: &str,
    f: impl FnOnce(&mut Image) -> T,
) -> TagResult<T> {
    let mut conn = pool.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    let result = apply_update(&mut conn, original_path, f).await;
    match &result {
        Ok(_) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
        }
        Err(e) => {
            tracing::debug!(image = %original_path, error = %e, "Rolling back image update");
            sqlx::query("ROLLBACK").execute(&mut *conn).await?;
        }
    }
    result
}

async fn apply_update<T>(
    conn: &mut SqliteConnection,
    original_path: &str,
    f: impl FnOnce(&mut Image) -> T,
) -> TagResult<T> {
    let record = load_image(&mut *conn, original_path)
        .await?
        .ok_or_else(|| TagError::UnknownImage(original_path.to_string()))?;

    let mut image = Image::from_record(record);
    let output = f(&mut image);
    save_image(&mut *conn, &image.snapshot()).await?;
    Ok(output)
}

/// Fill a store with every persisted image; returns how many were loaded
pub async fn load_into_store(pool: &SqlitePool, store: &TagStore) -> TagResult<usize> {
    let records = load_all(pool).await?;
    let count = records.len();
    for record in records {
        store.insert(Image::from_record(record));
    }

    tracing::debug!(count, "Loaded images from database");
    Ok(count)
}

fn record_from_row(row: &SqliteRow) -> TagResult<ImageRecord> {
    let skippers: String = row.get("skippers");
    let taggers: String = row.get("taggers");

    Ok(ImageRecord {
        original_path: row.get("original_path"),
        small_path: row.get("small_path"),
        skippers: serde_json::from_str(&skippers)?,
        taggers: serde_json::from_str(&taggers)?,
    })
}
