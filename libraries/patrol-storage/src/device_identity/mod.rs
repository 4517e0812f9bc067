//! Device identity
//!
//! The id this install sends with every delivery. It lives in its own
//! single-row table, apart from the read-side cache, so clearing cached
//! reads never changes the idempotency keys of items already queued.

use crate::error::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

/// The stored device id, if one was ever recorded
pub async fn load(pool: &SqlitePool) -> Result<Option<String>> {
    let device_id: Option<String> =
        sqlx::query_scalar("SELECT device_id FROM device_identity WHERE id = 1")
            .fetch_optional(pool)
            .await?;

    Ok(device_id)
}

/// Return the stored device id, recording `candidate` first if there is none.
///
/// The first writer wins; concurrent callers all get the same id back.
pub async fn get_or_insert(pool: &SqlitePool, candidate: &str) -> Result<String> {
    let result = sqlx::query(
        "INSERT INTO device_identity (id, device_id, created_at) VALUES (1, ?, ?)
         ON CONFLICT(id) DO NOTHING",
    )
    .bind(candidate)
    .bind(Utc::now().timestamp_millis())
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!(device_id = candidate, "Recorded device id");
    }

    let device_id: String = sqlx::query_scalar("SELECT device_id FROM device_identity WHERE id = 1")
        .fetch_one(pool)
        .await?;

    Ok(device_id)
}
