//! Read-side query cache
//!
//! Persists previously fetched read results so screens can show stale data
//! while the device is offline. This is a plain write-through blob store; the
//! offline write-queue never reads or writes it.
//!
//! # Example
//!
//! ```rust,no_run
//! use patrol_storage::query_cache;
//!
//! # async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! let snapshot = serde_json::json!({ "patrols": [] });
//! query_cache::persist(pool, query_cache::QUERY_CACHE_KEY, &snapshot).await?;
//!
//! if let Some(entry) = query_cache::restore(pool, query_cache::QUERY_CACHE_KEY).await? {
//!     println!("cached at {}", entry.updated_at);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Storage key used by the application's query client
pub const QUERY_CACHE_KEY: &str = "patrol-query-cache";

/// A cached blob with the time it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedQuery {
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Store (or overwrite) the blob under `key`
pub async fn persist(pool: &SqlitePool, key: &str, value: &serde_json::Value) -> Result<()> {
    let value_json = serde_json::to_string(value)?;

    sqlx::query(
        "INSERT INTO query_cache (key, value, updated_at) VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value_json)
    .bind(Utc::now().timestamp_millis())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the blob under `key`, if any
pub async fn restore(pool: &SqlitePool, key: &str) -> Result<Option<CachedQuery>> {
    let row = sqlx::query("SELECT value, updated_at FROM query_cache WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let value: String = row.try_get("value")?;
    let updated_at: i64 = row.try_get("updated_at")?;

    Ok(Some(CachedQuery {
        value: serde_json::from_str(&value)?,
        updated_at: DateTime::from_timestamp_millis(updated_at)
            .ok_or_else(|| StorageError::InvalidData(format!("invalid timestamp: {updated_at}")))?,
    }))
}

/// Drop the blob under `key` (e.g. on logout)
pub async fn remove(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM query_cache WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}
