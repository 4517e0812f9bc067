//! Event store
//!
//! Durable FIFO of scan events waiting to be delivered to the remote service.
//! Items stay here from the moment `enqueue` returns until the sync engine
//! confirms remote acceptance (or an operator purges them).
//!
//! Items that exhaust their retry budget are quarantined ("dead-lettered"):
//! they are kept for inspection but no longer appear in [`EventStore::list`]
//! or [`EventStore::count`].
//!
//! # Example
//!
//! ```rust,no_run
//! use patrol_core::ItemKind;
//! use patrol_storage::EventStore;
//!
//! # async fn example(store: &EventStore) -> Result<(), Box<dyn std::error::Error>> {
//! let id = store.enqueue(ItemKind::ScanLog, serde_json::json!({ "event": "door_open" })).await?;
//!
//! for item in store.list().await? {
//!     // deliver...
//!     store.remove(item.id).await?;
//! }
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, StorageError};
use chrono::{DateTime, Utc};
use patrol_core::{ItemKind, QueueId, QueueItem, QueuePayload};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const SELECT_COLUMNS: &str =
    "SELECT id, kind, payload, created_at, attempts, last_error, dead_lettered_at FROM pending_events";

/// Durable queue of pending items backed by `SQLite`
#[derive(Debug)]
pub struct EventStore {
    pool: SqlitePool,
    /// Active (not dead-lettered) item count, kept in step with every mutation
    count_tx: watch::Sender<usize>,
}

impl EventStore {
    /// Open (or create) the database at `database_url` and apply migrations
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = crate::create_pool(database_url).await?;
        crate::run_migrations(&pool).await?;
        Self::new(pool).await
    }

    /// Wrap an already migrated pool
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let active = Self::count_active(&pool).await?;
        let (count_tx, _) = watch::channel(active);

        debug!(active, "Event store ready");
        Ok(Self { pool, count_tx })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist a new item and return its id.
    ///
    /// The row is committed (and synced to disk) before this returns; any
    /// failure is surfaced so the caller can tell the user the scan was not saved.
    pub async fn enqueue(&self, kind: ItemKind, payload: serde_json::Value) -> Result<QueueId> {
        let payload_json = serde_json::to_string(&payload)?;
        let created_at = Utc::now().timestamp_millis();

        let result = sqlx::query(
            "INSERT INTO pending_events (kind, payload, created_at, attempts) VALUES (?, ?, ?, 0)",
        )
        .bind(kind.as_str())
        .bind(payload_json)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        let id = QueueId::new(result.last_insert_rowid());
        self.count_tx.send_modify(|count| *count += 1);

        debug!(queue_id = %id, kind = %kind, "Enqueued item");
        Ok(id)
    }

    /// Serialize a typed payload and enqueue it under its kind tag
    pub async fn enqueue_payload<P: QueuePayload>(&self, payload: &P) -> Result<QueueId> {
        let value = serde_json::to_value(payload)?;
        self.enqueue(P::KIND, value).await
    }

    /// Delete a delivered item.
    ///
    /// Removing an id that is already gone is not an error; returns whether a
    /// row was actually deleted.
    pub async fn remove(&self, id: QueueId) -> Result<bool> {
        let removed = self.delete_row(id).await?;
        if removed {
            debug!(queue_id = %id, "Removed item");
        }
        Ok(removed)
    }

    /// Operator deletion of an item, active or quarantined
    pub async fn purge(&self, id: QueueId) -> Result<bool> {
        let removed = self.delete_row(id).await?;
        if removed {
            info!(queue_id = %id, "Purged item");
        }
        Ok(removed)
    }

    /// Fetch a single item regardless of its rotation state
    pub async fn get(&self, id: QueueId) -> Result<Option<QueueItem>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_item).transpose()
    }

    /// Snapshot of active items in insertion order.
    ///
    /// Rows that no longer decode (an unknown kind, a corrupt timestamp) are
    /// dead-lettered on the spot instead of failing the whole snapshot.
    pub async fn list(&self) -> Result<Vec<QueueItem>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE dead_lettered_at IS NULL ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match row_to_item(row) {
                Ok(item) => items.push(item),
                Err(err) => self.quarantine_unreadable(row, &err).await?,
            }
        }
        Ok(items)
    }

    /// Number of active items. Cached; never touches the database.
    pub fn count(&self) -> usize {
        *self.count_tx.borrow()
    }

    /// Subscribe to the active count (e.g. for a pending badge)
    pub fn watch_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    /// Re-read the active count from the database
    pub async fn refresh_count(&self) -> Result<usize> {
        let active = Self::count_active(&self.pool).await?;
        self.count_tx.send_replace(active);
        Ok(active)
    }

    /// Record a failed delivery attempt.
    ///
    /// Increments `attempts`, stores `error` as `last_error` and returns the
    /// new attempt count, or `None` if the item no longer exists.
    pub async fn mark_failed(&self, id: QueueId, error: &str) -> Result<Option<u32>> {
        let attempts: Option<i64> = sqlx::query_scalar(
            "UPDATE pending_events SET attempts = attempts + 1, last_error = ?
             WHERE id = ?
             RETURNING attempts",
        )
        .bind(error)
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempts.map(|a| a as u32))
    }

    /// Pull an active item out of retry rotation.
    ///
    /// `reason` replaces `last_error`. Returns `false` if the item is missing
    /// or already quarantined.
    pub async fn dead_letter(&self, id: QueueId, reason: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE pending_events SET dead_lettered_at = ?, last_error = ?
             WHERE id = ? AND dead_lettered_at IS NULL",
        )
        .bind(Utc::now().timestamp_millis())
        .bind(reason)
        .bind(id.get())
        .execute(&self.pool)
        .await?;

        let moved = result.rows_affected() > 0;
        if moved {
            self.count_tx.send_modify(|count| *count = count.saturating_sub(1));
            info!(queue_id = %id, reason, "Item moved to dead-letter");
        }
        Ok(moved)
    }

    /// Quarantined items, oldest first.
    ///
    /// Rows that cannot be decoded are skipped; they still count towards
    /// [`dead_letter_count`](Self::dead_letter_count) and can be purged by id.
    pub async fn dead_letters(&self) -> Result<Vec<QueueItem>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE dead_lettered_at IS NOT NULL ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match row_to_item(row) {
                Ok(item) => Some(item),
                Err(err) => {
                    let id: Option<i64> = row.try_get("id").ok();
                    warn!(queue_id = ?id, error = %err, "Skipping unreadable dead-lettered row");
                    None
                }
            })
            .collect())
    }

    pub async fn dead_letter_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pending_events WHERE dead_lettered_at IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count as usize)
    }

    /// Put a quarantined item back into rotation.
    ///
    /// The item keeps its id, so it resumes its original FIFO position.
    /// `attempts` is left untouched; only removal resets it.
    pub async fn requeue(&self, id: QueueId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE pending_events SET dead_lettered_at = NULL
             WHERE id = ? AND dead_lettered_at IS NOT NULL",
        )
        .bind(id.get())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Dead-lettered item", id.to_string()));
        }

        self.count_tx.send_modify(|count| *count += 1);
        info!(queue_id = %id, "Requeued dead-lettered item");
        Ok(())
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn quarantine_unreadable(&self, row: &SqliteRow, err: &StorageError) -> Result<()> {
        let id = QueueId::new(row.try_get("id")?);
        error!(queue_id = %id, error = %err, "Unreadable queue row, dead-lettering");
        self.dead_letter(id, &format!("unreadable row: {err}")).await?;
        Ok(())
    }

    async fn delete_row(&self, id: QueueId) -> Result<bool> {
        let deleted: Option<Option<i64>> =
            sqlx::query_scalar("DELETE FROM pending_events WHERE id = ? RETURNING dead_lettered_at")
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await?;

        match deleted {
            Some(None) => {
                self.count_tx.send_modify(|count| *count = count.saturating_sub(1));
                Ok(true)
            }
            Some(Some(_)) => Ok(true),
            None => Ok(false),
        }
    }

    async fn count_active(pool: &SqlitePool) -> Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pending_events WHERE dead_lettered_at IS NULL")
                .fetch_one(pool)
                .await?;

        Ok(count as usize)
    }
}

fn row_to_item(row: &SqliteRow) -> Result<QueueItem> {
    let kind: String = row.try_get("kind")?;
    let payload: String = row.try_get("payload")?;
    let created_at: i64 = row.try_get("created_at")?;
    let attempts: i64 = row.try_get("attempts")?;
    let dead_lettered_at: Option<i64> = row.try_get("dead_lettered_at")?;

    Ok(QueueItem {
        id: QueueId::new(row.try_get("id")?),
        kind: kind.parse()?,
        payload: serde_json::from_str(&payload)?,
        created_at: millis_to_datetime(created_at)?,
        attempts: attempts as u32,
        last_error: row.try_get("last_error")?,
        dead_lettered_at: dead_lettered_at.map(millis_to_datetime).transpose()?,
    })
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::InvalidData(format!("invalid timestamp: {millis}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_to_datetime() {
        let dt = millis_to_datetime(1_700_000_000_123).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_123);
        assert!(millis_to_datetime(i64::MAX).is_err());
    }
}
