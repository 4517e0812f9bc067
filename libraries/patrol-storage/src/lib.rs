//! Patrol Storage
//!
//! `SQLite` persistence for the offline write-queue.
//!
//! # Architecture
//!
//! - **Event Store**: durable FIFO of pending scan events, flushed before every call returns
//! - **Query Cache**: a separate key/value blob used by the read side while offline
//! - **Device Identity**: the install's id, kept apart from anything a cache clear touches
//! - **Offline-First**: writes land here first, the sync engine drains them later
//!
//! # Example
//!
//! ```rust,no_run
//! use patrol_core::CheckpointPayload;
//! use patrol_storage::EventStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = EventStore::open("sqlite://patrol.db").await?;
//!
//! let id = store
//!     .enqueue_payload(&CheckpointPayload::new("patrol-1", "zone-a", "cp-3", "04:11:AB"))
//!     .await?;
//! println!("queued {id}, {} pending", store.count());
//! # Ok(())
//! # }
//! ```

mod error;

pub mod device_identity;
pub mod event_store;
pub mod query_cache;

pub use error::{Result, StorageError};
pub use event_store::EventStore;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Create a new `SQLite` pool
///
/// Every write is fully synced to disk before the statement returns, so an
/// item is recoverable even if the process dies right after `enqueue`.
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://patrol.db>`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    use sqlx::sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
    };
    use std::str::FromStr;

    tracing::debug!(url = %database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
