//! # Local Store Repository
//!
//! Key/value persistence: each concern owns exactly one key holding a JSON
//! document, and each key has exactly one writer.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────┬────────────────────┐
//! │ key                  │ value                    │ writer             │
//! ├──────────────────────┼──────────────────────────┼────────────────────┤
//! │ sync.queue           │ [QueueItem, ...]         │ OperationQueue     │
//! │ sync.history         │ [ScanRecord, ...]        │ ScanHistoryStore   │
//! │ reference.dataset    │ ReferenceDataset         │ SyncEngine / seed  │
//! │ sync.last_sync_at    │ "2024-05-01T10:00:00Z"   │ SyncScheduler      │
//! └──────────────────────┴──────────────────────────┴────────────────────┘
//! ```
//!
//! No transaction spans two keys.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Storage keys, one per persisted concern.
pub mod keys {
    /// Pending operations (`Vec<QueueItem>`).
    pub const QUEUE: &str = "sync.queue";
    /// User-visible scan ledger (`Vec<ScanRecord>`).
    pub const HISTORY: &str = "sync.history";
    /// Reference dataset snapshot with its version.
    pub const REFERENCE_DATASET: &str = "reference.dataset";
    /// Completion time of the last drain pass.
    pub const LAST_SYNC_AT: &str = "sync.last_sync_at";
}

/// Repository over the `local_store` table.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Creates a new LocalStore.
    pub fn new(pool: SqlitePool) -> Self {
        LocalStore { pool }
    }

    /// Reads the raw JSON text stored under `key`.
    pub async fn get_raw(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_store WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Writes raw JSON text under `key`, replacing any previous value.
    pub async fn put_raw(&self, key: &str, value: &str) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO local_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(key = %key, bytes = value.len(), "Stored value");
        Ok(())
    }

    /// Reads and decodes the document under `key`.
    ///
    /// ## Returns
    /// * `Ok(Some(T))` - Key present and decodable
    /// * `Ok(None)` - Key absent
    /// * `Err(DbError::Decode)` - Key present but unreadable
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| DbError::decode(key, e)),
            None => Ok(None),
        }
    }

    /// Encodes and writes `value` under `key`.
    pub async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> DbResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| DbError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.put_raw(key, &raw).await
    }
}
