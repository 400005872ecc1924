//! # Scan History Store
//!
//! Size-bounded ledger of user-visible scans, newest first.
//!
//! ```text
//! append(r5)            head                             tail
//!                        │                                 │
//!  before:   [r4] [r3] [r2] [r1]            (max_records = 4)
//!  after:    [r5] [r4] [r3] [r2]     r1 truncated
//! ```
//!
//! Status is written only by the scheduler through [`ScanHistoryStore::update_status`].
//! A record truncated by retention before its upload settles is simply not
//! found, which is not an error.

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use medscan_core::{ScanRecord, ScanStatus};
use medscan_db::{keys, LocalStore};

/// Local scan ledger.
pub struct ScanHistoryStore {
    records: Mutex<Vec<ScanRecord>>,
    store: LocalStore,
    max_records: usize,
}

impl ScanHistoryStore {
    /// Loads persisted history, failing closed to empty.
    pub async fn load(store: LocalStore, max_records: usize) -> Self {
        let mut records = match store.get_json::<Vec<ScanRecord>>(keys::HISTORY).await {
            Ok(Some(records)) => records,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Persisted history unreadable, starting empty");
                Vec::new()
            }
        };

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(max_records);
        info!(count = records.len(), "Loaded scan history");

        ScanHistoryStore {
            records: Mutex::new(records),
            store,
            max_records,
        }
    }

    /// Inserts a record at the head and truncates the tail.
    pub async fn append(&self, record: ScanRecord) {
        let mut records = self.records.lock().await;

        debug!(id = %record.id, status = %record.status, "Appending scan record");
        records.insert(0, record);

        if records.len() > self.max_records {
            let dropped = records.len() - self.max_records;
            records.truncate(self.max_records);
            debug!(dropped, "Scan history truncated");
        }

        self.persist(&records).await;
    }

    /// Returns up to `limit` records, newest first by `created_at`.
    pub async fn list(&self, limit: usize) -> Vec<ScanRecord> {
        let records = self.records.lock().await;
        let mut listed: Vec<ScanRecord> = records.clone();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listed.truncate(limit);
        listed
    }

    /// Looks up one record.
    pub async fn get(&self, id: &str) -> Option<ScanRecord> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Sets a record's status.
    ///
    /// Returns false, writing nothing, if the record is gone or has already
    /// settled. `Synced` and `SyncFailed` are final.
    pub async fn update_status(&self, id: &str, status: ScanStatus) -> bool {
        let mut records = self.records.lock().await;

        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            debug!(id = %id, status = %status, "Status update for purged record ignored");
            return false;
        };

        if record.status.is_terminal() {
            warn!(
                id = %id,
                current = %record.status,
                requested = %status,
                "Scan already settled, status left unchanged"
            );
            return false;
        }
        record.status = status;

        self.persist(&records).await;
        true
    }

    /// Number of records still waiting for upload.
    pub async fn pending_count(&self) -> usize {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| r.status == ScanStatus::PendingUpload)
            .count()
    }

    async fn persist(&self, records: &[ScanRecord]) {
        if let Err(e) = self.store.put_json(keys::HISTORY, records).await {
            error!(error = %e, count = records.len(), "Failed to persist scan history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use medscan_db::{Database, DbConfig};
    use serde_json::json;

    async fn store() -> LocalStore {
        Database::new(DbConfig::in_memory()).await.unwrap().store()
    }

    fn record(n: i64) -> ScanRecord {
        let mut r = ScanRecord::new_pending(json!({ "n": n }));
        r.created_at = Utc::now() - Duration::minutes(100 - n);
        r
    }

    #[tokio::test]
    async fn test_append_is_newest_first_and_bounded() {
        let history = ScanHistoryStore::load(store().await, 3).await;
        let records: Vec<ScanRecord> = (1..=4).map(record).collect();

        for r in &records {
            history.append(r.clone()).await;
        }

        let listed = history.list(10).await;
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                records[3].id.as_str(),
                records[2].id.as_str(),
                records[1].id.as_str()
            ]
        );
        assert!(history.get(&records[0].id).await.is_none());
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let history = ScanHistoryStore::load(store().await, 100).await;
        for n in 1..=5 {
            history.append(record(n)).await;
        }
        assert_eq!(history.list(2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_status_missing_is_noop() {
        let history = ScanHistoryStore::load(store().await, 100).await;
        assert!(!history.update_status("gone", ScanStatus::Synced).await);
    }

    #[tokio::test]
    async fn test_update_status_and_pending_count() {
        let history = ScanHistoryStore::load(store().await, 100).await;
        let a = record(1);
        let b = record(2);
        history.append(a.clone()).await;
        history.append(b.clone()).await;
        assert_eq!(history.pending_count().await, 2);

        assert!(history.update_status(&a.id, ScanStatus::Synced).await);
        assert_eq!(history.pending_count().await, 1);
        assert_eq!(
            history.get(&a.id).await.unwrap().status,
            ScanStatus::Synced
        );
    }

    #[tokio::test]
    async fn test_settled_status_is_final() {
        let history = ScanHistoryStore::load(store().await, 100).await;
        let r = record(1);
        history.append(r.clone()).await;
        assert!(history.update_status(&r.id, ScanStatus::Synced).await);

        assert!(!history.update_status(&r.id, ScanStatus::SyncFailed).await);
        assert!(!history.update_status(&r.id, ScanStatus::PendingUpload).await);
        assert_eq!(
            history.get(&r.id).await.unwrap().status,
            ScanStatus::Synced
        );
    }

    #[tokio::test]
    async fn test_history_survives_reload() {
        let store = store().await;
        let history = ScanHistoryStore::load(store.clone(), 100).await;
        let r = record(1);
        history.append(r.clone()).await;
        history.update_status(&r.id, ScanStatus::SyncFailed).await;

        let reloaded = ScanHistoryStore::load(store, 100).await;
        assert_eq!(
            reloaded.get(&r.id).await.unwrap().status,
            ScanStatus::SyncFailed
        );
    }

    #[tokio::test]
    async fn test_corrupt_history_fails_closed() {
        let store = store().await;
        store.put_raw(keys::HISTORY, "not json").await.unwrap();

        let history = ScanHistoryStore::load(store, 100).await;
        assert!(history.list(10).await.is_empty());
    }
}
