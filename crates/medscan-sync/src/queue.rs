//! # Operation Queue
//!
//! Durable, priority-ordered list of operations awaiting remote delivery.
//!
//! ## Lifecycle of a Queue Item
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  enqueue(op, priority) ──► QueueItem { retries: 0 } ──► persisted      │
//! │                                   │                                     │
//! │                       drain pass  ▼                                     │
//! │            ┌──────────────────────┼──────────────────────┐              │
//! │            ▼                      ▼                      ▼              │
//! │        success             retryable failure      permanent failure    │
//! │        remove(id)          increment_retry(id)    remove(id)           │
//! │                                   │                                     │
//! │                     retries < max ─┴─ retries == max                    │
//! │                     stays queued      remove(id)                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation rewrites the `sync.queue` key while holding the queue lock,
//! so the persisted snapshot is always the latest one. A failed write is
//! logged and the in-memory queue stays authoritative for the session.

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use medscan_core::queue::{find_by_idempotency_key, order_for_drain};
use medscan_core::{Operation, Priority, QueueItem};
use medscan_db::{keys, LocalStore};

/// Pending operations, owned exclusively by this type.
pub struct OperationQueue {
    items: Mutex<Vec<QueueItem>>,
    store: LocalStore,
}

impl OperationQueue {
    /// Loads the persisted queue.
    ///
    /// Unreadable state fails closed to an empty queue.
    pub async fn load(store: LocalStore) -> Self {
        let items = match store.get_json::<Vec<QueueItem>>(keys::QUEUE).await {
            Ok(Some(items)) => {
                info!(count = items.len(), "Loaded persisted operation queue");
                items
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Persisted queue unreadable, starting empty");
                Vec::new()
            }
        };

        OperationQueue {
            items: Mutex::new(items),
            store,
        }
    }

    /// Adds an operation and returns its item id.
    ///
    /// An operation whose idempotency key matches a live item is merged:
    /// the existing id is returned and nothing new is queued.
    pub async fn enqueue(&self, operation: Operation, priority: Priority) -> String {
        let mut items = self.items.lock().await;

        if let Some(key) = operation.idempotency_key() {
            if let Some(existing) = find_by_idempotency_key(&items, key) {
                debug!(
                    id = %existing.id,
                    key = %key,
                    "Duplicate operation merged into live queue item"
                );
                return existing.id.clone();
            }
        }

        let item = QueueItem::new(operation, priority);
        let id = item.id.clone();

        debug!(
            id = %id,
            kind = %item.operation.kind(),
            priority = %priority,
            "Operation enqueued"
        );

        items.push(item);
        self.persist(&items).await;
        id
    }

    /// Returns the queue in drain order. Recomputed on every call.
    pub async fn peek_ordered(&self) -> Vec<QueueItem> {
        let items = self.items.lock().await;
        order_for_drain(&items)
    }

    /// Removes an item. Removing an absent id is a no-op returning false.
    pub async fn remove(&self, id: &str) -> bool {
        let mut items = self.items.lock().await;
        let before = items.len();
        items.retain(|item| item.id != id);

        if items.len() == before {
            return false;
        }

        self.persist(&items).await;
        true
    }

    /// Increments an item's retry count and returns the new count, or `None`
    /// if the item is gone.
    pub async fn increment_retry(&self, id: &str) -> Option<u32> {
        let mut items = self.items.lock().await;
        let item = items.iter_mut().find(|item| item.id == id)?;
        item.retries += 1;
        let retries = item.retries;

        self.persist(&items).await;
        Some(retries)
    }

    /// Number of queued items.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Returns true if nothing is queued.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    async fn persist(&self, items: &[QueueItem]) {
        if let Err(e) = self.store.put_json(keys::QUEUE, items).await {
            error!(error = %e, count = items.len(), "Failed to persist operation queue");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medscan_db::{Database, DbConfig};
    use serde_json::json;

    async fn store() -> LocalStore {
        Database::new(DbConfig::in_memory()).await.unwrap().store()
    }

    fn analytics(name: &str) -> Operation {
        Operation::AnalyticsEvent {
            name: name.to_string(),
            props: json!({}),
        }
    }

    fn names(items: &[QueueItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| match &item.operation {
                Operation::AnalyticsEvent { name, .. } => name.clone(),
                other => other.kind().to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_peek_ordered_groups_by_priority() {
        let queue = OperationQueue::load(store().await).await;

        queue.enqueue(analytics("n1"), Priority::Normal).await;
        queue.enqueue(analytics("l1"), Priority::Low).await;
        let h1 = queue.enqueue(analytics("h1"), Priority::High).await;
        queue.enqueue(analytics("n2"), Priority::Normal).await;
        queue.enqueue(analytics("h2"), Priority::High).await;

        assert_eq!(
            names(&queue.peek_ordered().await),
            vec!["h1", "h2", "n1", "n2", "l1"]
        );

        queue.remove(&h1).await;
        queue.enqueue(analytics("h3"), Priority::High).await;

        assert_eq!(
            names(&queue.peek_ordered().await),
            vec!["h2", "h3", "n1", "n2", "l1"]
        );
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let queue = OperationQueue::load(store().await).await;
        let id = queue.enqueue(analytics("a"), Priority::Normal).await;

        assert!(queue.remove(&id).await);
        assert!(!queue.remove(&id).await);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_increment_retry_returns_new_count() {
        let queue = OperationQueue::load(store().await).await;
        let id = queue.enqueue(analytics("a"), Priority::Normal).await;

        assert_eq!(queue.increment_retry(&id).await, Some(1));
        assert_eq!(queue.increment_retry(&id).await, Some(2));
        assert_eq!(queue.increment_retry("missing").await, None);
    }

    #[tokio::test]
    async fn test_duplicate_scan_upload_is_merged() {
        let queue = OperationQueue::load(store().await).await;
        let op = Operation::ScanUpload {
            scan_id: "3f1c7a52-5d0e-4a8e-9f55-0c5b8c7d2e11".to_string(),
            payload: json!({"barcode": "0123"}),
        };

        let first = queue.enqueue(op.clone(), Priority::High).await;
        let second = queue.enqueue(op, Priority::High).await;

        assert_eq!(first, second);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_queue_survives_reload() {
        let store = store().await;
        let queue = OperationQueue::load(store.clone()).await;
        let id = queue.enqueue(analytics("a"), Priority::Low).await;
        queue.increment_retry(&id).await;

        let reloaded = OperationQueue::load(store).await;
        let items = reloaded.peek_ordered().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(items[0].retries, 1);
    }

    #[tokio::test]
    async fn test_corrupt_queue_fails_closed() {
        let store = store().await;
        store.put_raw(keys::QUEUE, "[{\"id\": 42").await.unwrap();

        let queue = OperationQueue::load(store).await;
        assert!(queue.is_empty().await);

        queue.enqueue(analytics("fresh"), Priority::Normal).await;
        assert_eq!(queue.len().await, 1);
    }
}
