//! # Drain Ordering
//!
//! Pure ordering rules for the operation queue.
//!
//! ```text
//! enqueue order:  n1(normal) h1(high) l1(low) n2(normal) h2(high)
//!
//! drain order:    h1 h2 │ n1 n2 │ l1
//!                 high  │normal │ low      (FIFO inside each band)
//! ```

use crate::types::QueueItem;

/// Returns the items in drain order: priority descending, then
/// `enqueued_at` ascending.
///
/// The sort is stable, so items with identical priority and timestamp keep
/// the order in which they were enqueued.
pub fn order_for_drain(items: &[QueueItem]) -> Vec<QueueItem> {
    let mut ordered = items.to_vec();
    ordered.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.enqueued_at.cmp(&b.enqueued_at))
    });
    ordered
}

/// Finds the live item carrying the given idempotency key.
pub fn find_by_idempotency_key<'a>(items: &'a [QueueItem], key: &str) -> Option<&'a QueueItem> {
    items
        .iter()
        .find(|item| item.operation.idempotency_key() == Some(key))
}
