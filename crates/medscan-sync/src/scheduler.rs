//! # Sync Scheduler
//!
//! Single-flight drain of the operation queue against the remote dispatcher.
//!
//! ## Drain Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          drain()                                        │
//! │                                                                         │
//! │  in-flight slot occupied? ──yes──► await that pass, return its report  │
//! │            │ no                                                         │
//! │            ▼                                                            │
//! │  claim slot, spawn the pass task, await its report                     │
//! │            │                                                            │
//! │            ▼  (pass task)                                               │
//! │  snapshot queue.peek_ordered()                                         │
//! │            │                                                            │
//! │            ▼  for each item, one at a time                              │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │ timeout(dispatch_timeout, dispatcher.dispatch(op))                │ │
//! │  │                                                                   │ │
//! │  │  Ok          → remove(id); ScanUpload → Synced                    │ │
//! │  │  retryable   → increment_retry(id)                                │ │
//! │  │                  < max  → stays queued for the next pass          │ │
//! │  │                  = max  → remove(id); ScanUpload → SyncFailed     │ │
//! │  │  permanent   → remove(id); ScanUpload → SyncFailed                │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! │            │                                                            │
//! │            ▼                                                            │
//! │  persist last_sync_at, release slot, publish report                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each item's removal and status update are committed before the next item
//! is dispatched, so a crash mid-pass never replays a delivered item. The
//! pass runs on its own task: a caller that stops waiting does not stop it.
//! There is no timer. A retryable failure waits for the next reconnect or
//! manual sync.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use medscan_core::{Operation, QueueItem, ScanStatus, SyncReport, SyncStats};
use medscan_db::{keys, LocalStore};

use crate::config::SyncSettings;
use crate::dispatcher::RemoteDispatcher;
use crate::error::SyncError;
use crate::history::ScanHistoryStore;
use crate::queue::OperationQueue;

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Sink for sync events (implemented by the mobile bridge).
pub trait SyncEventEmitter: Send + Sync {
    /// Emits a stats snapshot.
    fn emit_status(&self, stats: &SyncStats);

    /// Emits drain progress after each item.
    fn emit_progress(&self, processed: usize, total: usize);

    /// Emits a user-visible error.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _stats: &SyncStats) {}
    fn emit_progress(&self, _processed: usize, _total: usize) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// In-flight Slot
// =============================================================================

type InFlight = Mutex<Option<watch::Receiver<Option<SyncReport>>>>;

/// Releases the in-flight slot when the pass ends, even by panic.
struct InFlightGuard {
    slot: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        *slot = None;
    }
}

enum Claim {
    Leader(watch::Sender<Option<SyncReport>>, watch::Receiver<Option<SyncReport>>),
    Follower(watch::Receiver<Option<SyncReport>>),
}

// =============================================================================
// Sync Scheduler
// =============================================================================

/// Drains the queue. Only writer of scan status.
pub struct SyncScheduler {
    queue: Arc<OperationQueue>,
    history: Arc<ScanHistoryStore>,
    dispatcher: Arc<dyn RemoteDispatcher>,
    store: LocalStore,
    emitter: Arc<dyn SyncEventEmitter>,
    max_retries: u32,
    dispatch_timeout: Duration,
    in_flight: Arc<InFlight>,
    last_sync_at: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl SyncScheduler {
    /// Creates a scheduler, restoring the persisted `last_sync_at`.
    pub async fn new(
        queue: Arc<OperationQueue>,
        history: Arc<ScanHistoryStore>,
        dispatcher: Arc<dyn RemoteDispatcher>,
        store: LocalStore,
        settings: &SyncSettings,
    ) -> Self {
        let last_sync_at = match store.get_json::<DateTime<Utc>>(keys::LAST_SYNC_AT).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Persisted last sync time unreadable, ignoring");
                None
            }
        };

        SyncScheduler {
            queue,
            history,
            dispatcher,
            store,
            emitter: Arc::new(NoOpEmitter),
            max_retries: settings.max_retries,
            dispatch_timeout: Duration::from_secs(settings.dispatch_timeout_secs),
            in_flight: Arc::new(Mutex::new(None)),
            last_sync_at: Arc::new(RwLock::new(last_sync_at)),
        }
    }

    /// Replaces the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Overrides the per-dispatch timeout.
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Completion time of the last pass.
    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        *self.last_sync_at.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Returns true while a pass is running.
    pub fn is_syncing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }

    /// Derived snapshot of the subsystem.
    pub async fn stats(&self, is_online: bool) -> SyncStats {
        SyncStats {
            is_online,
            queued_operations: self.queue.len().await,
            pending_scans: self.history.pending_count().await,
            last_sync_at: self.last_sync_at(),
            sync_in_progress: self.is_syncing(),
        }
    }

    /// Runs one drain pass, or waits for the one already running.
    ///
    /// A caller arriving while a pass is in flight processes nothing. It
    /// waits for that pass to finish and gets the same report.
    ///
    /// The pass itself runs on its own task. Dropping the returned future
    /// stops the wait, never the pass: every snapshotted item is still
    /// settled and `last_sync_at` is still stamped.
    pub async fn drain(&self) -> SyncReport {
        let rx = match self.claim() {
            Claim::Follower(rx) => {
                debug!("Drain already in flight, joining it");
                rx
            }
            Claim::Leader(tx, rx) => {
                let guard = InFlightGuard {
                    slot: self.in_flight.clone(),
                };
                let pass = self.pass();
                tokio::spawn(async move {
                    let report = pass.run().await;
                    drop(guard);
                    tx.send_replace(Some(report));
                });
                rx
            }
        };

        self.join(rx).await
    }

    fn claim(&self) -> Claim {
        let mut slot = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(rx) = slot.as_ref().cloned() {
            return Claim::Follower(rx);
        }
        let (tx, rx) = watch::channel(None);
        *slot = Some(rx.clone());
        Claim::Leader(tx, rx)
    }

    async fn join(&self, mut rx: watch::Receiver<Option<SyncReport>>) -> SyncReport {
        let published = rx
            .wait_for(Option::is_some)
            .await
            .map(|report| report.clone().unwrap_or_default());

        match published {
            Ok(report) => report,
            // Pass task panicked before publishing.
            Err(_) => SyncReport {
                remaining: self.queue.len().await,
                ..Default::default()
            },
        }
    }

    fn pass(&self) -> DrainPass {
        DrainPass {
            queue: self.queue.clone(),
            history: self.history.clone(),
            dispatcher: self.dispatcher.clone(),
            store: self.store.clone(),
            emitter: self.emitter.clone(),
            max_retries: self.max_retries,
            dispatch_timeout: self.dispatch_timeout,
            last_sync_at: self.last_sync_at.clone(),
        }
    }
}

// =============================================================================
// Drain Pass
// =============================================================================

/// Everything one pass touches, owned so the pass can outlive its caller.
struct DrainPass {
    queue: Arc<OperationQueue>,
    history: Arc<ScanHistoryStore>,
    dispatcher: Arc<dyn RemoteDispatcher>,
    store: LocalStore,
    emitter: Arc<dyn SyncEventEmitter>,
    max_retries: u32,
    dispatch_timeout: Duration,
    last_sync_at: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl DrainPass {
    async fn run(&self) -> SyncReport {
        let snapshot = self.queue.peek_ordered().await;
        let total = snapshot.len();
        let mut report = SyncReport::default();

        info!(queued = total, "Drain pass starting");

        for (idx, item) in snapshot.iter().enumerate() {
            self.process_item(item, &mut report).await;
            self.emitter.emit_progress(idx + 1, total);
        }

        report.remaining = self.queue.len().await;
        self.record_completion().await;

        info!(
            successful = report.successful,
            failed = report.failed,
            remaining = report.remaining,
            needs_attention = report.needs_attention.len(),
            "Drain pass complete"
        );

        report
    }

    async fn process_item(&self, item: &QueueItem, report: &mut SyncReport) {
        let kind = item.operation.kind();

        let outcome = match tokio::time::timeout(
            self.dispatch_timeout,
            self.dispatcher.dispatch(&item.operation),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.dispatch_timeout.as_secs())),
        };

        match outcome {
            Ok(()) => {
                self.queue.remove(&item.id).await;
                if let Some(scan_id) = item.operation.scan_id() {
                    self.history.update_status(scan_id, ScanStatus::Synced).await;
                }
                report.successful += 1;
                debug!(id = %item.id, kind = %kind, "Operation delivered");
            }

            Err(e) if e.is_retryable() => match self.queue.increment_retry(&item.id).await {
                Some(retries) if retries < self.max_retries => {
                    debug!(
                        id = %item.id,
                        kind = %kind,
                        retries,
                        error = %e,
                        "Retryable failure, left queued"
                    );
                }
                Some(retries) => {
                    let exhausted = SyncError::MaxRetriesExceeded {
                        id: item.id.clone(),
                        last_error: e.to_string(),
                    };
                    error!(kind = %kind, retries, error = %exhausted, "Operation abandoned");
                    self.surface(&exhausted);
                    self.abandon(item, report).await;
                }
                None => debug!(id = %item.id, "Item removed during dispatch"),
            },

            Err(e) => {
                warn!(id = %item.id, kind = %kind, error = %e, "Permanent failure");
                self.surface(&e);
                self.abandon(item, report).await;
            }
        }
    }

    /// Drops an item for good and fails the scan it would have settled.
    async fn abandon(&self, item: &QueueItem, report: &mut SyncReport) {
        self.queue.remove(&item.id).await;
        report.failed += 1;

        if let Operation::ScanUpload { scan_id, .. } = &item.operation {
            if self
                .history
                .update_status(scan_id, ScanStatus::SyncFailed)
                .await
            {
                report.needs_attention.push(scan_id.clone());
            }
        }
    }

    /// Forwards user-visible errors to the emitter. The rest stay in the logs.
    fn surface(&self, err: &SyncError) {
        if err.is_user_visible() {
            self.emitter.emit_error(&err.to_string(), err.is_retryable());
        }
    }

    async fn record_completion(&self) {
        let now = Utc::now();
        {
            let mut last = self.last_sync_at.write().unwrap_or_else(|p| p.into_inner());
            *last = Some(now);
        }

        if let Err(e) = self.store.put_json(keys::LAST_SYNC_AT, &now).await {
            error!(error = %e, "Failed to persist last sync time");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncResult;
    use async_trait::async_trait;
    use medscan_core::{Priority, ScanRecord};
    use medscan_db::{Database, DbConfig};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Outcome {
        Ok,
        Retry,
        Reject,
    }

    /// Plays back outcomes in order; `Ok` once the script runs out.
    struct ScriptedDispatcher {
        script: Mutex<VecDeque<Outcome>>,
        delay: Duration,
        dispatched: Mutex<Vec<Operation>>,
    }

    impl ScriptedDispatcher {
        fn new(script: &[Outcome]) -> Self {
            ScriptedDispatcher {
                script: Mutex::new(script.iter().copied().collect()),
                delay: Duration::ZERO,
                dispatched: Mutex::new(Vec::new()),
            }
        }

        fn slow(delay: Duration) -> Self {
            ScriptedDispatcher {
                delay,
                ..Self::new(&[])
            }
        }

        fn calls(&self) -> usize {
            self.dispatched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RemoteDispatcher for ScriptedDispatcher {
        async fn dispatch(&self, operation: &Operation) -> SyncResult<()> {
            self.dispatched.lock().unwrap().push(operation.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.script.lock().unwrap().pop_front().unwrap_or(Outcome::Ok);
            match next {
                Outcome::Ok => Ok(()),
                Outcome::Retry => Err(SyncError::RetryableDispatch("HTTP 503".into())),
                Outcome::Reject => Err(SyncError::PermanentDispatch("HTTP 422".into())),
            }
        }
    }

    #[derive(Default)]
    struct CountingEmitter {
        errors: AtomicUsize,
        progress: AtomicUsize,
    }

    impl SyncEventEmitter for CountingEmitter {
        fn emit_status(&self, _stats: &SyncStats) {}
        fn emit_progress(&self, _processed: usize, _total: usize) {
            self.progress.fetch_add(1, Ordering::SeqCst);
        }
        fn emit_error(&self, _message: &str, _retryable: bool) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        store: LocalStore,
        queue: Arc<OperationQueue>,
        history: Arc<ScanHistoryStore>,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Database::new(DbConfig::in_memory()).await.unwrap().store();
            Fixture {
                queue: Arc::new(OperationQueue::load(store.clone()).await),
                history: Arc::new(ScanHistoryStore::load(store.clone(), 100).await),
                store,
            }
        }

        async fn scheduler(&self, dispatcher: Arc<dyn RemoteDispatcher>) -> SyncScheduler {
            SyncScheduler::new(
                self.queue.clone(),
                self.history.clone(),
                dispatcher,
                self.store.clone(),
                &SyncSettings::default(),
            )
            .await
        }

        async fn save_scan(&self) -> ScanRecord {
            let record = ScanRecord::new_pending(json!({"barcode": "0123"}));
            self.history.append(record.clone()).await;
            self.queue
                .enqueue(record.upload_operation(), Priority::High)
                .await;
            record
        }
    }

    fn analytics(name: &str) -> Operation {
        Operation::AnalyticsEvent {
            name: name.into(),
            props: json!({}),
        }
    }

    #[tokio::test]
    async fn test_success_marks_scan_synced() {
        let fx = Fixture::new().await;
        let scan = fx.save_scan().await;
        let scheduler = fx.scheduler(Arc::new(ScriptedDispatcher::new(&[]))).await;

        let report = scheduler.drain().await;

        assert_eq!(report.successful, 1);
        assert_eq!(report.remaining, 0);
        assert!(fx.queue.is_empty().await);
        assert_eq!(
            fx.history.get(&scan.id).await.unwrap().status,
            ScanStatus::Synced
        );
    }

    #[tokio::test]
    async fn test_one_short_of_max_retries_stays_queued() {
        let fx = Fixture::new().await;
        let scan = fx.save_scan().await;
        let dispatcher = Arc::new(ScriptedDispatcher::new(&[Outcome::Retry, Outcome::Retry]));
        let scheduler = fx.scheduler(dispatcher.clone()).await;

        scheduler.drain().await;
        let report = scheduler.drain().await;

        assert_eq!(dispatcher.calls(), 2);
        assert_eq!(report.remaining, 1);
        let items = fx.queue.peek_ordered().await;
        assert_eq!(items[0].retries, 2);
        assert_eq!(
            fx.history.get(&scan.id).await.unwrap().status,
            ScanStatus::PendingUpload
        );
    }

    #[tokio::test]
    async fn test_retry_exhaustion_fails_scan() {
        let fx = Fixture::new().await;
        let scan = fx.save_scan().await;
        let dispatcher = Arc::new(ScriptedDispatcher::new(&[
            Outcome::Retry,
            Outcome::Retry,
            Outcome::Retry,
        ]));
        let emitter = Arc::new(CountingEmitter::default());
        let scheduler = fx
            .scheduler(dispatcher.clone())
            .await
            .with_emitter(emitter.clone());

        for _ in 0..3 {
            scheduler.drain().await;
        }
        // Gone for good: a fourth pass dispatches nothing.
        let report = scheduler.drain().await;

        assert_eq!(dispatcher.calls(), 3);
        assert_eq!(report.processed(), 0);
        assert!(fx.queue.is_empty().await);
        assert_eq!(emitter.errors.load(Ordering::SeqCst), 1);

        let record = fx.history.get(&scan.id).await.unwrap();
        assert_eq!(record.status, ScanStatus::SyncFailed);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_needs_attention() {
        let fx = Fixture::new().await;
        let scan = fx.save_scan().await;
        let dispatcher = Arc::new(ScriptedDispatcher::new(&[
            Outcome::Retry,
            Outcome::Retry,
            Outcome::Retry,
        ]));
        let scheduler = fx.scheduler(dispatcher).await;

        scheduler.drain().await;
        scheduler.drain().await;
        let report = scheduler.drain().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.needs_attention, vec![scan.id]);
    }

    #[tokio::test]
    async fn test_permanent_failure_removed_without_retry() {
        let fx = Fixture::new().await;
        fx.queue.enqueue(analytics("bad"), Priority::Normal).await;
        let dispatcher = Arc::new(ScriptedDispatcher::new(&[Outcome::Reject]));
        let scheduler = fx.scheduler(dispatcher.clone()).await;

        let report = scheduler.drain().await;

        assert_eq!(report.failed, 1);
        assert!(report.needs_attention.is_empty());
        assert!(fx.queue.is_empty().await);
        assert_eq!(dispatcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_reupload_leaves_synced_scan_alone() {
        let fx = Fixture::new().await;
        let scan = fx.save_scan().await;
        let dispatcher = Arc::new(ScriptedDispatcher::new(&[Outcome::Ok, Outcome::Reject]));
        let scheduler = fx.scheduler(dispatcher).await;
        scheduler.drain().await;

        fx.queue
            .enqueue(scan.upload_operation(), Priority::High)
            .await;
        let report = scheduler.drain().await;

        assert_eq!(report.failed, 1);
        assert!(report.needs_attention.is_empty());
        assert_eq!(
            fx.history.get(&scan.id).await.unwrap().status,
            ScanStatus::Synced
        );
    }

    #[tokio::test]
    async fn test_dispatch_follows_priority_order() {
        let fx = Fixture::new().await;
        fx.queue.enqueue(analytics("low"), Priority::Low).await;
        fx.queue.enqueue(analytics("normal"), Priority::Normal).await;
        fx.queue.enqueue(analytics("high"), Priority::High).await;
        let dispatcher = Arc::new(ScriptedDispatcher::new(&[]));
        let scheduler = fx.scheduler(dispatcher.clone()).await;

        scheduler.drain().await;

        let names: Vec<String> = dispatcher
            .dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|op| match op {
                Operation::AnalyticsEvent { name, .. } => name.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["high", "normal", "low"]);
    }

    #[tokio::test]
    async fn test_concurrent_drain_is_single_flight() {
        let fx = Fixture::new().await;
        for n in 0..3 {
            fx.queue
                .enqueue(analytics(&format!("e{n}")), Priority::Normal)
                .await;
        }
        let dispatcher = Arc::new(ScriptedDispatcher::slow(Duration::from_millis(30)));
        let scheduler = fx.scheduler(dispatcher.clone()).await;

        let (first, second) = tokio::join!(scheduler.drain(), scheduler.drain());

        assert_eq!(dispatcher.calls(), 3);
        assert_eq!(first, second);
        assert_eq!(first.successful, 3);
        assert!(!scheduler.is_syncing());
    }

    #[tokio::test]
    async fn test_dropped_caller_still_settles_whole_snapshot() {
        let fx = Fixture::new().await;
        for n in 0..3 {
            fx.queue
                .enqueue(analytics(&format!("e{n}")), Priority::Normal)
                .await;
        }
        let dispatcher = Arc::new(ScriptedDispatcher::slow(Duration::from_millis(50)));
        let scheduler = fx.scheduler(dispatcher.clone()).await;

        let gave_up = tokio::time::timeout(Duration::from_millis(75), scheduler.drain()).await;
        assert!(gave_up.is_err());
        assert!(scheduler.is_syncing());

        while scheduler.is_syncing() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(dispatcher.calls(), 3);
        assert!(fx.queue.is_empty().await);
        assert!(scheduler.last_sync_at().is_some());
    }

    #[tokio::test]
    async fn test_rejection_is_not_surfaced_to_user() {
        let fx = Fixture::new().await;
        fx.queue.enqueue(analytics("rejected"), Priority::High).await;
        let dispatcher = Arc::new(ScriptedDispatcher::new(&[Outcome::Reject]));
        let emitter = Arc::new(CountingEmitter::default());
        let scheduler = fx
            .scheduler(dispatcher)
            .await
            .with_emitter(emitter.clone());

        let report = scheduler.drain().await;

        assert_eq!(report.failed, 1);
        assert_eq!(emitter.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_timeout_is_retryable() {
        let fx = Fixture::new().await;
        fx.queue.enqueue(analytics("slow"), Priority::Normal).await;
        let dispatcher = Arc::new(ScriptedDispatcher::slow(Duration::from_secs(5)));
        let scheduler = fx
            .scheduler(dispatcher)
            .await
            .with_dispatch_timeout(Duration::from_millis(20));

        let report = scheduler.drain().await;

        assert_eq!(report.remaining, 1);
        assert_eq!(fx.queue.peek_ordered().await[0].retries, 1);
    }

    #[tokio::test]
    async fn test_last_sync_at_persisted() {
        let fx = Fixture::new().await;
        let scheduler = fx.scheduler(Arc::new(ScriptedDispatcher::new(&[]))).await;
        assert!(scheduler.last_sync_at().is_none());

        scheduler.drain().await;
        let stamped = scheduler.last_sync_at().unwrap();

        let restored = fx.scheduler(Arc::new(ScriptedDispatcher::new(&[]))).await;
        assert_eq!(restored.last_sync_at(), Some(stamped));
    }

    #[tokio::test]
    async fn test_stats_reflect_queue_and_history() {
        let fx = Fixture::new().await;
        fx.save_scan().await;
        fx.queue.enqueue(analytics("a"), Priority::Low).await;
        let scheduler = fx.scheduler(Arc::new(ScriptedDispatcher::new(&[]))).await;

        let stats = scheduler.stats(false).await;
        assert!(!stats.is_online);
        assert_eq!(stats.queued_operations, 2);
        assert_eq!(stats.pending_scans, 1);
        assert!(!stats.sync_in_progress);
    }

    #[tokio::test]
    async fn test_progress_emitted_per_item() {
        let fx = Fixture::new().await;
        fx.queue.enqueue(analytics("a"), Priority::Low).await;
        fx.queue.enqueue(analytics("b"), Priority::Low).await;
        let emitter = Arc::new(CountingEmitter::default());
        let scheduler = fx
            .scheduler(Arc::new(ScriptedDispatcher::new(&[])))
            .await
            .with_emitter(emitter.clone());

        scheduler.drain().await;
        assert_eq!(emitter.progress.load(Ordering::SeqCst), 2);
    }
}
