//! # Sync Engine
//!
//! Composition root and caller-facing surface of the sync subsystem.
//!
//! ## Engine Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncEngine Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         SyncEngine                               │  │
//! │  │                                                                  │  │
//! │  │  • Built once by the app, shared as Arc<SyncEngine>              │  │
//! │  │  • Local writes always succeed immediately                       │  │
//! │  │  • Spawns the reconnect listener and optional probe loop         │  │
//! │  │  • Emits status events to the mobile bridge                      │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │     ┌──────────────┬──────────┼──────────────┬──────────────┐          │
//! │     ▼              ▼          ▼              ▼              ▼           │
//! │  ┌────────┐  ┌──────────┐  ┌────────┐  ┌──────────┐  ┌────────────┐   │
//! │  │Network │  │Operation │  │ Sync   │  │  Scan    │  │ Reference  │   │
//! │  │Monitor │  │  Queue   │  │Schedul.│  │ History  │  │   Cache    │   │
//! │  └───┬────┘  └──────────┘  └───▲────┘  └──────────┘  └────────────┘   │
//! │      │  offline → online edge  │                                       │
//! │      └──► reconnect listener ──┘  drain()                              │
//! │                                                                         │
//! │  STATUS EVENTS:                                                        │
//! │  ──────────────                                                        │
//! │  emit_status   - SyncStats after every drain                           │
//! │  emit_progress - (processed, total) per drained item                   │
//! │  emit_error    - retry exhaustion, force sync while offline            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use medscan_core::{
    Alternative, NetworkState, Operation, Priority, ReferenceDataset, ScanRecord, SearchHit,
    SyncReport, SyncStats,
};
use medscan_db::{keys, Database, DbConfig};

use crate::config::SyncConfig;
use crate::dispatcher::{HttpDispatcher, RemoteDispatcher};
use crate::error::{SyncError, SyncResult};
use crate::history::ScanHistoryStore;
use crate::network::{spawn_probe_loop, NetworkMonitor, TcpProbe};
use crate::queue::OperationQueue;
use crate::reference::ReferenceCache;
use crate::scheduler::{NoOpEmitter, SyncEventEmitter, SyncScheduler};

/// Background tasks owned by a started engine.
struct Running {
    shutdown_txs: Vec<mpsc::Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

// =============================================================================
// Sync Engine
// =============================================================================

/// The offline-first sync subsystem.
pub struct SyncEngine {
    config: Arc<SyncConfig>,
    db: Database,
    network: Arc<NetworkMonitor>,
    queue: Arc<OperationQueue>,
    history: Arc<ScanHistoryStore>,
    reference: Arc<ReferenceCache>,
    scheduler: Arc<SyncScheduler>,
    emitter: Arc<dyn SyncEventEmitter>,
    running: Mutex<Option<Running>>,
}

impl SyncEngine {
    /// Returns a builder for the given config.
    pub fn builder(config: SyncConfig) -> SyncEngineBuilder {
        SyncEngineBuilder::new(config)
    }

    // =========================================================================
    // Caller-facing Surface
    // =========================================================================

    /// Records a scan locally and queues its upload.
    ///
    /// Never waits on the network. The returned record is already visible
    /// through [`SyncEngine::get_history`].
    pub async fn save_scan_offline(&self, payload: Value) -> ScanRecord {
        let record = ScanRecord::new_pending(payload);

        self.history.append(record.clone()).await;
        let item_id = self
            .queue
            .enqueue(record.upload_operation(), Priority::High)
            .await;

        info!(scan_id = %record.id, item_id = %item_id, "Scan saved offline");
        record
    }

    /// Queues an arbitrary operation. Returns the queue item id.
    pub async fn enqueue_operation(&self, operation: Operation, priority: Priority) -> String {
        self.queue.enqueue(operation, priority).await
    }

    /// Most recent scans, newest first.
    pub async fn get_history(&self, limit: usize) -> Vec<ScanRecord> {
        self.history.list(limit).await
    }

    /// Offline reference search.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.reference.search(query)
    }

    /// Natural alternatives for a medication.
    pub fn get_alternatives(&self, name: &str) -> Vec<Alternative> {
        self.reference.lookup_alternatives_for(name)
    }

    /// Current sync statistics.
    pub async fn get_sync_stats(&self) -> SyncStats {
        self.scheduler.stats(self.network.is_online()).await
    }

    /// Drains now. Fails with [`SyncError::NotOnline`] when offline.
    pub async fn force_sync(&self) -> SyncResult<SyncReport> {
        if !self.network.is_online() {
            let err = SyncError::NotOnline;
            self.emitter.emit_error(&err.to_string(), false);
            return Err(err);
        }

        info!("Manual sync requested");
        let report = self.scheduler.drain().await;
        self.emit_stats().await;
        Ok(report)
    }

    /// Persists a new reference snapshot and swaps it in.
    pub async fn refresh_reference(&self, dataset: ReferenceDataset) -> SyncResult<()> {
        self.db
            .store()
            .put_json(keys::REFERENCE_DATASET, &dataset)
            .await?;
        self.reference.load(dataset);
        Ok(())
    }

    /// Reachability monitor. Platform observations go to `network().report(..)`.
    pub fn network(&self) -> &Arc<NetworkMonitor> {
        &self.network
    }

    /// Engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts background tasks.
    ///
    /// The reconnect listener runs one drain per offline → online edge.
    /// The probe loop only runs when `[network] probe_enabled` is set.
    pub async fn start(&self) -> SyncResult<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            warn!("Sync engine already started");
            return Ok(());
        }

        info!(
            mode = %self.config.mode(),
            api_url = %self.config.remote.api_url,
            probe = self.config.network.probe_enabled,
            "Starting sync engine"
        );

        let mut tasks = Running {
            shutdown_txs: Vec::new(),
            handles: Vec::new(),
        };

        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        self.network.set_reconnect_trigger(trigger_tx);

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tasks.shutdown_txs.push(shutdown_tx);
        tasks.handles.push(tokio::spawn(Self::reconnect_listener(
            self.config.clone(),
            self.scheduler.clone(),
            self.emitter.clone(),
            trigger_rx,
            shutdown_rx,
        )));

        if self.config.network.probe_enabled {
            let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
            tasks.shutdown_txs.push(shutdown_tx);
            tasks.handles.push(spawn_probe_loop(
                self.network.clone(),
                Arc::new(TcpProbe::new(
                    self.config.network.probe_addr.clone(),
                    self.config.probe_timeout(),
                )),
                self.config.probe_interval(),
                shutdown_rx,
            ));
        }

        *running = Some(tasks);
        info!("Sync engine started");
        Ok(())
    }

    /// Stops background tasks. An in-flight drain finishes first.
    pub async fn shutdown(&self) -> SyncResult<()> {
        let Some(tasks) = self.running.lock().await.take() else {
            return Ok(());
        };

        info!("Shutting down sync engine");

        for tx in &tasks.shutdown_txs {
            let _ = tx.send(()).await;
        }
        for handle in tasks.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }

        info!("Sync engine stopped");
        Ok(())
    }

    /// Drains once per reconnect signal until shut down.
    async fn reconnect_listener(
        config: Arc<SyncConfig>,
        scheduler: Arc<SyncScheduler>,
        emitter: Arc<dyn SyncEventEmitter>,
        mut trigger_rx: mpsc::UnboundedReceiver<NetworkState>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                Some(state) = trigger_rx.recv() => {
                    if !config.mode().drains_on_reconnect() {
                        debug!("Reconnected in manual mode, not draining");
                        continue;
                    }

                    info!(connection = %state.connection_type, "Reconnected, draining queue");
                    let report = scheduler.drain().await;
                    debug!(processed = report.processed(), "Reconnect drain finished");
                    emitter.emit_status(&scheduler.stats(true).await);
                }

                _ = shutdown_rx.recv() => {
                    debug!("Reconnect listener shutting down");
                    break;
                }
            }
        }
    }

    async fn emit_stats(&self) {
        let stats = self.get_sync_stats().await;
        self.emitter.emit_status(&stats);
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for [`SyncEngine`].
///
/// ## Example
/// ```rust,ignore
/// let engine = Arc::new(
///     SyncEngine::builder(SyncConfig::load_or_default(None))
///         .with_emitter(bridge)
///         .build()
///         .await?,
/// );
/// engine.start().await?;
/// ```
pub struct SyncEngineBuilder {
    config: SyncConfig,
    db: Option<Database>,
    dispatcher: Option<Arc<dyn RemoteDispatcher>>,
    emitter: Option<Arc<dyn SyncEventEmitter>>,
    network: Option<Arc<NetworkMonitor>>,
}

impl SyncEngineBuilder {
    /// Creates a new builder with the given config.
    pub fn new(config: SyncConfig) -> Self {
        SyncEngineBuilder {
            config,
            db: None,
            dispatcher: None,
            emitter: None,
            network: None,
        }
    }

    /// Uses an open database instead of `[storage] db_path`.
    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    /// Uses a custom dispatcher instead of HTTP.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn RemoteDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Uses an existing network monitor.
    pub fn with_network(mut self, network: Arc<NetworkMonitor>) -> Self {
        self.network = Some(network);
        self
    }

    /// Opens storage, restores persisted state and wires the components.
    pub async fn build(self) -> SyncResult<SyncEngine> {
        self.config.validate()?;

        let db = match self.db {
            Some(db) => db,
            None => {
                if let Some(parent) = self.config.storage.db_path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Database::new(DbConfig::new(&self.config.storage.db_path)).await?
            }
        };

        let dispatcher: Arc<dyn RemoteDispatcher> = match self.dispatcher {
            Some(d) => d,
            None => Arc::new(HttpDispatcher::from_settings(&self.config.remote)?),
        };
        let emitter = self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter));
        let network = self
            .network
            .unwrap_or_else(|| Arc::new(NetworkMonitor::new()));

        let store = db.store();
        let queue = Arc::new(OperationQueue::load(store.clone()).await);
        let history =
            Arc::new(ScanHistoryStore::load(store.clone(), self.config.history.max_records).await);

        let reference = Arc::new(ReferenceCache::new(self.config.reference.search_limit));
        if let Some(dataset) = restore_reference(&db, &self.config).await {
            reference.load(dataset);
        }

        let scheduler = Arc::new(
            SyncScheduler::new(
                queue.clone(),
                history.clone(),
                dispatcher,
                store,
                &self.config.sync,
            )
            .await
            .with_emitter(emitter.clone()),
        );

        Ok(SyncEngine {
            config: Arc::new(self.config),
            db,
            network,
            queue,
            history,
            reference,
            scheduler,
            emitter,
            running: Mutex::new(None),
        })
    }
}

/// Persisted snapshot first, then the bundled file. Failures fall through.
async fn restore_reference(db: &Database, config: &SyncConfig) -> Option<ReferenceDataset> {
    match db
        .store()
        .get_json::<ReferenceDataset>(keys::REFERENCE_DATASET)
        .await
    {
        Ok(Some(dataset)) => return Some(dataset),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Persisted reference dataset unreadable"),
    }

    let path = config.reference.bundled_path.as_ref()?;
    let dataset = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| e.to_string())
        .and_then(|json| ReferenceDataset::from_json(&json).map_err(|e| e.to_string()));

    match dataset {
        Ok(dataset) => {
            info!(path = %path.display(), "Loaded bundled reference dataset");
            if let Err(e) = db
                .store()
                .put_json(keys::REFERENCE_DATASET, &dataset)
                .await
            {
                warn!(error = %e, "Failed to persist bundled reference dataset");
            }
            Some(dataset)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Bundled reference dataset unusable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use medscan_core::{ConnectionType, ReferenceEntry, ScanStatus, Source};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails retryably `failures` times, then succeeds.
    struct FlakyDispatcher {
        failures: std::sync::Mutex<VecDeque<()>>,
        calls: AtomicUsize,
    }

    impl FlakyDispatcher {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(FlakyDispatcher {
                failures: std::sync::Mutex::new(std::iter::repeat(()).take(failures).collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RemoteDispatcher for FlakyDispatcher {
        async fn dispatch(&self, _operation: &Operation) -> SyncResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failures.lock().unwrap().pop_front() {
                Some(()) => Err(SyncError::RetryableDispatch("HTTP 503".into())),
                None => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingEmitter {
        statuses: AtomicUsize,
        errors: AtomicUsize,
    }

    impl SyncEventEmitter for RecordingEmitter {
        fn emit_status(&self, _stats: &SyncStats) {
            self.statuses.fetch_add(1, Ordering::SeqCst);
        }
        fn emit_progress(&self, _processed: usize, _total: usize) {}
        fn emit_error(&self, _message: &str, _retryable: bool) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn engine_with(
        config: SyncConfig,
        db: Database,
        dispatcher: Arc<dyn RemoteDispatcher>,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> SyncEngine {
        SyncEngine::builder(config)
            .with_database(db)
            .with_dispatcher(dispatcher)
            .with_emitter(emitter)
            .build()
            .await
            .unwrap()
    }

    async fn engine(dispatcher: Arc<dyn RemoteDispatcher>) -> SyncEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        engine_with(
            SyncConfig::default(),
            db,
            dispatcher,
            Arc::new(NoOpEmitter),
        )
        .await
    }

    fn dataset() -> ReferenceDataset {
        let mut categories = BTreeMap::new();
        categories.insert(
            "pain".to_string(),
            vec![ReferenceEntry {
                id: "p1".into(),
                name: "Ibuprofen".into(),
                conditions: vec!["headache".into()],
                description: None,
            }],
        );
        ReferenceDataset {
            categories,
            alternatives: vec![Alternative {
                name: "Turmeric".into(),
                targets: vec!["Ibuprofen".into()],
                description: None,
            }],
            version: "2024.05".into(),
            last_updated: Utc::now(),
        }
    }

    /// Polls until the queue is empty or two seconds pass.
    async fn wait_for_empty_queue(engine: &SyncEngine) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while engine.get_sync_stats().await.queued_operations > 0 {
            assert!(tokio::time::Instant::now() < deadline, "queue never drained");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_offline_save_then_reconnect_drains_once() {
        let dispatcher = FlakyDispatcher::new(0);
        let emitter = Arc::new(RecordingEmitter::default());
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = engine_with(
            SyncConfig::default(),
            db,
            dispatcher.clone(),
            emitter.clone(),
        )
        .await;
        engine.start().await.unwrap();

        let scan = engine.save_scan_offline(json!({"barcode": "0123"})).await;

        let stats = engine.get_sync_stats().await;
        assert!(!stats.is_online);
        assert_eq!(stats.queued_operations, 1);
        assert_eq!(stats.pending_scans, 1);

        engine
            .network()
            .report(NetworkState::online(ConnectionType::Wifi));
        // Duplicate observation is debounced and must not drain again.
        engine
            .network()
            .report(NetworkState::online(ConnectionType::Wifi));

        wait_for_empty_queue(&engine).await;
        engine.shutdown().await.unwrap();

        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.statuses.load(Ordering::SeqCst), 1);

        let history = engine.get_history(10).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, scan.id);
        assert_eq!(history[0].status, ScanStatus::Synced);

        let stats = engine.get_sync_stats().await;
        assert_eq!(stats.queued_operations, 0);
        assert_eq!(stats.pending_scans, 0);
        assert!(stats.last_sync_at.is_some());
    }

    #[tokio::test]
    async fn test_three_retryable_failures_mark_sync_failed() {
        let dispatcher = FlakyDispatcher::new(3);
        let engine = engine(dispatcher.clone()).await;
        engine
            .network()
            .report(NetworkState::online(ConnectionType::Cellular));

        let scan = engine.save_scan_offline(json!({"barcode": "0123"})).await;

        engine.force_sync().await.unwrap();
        engine.force_sync().await.unwrap();
        assert_eq!(engine.get_sync_stats().await.queued_operations, 1);

        let report = engine.force_sync().await.unwrap();
        assert_eq!(report.needs_attention, vec![scan.id.clone()]);
        assert_eq!(engine.get_sync_stats().await.queued_operations, 0);

        let history = engine.get_history(10).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, ScanStatus::SyncFailed);

        engine.force_sync().await.unwrap();
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_force_sync_offline_is_not_online_error() {
        let dispatcher = FlakyDispatcher::new(0);
        let emitter = Arc::new(RecordingEmitter::default());
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = engine_with(
            SyncConfig::default(),
            db,
            dispatcher.clone(),
            emitter.clone(),
        )
        .await;
        engine
            .enqueue_operation(
                Operation::AlternativesRequest {
                    medication_name: "ibuprofen".into(),
                },
                Priority::Low,
            )
            .await;

        let err = engine.force_sync().await.unwrap_err();
        assert!(matches!(err, SyncError::NotOnline));
        assert_eq!(emitter.errors.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.get_sync_stats().await.queued_operations, 1);
    }

    #[tokio::test]
    async fn test_manual_mode_does_not_drain_on_reconnect() {
        let dispatcher = FlakyDispatcher::new(0);
        let mut config = SyncConfig::default();
        config.sync.mode = crate::config::SyncMode::Manual;
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = engine_with(config, db, dispatcher.clone(), Arc::new(NoOpEmitter)).await;
        engine.start().await.unwrap();

        engine.save_scan_offline(json!({})).await;
        engine
            .network()
            .report(NetworkState::online(ConnectionType::Wifi));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.get_sync_stats().await.queued_operations, 1);

        engine.force_sync().await.unwrap();
        assert_eq!(engine.get_sync_stats().await.queued_operations, 0);
        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_drain_after_shutdown() {
        let dispatcher = FlakyDispatcher::new(0);
        let engine = engine(dispatcher.clone()).await;
        engine.start().await.unwrap();
        engine.shutdown().await.unwrap();

        engine.save_scan_offline(json!({})).await;
        engine
            .network()
            .report(NetworkState::online(ConnectionType::Wifi));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_works_offline_after_refresh() {
        let engine = engine(FlakyDispatcher::new(0)).await;
        assert!(engine.search("ibuprofen").is_empty());

        engine.refresh_reference(dataset()).await.unwrap();

        assert!(!engine.network().is_online());
        let hits = engine.search("ibuprofen");
        assert!(hits
            .iter()
            .any(|h| h.category == "pain" && h.source == Source::Cache));
        assert_eq!(engine.get_alternatives("Ibuprofen")[0].name, "Turmeric");
    }

    #[tokio::test]
    async fn test_state_restored_from_same_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = engine_with(
            SyncConfig::default(),
            db.clone(),
            FlakyDispatcher::new(0),
            Arc::new(NoOpEmitter),
        )
        .await;
        first.refresh_reference(dataset()).await.unwrap();
        let scan = first.save_scan_offline(json!({"barcode": "9"})).await;

        let second = engine_with(
            SyncConfig::default(),
            db,
            FlakyDispatcher::new(0),
            Arc::new(NoOpEmitter),
        )
        .await;

        assert_eq!(second.get_history(10).await[0].id, scan.id);
        assert_eq!(second.get_sync_stats().await.queued_operations, 1);
        assert!(!second.search("headache").is_empty());
    }

    #[tokio::test]
    async fn test_bundled_reference_fallback() {
        let path = std::env::temp_dir().join(format!("medscan-ref-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, serde_json::to_string(&dataset()).unwrap()).unwrap();

        let mut config = SyncConfig::default();
        config.reference.bundled_path = Some(path.clone());
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = engine_with(config, db, FlakyDispatcher::new(0), Arc::new(NoOpEmitter)).await;

        assert_eq!(engine.search("ibuprofen").len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let engine = engine(FlakyDispatcher::new(0)).await;
        engine.start().await.unwrap();
        engine.start().await.unwrap();
        engine.shutdown().await.unwrap();
        engine.shutdown().await.unwrap();
    }
}
