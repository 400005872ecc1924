//! # medscan-sync: Offline-first Sync Engine for MedScan
//!
//! Lets the app record scans and queue remote operations with no network,
//! then delivers them in priority order when connectivity returns.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  SyncEngine (Composition Root)                   │  │
//! │  │                                                                  │  │
//! │  │  Built once at app start, shared as Arc<SyncEngine>              │  │
//! │  │  save_scan_offline · search · get_sync_stats · force_sync        │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ NetworkMonitor │  │ SyncScheduler  │  │   ReferenceCache       │    │
//! │  │                │  │                │  │                        │    │
//! │  │ Debounces      │  │ Single-flight  │  │ Offline substring      │    │
//! │  │ observations   │──► drain, retry   │  │ search, alternatives   │    │
//! │  │ Reconnect edge │  │ classification │  │                        │    │
//! │  └────────────────┘  └───────┬────────┘  └────────────────────────┘    │
//! │                              │                                          │
//! │         ┌────────────────────┼────────────────────┐                     │
//! │         ▼                    ▼                    ▼                     │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ OperationQueue │  │ScanHistoryStore│  │  RemoteDispatcher      │    │
//! │  │ sync.queue     │  │ sync.history   │  │  HttpDispatcher        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - `SyncEngine` and its builder
//! - [`scheduler`] - Drain loop, stats, event emitter trait
//! - [`queue`] - Durable operation queue
//! - [`history`] - Scan history ledger
//! - [`reference`] - Reference dataset cache
//! - [`network`] - Reachability monitor and TCP probe
//! - [`dispatcher`] - Remote dispatcher trait and HTTP adapter
//! - [`config`] - Sync configuration (TOML + environment)
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medscan_sync::{SyncConfig, SyncEngine};
//!
//! let engine = Arc::new(
//!     SyncEngine::builder(SyncConfig::load_or_default(None))
//!         .build()
//!         .await?,
//! );
//! engine.start().await?;
//!
//! // Platform reachability callback
//! engine.network().report(NetworkState::online(ConnectionType::Wifi));
//!
//! let record = engine.save_scan_offline(payload).await;
//! let stats = engine.get_sync_stats().await;
//! println!("Queued: {}", stats.queued_operations);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod history;
pub mod network;
pub mod queue;
pub mod reference;
pub mod scheduler;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{SyncConfig, SyncMode};
pub use dispatcher::{HttpDispatcher, RemoteDispatcher};
pub use engine::{SyncEngine, SyncEngineBuilder};
pub use error::{SyncError, SyncResult};
pub use history::ScanHistoryStore;
pub use network::{NetworkMonitor, ReachabilityProbe, SubscriptionId, TcpProbe};
pub use queue::OperationQueue;
pub use reference::ReferenceCache;
pub use scheduler::{NoOpEmitter, SyncEventEmitter, SyncScheduler};
