//! # medscan-db: Local Storage for MedScan Sync
//!
//! On-device persistence for the offline sync engine. Every concern (queue,
//! scan history, reference snapshot, last drain time) is stored as one JSON
//! document under its own key in a SQLite table.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MedScan Data Flow                                │
//! │                                                                         │
//! │  OperationQueue / ScanHistoryStore / ReferenceCache (medscan-sync)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     medscan-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  LocalStore   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│  get_json     │    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │  put_json     │    │ 001_local_   │  │   │
//! │  │   │               │    │  (upsert)     │    │   store.sql  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file in the app data directory                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medscan_db::{keys, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("medscan.db")).await?;
//! db.store().put_json(keys::LAST_SYNC_AT, &chrono::Utc::now()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::local_store::{keys, LocalStore};
