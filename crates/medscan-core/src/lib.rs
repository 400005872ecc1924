//! # medscan-core: Pure Domain Logic for MedScan Sync
//!
//! Types and pure functions for the offline-first sync engine. Nothing in
//! this crate touches the disk or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MedScan Sync Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Mobile front end (TypeScript)                   │   │
//! │  │   Scan screen ──► History list ──► Search ──► Sync badge        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ SyncEngine calls                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    medscan-sync (engine)                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ medscan-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   queue   │  │ reference │  │ validation│  │   │
//! │  │   │ Operation │  │  drain    │  │  dataset  │  │  rules    │  │   │
//! │  │   │ ScanRecord│  │  order    │  │  search   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Operation, QueueItem, ScanRecord, SyncStats, ...)
//! - [`queue`] - Drain ordering for queued operations
//! - [`reference`] - Reference dataset and offline substring search
//! - [`error`] - Domain error types
//! - [`validation`] - Operation and query validation
//!
//! ## Example Usage
//!
//! ```rust
//! use medscan_core::types::{Operation, Priority};
//!
//! let op = Operation::AlternativesRequest {
//!     medication_name: "ibuprofen".to_string(),
//! };
//! assert_eq!(op.kind().as_str(), "alternatives_request");
//! assert!(Priority::High > Priority::Low);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod queue;
pub mod reference;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use reference::{Alternative, ReferenceDataset, ReferenceEntry, SearchHit, Source};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Retry budget for a queued operation before it is abandoned.
///
/// A retryable failure on the third attempt removes the item and marks the
/// associated scan as `sync_failed`.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Maximum number of scan records kept in local history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Maximum number of hits returned by an offline reference search.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;
