//! # Sync Error Types
//!
//! Error types for the sync engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Caller-facing  │  │    Dispatch     │  │     Persistence         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  NotOnline      │  │  Retryable      │  │  PersistenceRead        │ │
//! │  │  MaxRetries     │  │  Permanent      │  │  DatabaseError          │ │
//! │  │   Exceeded      │  │  Timeout        │  │  SerializationFailed    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  Configuration  │                                                   │
//! │  │                 │                                                   │
//! │  │  InvalidConfig  │                                                   │
//! │  │  InvalidUrl     │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation
//! Dispatch failures are absorbed by the scheduler. Only [`SyncError::NotOnline`]
//! and [`SyncError::MaxRetriesExceeded`] ever reach the user.

use medscan_core::ValidationError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Caller-facing Errors
    // =========================================================================
    /// A manual sync was requested while offline.
    #[error("Cannot sync while offline")]
    NotOnline,

    /// An operation failed retryably on every one of its attempts.
    #[error("Max retries exceeded for queue item {id}: {last_error}")]
    MaxRetriesExceeded { id: String, last_error: String },

    // =========================================================================
    // Dispatch Errors
    // =========================================================================
    /// Network, timeout or server-side transient failure.
    #[error("Retryable dispatch failure: {0}")]
    RetryableDispatch(String),

    /// Validation-class failure. The operation will never succeed as sent.
    #[error("Permanent dispatch failure: {0}")]
    PermanentDispatch(String),

    /// Failed to reach the remote service at all.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A dispatch did not resolve in time.
    #[error("Dispatch timed out after {0} seconds")]
    Timeout(u64),

    /// Local validation rejected the operation before sending.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Persisted state under `key` could not be read back.
    #[error("Unreadable persisted state under {key}: {reason}")]
    PersistenceRead { key: String, reason: String },

    /// Database query failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Failed to encode or decode a JSON document.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid remote base URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<medscan_db::DbError> for SyncError {
    fn from(err: medscan_db::DbError) -> Self {
        match err {
            medscan_db::DbError::Decode { key, reason } => {
                SyncError::PersistenceRead { key, reason }
            }
            other => SyncError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::RetryableDispatch(format!("request timed out: {}", err))
        } else if err.is_connect() {
            SyncError::ConnectionFailed(err.to_string())
        } else if err.is_builder() {
            SyncError::InvalidUrl(err.to_string())
        } else if err.is_decode() {
            SyncError::SerializationFailed(err.to_string())
        } else {
            SyncError::RetryableDispatch(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if a failed dispatch should stay queued for another pass.
    ///
    /// ## Retryable Errors
    /// - Transient dispatch failures (5xx, 408, 429)
    /// - Connection failures
    /// - Timeouts
    ///
    /// Everything else, including local validation failures and config
    /// problems, is permanent for the operation that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RetryableDispatch(_)
                | SyncError::ConnectionFailed(_)
                | SyncError::Timeout(_)
        )
    }

    /// Returns true if the error should be surfaced to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            SyncError::NotOnline | SyncError::MaxRetriesExceeded { .. }
        )
    }
}
