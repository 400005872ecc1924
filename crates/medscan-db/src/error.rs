//! # Database Error Types
//!
//! Error types for local storage operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error) / serde_json::Error                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds key context and categorization           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError (medscan-sync)                                              │
//! │       ├── reads: fail closed to an empty collection + warn!            │
//! │       └── writes: logged, in-memory state stays authoritative          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Local storage errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Stored value could not be decoded.
    ///
    /// ## When This Occurs
    /// - Blob written by an incompatible app version
    /// - Partial write after process termination
    #[error("Corrupt value for key '{key}': {reason}")]
    Decode { key: String, reason: String },

    /// Value could not be encoded for storage.
    #[error("Failed to encode value for key '{key}': {reason}")]
    Encode { key: String, reason: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a Decode error for a storage key.
    pub fn decode(key: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Decode {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true when the stored data itself is unreadable (as opposed to
    /// the database being unavailable).
    pub fn is_corruption(&self) -> bool {
        matches!(self, DbError::Decode { .. })
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_is_corruption() {
        let err = DbError::decode("sync.queue", "expected value at line 1");
        assert!(err.is_corruption());
        assert!(err.to_string().contains("sync.queue"));

        assert!(!DbError::PoolExhausted.is_corruption());
    }
}
