//! # Error Types
//!
//! Domain-specific error types for medscan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  medscan-core errors (this file)                                       │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Operation / query validation failures          │
//! │                                                                         │
//! │  medscan-db errors (separate crate)                                    │
//! │  └── DbError          - Local storage failures                         │
//! │                                                                         │
//! │  medscan-sync errors (separate crate)                                  │
//! │  └── SyncError        - Dispatch, connectivity, config                 │
//! │                                                                         │
//! │  Flow: ValidationError → SyncError::PermanentDispatch → failed item    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A persisted blob could not be decoded into the expected shape.
    ///
    /// ## When This Occurs
    /// - Storage written by an incompatible app version
    /// - Truncated write after a crash
    #[error("Corrupt {what}: {reason}")]
    Corrupt { what: String, reason: String },

    /// An unknown priority or status label was supplied.
    #[error("Unknown {field} value: '{value}'")]
    UnknownVariant { field: String, value: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// An operation that fails validation can never succeed remotely, so the
/// sync layer treats these as permanent dispatch failures.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Collection has too few elements.
    #[error("{field} must contain at least {min} entries")]
    TooFew { field: String, min: usize },

    /// Collection has too many elements.
    #[error("{field} must contain at most {max} entries")]
    TooMany { field: String, max: usize },

    /// Invalid format (e.g., invalid UUID, non-object payload).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::Corrupt {
            what: "queue".to_string(),
            reason: "expected array".to_string(),
        };
        assert_eq!(err.to_string(), "Corrupt queue: expected array");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "medication_name".to_string(),
        };
        assert_eq!(err.to_string(), "medication_name is required");

        let err = ValidationError::TooFew {
            field: "medications".to_string(),
            min: 2,
        };
        assert_eq!(err.to_string(), "medications must contain at least 2 entries");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "scan_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
