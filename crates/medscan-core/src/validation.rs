//! # Validation Module
//!
//! Input validation for operations and search queries.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end (TypeScript)                                       │
//! │  └── Basic format checks, immediate user feedback                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Enqueue (Rust)                                               │
//! │  └── Never rejects: saving offline always succeeds locally             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Dispatch (THIS MODULE)                                       │
//! │  └── An invalid operation can never succeed remotely, so it is         │
//! │      classified as a permanent failure without a network call          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use medscan_core::types::Operation;
//! use medscan_core::validation::validate_operation;
//!
//! let op = Operation::AlternativesRequest { medication_name: "".into() };
//! assert!(validate_operation(&op).is_err());
//! ```

use serde_json::Value;

use crate::error::ValidationError;
use crate::types::Operation;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a search query or medication name.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum medications in one interaction check.
pub const MAX_INTERACTION_MEDICATIONS: usize = 20;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, bounded string field.
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (matches nothing)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(query.to_string())
}

/// Validates a UUID string.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

fn validate_object(field: &str, value: &Value) -> ValidationResult<()> {
    if !value.is_object() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a JSON object".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Operation Validator
// =============================================================================

/// Validates an operation before it is sent to the remote service.
///
/// ## Rules
/// | Variant             | Rule                                          |
/// |---------------------|-----------------------------------------------|
/// | ScanUpload          | scan_id is a UUID, payload is an object       |
/// | ProfileUpdate       | user_id non-empty, fields is a non-empty object |
/// | FeedbackSubmit      | payload is an object                          |
/// | AnalyticsEvent      | name non-empty                                |
/// | InteractionCheck    | 2..=20 non-empty medication names             |
/// | AlternativesRequest | medication_name non-empty                     |
pub fn validate_operation(op: &Operation) -> ValidationResult<()> {
    match op {
        Operation::ScanUpload { scan_id, payload } => {
            validate_uuid("scan_id", scan_id)?;
            validate_object("payload", payload)
        }
        Operation::ProfileUpdate { user_id, fields } => {
            validate_name("user_id", user_id)?;
            validate_object("fields", fields)?;
            if fields.as_object().is_some_and(|m| m.is_empty()) {
                return Err(ValidationError::TooFew {
                    field: "fields".to_string(),
                    min: 1,
                });
            }
            Ok(())
        }
        Operation::FeedbackSubmit { payload } => validate_object("payload", payload),
        Operation::AnalyticsEvent { name, .. } => validate_name("name", name),
        Operation::InteractionCheck { medications } => {
            if medications.len() < 2 {
                return Err(ValidationError::TooFew {
                    field: "medications".to_string(),
                    min: 2,
                });
            }
            if medications.len() > MAX_INTERACTION_MEDICATIONS {
                return Err(ValidationError::TooMany {
                    field: "medications".to_string(),
                    max: MAX_INTERACTION_MEDICATIONS,
                });
            }
            medications
                .iter()
                .try_for_each(|m| validate_name("medications", m))
        }
        Operation::AlternativesRequest { medication_name } => {
            validate_name("medication_name", medication_name)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
