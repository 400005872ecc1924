//! # Domain Types
//!
//! Core domain types used throughout the sync engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  NetworkState   │   │    QueueItem    │   │   ScanRecord    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  is_online      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  connection_type│   │  operation ─────┼─► │  payload        │       │
//! │  │  observed_at    │   │  priority       │   │  created_at     │       │
//! │  └─────────────────┘   │  retries        │   │  status         │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Operation     │   │    Priority     │   │   ScanStatus    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  ScanUpload     │   │  High           │   │  PendingUpload  │       │
//! │  │  ProfileUpdate  │   │  Normal         │   │  Synced         │       │
//! │  │  FeedbackSubmit │   │  Low            │   │  SyncFailed     │       │
//! │  │  AnalyticsEvent │   └─────────────────┘   └─────────────────┘       │
//! │  │  InteractionChk │                                                    │
//! │  │  Alternatives   │   SyncStats / SyncReport: derived, never stored   │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;

// =============================================================================
// Network State
// =============================================================================

/// Physical link reported by the platform reachability API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Wifi,
    Cellular,
    #[default]
    Unknown,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::Wifi => write!(f, "wifi"),
            ConnectionType::Cellular => write!(f, "cellular"),
            ConnectionType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Point-in-time reachability observation. Recomputed on every probe, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NetworkState {
    pub is_online: bool,
    pub connection_type: ConnectionType,
    #[ts(as = "String")]
    pub observed_at: DateTime<Utc>,
}

impl NetworkState {
    /// Online observation stamped with the current time.
    pub fn online(connection_type: ConnectionType) -> Self {
        NetworkState {
            is_online: true,
            connection_type,
            observed_at: Utc::now(),
        }
    }

    /// Offline observation stamped with the current time.
    pub fn offline() -> Self {
        NetworkState {
            is_online: false,
            connection_type: ConnectionType::Unknown,
            observed_at: Utc::now(),
        }
    }

    /// Two observations describe the same link when they differ only in
    /// their timestamp.
    pub fn same_link(&self, other: &NetworkState) -> bool {
        self.is_online == other.is_online && self.connection_type == other.connection_type
    }
}

// =============================================================================
// Priority
// =============================================================================

/// Drain priority of a queued operation.
///
/// Variants are declared lowest first so the derived `Ord` gives
/// `High > Normal > Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(CoreError::UnknownVariant {
                field: "priority".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Operation
// =============================================================================

/// A state-changing call destined for the remote service.
///
/// Each variant carries exactly what its remote endpoint needs. The variant
/// tag decides dispatch routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    ScanUpload { scan_id: String, payload: Value },
    ProfileUpdate { user_id: String, fields: Value },
    FeedbackSubmit { payload: Value },
    AnalyticsEvent { name: String, props: Value },
    InteractionCheck { medications: Vec<String> },
    AlternativesRequest { medication_name: String },
}

/// Variant tag of an [`Operation`], used for routing and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ScanUpload,
    ProfileUpdate,
    FeedbackSubmit,
    AnalyticsEvent,
    InteractionCheck,
    AlternativesRequest,
}

impl OperationKind {
    /// Wire name of the tag (matches the serde tag value).
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::ScanUpload => "scan_upload",
            OperationKind::ProfileUpdate => "profile_update",
            OperationKind::FeedbackSubmit => "feedback_submit",
            OperationKind::AnalyticsEvent => "analytics_event",
            OperationKind::InteractionCheck => "interaction_check",
            OperationKind::AlternativesRequest => "alternatives_request",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation {
    /// Returns the variant tag.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::ScanUpload { .. } => OperationKind::ScanUpload,
            Operation::ProfileUpdate { .. } => OperationKind::ProfileUpdate,
            Operation::FeedbackSubmit { .. } => OperationKind::FeedbackSubmit,
            Operation::AnalyticsEvent { .. } => OperationKind::AnalyticsEvent,
            Operation::InteractionCheck { .. } => OperationKind::InteractionCheck,
            Operation::AlternativesRequest { .. } => OperationKind::AlternativesRequest,
        }
    }

    /// Key identifying the logical operation across retries and duplicate
    /// enqueues. Only scan uploads have a caller-supplied identity.
    pub fn idempotency_key(&self) -> Option<&str> {
        match self {
            Operation::ScanUpload { scan_id, .. } => Some(scan_id),
            _ => None,
        }
    }

    /// The scan record this operation settles, if any.
    pub fn scan_id(&self) -> Option<&str> {
        match self {
            Operation::ScanUpload { scan_id, .. } => Some(scan_id),
            _ => None,
        }
    }
}

// =============================================================================
// Queue Item
// =============================================================================

/// A pending operation owned by the operation queue.
///
/// Created on enqueue, mutated only by incrementing `retries`, destroyed on
/// success, permanent failure or retry exhaustion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub operation: Operation,
    pub enqueued_at: DateTime<Utc>,
    pub retries: u32,
    pub priority: Priority,
}

impl QueueItem {
    /// Creates a fresh item with a new UUID and zero retries.
    pub fn new(operation: Operation, priority: Priority) -> Self {
        QueueItem {
            id: Uuid::new_v4().to_string(),
            operation,
            enqueued_at: Utc::now(),
            retries: 0,
            priority,
        }
    }
}

// =============================================================================
// Scan Record
// =============================================================================

/// Sync state of a locally captured scan.
///
/// ```text
/// PendingUpload ──(upload succeeded)──► Synced      (terminal)
///       │
///       └──(retries exhausted / rejected)──► SyncFailed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    #[default]
    PendingUpload,
    Synced,
    SyncFailed,
}

impl ScanStatus {
    /// Terminal states get no further automatic retries.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Synced | ScanStatus::SyncFailed)
    }

    /// The UI surfaces failed scans as "needs attention".
    pub fn needs_attention(&self) -> bool {
        matches!(self, ScanStatus::SyncFailed)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::PendingUpload => write!(f, "pending_upload"),
            ScanStatus::Synced => write!(f, "synced"),
            ScanStatus::SyncFailed => write!(f, "sync_failed"),
        }
    }
}

/// A user-visible scan. This record is what the UI reads; it exists from the
/// instant of capture whether or not the device is online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScanRecord {
    pub id: String,
    #[ts(type = "unknown")]
    pub payload: Value,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub status: ScanStatus,
}

impl ScanRecord {
    /// Creates a pending record with a fresh UUID.
    pub fn new_pending(payload: Value) -> Self {
        ScanRecord {
            id: Uuid::new_v4().to_string(),
            payload,
            created_at: Utc::now(),
            status: ScanStatus::PendingUpload,
        }
    }

    /// The upload operation that settles this record.
    pub fn upload_operation(&self) -> Operation {
        Operation::ScanUpload {
            scan_id: self.id.clone(),
            payload: self.payload.clone(),
        }
    }
}

// =============================================================================
// Sync Stats & Report
// =============================================================================

/// Snapshot of the sync subsystem, computed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub is_online: bool,
    pub queued_operations: usize,
    pub pending_scans: usize,
    #[ts(as = "Option<String>")]
    pub last_sync_at: Option<DateTime<Utc>>,
    pub sync_in_progress: bool,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Items delivered and removed from the queue.
    pub successful: usize,
    /// Items removed as permanently failed or retry-exhausted.
    pub failed: usize,
    /// Items still queued after the pass.
    pub remaining: usize,
    /// Scan ids demoted to `sync_failed` during this pass.
    pub needs_attention: Vec<String>,
}

impl SyncReport {
    /// Number of items the pass touched.
    pub fn processed(&self) -> usize {
        self.successful + self.failed
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_priority_parsing() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_operation_tagged_serialization() {
        let op = Operation::InteractionCheck {
            medications: vec!["warfarin".into(), "aspirin".into()],
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "interaction_check");
        assert_eq!(json["medications"][1], "aspirin");
    }

    #[test]
    fn test_idempotency_key_only_for_scans() {
        let record = ScanRecord::new_pending(json!({"barcode": "0123"}));
        let upload = record.upload_operation();
        assert_eq!(upload.idempotency_key(), Some(record.id.as_str()));
        assert_eq!(upload.kind(), OperationKind::ScanUpload);

        let feedback = Operation::FeedbackSubmit { payload: json!({}) };
        assert!(feedback.idempotency_key().is_none());
        assert!(feedback.scan_id().is_none());
    }

    #[test]
    fn test_network_state_same_link_ignores_timestamp() {
        let a = NetworkState::online(ConnectionType::Wifi);
        let mut b = a.clone();
        b.observed_at = a.observed_at + chrono::Duration::seconds(30);
        assert!(a.same_link(&b));
        assert!(!a.same_link(&NetworkState::online(ConnectionType::Cellular)));
        assert!(!a.same_link(&NetworkState::offline()));
    }

    #[test]
    fn test_scan_status_terminal() {
        assert!(!ScanStatus::PendingUpload.is_terminal());
        assert!(ScanStatus::Synced.is_terminal());
        assert!(ScanStatus::SyncFailed.needs_attention());
        assert_eq!(ScanStatus::SyncFailed.to_string(), "sync_failed");
    }

    #[test]
    fn test_sync_stats_camel_case() {
        let stats = SyncStats {
            queued_operations: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["queuedOperations"], 2);
        assert_eq!(json["syncInProgress"], false);
    }
}
