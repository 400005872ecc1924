//! # Remote Dispatcher
//!
//! Delivers one queued operation to the remote service.
//!
//! ## Routing
//! ```text
//! ┌──────────────────────┬────────┬──────────────────────────────┐
//! │ Operation            │ Method │ Path                         │
//! ├──────────────────────┼────────┼──────────────────────────────┤
//! │ ScanUpload           │ POST   │ /scans  (+ Idempotency-Key)  │
//! │ ProfileUpdate        │ PATCH  │ /users/{user_id}/profile     │
//! │ FeedbackSubmit       │ POST   │ /feedback                    │
//! │ AnalyticsEvent       │ POST   │ /analytics/events            │
//! │ InteractionCheck     │ POST   │ /interactions/check          │
//! │ AlternativesRequest  │ POST   │ /alternatives                │
//! └──────────────────────┴────────┴──────────────────────────────┘
//! ```
//!
//! ## Outcome Classification
//! ```text
//! 2xx                      → Ok
//! 408, 429, 5xx            → RetryableDispatch
//! other 4xx / 3xx          → PermanentDispatch
//! connect / timeout error  → retryable
//! fails local validation   → Validation (permanent, never sent)
//! ```

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use medscan_core::validation::validate_operation;
use medscan_core::Operation;

use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};

/// Header carrying the scan id so the server can treat repeats as upserts.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

// =============================================================================
// Dispatcher Trait
// =============================================================================

/// The network side of a drain pass.
///
/// Implementations must resolve every call to success, a retryable error
/// (see [`SyncError::is_retryable`]) or a permanent error.
#[async_trait]
pub trait RemoteDispatcher: Send + Sync {
    /// Delivers one operation.
    async fn dispatch(&self, operation: &Operation) -> SyncResult<()>;
}

// =============================================================================
// Routing
// =============================================================================

/// Method and path for an operation.
pub fn route_for(operation: &Operation) -> (Method, String) {
    match operation {
        Operation::ScanUpload { .. } => (Method::POST, "/scans".to_string()),
        Operation::ProfileUpdate { user_id, .. } => {
            (Method::PATCH, format!("/users/{}/profile", user_id))
        }
        Operation::FeedbackSubmit { .. } => (Method::POST, "/feedback".to_string()),
        Operation::AnalyticsEvent { .. } => (Method::POST, "/analytics/events".to_string()),
        Operation::InteractionCheck { .. } => (Method::POST, "/interactions/check".to_string()),
        Operation::AlternativesRequest { .. } => (Method::POST, "/alternatives".to_string()),
    }
}

/// Request body for an operation. The variant tag travels in the path, not
/// the body.
pub fn body_for(operation: &Operation) -> Value {
    match operation {
        Operation::ScanUpload { scan_id, payload } => {
            json!({ "scan_id": scan_id, "payload": payload })
        }
        Operation::ProfileUpdate { fields, .. } => fields.clone(),
        Operation::FeedbackSubmit { payload } => payload.clone(),
        Operation::AnalyticsEvent { name, props } => json!({ "name": name, "props": props }),
        Operation::InteractionCheck { medications } => json!({ "medications": medications }),
        Operation::AlternativesRequest { medication_name } => {
            json!({ "medication_name": medication_name })
        }
    }
}

/// Maps an HTTP status to a dispatch outcome.
pub fn classify_status(status: StatusCode, body: &str) -> SyncResult<()> {
    if status.is_success() {
        return Ok(());
    }

    let detail = if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), body)
    };

    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        Err(SyncError::RetryableDispatch(detail))
    } else {
        Err(SyncError::PermanentDispatch(detail))
    }
}

// =============================================================================
// HTTP Dispatcher
// =============================================================================

/// [`RemoteDispatcher`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDispatcher {
    /// Creates a dispatcher for `base_url` (e.g. `https://api.medscan.app/v1`).
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> SyncResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SyncError::InvalidUrl(base_url));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("medscan-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpDispatcher { client, base_url })
    }

    /// Creates a dispatcher from the `[remote]` config section.
    pub fn from_settings(settings: &RemoteSettings) -> SyncResult<Self> {
        Self::new(
            settings.api_url.clone(),
            Duration::from_secs(settings.connect_timeout_secs),
        )
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RemoteDispatcher for HttpDispatcher {
    async fn dispatch(&self, operation: &Operation) -> SyncResult<()> {
        validate_operation(operation)?;

        let (method, path) = route_for(operation);
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .json(&body_for(operation));

        if let Some(key) = operation.idempotency_key() {
            request = request.header(IDEMPOTENCY_HEADER, key);
        }

        debug!(kind = %operation.kind(), %method, url = %url, "Dispatching operation");

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let outcome = classify_status(status, &body);
        if let Err(ref e) = outcome {
            warn!(
                kind = %operation.kind(),
                status = status.as_u16(),
                retryable = e.is_retryable(),
                "Remote rejected operation"
            );
        }
        outcome
    }
}
