//! # Reference Cache
//!
//! In-memory handle on the current [`ReferenceDataset`] snapshot.
//!
//! Reads are synchronous and never touch the network. A refresh swaps the
//! whole snapshot behind the lock; readers holding the previous `Arc` keep
//! a consistent view until they drop it.

use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use medscan_core::validation::validate_search_query;
use medscan_core::{Alternative, ReferenceDataset, SearchHit, DEFAULT_SEARCH_LIMIT};

/// Read-only local copy of the reference dataset.
pub struct ReferenceCache {
    dataset: RwLock<Option<Arc<ReferenceDataset>>>,
    search_limit: usize,
}

impl ReferenceCache {
    /// Creates an empty cache.
    pub fn new(search_limit: usize) -> Self {
        ReferenceCache {
            dataset: RwLock::new(None),
            search_limit,
        }
    }

    /// Replaces the snapshot wholesale.
    pub fn load(&self, dataset: ReferenceDataset) {
        info!(
            version = %dataset.version,
            entries = dataset.entry_count(),
            alternatives = dataset.alternatives.len(),
            "Reference dataset loaded"
        );
        let mut slot = self.dataset.write().unwrap_or_else(|p| p.into_inner());
        *slot = Some(Arc::new(dataset));
    }

    /// Current snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<ReferenceDataset>> {
        self.dataset
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Version of the loaded snapshot.
    pub fn version(&self) -> Option<String> {
        self.snapshot().map(|d| d.version.clone())
    }

    /// Offline search over name, category and conditions.
    ///
    /// Over-long queries and an unloaded cache both yield no hits.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query = match validate_search_query(query) {
            Ok(q) => q,
            Err(e) => {
                debug!(error = %e, "Rejected search query");
                return Vec::new();
            }
        };

        match self.snapshot() {
            Some(dataset) => dataset.search(&query, self.search_limit),
            None => {
                warn!("Search before reference dataset was loaded");
                Vec::new()
            }
        }
    }

    /// Natural alternatives targeting `name`.
    pub fn lookup_alternatives_for(&self, name: &str) -> Vec<Alternative> {
        self.snapshot()
            .map(|dataset| dataset.alternatives_for(name))
            .unwrap_or_default()
    }
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_LIMIT)
    }
}
