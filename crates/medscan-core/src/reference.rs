//! # Reference Dataset
//!
//! Versioned, immutable snapshot of the categorized medication reference
//! data plus its offline search.
//!
//! ## How Offline Search Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types: "IBU"                                                     │
//! │       │                                                                 │
//! │       ▼  lowercase + trim → "ibu"                                      │
//! │                                                                         │
//! │  categories (BTreeMap, iterated in key order)                          │
//! │  ┌──────────────┬───────────────────────────────────────────┐          │
//! │  │ "pain"       │ Ibuprofen [headache, fever]     ← name    │ MATCH    │
//! │  │              │ Naproxen  [arthritis]                     │          │
//! │  │ "sleep"      │ Melatonin [insomnia]                      │          │
//! │  └──────────────┴───────────────────────────────────────────┘          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SearchHit { entry, category: "pain", source: cache }  (max 20)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// A single reference entry (a medication).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReferenceEntry {
    pub id: String,
    pub name: String,
    /// Condition tags this medication is used for.
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A natural alternative and the medication names it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Alternative {
    pub name: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Where a search hit came from. Cached hits are labelled so the UI can tell
/// them apart from live results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
}

/// A search result annotated with its category and source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SearchHit {
    pub entry: ReferenceEntry,
    pub category: String,
    pub source: Source,
}

/// Immutable reference snapshot. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDataset {
    pub categories: BTreeMap<String, Vec<ReferenceEntry>>,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    pub version: String,
    pub last_updated: DateTime<Utc>,
}

impl ReferenceDataset {
    /// Parses a dataset from its JSON encoding.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::Corrupt {
            what: "reference dataset".to_string(),
            reason: e.to_string(),
        })
    }

    /// Total number of entries across all categories.
    pub fn entry_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Case-insensitive substring search over entry name, category and
    /// condition tags.
    ///
    /// Categories are visited in key order and entries in dataset order.
    /// An empty query matches nothing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for (category, entries) in &self.categories {
            let category_match = category.to_lowercase().contains(&needle);

            for entry in entries {
                if hits.len() >= limit {
                    return hits;
                }

                let matched = category_match
                    || entry.name.to_lowercase().contains(&needle)
                    || entry
                        .conditions
                        .iter()
                        .any(|c| c.to_lowercase().contains(&needle));

                if matched {
                    hits.push(SearchHit {
                        entry: entry.clone(),
                        category: category.clone(),
                        source: Source::Cache,
                    });
                }
            }
        }
        hits
    }

    /// Alternatives targeting a medication, matched by substring in either
    /// direction so "ibuprofen 200mg" still finds alternatives for
    /// "ibuprofen".
    pub fn alternatives_for(&self, medication_name: &str) -> Vec<Alternative> {
        let needle = medication_name.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.alternatives
            .iter()
            .filter(|alt| {
                alt.targets.iter().any(|target| {
                    let target = target.to_lowercase();
                    !target.is_empty() && (target.contains(&needle) || needle.contains(&target))
                })
            })
            .cloned()
            .collect()
    }
}
