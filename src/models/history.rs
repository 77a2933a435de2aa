use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One watched playable unit in a user's history
///
/// Written by the playback service; this engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchedEntry {
    pub media_locator: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub playback_position_seconds: Option<f64>,
    #[serde(default)]
    pub validity: Option<bool>,
}

/// Per-user watch record: an order-irrelevant set of entries keyed by locator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryRecord {
    pub user_id: String,
    #[serde(default)]
    pub watched_entries: Vec<WatchedEntry>,
}

impl WatchHistoryRecord {
    pub fn new(user_id: impl Into<String>, watched_entries: Vec<WatchedEntry>) -> Self {
        Self {
            user_id: user_id.into(),
            watched_entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.watched_entries.is_empty()
    }

    /// Every locator the user has watched
    pub fn locator_set(&self) -> HashSet<String> {
        self.watched_entries
            .iter()
            .map(|e| e.media_locator.clone())
            .collect()
    }

    /// Timestamp of the most recent watch activity; part of the cache key, so
    /// new playback implicitly invalidates cached recommendation pages
    pub fn latest_watch(&self) -> Option<DateTime<Utc>> {
        self.watched_entries.iter().map(|e| e.last_updated).max()
    }
}
