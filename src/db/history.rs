use std::collections::HashMap;

use crate::error::AppResult;
use crate::models::WatchHistoryRecord;

/// Read-only access to per-user playback records
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WatchHistoryStore: Send + Sync {
    /// The user's record, or `None` for a user who has never watched anything
    async fn record_for_user(&self, user_id: &str) -> AppResult<Option<WatchHistoryRecord>>;

    /// `mediaLocator → watch count` aggregated across every user; feeds the
    /// popularity tier
    async fn global_watch_counts(&self) -> AppResult<HashMap<String, u64>>;
}
