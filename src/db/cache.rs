use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::sync::Mutex;

use crate::error::AppResult;
use crate::models::RecommendationResult;

/// Composite key of one memoized recommendation page
///
/// `latest_watch` is the unix timestamp of the user's most recent playback
/// (0 without history), so any new watch activity rolls every page of the
/// session over to a fresh key and no explicit invalidation is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub user_id: String,
    pub latest_watch: i64,
    pub page: usize,
    pub limit: usize,
}

impl CacheKey {
    pub fn new(
        user_id: &str,
        latest_watch: Option<chrono::DateTime<chrono::Utc>>,
        page: usize,
        limit: usize,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            latest_watch: latest_watch.map(|t| t.timestamp()).unwrap_or(0),
            page,
            limit,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "recs:{}:{}:{}:{}",
            self.user_id, self.latest_watch, self.page, self.limit
        )
    }
}

/// Storage seam for memoized recommendation results
///
/// Injected into the engine so deployments choose the backend (bounded
/// in-memory or Redis) and tests can substitute a no-op. Reads are fallible;
/// writes are fire-and-forget.
#[async_trait::async_trait]
pub trait ResultCache: Send + Sync {
    async fn get_cached(&self, key: &CacheKey) -> AppResult<Option<RecommendationResult>>;

    fn store(&self, key: &CacheKey, value: &RecommendationResult, ttl_seconds: u64);
}

/// A macro wrapping the get-or-compute-and-store flow around a [`ResultCache`].
///
/// Checks the cache first and returns the hit if present. A failed read is
/// logged and treated as a miss. On a miss the block computes the value, which
/// is stored in the background and returned; a block error propagates and
/// nothing is stored.
///
/// # Arguments
/// * `$cache`: anything with `get_cached` and `store` in [`ResultCache`] shape.
/// * `$key`: the [`CacheKey`] for this value.
/// * `$ttl`: time-to-live in seconds for the stored value.
/// * `$block`: the future producing the value on a cache miss.
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let hit = match $cache.get_cached(&$key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, recomputing");
                None
            }
        };

        if let Some(cached) = hit {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.store(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}

struct MemoryCacheInner {
    entries: HashMap<String, RecommendationResult>,
    insertion_order: VecDeque<String>,
}

/// Bounded in-process cache: plain map plus FIFO eviction over a max-entry cap
///
/// The TTL parameter is ignored here; the entry cap is what stops a
/// long-running process from accumulating stale session keys.
pub struct MemoryResultCache {
    inner: Mutex<MemoryCacheInner>,
    max_entries: usize,
}

impl MemoryResultCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryCacheInner {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryCacheInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

#[async_trait::async_trait]
impl ResultCache for MemoryResultCache {
    async fn get_cached(&self, key: &CacheKey) -> AppResult<Option<RecommendationResult>> {
        Ok(self.lock().entries.get(&key.to_string()).cloned())
    }

    fn store(&self, key: &CacheKey, value: &RecommendationResult, _ttl_seconds: u64) {
        let rendered = key.to_string();
        let mut inner = self.lock();
        if inner.entries.insert(rendered.clone(), value.clone()).is_none() {
            inner.insertion_order.push_back(rendered);
        }
        while inner.entries.len() > self.max_entries {
            match inner.insertion_order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

/// Cache that never hits; used by tests asserting raw pipeline behavior
pub struct NoopResultCache;

#[async_trait::async_trait]
impl ResultCache for NoopResultCache {
    async fn get_cached(&self, _key: &CacheKey) -> AppResult<Option<RecommendationResult>> {
        Ok(None)
    }

    fn store(&self, _key: &CacheKey, _value: &RecommendationResult, _ttl_seconds: u64) {}
}
