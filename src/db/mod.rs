pub mod cache;
pub mod catalog;
pub mod history;
pub mod memory;
pub mod redis;

pub use cache::{CacheKey, MemoryResultCache, NoopResultCache, ResultCache};
pub use catalog::CatalogStore;
pub use history::WatchHistoryStore;
pub use memory::{MemoryCatalogStore, MemoryWatchHistoryStore};
pub use redis::create_redis_client;
pub use redis::CacheWriterHandle;
pub use redis::RedisResultCache;

#[cfg(test)]
pub use catalog::MockCatalogStore;
#[cfg(test)]
pub use history::MockWatchHistoryStore;
