use crate::client::ServiceResponse;
use async_trait::async_trait;
use moka::{sync::Cache as MokaCache, Expiry};
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

/// 缓存条目，写入后不再修改
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub identity: String,
    pub response: ServiceResponse,
    pub stored_at: Instant,
    pub expires_at: Instant,
    pub etag: Option<String>,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// 缓存存储
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Arc<CacheEntry>>;

    async fn put(&self, entry: CacheEntry);

    async fn remove(&self, key: &str) -> bool;

    /// 删除所有满足条件的条目，返回删除数量
    async fn remove_where(&self, predicate: &(dyn for<'e> Fn(&'e CacheEntry) -> bool + Send + Sync))
        -> usize;

    fn entry_count(&self) -> u64;
}

// 按条目自身的过期时间淘汰
struct EntryExpiry;

impl Expiry<String, Arc<CacheEntry>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(Instant::now()))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(Instant::now()))
    }
}

/// 基于 moka 的内存缓存
pub struct MokaCacheStore {
    cache: MokaCache<String, Arc<CacheEntry>>,
}

impl MokaCacheStore {
    pub fn new(max_entries: u64) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.cache.get(key)
    }

    async fn put(&self, entry: CacheEntry) {
        self.cache.insert(entry.key.clone(), Arc::new(entry));
    }

    async fn remove(&self, key: &str) -> bool {
        self.cache.remove(key).is_some()
    }

    async fn remove_where(
        &self,
        predicate: &(dyn for<'e> Fn(&'e CacheEntry) -> bool + Send + Sync),
    ) -> usize {
        let keys: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(key, _)| key)
            .collect();

        for key in &keys {
            self.cache.invalidate(key.as_str());
        }
        keys.len()
    }

    fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

/// 缓存关闭时使用的空实现
pub struct NoopCacheStore;

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn get(&self, _key: &str) -> Option<Arc<CacheEntry>> {
        None
    }

    async fn put(&self, _entry: CacheEntry) {}

    async fn remove(&self, _key: &str) -> bool {
        false
    }

    async fn remove_where(
        &self,
        _predicate: &(dyn for<'e> Fn(&'e CacheEntry) -> bool + Send + Sync),
    ) -> usize {
        0
    }

    fn entry_count(&self) -> u64 {
        0
    }
}
