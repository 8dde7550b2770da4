mod key;
mod policy;
mod store;

pub use key::{normalize_endpoint, CacheKey};
pub use policy::CachePolicy;
pub use store::{CacheEntry, CacheStore, MokaCacheStore, NoopCacheStore};

use crate::{
    client::ServiceResponse,
    config::{CachePolicyConfig, CachingConfig},
    error::AppError,
    metrics::METRICS,
    r#const::cache_labels,
};
use regex::Regex;
use reqwest::Method;
use std::{collections::HashMap, sync::Arc};
use tokio::time::Instant;
use tracing::{debug, info};

/// 响应缓存
///
/// 按服务策略决定读写，存储后端可替换。
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    default_policy: CachePolicy,
    policies: HashMap<String, CachePolicy>,
}

impl ResponseCache {
    /// 根据配置创建，缓存关闭时使用空存储
    pub fn from_config(config: &CachingConfig) -> Result<Self, AppError> {
        let store: Arc<dyn CacheStore> = if config.enabled {
            info!(
                "Response cache enabled, defaultTTL={}s, maxEntries={}",
                config.default_ttl, config.max_entries
            );
            Arc::new(MokaCacheStore::new(config.max_entries))
        } else {
            info!("Response cache disabled");
            Arc::new(NoopCacheStore)
        };
        Self::with_store(config, store)
    }

    /// 使用指定存储创建
    pub fn with_store(
        config: &CachingConfig,
        store: Arc<dyn CacheStore>,
    ) -> Result<Self, AppError> {
        let default_policy =
            CachePolicy::from_config(&CachePolicyConfig::default(), config.default_ttl)?;

        let mut policies = HashMap::with_capacity(config.per_service_policies.len());
        for (service, policy) in &config.per_service_policies {
            policies.insert(
                service.clone(),
                CachePolicy::from_config(policy, config.default_ttl)?,
            );
        }

        Ok(Self {
            store,
            default_policy,
            policies,
        })
    }

    pub fn policy_for(&self, service: &str) -> &CachePolicy {
        self.policies.get(service).unwrap_or(&self.default_policy)
    }

    /// 调用是否参与缓存
    pub fn is_cacheable(&self, key: &CacheKey, method: &Method) -> bool {
        let policy = self.policy_for(&key.service);
        policy.allows_method(method) && policy.matches(&key.identity)
    }

    /// 查询缓存，过期条目不会返回
    pub async fn lookup(&self, key: &CacheKey) -> Option<ServiceResponse> {
        let (result, label) = match self.store.get(key.as_str()).await {
            Some(entry) if !entry.is_expired() => {
                debug!("Cache hit for '{}'", key.identity);
                let mut response = entry.response.clone();
                response.from_cache = true;
                (Some(response), cache_labels::HIT)
            }
            Some(_) => {
                self.store.remove(key.as_str()).await;
                (None, cache_labels::EXPIRED)
            }
            None => (None, cache_labels::MISS),
        };

        METRICS
            .cache_requests_total()
            .with_label_values(&[&key.service, label])
            .inc();

        result
    }

    /// 写入缓存，返回是否写入
    pub async fn store(&self, key: &CacheKey, response: &ServiceResponse) -> bool {
        let policy = self.policy_for(&key.service);
        if !policy.allows_status(response.status) {
            return false;
        }

        let now = Instant::now();
        let entry = CacheEntry {
            key: key.key.clone(),
            identity: key.identity.clone(),
            etag: response.etag().map(str::to_string),
            response: ServiceResponse {
                from_cache: false,
                ..response.clone()
            },
            stored_at: now,
            expires_at: now + policy.ttl,
        };
        self.store.put(entry).await;

        debug!(
            "Cached response for '{}' with TTL {:?}",
            key.identity, policy.ttl
        );
        true
    }

    /// 按精确键删除
    pub async fn invalidate_key(&self, key: &str) -> bool {
        let removed = self.store.remove(key).await;
        if removed {
            debug!("Invalidated cache key '{}'", key);
        }
        removed
    }

    /// 按通配符删除（`*` 匹配任意字符，`?` 匹配单个字符）
    ///
    /// 模式同时与存储键和 `{service}:{端点}` 标识匹配。
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, AppError> {
        let re = glob_to_regex(pattern)?;
        Ok(self.invalidate_matching(&re, pattern).await)
    }

    /// 按正则删除
    pub async fn invalidate_regex(&self, pattern: &str) -> Result<usize, AppError> {
        let re = Regex::new(pattern)
            .map_err(|e| AppError::Config(format!("Invalid regex '{}': {}", pattern, e)))?;
        Ok(self.invalidate_matching(&re, pattern).await)
    }

    /// 删除同一服务下以该路径开头的条目
    pub async fn invalidate_prefix(&self, service: &str, endpoint: &str) -> usize {
        let path = normalize_endpoint(endpoint.split('?').next().unwrap_or(endpoint));
        let prefix = format!("{}:{}", service, path);
        let removed = self
            .store
            .remove_where(&|entry: &CacheEntry| entry.identity.starts_with(&prefix))
            .await;
        if removed > 0 {
            debug!("Invalidated {} cache entries under '{}'", removed, prefix);
        }
        removed
    }

    /// 当前条目数
    pub fn len(&self) -> u64 {
        self.store.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn invalidate_matching(&self, re: &Regex, pattern: &str) -> usize {
        let removed = self
            .store
            .remove_where(&|entry: &CacheEntry| {
                re.is_match(&entry.key) || re.is_match(&entry.identity)
            })
            .await;
        info!("Invalidated {} cache entries matching '{}'", removed, pattern);
        removed
    }
}

// 将通配符转为锚定的正则
fn glob_to_regex(pattern: &str) -> Result<Regex, AppError> {
    let mut re = String::with_capacity(pattern.len() * 2 + 2);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| AppError::Config(format!("Invalid pattern '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::header::HeaderMap;
    use std::time::Duration;

    fn response(status: u16, body: &'static str) -> ServiceResponse {
        ServiceResponse {
            service: "userservice".to_string(),
            status,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
            from_cache: false,
        }
    }

    fn cache() -> ResponseCache {
        ResponseCache::from_config(&CachingConfig::default()).unwrap()
    }

    #[test]
    fn test_glob_to_regex() {
        let re = glob_to_regex("userservice:/users/*").unwrap();
        assert!(re.is_match("userservice:/users/42"));
        assert!(!re.is_match("skills:/users/42"));

        let re = glob_to_regex("a?c.d").unwrap();
        assert!(re.is_match("abc.d"));
        assert!(!re.is_match("abcxd"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = cache();
        let key = CacheKey::new("userservice", "/users/42");

        assert!(cache.store(&key, &response(200, "{}")).await);
        let hit = cache.lookup(&key).await.unwrap();
        assert!(hit.from_cache);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(cache.lookup(&key).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_outcomes_are_counted() {
        let count = |label: &str| {
            METRICS
                .cache_requests_total()
                .with_label_values(&["ledger", label])
                .get()
        };
        let cache = cache();
        let key = CacheKey::new("ledger", "/entries/1");

        assert!(cache.lookup(&key).await.is_none());
        cache.store(&key, &response(200, "{}")).await;
        assert!(cache.lookup(&key).await.is_some());
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(cache.lookup(&key).await.is_none());

        assert_eq!(count(cache_labels::MISS), 1.0);
        assert_eq!(count(cache_labels::HIT), 1.0);
        assert_eq!(count(cache_labels::EXPIRED), 1.0);
    }

    #[tokio::test]
    async fn test_only_success_is_cached_by_default() {
        let cache = cache();
        let key = CacheKey::new("userservice", "/users/404");
        assert!(!cache.store(&key, &response(404, "")).await);
        assert!(cache.lookup(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidation() {
        let cache = cache();
        let a = CacheKey::new("userservice", "/users/1");
        let b = CacheKey::new("userservice", "/users/2");
        let c = CacheKey::new("skills", "/skills/1");
        for key in [&a, &b, &c] {
            cache.store(key, &response(200, "{}")).await;
        }

        assert!(cache.invalidate_key(a.as_str()).await);
        assert!(!cache.invalidate_key(a.as_str()).await);

        assert_eq!(cache.invalidate_pattern("userservice:*").await.unwrap(), 1);
        assert!(cache.lookup(&b).await.is_none());
        assert!(cache.lookup(&c).await.is_some());

        assert_eq!(cache.invalidate_regex("^skills:").await.unwrap(), 1);
        assert!(cache.invalidate_regex("(").await.is_err());
    }

    #[tokio::test]
    async fn test_prefix_invalidation_stays_within_service() {
        let cache = cache();
        let item = CacheKey::new("userservice", "/users/42?fields=name");
        let other = CacheKey::new("skills", "/users/42");
        cache.store(&item, &response(200, "{}")).await;
        cache.store(&other, &response(200, "{}")).await;

        assert_eq!(cache.invalidate_prefix("userservice", "/users/42").await, 1);
        assert!(cache.lookup(&item).await.is_none());
        assert!(cache.lookup(&other).await.is_some());
    }

    #[tokio::test]
    async fn test_disabled_cache_never_stores() {
        let cache = ResponseCache::from_config(&CachingConfig {
            enabled: false,
            ..CachingConfig::default()
        })
        .unwrap();
        let key = CacheKey::new("userservice", "/users/42");
        cache.store(&key, &response(200, "{}")).await;
        assert!(cache.lookup(&key).await.is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_per_service_policy_exclusions() {
        let mut config = CachingConfig::default();
        config.per_service_policies.insert(
            "userservice".to_string(),
            CachePolicyConfig {
                include_patterns: vec!["/users".to_string()],
                exclude_patterns: vec!["/users/me".to_string()],
                ..CachePolicyConfig::default()
            },
        );
        let cache = ResponseCache::from_config(&config).unwrap();

        assert!(cache.is_cacheable(&CacheKey::new("userservice", "/users/42"), &Method::GET));
        assert!(!cache.is_cacheable(&CacheKey::new("userservice", "/users/me"), &Method::GET));
        assert!(!cache.is_cacheable(&CacheKey::new("userservice", "/users/42"), &Method::POST));
        assert!(cache.is_cacheable(&CacheKey::new("skills", "/anything"), &Method::GET));
    }
}
