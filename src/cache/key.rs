use crate::r#const::cache_limits;
use xxhash_rust::xxh3::xxh3_64;

/// 缓存键
///
/// `key` 用于存储，`identity` 是 `{service}:{规范化端点}`，
/// 缓存策略中的包含/排除模式针对它匹配。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub service: String,
    pub identity: String,
    pub key: String,
}

impl CacheKey {
    pub fn new(service: &str, endpoint: &str) -> Self {
        let normalized = normalize_endpoint(endpoint);
        let identity = format!("{}:{}", service, normalized);
        let hash = xxh3_64(identity.as_bytes());

        Self {
            service: service.to_string(),
            key: format!("{}:{}:{:016x}", cache_limits::KEY_PREFIX, service, hash),
            identity,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

/// 规范化端点：去掉路径结尾斜杠，查询参数按名称排序
///
/// 路径区分大小写，保持原样。
pub fn normalize_endpoint(endpoint: &str) -> String {
    let (path, query) = match endpoint.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (endpoint, None),
    };

    let mut normalized = path.trim_end_matches('/').to_string();
    if !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }

    if let Some(query) = query {
        let mut params: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
        // 稳定排序，同名参数保持原有顺序
        params.sort_by_key(|p| p.split('=').next().unwrap_or(p));
        if !params.is_empty() {
            normalized.push('?');
            normalized.push_str(&params.join("&"));
        }
    }

    normalized
}
