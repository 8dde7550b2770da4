use crate::config::defaults::{
    default_cache_max_entries, default_cache_ttl, default_cacheable_methods, default_true,
};
use crate::r#const::cache_limits;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

// 响应缓存配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CachingConfig {
    // 是否启用响应缓存
    #[serde(default = "default_true")]
    pub enabled: bool,
    // 默认缓存有效期（秒）
    #[serde(default = "default_cache_ttl", rename = "defaultTTL", alias = "defaultTtl")]
    #[validate(range(min = 1, max = cache_limits::MAX_TTL))]
    pub default_ttl: u64,
    // 最大缓存条目数
    #[serde(default = "default_cache_max_entries")]
    #[validate(range(min = 1))]
    pub max_entries: u64,
    // 每服务缓存策略
    #[serde(default)]
    #[validate(nested)]
    pub per_service_policies: HashMap<String, CachePolicyConfig>,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
            per_service_policies: HashMap::new(),
        }
    }
}

// 服务缓存策略配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CachePolicyConfig {
    // 是否为该服务启用缓存
    #[serde(default = "default_true")]
    pub enabled: bool,
    // 缓存有效期（秒），为空时使用全局默认值
    #[serde(default, rename = "TTL", alias = "ttl")]
    #[validate(range(min = 1, max = cache_limits::MAX_TTL))]
    pub ttl: Option<u64>,
    // 可缓存的请求方法
    #[serde(default = "default_cacheable_methods")]
    pub cacheable_methods: Vec<String>,
    // 排除的端点模式（正则），优先于包含模式
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    // 包含的端点模式（正则），为空表示全部包含
    #[serde(default)]
    pub include_patterns: Vec<String>,
    // 是否只缓存成功响应
    #[serde(default = "default_true")]
    pub cache_only_success: bool,
}

impl Default for CachePolicyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: None,
            cacheable_methods: default_cacheable_methods(),
            exclude_patterns: Vec::new(),
            include_patterns: Vec::new(),
            cache_only_success: true,
        }
    }
}
