use crate::{config::CachePolicyConfig, error::AppError};
use regex::Regex;
use reqwest::Method;
use std::time::Duration;

/// 编译后的服务缓存策略
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub enabled: bool,
    pub ttl: Duration,
    cacheable_methods: Vec<Method>,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    cache_only_success: bool,
}

impl CachePolicy {
    pub fn from_config(config: &CachePolicyConfig, default_ttl: u64) -> Result<Self, AppError> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>, AppError> {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        AppError::Config(format!("Invalid cache pattern '{}': {}", p, e))
                    })
                })
                .collect()
        };

        let cacheable_methods = config
            .cacheable_methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok())
            .collect();

        Ok(Self {
            enabled: config.enabled,
            ttl: Duration::from_secs(config.ttl.unwrap_or(default_ttl)),
            cacheable_methods,
            include: compile(&config.include_patterns)?,
            exclude: compile(&config.exclude_patterns)?,
            cache_only_success: config.cache_only_success,
        })
    }

    /// 请求方法是否可缓存
    pub fn allows_method(&self, method: &Method) -> bool {
        self.enabled && self.cacheable_methods.contains(method)
    }

    /// 端点是否在缓存范围内，排除模式优先
    pub fn matches(&self, identity: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(identity)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(identity))
    }

    /// 响应状态是否可以写入缓存
    pub fn allows_status(&self, status: u16) -> bool {
        !self.cache_only_success || (200..300).contains(&status)
    }
}
