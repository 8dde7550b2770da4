pub mod custom;

use crate::config::cache::CachePolicyConfig;
use crate::error::AppError;
use regex::Regex;
use tracing::debug;
use url::Url;
use validator::Validate;

use super::Config;

impl Config {
    // 验证配置
    pub fn validate(&self) -> Result<(), AppError> {
        // 字段级验证
        Validate::validate(self).map_err(|e| AppError::ValidationError(e.to_string()))?;

        // 验证网关配置
        if self.use_gateway {
            match &self.gateway_url {
                Some(url) => {
                    if let Err(e) = Url::parse(url) {
                        return Err(AppError::Config(format!(
                            "Gateway URL '{}' is invalid: {}",
                            url, e
                        )));
                    }
                }
                None => {
                    return Err(AppError::Config(
                        "useGateway is enabled but no gatewayUrl was provided".to_string(),
                    ));
                }
            }
        }

        // 验证服务地址
        for (service, url) in &self.service_endpoints {
            if let Err(e) = Url::parse(url) {
                return Err(AppError::Config(format!(
                    "URL '{}' for service '{}' is invalid: {}",
                    url, service, e
                )));
            }
        }

        // 验证重试延迟上下限
        self.validate_retry_bounds(
            "Global retry policy",
            self.retry_policy.initial_delay,
            self.retry_policy.max_delay,
        )?;
        for (service, overrides) in &self.services {
            if let Some(retry) = &overrides.retry_policy {
                self.validate_retry_bounds(
                    &format!("Retry policy of service '{}'", service),
                    retry.initial_delay,
                    retry.max_delay,
                )?;
            }
        }

        // 验证隔板配置
        for (service, limit) in &self.bulkhead.per_service_limits {
            if *limit == 0 {
                return Err(AppError::Config(format!(
                    "Bulkhead limit for service '{}' must be greater than 0",
                    service
                )));
            }
        }

        // 验证缓存策略
        for (service, policy) in &self.caching.per_service_policies {
            self.validate_cache_policy(service, policy)?;
        }

        // 验证 M2M 刷新窗口
        if self.m2m.enabled && self.m2m.refresh_before_expiry >= self.m2m.token_lifetime {
            debug!(
                "M2M refreshBeforeExpiry ({}s) is not shorter than tokenLifetime ({}s), tokens without expires_in will refresh on every call",
                self.m2m.refresh_before_expiry, self.m2m.token_lifetime
            );
        }

        Ok(())
    }

    // 验证重试延迟上下限
    fn validate_retry_bounds(
        &self,
        context: &str,
        initial_delay: u64,
        max_delay: u64,
    ) -> Result<(), AppError> {
        if initial_delay > max_delay {
            return Err(AppError::Config(format!(
                "{} has initialDelay {}ms greater than maxDelay {}ms",
                context, initial_delay, max_delay
            )));
        }
        Ok(())
    }

    // 验证缓存策略，确保所有模式可以编译
    fn validate_cache_policy(
        &self,
        service: &str,
        policy: &CachePolicyConfig,
    ) -> Result<(), AppError> {
        for pattern in policy
            .include_patterns
            .iter()
            .chain(policy.exclude_patterns.iter())
        {
            if let Err(e) = Regex::new(pattern) {
                return Err(AppError::Config(format!(
                    "Cache pattern '{}' for service '{}' is invalid: {}",
                    pattern, service, e
                )));
            }
        }

        if policy.cacheable_methods.is_empty() && policy.enabled {
            debug!(
                "Cache policy for service '{}' is enabled but has no cacheable methods",
                service
            );
        }

        Ok(())
    }
}
