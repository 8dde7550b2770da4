// 导出子模块
pub mod admin;
pub mod cache;
pub mod common;
pub mod defaults;
pub mod http_client;
pub mod m2m;
pub mod service;
pub mod validation;

// 重新导出常用类型
pub use self::admin::AdminConfig;
pub use self::cache::{CachePolicyConfig, CachingConfig};
pub use self::common::{
    BackoffStrategy, BreakerConfig, BulkheadConfig, RetryConfig, TelemetryConfig,
};
pub use self::http_client::{HttpClientConfig, HttpClientTimeoutConfig, ProxyConfig};
pub use self::m2m::M2mConfig;
pub use self::service::{AuthConfig, AuthType, HeaderOp, HeaderOpType, ServiceConfig};

use crate::config::defaults::default_call_timeout;
use crate::error::AppError;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use validator::Validate;

// 配置文件结构
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    // 是否通过网关转发所有调用
    #[serde(default)]
    pub use_gateway: bool,
    // 网关地址
    #[serde(default)]
    pub gateway_url: Option<String>,
    // 默认调用截止时间（毫秒）
    #[serde(default = "default_call_timeout")]
    pub default_timeout: u64,
    // 全局重试策略
    #[serde(default)]
    #[validate(nested)]
    pub retry_policy: RetryConfig,
    // 全局熔断器配置
    #[serde(default)]
    #[validate(nested)]
    pub circuit_breaker: BreakerConfig,
    // 响应缓存配置
    #[serde(default)]
    #[validate(nested)]
    pub caching: CachingConfig,
    // M2M 令牌配置
    #[serde(default)]
    #[validate(nested)]
    pub m2m: M2mConfig,
    // 隔板配置
    #[serde(default)]
    #[validate(nested)]
    pub bulkhead: BulkheadConfig,
    // 遥测配置
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
    // 服务地址覆盖
    #[serde(default)]
    pub service_endpoints: HashMap<String, String>,
    // 每服务覆盖配置
    #[serde(default)]
    #[validate(nested)]
    pub services: HashMap<String, ServiceConfig>,
    // HTTP客户端配置
    #[serde(default)]
    #[validate(nested)]
    pub http_client: HttpClientConfig,
    // 管理服务配置
    #[serde(default)]
    #[validate(nested)]
    pub admin: AdminConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_gateway: false,
            gateway_url: None,
            default_timeout: default_call_timeout(),
            retry_policy: RetryConfig::default(),
            circuit_breaker: BreakerConfig::default(),
            caching: CachingConfig::default(),
            m2m: M2mConfig::default(),
            bulkhead: BulkheadConfig::default(),
            telemetry: TelemetryConfig::default(),
            service_endpoints: HashMap::new(),
            services: HashMap::new(),
            http_client: HttpClientConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl Config {
    // 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        debug!("Attempting to load configuration from file: {:?}", path);

        // 打开并读取文件
        let mut file = File::open(path).map_err(|e| {
            AppError::Config(format!(
                "Unable to open configuration file {:?}: {}",
                path, e
            ))
        })?;

        let mut content = String::new();
        file.read_to_string(&mut content).map_err(|e| {
            AppError::Config(format!(
                "Unable to read configuration file {:?}: {}",
                path, e
            ))
        })?;

        Self::from_yaml(&content)
    }

    // 从 YAML 文本加载配置
    pub fn from_yaml(content: &str) -> Result<Self, AppError> {
        // 解析YAML
        let mut config: Config = serde_yaml::from_str(content)
            .map_err(|e| AppError::Config(format!("Configuration file parsing error: {}", e)))?;

        // 预处理配置
        config.post_process()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    // 预处理配置，例如预解析头部
    pub fn post_process(&mut self) -> Result<(), AppError> {
        for (service, overrides) in &mut self.services {
            for op in &mut overrides.headers {
                // 预解析头部名称
                let name = HeaderName::from_bytes(op.key.as_bytes()).map_err(|e| {
                    AppError::InvalidHeader(format!(
                        "Invalid header name '{}' for service '{}': {}",
                        op.key, service, e
                    ))
                })?;
                op.parsed_name = Some(name);

                // 预解析头部值
                if let Some(value_str) = &op.value {
                    let value = HeaderValue::from_str(value_str).map_err(|e| {
                        AppError::InvalidHeader(format!(
                            "Invalid header value for key '{}' in service '{}': {}",
                            op.key, service, e
                        ))
                    })?;
                    op.parsed_value = Some(value);
                }
            }
        }
        Ok(())
    }

    // 获取服务的重试配置（服务覆盖优先）
    pub fn retry_config_for(&self, service: &str) -> &RetryConfig {
        self.services
            .get(service)
            .and_then(|s| s.retry_policy.as_ref())
            .unwrap_or(&self.retry_policy)
    }

    // 获取服务的熔断器配置（服务覆盖优先）
    pub fn breaker_config_for(&self, service: &str) -> &BreakerConfig {
        self.services
            .get(service)
            .and_then(|s| s.circuit_breaker.as_ref())
            .unwrap_or(&self.circuit_breaker)
    }

    // 获取服务的调用截止时间
    pub fn timeout_for(&self, service: &str) -> Duration {
        let ms = self
            .services
            .get(service)
            .and_then(|s| s.timeout)
            .unwrap_or(self.default_timeout);
        Duration::from_millis(ms)
    }

    // 获取服务的覆盖配置
    pub fn service(&self, service: &str) -> Option<&ServiceConfig> {
        self.services.get(service)
    }

    // 解析服务的基础地址
    pub fn base_url_for(&self, service: &str) -> String {
        if self.use_gateway {
            if let Some(gateway) = &self.gateway_url {
                return format!("{}/{}", gateway.trim_end_matches('/'), service);
            }
        }

        match self.service_endpoints.get(service) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", service),
        }
    }
}
