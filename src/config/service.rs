use crate::config::common::{BreakerConfig, RetryConfig};
use crate::config::defaults::default_true;
use crate::config::validation::custom;
use crate::r#const::call_timeout_limits;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 单个下游服务的覆盖配置
#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    // 重试策略覆盖
    #[serde(default)]
    #[validate(nested)]
    pub retry_policy: Option<RetryConfig>,
    // 熔断器配置覆盖
    #[serde(default)]
    #[validate(nested)]
    pub circuit_breaker: Option<BreakerConfig>,
    // 调用截止时间覆盖（毫秒）
    #[serde(default)]
    #[validate(range(
        min = call_timeout_limits::MIN_TIMEOUT_MS,
        max = call_timeout_limits::MAX_TIMEOUT_MS
    ))]
    pub timeout: Option<u64>,
    // 静态认证配置（M2M 不可用时的回退凭据）
    #[serde(default)]
    #[validate(nested)]
    pub auth: Option<AuthConfig>,
    // 是否为该服务附加 M2M 令牌
    #[serde(default = "default_true")]
    pub use_m2m: bool,
    // 请求头操作
    #[serde(default)]
    #[validate(nested)]
    pub headers: Vec<HeaderOp>,
}

// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "custom::validate_auth_config"))]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    // 认证类型
    #[serde(default)]
    pub r#type: AuthType,
    // 认证令牌（用于Bearer认证）
    #[serde(default)]
    pub token: Option<String>,
    // 用户名（用于Basic认证）
    #[serde(default)]
    pub username: Option<String>,
    // 密码（用于Basic认证）
    #[serde(default)]
    pub password: Option<String>,
}

// 认证类型
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    // Bearer令牌认证
    Bearer,
    // 基本认证
    Basic,
    // 无认证
    #[default]
    None,
}

/// HTTP 请求头操作类型
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HeaderOpType {
    // 插入
    Insert,
    // 替换
    Replace,
    // 移除
    Remove,
}

// 请求头操作
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "custom::validate_header_op"))]
pub struct HeaderOp {
    pub op: HeaderOpType,
    pub key: String,
    pub value: Option<String>,
    #[serde(skip)]
    pub parsed_name: Option<HeaderName>,
    #[serde(skip)]
    pub parsed_value: Option<HeaderValue>,
}
