use crate::config::defaults::{
    default_connect_timeout, default_idle_timeout, default_keepalive, default_user_agent,
};
use crate::config::validation::custom;
use crate::r#const::http_client_limits;
use serde::{Deserialize, Serialize};
use validator::Validate;

// HTTP客户端配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HttpClientConfig {
    // 用户代理
    #[serde(default = "default_user_agent")]
    pub agent: String,
    // TCP Keepalive（秒）
    #[serde(default = "default_keepalive")]
    #[validate(range(
        min = http_client_limits::MIN_KEEPALIVE,
        max = http_client_limits::MAX_KEEPALIVE
    ))]
    pub keepalive: u32,
    // 超时配置
    #[serde(default)]
    #[validate(nested)]
    pub timeout: HttpClientTimeoutConfig,
    // 代理配置
    #[serde(default)]
    #[validate(nested)]
    pub proxy: Option<ProxyConfig>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            agent: default_user_agent(),
            keepalive: default_keepalive(),
            timeout: HttpClientTimeoutConfig::default(),
            proxy: None,
        }
    }
}

// HTTP客户端超时配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HttpClientTimeoutConfig {
    // 连接超时（秒）
    #[serde(default = "default_connect_timeout")]
    #[validate(range(
        min = http_client_limits::MIN_CONNECT_TIMEOUT,
        max = http_client_limits::MAX_CONNECT_TIMEOUT
    ))]
    pub connect: u64,
    // 空闲超时（秒）
    #[serde(default = "default_idle_timeout")]
    #[validate(range(max = http_client_limits::MAX_IDLE_TIMEOUT))]
    pub idle: u64,
}

impl Default for HttpClientTimeoutConfig {
    fn default() -> Self {
        Self {
            connect: default_connect_timeout(),
            idle: default_idle_timeout(),
        }
    }
}

// 代理配置
#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
#[validate(schema(function = "custom::validate_proxy_config"))]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    // 代理URL
    #[serde(default)]
    pub url: String,
}
