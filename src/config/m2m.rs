use crate::config::defaults::{
    default_refresh_before_expiry, default_refresh_interval, default_token_lifetime,
};
use crate::config::validation::custom;
use crate::r#const::m2m_limits;
use serde::{Deserialize, Serialize};
use validator::Validate;

// M2M 客户端凭据配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "custom::validate_m2m_config"))]
#[serde(rename_all = "camelCase")]
pub struct M2mConfig {
    // 是否启用 M2M 令牌
    #[serde(default)]
    pub enabled: bool,
    // 令牌端点
    #[serde(default)]
    pub token_endpoint: String,
    // 客户端标识
    #[serde(default)]
    pub client_id: String,
    // 客户端密钥
    #[serde(default)]
    pub client_secret: String,
    // 请求的权限范围
    #[serde(default)]
    pub scopes: Vec<String>,
    // 令牌端点未返回 expires_in 时使用的有效期（秒）
    #[serde(default = "default_token_lifetime")]
    #[validate(range(min = 1))]
    pub token_lifetime: u64,
    // 在过期前多久刷新（秒）
    #[serde(default = "default_refresh_before_expiry")]
    pub refresh_before_expiry: u64,
    // 后台刷新检查间隔（秒）
    #[serde(default = "default_refresh_interval")]
    #[validate(range(min = m2m_limits::MIN_REFRESH_INTERVAL))]
    pub refresh_interval: u64,
    // 刷新失败时使用的静态令牌
    #[serde(default)]
    pub fallback_token: Option<String>,
}

impl Default for M2mConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token_endpoint: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scopes: Vec::new(),
            token_lifetime: default_token_lifetime(),
            refresh_before_expiry: default_refresh_before_expiry(),
            refresh_interval: default_refresh_interval(),
            fallback_token: None,
        }
    }
}
