use crate::config::defaults::{
    default_admin_port, default_admin_timeout, default_listen_address, default_true,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

// 管理服务配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfig {
    // 是否启动管理服务
    #[serde(default = "default_true")]
    pub enabled: bool,
    // 监听端口
    #[serde(default = "default_admin_port")]
    pub port: u16,
    // 监听地址
    #[serde(default = "default_listen_address")]
    #[validate(length(min = 1, message = "Admin address cannot be empty"))]
    pub address: String,
    // API 访问令牌
    #[serde(default)]
    pub auth_token: Option<String>,
    // 请求超时（秒）
    #[serde(default = "default_admin_timeout")]
    #[validate(range(min = 1, max = 600))]
    pub timeout: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_admin_port(),
            address: default_listen_address(),
            auth_token: None,
            timeout: default_admin_timeout(),
        }
    }
}
