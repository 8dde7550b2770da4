// 自定义验证函数
use validator::ValidationError;

use crate::config::{
    m2m::M2mConfig,
    service::{AuthConfig, AuthType, HeaderOp, HeaderOpType},
    ProxyConfig,
};

pub fn validate_proxy_config(proxy: &ProxyConfig) -> Result<(), ValidationError> {
    if proxy.url.is_empty() {
        let mut err = ValidationError::new("url_empty");
        err.message = Some("Proxy URL cannot be empty".into());
        return Err(err);
    }
    if url::Url::parse(&proxy.url).is_err() {
        let mut err = ValidationError::new("url_invalid");
        err.message = Some("Proxy URL is not a valid URL".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_auth_config(auth: &AuthConfig) -> Result<(), ValidationError> {
    match auth.r#type {
        AuthType::Bearer => {
            if auth.token.as_ref().is_none_or(|s| s.is_empty()) {
                let mut err = ValidationError::new("bearer_token_empty");
                err.message = Some("Bearer token cannot be empty".into());
                return Err(err);
            }
        }
        AuthType::Basic => {
            if auth.username.as_ref().is_none_or(|s| s.is_empty())
                || auth.password.as_ref().is_none_or(|s| s.is_empty())
            {
                let mut err = ValidationError::new("basic_credentials_empty");
                err.message = Some("Basic auth requires a non-empty username and password".into());
                return Err(err);
            }
        }
        AuthType::None => {}
    }
    Ok(())
}

pub fn validate_header_op(op: &HeaderOp) -> Result<(), ValidationError> {
    match op.op {
        HeaderOpType::Insert | HeaderOpType::Replace => {
            if op.value.as_ref().is_none_or(|s| s.is_empty()) {
                let mut err = ValidationError::new("header_value_empty");
                err.message =
                    Some("Header value cannot be empty for insert/replace operations".into());
                return Err(err);
            }
        }
        HeaderOpType::Remove => {}
    }
    Ok(())
}

pub fn validate_m2m_config(m2m: &M2mConfig) -> Result<(), ValidationError> {
    if !m2m.enabled {
        return Ok(());
    }
    if url::Url::parse(&m2m.token_endpoint).is_err() {
        let mut err = ValidationError::new("token_endpoint_invalid");
        err.message = Some("M2M token endpoint must be a valid URL".into());
        return Err(err);
    }
    if m2m.client_id.is_empty() || m2m.client_secret.is_empty() {
        let mut err = ValidationError::new("client_credentials_empty");
        err.message = Some("M2M requires a non-empty clientId and clientSecret".into());
        return Err(err);
    }
    Ok(())
}
