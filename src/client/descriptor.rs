use crate::{error::CallError, r#const::http_headers};
use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// 一次服务调用的描述
///
/// 通过构建器方法组装，交给 `CommunicationManager::execute` 后不再修改。
#[derive(Debug, Clone)]
pub struct CallDescriptor {
    service: String,
    method: Method,
    endpoint: String,
    body: Option<Bytes>,
    headers: HeaderMap,
    timeout: Option<Duration>,
    deduplicate: Option<bool>,
}

impl CallDescriptor {
    pub fn new(service: impl Into<String>, method: Method, endpoint: impl Into<String>) -> Self {
        let mut endpoint = endpoint.into();
        if !endpoint.starts_with('/') {
            endpoint.insert(0, '/');
        }
        Self {
            service: service.into(),
            method,
            endpoint,
            body: None,
            headers: HeaderMap::new(),
            timeout: None,
            deduplicate: None,
        }
    }

    pub fn get(service: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(service, Method::GET, endpoint)
    }

    pub fn post(service: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(service, Method::POST, endpoint)
    }

    /// 设置原始请求体
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// 以 JSON 序列化请求体
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, CallError> {
        let bytes = serde_json::to_vec(body).map_err(|e| CallError::Serialization {
            service: self.service.clone(),
            message: e.to_string(),
        })?;
        self.headers.insert(
            HeaderName::from_static(http_headers::CONTENT_TYPE),
            HeaderValue::from_static(http_headers::content_types::JSON),
        );
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// 合并额外的请求头
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// 调用截止时间，覆盖服务默认值
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 显式开启或关闭请求合并
    pub fn deduplicate(mut self, enabled: bool) -> Self {
        self.deduplicate = Some(enabled);
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn request_body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub(crate) fn request_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn call_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// 是否为只读调用 (GET/HEAD)
    pub fn is_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    pub(crate) fn should_deduplicate(&self) -> bool {
        self.deduplicate.unwrap_or_else(|| self.is_read())
    }
}

/// 服务调用的原始响应
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub service: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    // 是否来自响应缓存
    pub from_cache: bool,
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn etag(&self) -> Option<&str> {
        self.headers
            .get(http_headers::ETAG)
            .and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// 反序列化响应体，空响应体按 `null` 处理
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, CallError> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|e| CallError::Serialization {
            service: self.service.clone(),
            message: e.to_string(),
        })
    }
}
