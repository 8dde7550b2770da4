use crate::{
    client::ServiceResponse,
    config::{AuthConfig, AuthType, HeaderOp, HeaderOpType, HttpClientConfig},
    error::{AppError, CallError, FailureKind},
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::HeaderMap, Method, RequestBuilder};
use std::time::Duration;
use tracing::debug;

/// 单次传输请求
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub credential: Option<Credential>,
    // 单次尝试超时
    pub timeout: Duration,
}

/// 请求凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    Basic {
        username: String,
        password: Option<String>,
    },
}

impl Credential {
    /// 由服务的静态认证配置生成
    pub fn from_auth(auth: &AuthConfig) -> Option<Self> {
        match auth.r#type {
            AuthType::Bearer => auth.token.clone().map(Self::Bearer),
            AuthType::Basic => auth.username.clone().map(|username| Self::Basic {
                username,
                password: auth.password.clone(),
            }),
            AuthType::None => None,
        }
    }
}

/// 传输层，负责发出一次 HTTP 请求
///
/// 任何状态码都作为响应返回，由调用方决定是否视为失败。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        service: &str,
        request: TransportRequest,
    ) -> Result<ServiceResponse, CallError>;
}

/// 基于 reqwest 的传输层
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        service: &str,
        request: TransportRequest,
    ) -> Result<ServiceResponse, CallError> {
        let transport_error = |e: reqwest::Error| CallError::Transport {
            service: service.to_string(),
            kind: FailureKind::from_reqwest(&e),
            message: e.to_string(),
        };

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .timeout(request.timeout);
        if let Some(credential) = &request.credential {
            builder = add_auth(builder, credential);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!(
            "Service '{}' responded with status {} ({} bytes)",
            service,
            status,
            body.len()
        );

        Ok(ServiceResponse {
            service: service.to_string(),
            status,
            headers,
            body,
            from_cache: false,
        })
    }
}

/// 创建共享的 HTTP 客户端
pub fn create_http_client(config: &HttpClientConfig) -> Result<reqwest::Client, AppError> {
    debug!("Creating HTTP client, config: {:?}", config);

    let mut client_builder = reqwest::Client::builder()
        .user_agent(&config.agent)
        .tcp_keepalive(Some(Duration::from_secs(config.keepalive.into())))
        .connect_timeout(Duration::from_secs(config.timeout.connect));

    // 设置空闲超时
    if config.timeout.idle > 0 {
        client_builder =
            client_builder.pool_idle_timeout(Some(Duration::from_secs(config.timeout.idle)));
    }

    // 配置代理
    if let Some(proxy_config) = &config.proxy {
        let proxy = reqwest::Proxy::all(&proxy_config.url).map_err(|e| {
            AppError::Config(format!("Invalid proxy URL '{}': {}", proxy_config.url, e))
        })?;
        client_builder = client_builder.proxy(proxy);
    }

    Ok(client_builder.build()?)
}

/// 添加认证信息到请求
fn add_auth(request: RequestBuilder, credential: &Credential) -> RequestBuilder {
    match credential {
        Credential::Bearer(token) => request.bearer_auth(token),
        Credential::Basic { username, password } => {
            request.basic_auth(username, password.as_ref())
        }
    }
}

/// 应用服务配置的请求头操作
pub(crate) fn apply_header_ops(headers: &mut HeaderMap, ops: &[HeaderOp]) {
    for op in ops {
        match op.op {
            HeaderOpType::Insert => {
                if let (Some(name), Some(value)) = (&op.parsed_name, &op.parsed_value) {
                    if !headers.contains_key(name) {
                        headers.insert(name.clone(), value.clone());
                    }
                }
            }
            HeaderOpType::Replace => {
                if let (Some(name), Some(value)) = (&op.parsed_name, &op.parsed_value) {
                    headers.insert(name.clone(), value.clone());
                }
            }
            HeaderOpType::Remove => {
                if let Some(name) = &op.parsed_name {
                    headers.remove(name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn op(op: HeaderOpType, key: &'static str, value: Option<&'static str>) -> HeaderOp {
        HeaderOp {
            op,
            key: key.to_string(),
            value: value.map(str::to_string),
            parsed_name: Some(HeaderName::from_static(key)),
            parsed_value: value.map(HeaderValue::from_static),
        }
    }

    #[test]
    fn test_header_ops() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", HeaderValue::from_static("caller"));
        headers.insert("x-debug", HeaderValue::from_static("1"));

        apply_header_ops(
            &mut headers,
            &[
                op(HeaderOpType::Insert, "x-tenant", Some("default")),
                op(HeaderOpType::Insert, "x-source", Some("svclink")),
                op(HeaderOpType::Replace, "x-debug", Some("0")),
                op(HeaderOpType::Remove, "x-debug", None),
            ],
        );

        assert_eq!(headers["x-tenant"], "caller");
        assert_eq!(headers["x-source"], "svclink");
        assert!(!headers.contains_key("x-debug"));
    }

    #[test]
    fn test_credential_from_auth() {
        let bearer = AuthConfig {
            r#type: AuthType::Bearer,
            token: Some("abc".to_string()),
            username: None,
            password: None,
        };
        assert_eq!(
            Credential::from_auth(&bearer),
            Some(Credential::Bearer("abc".to_string()))
        );

        let none = AuthConfig {
            r#type: AuthType::None,
            ..bearer
        };
        assert_eq!(Credential::from_auth(&none), None);
    }

    #[test]
    fn test_create_http_client_with_proxy() {
        let mut config = HttpClientConfig::default();
        assert!(create_http_client(&config).is_ok());

        config.proxy = Some(crate::config::ProxyConfig {
            url: "http://proxy.internal:3128".to_string(),
        });
        assert!(create_http_client(&config).is_ok());
    }
}
