use serde::{Deserialize, Serialize};
use std::{fmt, io};
use thiserror::Error;

/// 应用错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP客户端错误
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),

    /// 序列化/反序列化错误
    #[error("Serialization/deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// 配置验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 无效的HTTP头
    #[error("Invalid HTTP header: {0}")]
    InvalidHeader(String),

    /// 服务调用错误
    #[error(transparent)]
    Call(#[from] CallError),
}

/// 传输层失败类型，可在配置中声明为可重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    // 单次调用超时
    Timeout,
    // 连接失败
    Connect,
    // 请求发送失败
    Request,
    // 响应体读取失败
    Body,
}

impl FailureKind {
    /// 根据 reqwest 错误推断失败类型
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect
        } else if err.is_body() || err.is_decode() {
            Self::Body
        } else {
            Self::Request
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 调用方可见的失败分类，用于决定降级策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    // 下游明确表示没有数据
    NoData,
    // 暂时性故障，稍后重试
    Transient,
    // 依赖降级（熔断或容量不足）
    Degraded,
    // 不可恢复的错误
    Fatal,
}

/// 服务间调用错误
///
/// 所有变体都可以克隆，合并请求时同一个错误会分发给每个等待者。
#[derive(Error, Debug, Clone)]
pub enum CallError {
    /// 网络或超时错误
    #[error("Transport failure calling '{service}' ({kind}): {message}")]
    Transport {
        service: String,
        kind: FailureKind,
        message: String,
    },

    /// 下游返回非 2xx 状态码
    #[error("Service '{service}' responded with status {status}")]
    UpstreamStatus {
        service: String,
        status: u16,
        body: String,
    },

    /// 熔断器开启，未发起调用
    #[error("Circuit breaker is open for service '{service}'")]
    CircuitOpen { service: String },

    /// 隔板容量已满
    #[error("Bulkhead is full for service '{service}'")]
    BulkheadRejected { service: String },

    /// 重试次数耗尽
    #[error("Retries exhausted for service '{service}' after {attempts} attempt(s): {last}")]
    RetryExhausted {
        service: String,
        attempts: u32,
        last: Box<CallError>,
    },

    /// 获取令牌失败且无静态凭据
    #[error("Authentication failed for service '{service}': {message}")]
    Authentication { service: String, message: String },

    /// 共享的进行中调用失败
    #[error("Shared in-flight call '{key}' failed: {source}")]
    Deduplication {
        key: String,
        #[source]
        source: Box<CallError>,
    },

    /// 调用方截止时间已过
    #[error("Deadline exceeded calling service '{service}'")]
    DeadlineExceeded { service: String },

    /// 请求或响应序列化失败
    #[error("Serialization failure for service '{service}': {message}")]
    Serialization { service: String, message: String },
}

impl CallError {
    /// 获取错误所属的目标服务
    pub fn service(&self) -> &str {
        match self {
            Self::Transport { service, .. }
            | Self::UpstreamStatus { service, .. }
            | Self::CircuitOpen { service }
            | Self::BulkheadRejected { service }
            | Self::RetryExhausted { service, .. }
            | Self::Authentication { service, .. }
            | Self::DeadlineExceeded { service }
            | Self::Serialization { service, .. } => service,
            Self::Deduplication { source, .. } => source.service(),
        }
    }

    /// 下游响应状态码（如果有）
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status, .. } => Some(*status),
            Self::RetryExhausted { last, .. } => last.status(),
            Self::Deduplication { source, .. } => source.status(),
            _ => None,
        }
    }

    /// 是否应计入熔断器失败
    ///
    /// 调用方错误（大部分 4xx）说明下游是健康的，不计入。
    pub fn is_breaker_failure(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::UpstreamStatus { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Self::RetryExhausted { last, .. } => last.is_breaker_failure(),
            Self::Deduplication { source, .. } => source.is_breaker_failure(),
            _ => false,
        }
    }

    /// 调用方可见的失败分类
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::UpstreamStatus { status, .. } if *status == 404 || *status == 410 => {
                FailureCategory::NoData
            }
            Self::UpstreamStatus { .. } if self.is_breaker_failure() => FailureCategory::Transient,
            Self::UpstreamStatus { .. } => FailureCategory::Fatal,
            Self::Transport { .. }
            | Self::RetryExhausted { .. }
            | Self::DeadlineExceeded { .. } => FailureCategory::Transient,
            Self::CircuitOpen { .. } | Self::BulkheadRejected { .. } => FailureCategory::Degraded,
            Self::Authentication { .. } | Self::Serialization { .. } => FailureCategory::Fatal,
            Self::Deduplication { source, .. } => source.category(),
        }
    }

    /// 指标中使用的错误标签
    pub fn label(&self) -> &'static str {
        use crate::r#const::error_labels;
        match self {
            Self::Transport { .. } => error_labels::TRANSPORT,
            Self::UpstreamStatus { .. } => error_labels::UPSTREAM_STATUS,
            Self::CircuitOpen { .. } => error_labels::CIRCUIT_OPEN,
            Self::BulkheadRejected { .. } => error_labels::BULKHEAD_REJECTED,
            Self::RetryExhausted { .. } => error_labels::RETRY_EXHAUSTED,
            Self::Authentication { .. } => error_labels::AUTHENTICATION,
            Self::Deduplication { .. } => error_labels::DEDUPLICATION,
            Self::DeadlineExceeded { .. } => error_labels::DEADLINE,
            Self::Serialization { .. } => error_labels::SERIALIZATION,
        }
    }
}
