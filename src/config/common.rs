use crate::{
    config::defaults::{
        default_breaker_call_timeout, default_consecutive_failures, default_failure_threshold,
        default_jitter_factor, default_max_parallel, default_max_queued, default_max_retries,
        default_minimum_throughput, default_open_duration, default_retry_initial,
        default_retry_max_delay, default_retryable_failures, default_retryable_status_codes,
        default_sample_rate, default_sampling_duration, default_true,
    },
    error::FailureKind,
    r#const::{breaker_limits, bulkhead_limits, retry_limits},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

// 退避策略类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    // 线性退避
    Linear,
    // 指数退避
    #[default]
    Exponential,
    // 带抖动的指数退避
    ExponentialJitter,
    // 斐波那契退避
    Fibonacci,
}

impl BackoffStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::ExponentialJitter => "exponential_jitter",
            Self::Fibonacci => "fibonacci",
        }
    }
}

// 重试配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    // 最大重试次数（不含首次调用）
    #[serde(default = "default_max_retries")]
    #[validate(range(max = retry_limits::MAX_RETRIES))]
    pub max_retries: u32,
    // 退避策略
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    // 初始重试间隔（毫秒）
    #[serde(default = "default_retry_initial")]
    #[validate(range(min = retry_limits::MIN_INITIAL_MS, max = retry_limits::MAX_INITIAL_MS))]
    pub initial_delay: u64,
    // 最大重试间隔（毫秒）
    #[serde(default = "default_retry_max_delay")]
    #[validate(range(min = retry_limits::MIN_INITIAL_MS, max = retry_limits::MAX_DELAY_MS))]
    pub max_delay: u64,
    // 可重试的状态码
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: Vec<u16>,
    // 可重试的失败类型
    #[serde(default = "default_retryable_failures", rename = "retryableExceptions")]
    pub retryable_failures: Vec<FailureKind>,
    // 是否启用抖动
    #[serde(default)]
    pub use_jitter: bool,
    // 抖动系数 (0-1)
    #[serde(default = "default_jitter_factor")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_strategy: BackoffStrategy::default(),
            initial_delay: default_retry_initial(),
            max_delay: default_retry_max_delay(),
            retryable_status_codes: default_retryable_status_codes(),
            retryable_failures: default_retryable_failures(),
            use_jitter: false,
            jitter_factor: default_jitter_factor(),
        }
    }
}

// 熔断器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BreakerConfig {
    // 连续失败多少次后熔断
    #[serde(
        default = "default_consecutive_failures",
        rename = "exceptionsAllowedBeforeBreaking"
    )]
    #[validate(range(min = 1, max = breaker_limits::MAX_CONSECUTIVE_FAILURES))]
    pub consecutive_failures: u32,
    // 熔断持续时间，之后进入半开 (Half-Open) 状态（秒）
    #[serde(default = "default_open_duration", rename = "durationOfBreak")]
    #[validate(range(
        min = breaker_limits::MIN_OPEN_DURATION,
        max = breaker_limits::MAX_OPEN_DURATION
    ))]
    pub open_duration: u64,
    // 单次调用超时（毫秒），超时计为失败
    #[serde(default = "default_breaker_call_timeout", rename = "timeout")]
    #[validate(range(min = 1))]
    pub call_timeout: u64,
    // 触发熔断的失败率阈值 (0.01-1.0, 例如0.5表示50%的调用失败)
    #[serde(default = "default_failure_threshold")]
    #[validate(range(
        min = breaker_limits::MIN_FAILURE_THRESHOLD,
        max = breaker_limits::MAX_FAILURE_THRESHOLD
    ))]
    pub failure_threshold: f64,
    // 计算失败率所需的最小调用数
    #[serde(default = "default_minimum_throughput")]
    #[validate(range(min = 1))]
    pub minimum_throughput: u32,
    // 失败率统计窗口（秒）
    #[serde(default = "default_sampling_duration")]
    #[validate(range(min = 1, max = breaker_limits::MAX_SAMPLING_DURATION))]
    pub sampling_duration: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            consecutive_failures: default_consecutive_failures(),
            open_duration: default_open_duration(),
            call_timeout: default_breaker_call_timeout(),
            failure_threshold: default_failure_threshold(),
            minimum_throughput: default_minimum_throughput(),
            sampling_duration: default_sampling_duration(),
        }
    }
}

// 隔板配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkheadConfig {
    // 全局默认的每服务最大并行请求数
    #[serde(default = "default_max_parallel")]
    #[validate(range(min = 1, max = bulkhead_limits::MAX_PARALLEL))]
    pub max_parallel_requests: usize,
    // 最大排队请求数
    #[serde(default = "default_max_queued")]
    #[validate(range(max = bulkhead_limits::MAX_QUEUED))]
    pub max_queued_requests: usize,
    // 每服务并行上限
    #[serde(default)]
    pub per_service_limits: HashMap<String, usize>,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_parallel_requests: default_max_parallel(),
            max_queued_requests: default_max_queued(),
            per_service_limits: HashMap::new(),
        }
    }
}

impl BulkheadConfig {
    // 获取服务的并行上限
    pub fn limit_for(&self, service: &str) -> usize {
        self.per_service_limits
            .get(service)
            .copied()
            .unwrap_or(self.max_parallel_requests)
    }
}

// 遥测配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryConfig {
    // 是否启用调用统计
    #[serde(default = "default_true")]
    pub enabled: bool,
    // 是否按端点细分统计
    #[serde(default)]
    pub enable_detailed_metrics: bool,
    // 延迟采样率 (0-1)
    #[serde(default = "default_sample_rate")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_detailed_metrics: false,
            sample_rate: default_sample_rate(),
        }
    }
}
