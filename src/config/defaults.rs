use crate::error::FailureKind;
use crate::r#const::{
    breaker_limits, bulkhead_limits, cache_limits, call_timeout_limits, http_client_limits,
    m2m_limits, retry_limits, telemetry_limits,
};

// 默认值函数
pub fn default_true() -> bool {
    true
}

pub fn default_call_timeout() -> u64 {
    call_timeout_limits::DEFAULT_TIMEOUT_MS
}

pub fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

pub fn default_admin_port() -> u16 {
    9000
}

pub fn default_admin_timeout() -> u64 {
    30
}

pub fn default_connect_timeout() -> u64 {
    http_client_limits::DEFAULT_CONNECT_TIMEOUT
}

pub fn default_idle_timeout() -> u64 {
    http_client_limits::DEFAULT_IDLE_TIMEOUT
}

pub fn default_keepalive() -> u32 {
    http_client_limits::DEFAULT_KEEPALIVE
}

pub fn default_user_agent() -> String {
    "svclink/1.0".to_string()
}

pub fn default_max_retries() -> u32 {
    retry_limits::DEFAULT_MAX_RETRIES
}

pub fn default_retry_initial() -> u64 {
    retry_limits::DEFAULT_INITIAL_MS
}

pub fn default_retry_max_delay() -> u64 {
    retry_limits::DEFAULT_MAX_DELAY_MS
}

pub fn default_jitter_factor() -> f64 {
    retry_limits::DEFAULT_JITTER_FACTOR
}

pub fn default_retryable_status_codes() -> Vec<u16> {
    retry_limits::DEFAULT_RETRYABLE_STATUS_CODES.to_vec()
}

pub fn default_retryable_failures() -> Vec<FailureKind> {
    vec![FailureKind::Timeout, FailureKind::Connect, FailureKind::Request]
}

// 熔断器默认失败率阈值
pub fn default_failure_threshold() -> f64 {
    breaker_limits::DEFAULT_FAILURE_THRESHOLD
}

pub fn default_minimum_throughput() -> u32 {
    breaker_limits::DEFAULT_MINIMUM_THROUGHPUT
}

pub fn default_consecutive_failures() -> u32 {
    breaker_limits::DEFAULT_CONSECUTIVE_FAILURES
}

// 熔断器默认熔断时长（秒）
pub fn default_open_duration() -> u64 {
    breaker_limits::DEFAULT_OPEN_DURATION
}

pub fn default_breaker_call_timeout() -> u64 {
    breaker_limits::DEFAULT_CALL_TIMEOUT_MS
}

pub fn default_sampling_duration() -> u64 {
    breaker_limits::DEFAULT_SAMPLING_DURATION
}

pub fn default_max_parallel() -> usize {
    bulkhead_limits::DEFAULT_MAX_PARALLEL
}

pub fn default_max_queued() -> usize {
    bulkhead_limits::DEFAULT_MAX_QUEUED
}

pub fn default_cache_ttl() -> u64 {
    cache_limits::DEFAULT_TTL
}

pub fn default_cache_max_entries() -> u64 {
    cache_limits::DEFAULT_MAX_ENTRIES
}

pub fn default_cacheable_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

pub fn default_token_lifetime() -> u64 {
    m2m_limits::DEFAULT_TOKEN_LIFETIME
}

pub fn default_refresh_before_expiry() -> u64 {
    m2m_limits::DEFAULT_REFRESH_BEFORE_EXPIRY
}

pub fn default_refresh_interval() -> u64 {
    m2m_limits::DEFAULT_REFRESH_INTERVAL
}

pub fn default_sample_rate() -> f64 {
    telemetry_limits::DEFAULT_SAMPLE_RATE
}
