pub mod aggregate;

pub use aggregate::{
    CallOutcome, CallRecorder, EndpointMetricsSnapshot, GlobalMetricsSummary, LatencyPercentiles,
    MetricsAggregator, NoopRecorder, ServiceMetricsSnapshot,
};

use once_cell::sync::Lazy;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntGaugeVec, Opts, Registry};

/// 应用指标
pub struct Metrics {
    registry: Registry,
    // 服务调用计数
    calls_total: CounterVec,
    // 服务调用耗时
    call_duration_seconds: HistogramVec,
    // 服务调用错误计数
    call_errors_total: CounterVec,
    // 重试计数
    retries_total: CounterVec,
    // 缓存查询计数
    cache_requests_total: CounterVec,
    // 合并请求计数
    deduplicated_total: CounterVec,
    // 熔断器状态变化计数
    circuitbreaker_state_changes_total: CounterVec,
    // 熔断器拒绝计数
    circuitbreaker_rejected_total: CounterVec,
    // 隔板拒绝计数
    bulkhead_rejected_total: CounterVec,
    // 隔板当前占用
    bulkhead_in_flight: IntGaugeVec,
    // 令牌刷新计数
    token_refresh_total: CounterVec,
}

impl Metrics {
    /// 创建新的指标收集器
    fn new() -> Self {
        let registry = Registry::new();

        // 服务调用计数
        let calls_total = CounterVec::new(
            Opts::new(
                "svclink_calls_total",
                "Total number of outbound service calls, by target service and outcome.",
            ),
            &["service", "outcome"],
        )
        .unwrap();

        // 服务调用耗时
        let call_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "svclink_call_duration_seconds",
                "The end-to-end latency of outbound service calls, in seconds.",
            ),
            &["service"],
        )
        .unwrap();

        // 服务调用错误计数
        let call_errors_total = CounterVec::new(
            Opts::new(
                "svclink_call_errors_total",
                "Total number of failed outbound service calls, by target service and error type.",
            ),
            &["service", "error"],
        )
        .unwrap();

        // 重试计数
        let retries_total = CounterVec::new(
            Opts::new(
                "svclink_retries_total",
                "Total number of retry attempts made against downstream services.",
            ),
            &["service"],
        )
        .unwrap();

        // 缓存查询计数
        let cache_requests_total = CounterVec::new(
            Opts::new(
                "svclink_cache_requests_total",
                "Total number of response cache lookups, by target service and result.",
            ),
            &["service", "result"],
        )
        .unwrap();

        // 合并请求计数
        let deduplicated_total = CounterVec::new(
            Opts::new(
                "svclink_deduplicated_total",
                "Total number of calls that joined an identical in-flight call instead of dispatching.",
            ),
            &["service"],
        )
        .unwrap();

        // 熔断器状态变化计数
        let circuitbreaker_state_changes_total = CounterVec::new(
            Opts::new(
                "svclink_circuitbreaker_state_changes_total",
                "Total number of circuit breaker state transitions.",
            ),
            &["service", "from", "to"],
        )
        .unwrap();

        // 熔断器拒绝计数
        let circuitbreaker_rejected_total = CounterVec::new(
            Opts::new(
                "svclink_circuitbreaker_rejected_total",
                "Total number of calls rejected without dispatch because the circuit was open.",
            ),
            &["service"],
        )
        .unwrap();

        // 隔板拒绝计数
        let bulkhead_rejected_total = CounterVec::new(
            Opts::new(
                "svclink_bulkhead_rejected_total",
                "Total number of calls rejected because the service bulkhead and its queue were full.",
            ),
            &["service"],
        )
        .unwrap();

        // 隔板当前占用
        let bulkhead_in_flight = IntGaugeVec::new(
            Opts::new(
                "svclink_bulkhead_in_flight",
                "Number of calls currently holding a bulkhead slot.",
            ),
            &["service"],
        )
        .unwrap();

        // 令牌刷新计数
        let token_refresh_total = CounterVec::new(
            Opts::new(
                "svclink_token_refresh_total",
                "Total number of M2M token refresh attempts, by result.",
            ),
            &["client", "result"],
        )
        .unwrap();

        // 注册指标
        registry.register(Box::new(calls_total.clone())).unwrap();
        registry
            .register(Box::new(call_duration_seconds.clone()))
            .unwrap();
        registry
            .register(Box::new(call_errors_total.clone()))
            .unwrap();
        registry.register(Box::new(retries_total.clone())).unwrap();
        registry
            .register(Box::new(cache_requests_total.clone()))
            .unwrap();
        registry
            .register(Box::new(deduplicated_total.clone()))
            .unwrap();
        registry
            .register(Box::new(circuitbreaker_state_changes_total.clone()))
            .unwrap();
        registry
            .register(Box::new(circuitbreaker_rejected_total.clone()))
            .unwrap();
        registry
            .register(Box::new(bulkhead_rejected_total.clone()))
            .unwrap();
        registry
            .register(Box::new(bulkhead_in_flight.clone()))
            .unwrap();
        registry
            .register(Box::new(token_refresh_total.clone()))
            .unwrap();

        Self {
            registry,
            calls_total,
            call_duration_seconds,
            call_errors_total,
            retries_total,
            cache_requests_total,
            deduplicated_total,
            circuitbreaker_state_changes_total,
            circuitbreaker_rejected_total,
            bulkhead_rejected_total,
            bulkhead_in_flight,
            token_refresh_total,
        }
    }

    /// 获取注册表
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// 服务调用计数
    pub fn calls_total(&self) -> &CounterVec {
        &self.calls_total
    }

    /// 服务调用耗时
    pub fn call_duration_seconds(&self) -> &HistogramVec {
        &self.call_duration_seconds
    }

    /// 服务调用错误计数
    pub fn call_errors_total(&self) -> &CounterVec {
        &self.call_errors_total
    }

    /// 重试计数
    pub fn retries_total(&self) -> &CounterVec {
        &self.retries_total
    }

    /// 缓存查询计数
    pub fn cache_requests_total(&self) -> &CounterVec {
        &self.cache_requests_total
    }

    /// 合并请求计数
    pub fn deduplicated_total(&self) -> &CounterVec {
        &self.deduplicated_total
    }

    /// 熔断器状态变化计数
    pub fn circuitbreaker_state_changes_total(&self) -> &CounterVec {
        &self.circuitbreaker_state_changes_total
    }

    /// 熔断器拒绝计数
    pub fn circuitbreaker_rejected_total(&self) -> &CounterVec {
        &self.circuitbreaker_rejected_total
    }

    /// 隔板拒绝计数
    pub fn bulkhead_rejected_total(&self) -> &CounterVec {
        &self.bulkhead_rejected_total
    }

    /// 隔板当前占用
    pub fn bulkhead_in_flight(&self) -> &IntGaugeVec {
        &self.bulkhead_in_flight
    }

    /// 令牌刷新计数
    pub fn token_refresh_total(&self) -> &CounterVec {
        &self.token_refresh_total
    }
}

/// 全局指标实例
pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);
