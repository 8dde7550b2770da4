use crate::{config::TelemetryConfig, r#const::telemetry_limits};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

// 未开启端点细分时使用的统一端点名
const ALL_ENDPOINTS: &str = "*";

/// 单次调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    // 下游调用成功
    Success,
    // 由缓存直接返回
    Cached,
    // 调用失败，附带错误标签
    Failure(&'static str),
}

/// 调用统计记录器
///
/// 遥测关闭时使用 [`NoopRecorder`]，调用路径上无需判断。
pub trait CallRecorder: Send + Sync {
    /// 记录一次完成的调用
    fn record_call(
        &self,
        service: &str,
        endpoint: &str,
        outcome: CallOutcome,
        latency: Duration,
        retries: u32,
    );

    /// 获取单个服务的快照
    fn service_snapshot(&self, service: &str) -> Option<ServiceMetricsSnapshot>;

    /// 获取所有已记录服务的名称
    fn services(&self) -> Vec<String>;
}

/// 延迟分位数（毫秒）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// 端点维度的统计快照
#[derive(Debug, Clone, Serialize)]
pub struct EndpointMetricsSnapshot {
    pub endpoint: String,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub cached_calls: u64,
    pub retried_calls: u64,
    pub latency_ms: LatencyPercentiles,
}

/// 服务维度的统计快照
#[derive(Debug, Clone, Serialize)]
pub struct ServiceMetricsSnapshot {
    pub service: String,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub cached_calls: u64,
    pub retried_calls: u64,
    pub retry_attempts: u64,
    pub circuit_trips: u64,
    pub success_rate: f64,
    pub cache_hit_rate: f64,
    pub latency_ms: LatencyPercentiles,
    pub circuit_state: Option<String>,
    pub endpoints: Vec<EndpointMetricsSnapshot>,
}

/// 全局汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalMetricsSummary {
    pub services: usize,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub cached_calls: u64,
    pub retried_calls: u64,
    pub circuit_trips: u64,
    pub open_circuits: usize,
    pub success_rate: f64,
    pub cache_hit_rate: f64,
}

impl GlobalMetricsSummary {
    /// 由服务快照汇总
    pub fn from_snapshots(snapshots: &[ServiceMetricsSnapshot]) -> Self {
        let mut summary = Self {
            services: snapshots.len(),
            ..Default::default()
        };

        for s in snapshots {
            summary.total_calls += s.total_calls;
            summary.successful_calls += s.successful_calls;
            summary.failed_calls += s.failed_calls;
            summary.cached_calls += s.cached_calls;
            summary.retried_calls += s.retried_calls;
            summary.circuit_trips += s.circuit_trips;
            if matches!(s.circuit_state.as_deref(), Some("open") | Some("half_open")) {
                summary.open_circuits += 1;
            }
        }

        summary.success_rate = ratio(summary.successful_calls, summary.total_calls);
        summary.cache_hit_rate = ratio(summary.cached_calls, summary.total_calls);
        summary
    }
}

#[derive(Default)]
struct EndpointStats {
    total: u64,
    successful: u64,
    failed: u64,
    cached: u64,
    retried: u64,
    retry_attempts: u64,
    // 最近的延迟样本（毫秒）
    latencies: VecDeque<f64>,
}

/// 内存中的调用统计聚合器
pub struct MetricsAggregator {
    detailed: bool,
    sample_rate: f64,
    stats: DashMap<String, DashMap<String, Mutex<EndpointStats>>>,
}

impl MetricsAggregator {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            detailed: config.enable_detailed_metrics,
            sample_rate: config.sample_rate,
            stats: DashMap::new(),
        }
    }

    // 是否记录本次延迟样本
    fn should_sample(&self) -> bool {
        if self.sample_rate >= 1.0 {
            return true;
        }
        if self.sample_rate <= 0.0 {
            return false;
        }
        rand::thread_rng().gen::<f64>() < self.sample_rate
    }

    fn endpoint_key(&self, endpoint: &str) -> String {
        if self.detailed {
            normalize_endpoint(endpoint)
        } else {
            ALL_ENDPOINTS.to_string()
        }
    }
}

impl CallRecorder for MetricsAggregator {
    fn record_call(
        &self,
        service: &str,
        endpoint: &str,
        outcome: CallOutcome,
        latency: Duration,
        retries: u32,
    ) {
        let sample = self.should_sample();
        let endpoints = self.stats.entry(service.to_string()).or_default();
        let entry = endpoints.entry(self.endpoint_key(endpoint)).or_default();
        let mut stats = entry.lock();

        stats.total += 1;
        match outcome {
            CallOutcome::Success => stats.successful += 1,
            CallOutcome::Cached => {
                stats.successful += 1;
                stats.cached += 1;
            }
            CallOutcome::Failure(_) => stats.failed += 1,
        }
        if retries > 0 {
            stats.retried += 1;
            stats.retry_attempts += u64::from(retries);
        }

        if sample {
            if stats.latencies.len() >= telemetry_limits::LATENCY_WINDOW {
                stats.latencies.pop_front();
            }
            stats.latencies.push_back(latency.as_secs_f64() * 1000.0);
        }
    }

    fn service_snapshot(&self, service: &str) -> Option<ServiceMetricsSnapshot> {
        let endpoints = self.stats.get(service)?;

        let mut snapshot = ServiceMetricsSnapshot {
            service: service.to_string(),
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            cached_calls: 0,
            retried_calls: 0,
            retry_attempts: 0,
            circuit_trips: 0,
            success_rate: 0.0,
            cache_hit_rate: 0.0,
            latency_ms: LatencyPercentiles::default(),
            circuit_state: None,
            endpoints: Vec::with_capacity(endpoints.len()),
        };
        let mut all_samples = Vec::new();

        for item in endpoints.iter() {
            let stats = item.value().lock();
            let samples: Vec<f64> = stats.latencies.iter().copied().collect();

            snapshot.total_calls += stats.total;
            snapshot.successful_calls += stats.successful;
            snapshot.failed_calls += stats.failed;
            snapshot.cached_calls += stats.cached;
            snapshot.retried_calls += stats.retried;
            snapshot.retry_attempts += stats.retry_attempts;

            if self.detailed {
                snapshot.endpoints.push(EndpointMetricsSnapshot {
                    endpoint: item.key().clone(),
                    total_calls: stats.total,
                    successful_calls: stats.successful,
                    failed_calls: stats.failed,
                    cached_calls: stats.cached,
                    retried_calls: stats.retried,
                    latency_ms: percentiles(samples.clone()),
                });
            }
            all_samples.extend(samples);
        }

        snapshot.success_rate = ratio(snapshot.successful_calls, snapshot.total_calls);
        snapshot.cache_hit_rate = ratio(snapshot.cached_calls, snapshot.total_calls);
        snapshot.latency_ms = percentiles(all_samples);
        snapshot.endpoints.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));

        Some(snapshot)
    }

    fn services(&self) -> Vec<String> {
        let mut services: Vec<String> = self.stats.iter().map(|e| e.key().clone()).collect();
        services.sort();
        services
    }
}

/// 遥测关闭时使用的空实现
pub struct NoopRecorder;

impl CallRecorder for NoopRecorder {
    fn record_call(&self, _: &str, _: &str, _: CallOutcome, _: Duration, _: u32) {}

    fn service_snapshot(&self, _service: &str) -> Option<ServiceMetricsSnapshot> {
        None
    }

    fn services(&self) -> Vec<String> {
        Vec::new()
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

// 最近秩法计算分位数
fn percentiles(mut samples: Vec<f64>) -> LatencyPercentiles {
    if samples.is_empty() {
        return LatencyPercentiles::default();
    }
    samples.sort_by(|a, b| a.total_cmp(b));

    let rank = |p: f64| {
        let idx = ((p / 100.0) * samples.len() as f64).ceil() as usize;
        samples[idx.saturating_sub(1).min(samples.len() - 1)]
    };

    LatencyPercentiles {
        p50: rank(50.0),
        p95: rank(95.0),
        p99: rank(99.0),
    }
}

// 去掉查询参数，并把数字路径段折叠为 {id}，控制统计维度
fn normalize_endpoint(endpoint: &str) -> String {
    let path = endpoint.split('?').next().unwrap_or(endpoint);
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
