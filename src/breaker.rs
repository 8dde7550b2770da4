use crate::{
    config::{BreakerConfig, Config},
    error::CallError,
    metrics::METRICS,
    r#const::breaker_state_labels,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// 熔断器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    // 正常放行
    Closed,
    // 拒绝所有调用
    Open,
    // 只放行一个探测调用
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => breaker_state_labels::CLOSED,
            Self::Open => breaker_state_labels::OPEN,
            Self::HalfOpen => breaker_state_labels::HALF_OPEN,
        }
    }
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    // 统计窗口内的调用结果，true 表示失败
    window: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    trips: u64,
}

/// 单个服务的熔断器
///
/// 连续失败次数达到上限，或窗口内调用数达到最小吞吐量且失败率达到阈值时熔断。
/// 熔断时长过后的下一次检查进入半开状态，只放行一个探测调用。
pub struct CircuitBreaker {
    service: String,
    consecutive_limit: u32,
    failure_threshold: f64,
    minimum_throughput: u32,
    open_duration: Duration,
    sampling_duration: Duration,
    call_timeout: Duration,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: &BreakerConfig) -> Arc<Self> {
        let service = service.into();
        debug!(
            "Created circuit breaker for service '{}' with consecutiveFailures={}, failureThreshold={}, minimumThroughput={}, durationOfBreak={}s",
            service,
            config.consecutive_failures,
            config.failure_threshold,
            config.minimum_throughput,
            config.open_duration
        );

        Arc::new(Self {
            service,
            consecutive_limit: config.consecutive_failures,
            failure_threshold: config.failure_threshold,
            minimum_throughput: config.minimum_throughput,
            open_duration: Duration::from_secs(config.open_duration),
            sampling_duration: Duration::from_secs(config.sampling_duration),
            call_timeout: Duration::from_millis(config.call_timeout),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                window: VecDeque::new(),
                opened_at: None,
                probe_in_flight: false,
                trips: 0,
            }),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// 单次尝试的超时时间
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// 当前状态（熔断时长已过时报告为半开）
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        inner.state
    }

    /// 累计熔断次数
    pub fn trips(&self) -> u64 {
        self.inner.lock().trips
    }

    /// 当前连续失败次数
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// 申请调用许可
    ///
    /// 返回的 [`CallPermit`] 必须通过 `record_*` 报告结果；
    /// 探测调用被取消时，许可在析构时释放探测名额。
    pub fn try_acquire(self: &Arc<Self>) -> Result<CallPermit, CallError> {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);

        let state = inner.state;
        let probe = match state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen if !inner.probe_in_flight => {
                inner.probe_in_flight = true;
                true
            }
            CircuitState::HalfOpen | CircuitState::Open => {
                drop(inner);
                METRICS
                    .circuitbreaker_rejected_total()
                    .with_label_values(&[&self.service])
                    .inc();
                return Err(CallError::CircuitOpen {
                    service: self.service.clone(),
                });
            }
        };

        Ok(CallPermit {
            breaker: Arc::clone(self),
            probe,
            completed: false,
            last_attempt_failed: AtomicBool::new(false),
        })
    }

    // 熔断时长已过则转为半开
    fn maybe_half_open(&self, inner: &mut BreakerState) {
        if inner.state != CircuitState::Open {
            return;
        }
        let elapsed = inner
            .opened_at
            .map(|at| at.elapsed() >= self.open_duration)
            .unwrap_or(true);
        if elapsed {
            self.transition(inner, CircuitState::HalfOpen);
            inner.probe_in_flight = false;
        }
    }

    fn on_success(&self, probe: bool) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen if probe => {
                inner.probe_in_flight = false;
                inner.consecutive_failures = 0;
                inner.window.clear();
                self.transition(&mut inner, CircuitState::Closed);
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                self.push_sample(&mut inner, false);
            }
            // 熔断期间完成的旧调用不影响状态
            _ => {}
        }
    }

    fn on_failure(&self, probe: bool) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen if probe => {
                inner.probe_in_flight = false;
                self.trip(&mut inner);
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                self.push_sample(&mut inner, true);

                if inner.consecutive_failures >= self.consecutive_limit {
                    warn!(
                        "Service '{}' failed {} consecutive calls",
                        self.service, inner.consecutive_failures
                    );
                    self.trip(&mut inner);
                } else if self.failure_rate_exceeded(&inner) {
                    warn!(
                        "Service '{}' failure rate exceeded {:.0}% over the last {:?}",
                        self.service,
                        self.failure_threshold * 100.0,
                        self.sampling_duration
                    );
                    self.trip(&mut inner);
                }
            }
            _ => {}
        }
    }

    fn release_probe(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    fn push_sample(&self, inner: &mut BreakerState, failed: bool) {
        let now = Instant::now();
        while let Some((at, _)) = inner.window.front() {
            if now.duration_since(*at) > self.sampling_duration {
                inner.window.pop_front();
            } else {
                break;
            }
        }
        inner.window.push_back((now, failed));
    }

    fn failure_rate_exceeded(&self, inner: &BreakerState) -> bool {
        let total = inner.window.len();
        if total < self.minimum_throughput as usize {
            return false;
        }
        let failures = inner.window.iter().filter(|(_, failed)| *failed).count();
        failures as f64 / total as f64 >= self.failure_threshold
    }

    fn trip(&self, inner: &mut BreakerState) {
        inner.opened_at = Some(Instant::now());
        inner.trips += 1;
        inner.consecutive_failures = 0;
        inner.window.clear();
        self.transition(inner, CircuitState::Open);
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;

        METRICS
            .circuitbreaker_state_changes_total()
            .with_label_values(&[&self.service, from.as_str(), to.as_str()])
            .inc();

        match to {
            CircuitState::Open => warn!(
                "Circuit breaker opened for service '{}' for {:?}",
                self.service, self.open_duration
            ),
            CircuitState::HalfOpen => {
                info!("Circuit breaker half-opened for service '{}'", self.service)
            }
            CircuitState::Closed => {
                info!("Circuit breaker closed for service '{}'", self.service)
            }
        }
    }
}

/// 熔断器调用许可
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    probe: bool,
    completed: bool,
    // 最近一次完成的尝试是否为健康失败
    last_attempt_failed: AtomicBool,
}

impl CallPermit {
    /// 是否为半开状态下的探测调用
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self) {
        self.completed = true;
        self.breaker.on_success(self.probe);
    }

    pub fn record_failure(mut self) {
        self.completed = true;
        self.breaker.on_failure(self.probe);
    }

    /// 记录单次尝试的结果
    ///
    /// 不产生状态转换。调用在报告结果前被截止时间取消时，
    /// 析构会依据最近一次尝试计为失败。
    pub fn observe<T>(&self, result: &Result<T, CallError>) {
        let failed = matches!(result, Err(e) if e.is_breaker_failure());
        self.last_attempt_failed.store(failed, Ordering::Relaxed);
    }

    /// 根据调用结果报告
    ///
    /// 下游返回的客户端错误说明服务可达，计为成功；
    /// 认证、序列化等本地错误不影响熔断器。
    pub fn record<T>(self, result: &Result<T, CallError>) {
        match result {
            Ok(_) => self.record_success(),
            Err(e) if e.is_breaker_failure() => self.record_failure(),
            Err(e) if e.status().is_some() => self.record_success(),
            Err(_) => {}
        }
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if self.last_attempt_failed.load(Ordering::Relaxed) {
            debug!(
                "Call to service '{}' abandoned after a failed attempt, counting as failure",
                self.breaker.service
            );
            self.breaker.on_failure(self.probe);
        } else if self.probe {
            self.breaker.release_probe();
        }
    }
}

/// 熔断器快照
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub service: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub trips: u64,
}

/// 按服务划分的熔断器集合
pub struct BreakerRegistry {
    config: Arc<Config>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// 获取服务的熔断器，不存在时按配置创建
    pub fn get_or_create(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.get(service) {
            return Arc::clone(breaker.value());
        }
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                CircuitBreaker::new(service, self.config.breaker_config_for(service))
            })
            .clone()
    }

    /// 服务的熔断器状态，未调用过的服务返回 None
    pub fn state(&self, service: &str) -> Option<CircuitState> {
        self.breakers.get(service).map(|b| b.state())
    }

    /// 服务的累计熔断次数
    pub fn trips(&self, service: &str) -> u64 {
        self.breakers.get(service).map(|b| b.trips()).unwrap_or(0)
    }

    /// 所有熔断器的快照，按服务名排序
    pub fn snapshot(&self) -> Vec<CircuitSnapshot> {
        let mut snapshots: Vec<CircuitSnapshot> = self
            .breakers
            .iter()
            .map(|entry| {
                let breaker = entry.value();
                CircuitSnapshot {
                    service: entry.key().clone(),
                    state: breaker.state(),
                    consecutive_failures: breaker.consecutive_failures(),
                    trips: breaker.trips(),
                }
            })
            .collect();
        snapshots.sort_by(|a, b| a.service.cmp(&b.service));
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(consecutive: u32, threshold: f64, throughput: u32) -> BreakerConfig {
        BreakerConfig {
            consecutive_failures: consecutive,
            open_duration: 30,
            call_timeout: 1_000,
            failure_threshold: threshold,
            minimum_throughput: throughput,
            sampling_duration: 60,
        }
    }

    fn fail(breaker: &Arc<CircuitBreaker>, times: usize) {
        for _ in 0..times {
            breaker.try_acquire().unwrap().record_failure();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new("userservice", &config(5, 1.0, 100));

        fail(&breaker, 4);
        assert_eq!(breaker.state(), CircuitState::Closed);
        fail(&breaker, 1);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.trips(), 1);

        assert!(matches!(
            breaker.try_acquire(),
            Err(CallError::CircuitOpen { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_count() {
        let breaker = CircuitBreaker::new("userservice", &config(3, 1.0, 100));
        fail(&breaker, 2);
        breaker.try_acquire().unwrap().record_success();
        fail(&breaker, 2);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_rate_requires_minimum_throughput() {
        let breaker = CircuitBreaker::new("userservice", &config(100, 0.5, 10));

        // 4 次失败 + 4 次成功：未达到最小吞吐量
        for _ in 0..4 {
            breaker.try_acquire().unwrap().record_failure();
            breaker.try_acquire().unwrap().record_success();
        }
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.try_acquire().unwrap().record_success();
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_success_closes() {
        let breaker = CircuitBreaker::new("userservice", &config(1, 1.0, 100));
        fail(&breaker, 1);
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let probe = breaker.try_acquire().unwrap();
        assert!(probe.is_probe());
        // 探测进行中，其他调用被拒绝
        assert!(breaker.try_acquire().is_err());

        probe.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_failure_reopens_with_fresh_timer() {
        let breaker = CircuitBreaker::new("userservice", &config(1, 1.0, 100));
        fail(&breaker, 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.trips(), 2);

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_probe_releases_slot() {
        let breaker = CircuitBreaker::new("userservice", &config(1, 1.0, 100));
        fail(&breaker, 1);
        tokio::time::advance(Duration::from_secs(31)).await;

        let probe = breaker.try_acquire().unwrap();
        drop(probe);

        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.try_acquire().unwrap().is_probe());
    }

    fn timed_out() -> Result<(), CallError> {
        Err(CallError::Transport {
            service: "userservice".to_string(),
            kind: crate::error::FailureKind::Timeout,
            message: "call timed out".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_call_after_timeout_counts_as_failure() {
        let breaker = CircuitBreaker::new("userservice", &config(2, 1.0, 100));

        for _ in 0..2 {
            let permit = breaker.try_acquire().unwrap();
            permit.observe(&timed_out());
            drop(permit);
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.trips(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_call_after_recovery_is_neutral() {
        let breaker = CircuitBreaker::new("userservice", &config(1, 1.0, 100));

        let permit = breaker.try_acquire().unwrap();
        permit.observe(&timed_out());
        permit.observe(&Ok::<(), CallError>(()));
        drop(permit);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_probe_after_timeout_reopens() {
        let breaker = CircuitBreaker::new("userservice", &config(1, 1.0, 100));
        fail(&breaker, 1);
        tokio::time::advance(Duration::from_secs(31)).await;

        let probe = breaker.try_acquire().unwrap();
        assert!(probe.is_probe());
        probe.observe(&timed_out());
        drop(probe);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.trips(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_do_not_trip() {
        let breaker = CircuitBreaker::new("userservice", &config(2, 1.0, 100));
        for _ in 0..5 {
            let result: Result<(), CallError> = Err(CallError::UpstreamStatus {
                service: "userservice".to_string(),
                status: 404,
                body: String::new(),
            });
            breaker.try_acquire().unwrap().record(&result);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_uses_service_overrides() {
        let mut config = Config::default();
        config.services.insert(
            "fragile".to_string(),
            crate::config::ServiceConfig {
                circuit_breaker: Some(self::config(1, 1.0, 100)),
                ..Default::default()
            },
        );
        let registry = BreakerRegistry::new(Arc::new(config));

        fail(&registry.get_or_create("fragile"), 1);
        fail(&registry.get_or_create("sturdy"), 1);

        assert_eq!(registry.state("fragile"), Some(CircuitState::Open));
        assert_eq!(registry.state("sturdy"), Some(CircuitState::Closed));
        assert_eq!(registry.state("unknown"), None);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].service, "fragile");
        assert_eq!(snapshot[0].trips, 1);
    }
}
