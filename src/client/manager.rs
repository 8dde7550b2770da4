use crate::{
    breaker::{BreakerRegistry, CircuitSnapshot, CircuitState},
    bulkhead::BulkheadRegistry,
    cache::{CacheKey, ResponseCache},
    client::{
        apply_header_ops, CallDescriptor, CommunicationManagerBuilder, Credential,
        ServiceResponse, Transport, TransportRequest,
    },
    config::Config,
    dedup::Deduplicator,
    error::{AppError, CallError, FailureKind},
    m2m::{CredentialProvider, TokenManager},
    metrics::{
        CallOutcome, CallRecorder, GlobalMetricsSummary, ServiceMetricsSnapshot, METRICS,
    },
    r#const::{http_headers, outcome_labels},
    retry::RetryPolicy,
};
use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, warn};
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_64;

/// 服务间通信管理器
///
/// 一次调用依次经过请求合并、响应缓存、隔板、熔断器、凭据和重试。
/// 克隆开销很小，所有克隆共享同一组组件。
#[derive(Clone)]
pub struct CommunicationManager {
    inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) config: Arc<Config>,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) breakers: BreakerRegistry,
    pub(super) bulkheads: BulkheadRegistry,
    pub(super) cache: ResponseCache,
    pub(super) dedup: Deduplicator<ServiceResponse>,
    pub(super) credentials: Arc<dyn CredentialProvider>,
    pub(super) token_manager: Option<Arc<TokenManager>>,
    pub(super) recorder: Arc<dyn CallRecorder>,
    pub(super) default_retry: RetryPolicy,
    pub(super) service_retry: HashMap<String, RetryPolicy>,
}

impl CommunicationManager {
    /// 按配置创建
    pub fn new(config: Config) -> Result<Self, AppError> {
        CommunicationManagerBuilder::new(config).build()
    }

    pub fn builder(config: Config) -> CommunicationManagerBuilder {
        CommunicationManagerBuilder::new(config)
    }

    pub(super) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// M2M 开启时返回令牌管理器，供后台刷新使用
    pub fn token_manager(&self) -> Option<Arc<TokenManager>> {
        self.inner.token_manager.clone()
    }

    /// GET 调用并反序列化响应
    pub async fn get<T: DeserializeOwned>(
        &self,
        service: &str,
        endpoint: &str,
        headers: Option<HeaderMap>,
    ) -> Result<T, CallError> {
        let mut descriptor = CallDescriptor::get(service, endpoint);
        if let Some(headers) = headers {
            descriptor = descriptor.headers(headers);
        }
        self.execute(descriptor).await?.json()
    }

    /// POST JSON 请求体并反序列化响应
    pub async fn send<TReq, TResp>(
        &self,
        service: &str,
        endpoint: &str,
        body: &TReq,
        headers: Option<HeaderMap>,
    ) -> Result<TResp, CallError>
    where
        TReq: Serialize + ?Sized,
        TResp: DeserializeOwned,
    {
        self.send_with_method(Method::POST, service, endpoint, Some(body), headers)
            .await
    }

    /// 以指定方法发送 (PUT/PATCH/DELETE 等)
    pub async fn send_with_method<TReq, TResp>(
        &self,
        method: Method,
        service: &str,
        endpoint: &str,
        body: Option<&TReq>,
        headers: Option<HeaderMap>,
    ) -> Result<TResp, CallError>
    where
        TReq: Serialize + ?Sized,
        TResp: DeserializeOwned,
    {
        let mut descriptor = CallDescriptor::new(service, method, endpoint);
        if let Some(body) = body {
            descriptor = descriptor.json(body)?;
        }
        if let Some(headers) = headers {
            descriptor = descriptor.headers(headers);
        }
        self.execute(descriptor).await?.json()
    }

    /// 执行调用，返回原始响应
    ///
    /// 非 2xx 响应以 [`CallError::UpstreamStatus`] 返回。
    pub async fn execute(&self, descriptor: CallDescriptor) -> Result<ServiceResponse, CallError> {
        let service = descriptor.service().to_string();
        let call_timeout = descriptor
            .call_timeout()
            .unwrap_or_else(|| self.inner.config.timeout_for(&service));
        let deadline = Instant::now() + call_timeout;
        let key = CacheKey::new(&service, descriptor.endpoint());

        if !descriptor.should_deduplicate() {
            return self.inner.call(&descriptor, &key, deadline).await;
        }

        let started = Instant::now();
        let endpoint = descriptor.endpoint().to_string();
        let group = dedup_key(&descriptor, &key);
        let inner = Arc::clone(&self.inner);
        let shared = timeout_at(
            deadline,
            self.inner.dedup.run(&service, &group, move || async move {
                inner.call(&descriptor, &key, deadline).await
            }),
        )
        .await;

        match shared {
            Ok(shared) => {
                // 首个调用者的统计由执行方记录
                if shared.joined {
                    self.inner.record(
                        &service,
                        &endpoint,
                        &shared.result,
                        0,
                        started.elapsed(),
                        true,
                    );
                }
                shared.result
            }
            Err(_) => {
                debug!(
                    "Deadline of {:?} exceeded while waiting for '{}'",
                    call_timeout, group
                );
                Err(CallError::DeadlineExceeded { service })
            }
        }
    }

    /// 按精确键删除缓存
    pub async fn invalidate_key(&self, key: &str) -> bool {
        self.inner.cache.invalidate_key(key).await
    }

    /// 按通配符删除缓存
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, AppError> {
        self.inner.cache.invalidate_pattern(pattern).await
    }

    /// 按正则删除缓存
    pub async fn invalidate_regex(&self, pattern: &str) -> Result<usize, AppError> {
        self.inner.cache.invalidate_regex(pattern).await
    }

    /// 单个服务的统计快照
    pub fn service_metrics(&self, service: &str) -> Option<ServiceMetricsSnapshot> {
        let mut snapshot = self.inner.recorder.service_snapshot(service)?;
        snapshot.circuit_state = self
            .inner
            .breakers
            .state(service)
            .map(|state| state.as_str().to_string());
        snapshot.circuit_trips = self.inner.breakers.trips(service);
        Some(snapshot)
    }

    /// 所有服务的统计快照，按服务名排序
    pub fn all_service_metrics(&self) -> Vec<ServiceMetricsSnapshot> {
        let mut services = self.inner.recorder.services();
        services.sort();
        services
            .iter()
            .filter_map(|service| self.service_metrics(service))
            .collect()
    }

    /// 全局汇总
    pub fn metrics_summary(&self) -> GlobalMetricsSummary {
        GlobalMetricsSummary::from_snapshots(&self.all_service_metrics())
    }

    /// 服务的熔断器状态，未调用过的服务返回 None
    pub fn circuit_state(&self, service: &str) -> Option<CircuitState> {
        self.inner.breakers.state(service)
    }

    /// 所有熔断器快照
    pub fn circuits(&self) -> Vec<CircuitSnapshot> {
        self.inner.breakers.snapshot()
    }
}

impl Inner {
    // 执行一次完整调用并记录统计
    async fn call(
        &self,
        descriptor: &CallDescriptor,
        key: &CacheKey,
        deadline: Instant,
    ) -> Result<ServiceResponse, CallError> {
        let started = Instant::now();
        let retries = AtomicU32::new(0);

        let result = match timeout_at(deadline, self.dispatch(descriptor, key, &retries)).await {
            Ok(result) => result,
            Err(_) => Err(CallError::DeadlineExceeded {
                service: descriptor.service().to_string(),
            }),
        };

        self.record(
            descriptor.service(),
            descriptor.endpoint(),
            &result,
            retries.load(Ordering::Relaxed),
            started.elapsed(),
            false,
        );
        result
    }

    async fn dispatch(
        &self,
        descriptor: &CallDescriptor,
        key: &CacheKey,
        retries: &AtomicU32,
    ) -> Result<ServiceResponse, CallError> {
        let service = descriptor.service();
        let cacheable = descriptor.is_read() && self.cache.is_cacheable(key, descriptor.method());

        if cacheable {
            if let Some(response) = self.cache.lookup(key).await {
                return into_result(response);
            }
        }

        // 持有到调用结束
        let bulkhead = self.bulkheads.get_or_create(service);
        let _slot = bulkhead.acquire().await?;

        let breaker = self.breakers.get_or_create(service);
        let permit = breaker.try_acquire()?;

        let credential = self.credential_for(service).await?;
        let request = self.build_request(descriptor, credential, breaker.call_timeout());

        let observer = &permit;
        let attempted = self
            .retry_policy_for(service)
            .execute(service, |attempt| {
                retries.store(attempt - 1, Ordering::Relaxed);
                let request = request.clone();
                async move {
                    let result = self.attempt(service, request).await;
                    observer.observe(&result);
                    result
                }
            })
            .await;
        permit.record(&attempted.result);
        let result = attempted.result;

        match &result {
            Ok(response) if cacheable => {
                self.cache.store(key, response).await;
            }
            Err(CallError::UpstreamStatus { status, body, .. }) if cacheable => {
                // 仅在策略允许缓存非成功响应时写入
                let response = ServiceResponse {
                    service: service.to_string(),
                    status: *status,
                    headers: HeaderMap::new(),
                    body: Bytes::from(body.clone()),
                    from_cache: false,
                };
                self.cache.store(key, &response).await;
            }
            Ok(_) if !descriptor.is_read() => {
                self.cache
                    .invalidate_prefix(service, descriptor.endpoint())
                    .await;
            }
            _ => {}
        }

        result
    }

    // 单次传输尝试
    async fn attempt(
        &self,
        service: &str,
        request: TransportRequest,
    ) -> Result<ServiceResponse, CallError> {
        let attempt_timeout = request.timeout;
        let bearer = match &request.credential {
            Some(Credential::Bearer(token)) => Some(token.clone()),
            _ => None,
        };

        let response = match timeout(attempt_timeout, self.transport.send(service, request)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(CallError::Transport {
                    service: service.to_string(),
                    kind: FailureKind::Timeout,
                    message: format!("call timed out after {:?}", attempt_timeout),
                })
            }
        };

        if response.is_success() {
            return Ok(response);
        }

        // 令牌被拒绝后不再复用
        if response.status == 401 {
            if let Some(token) = bearer {
                self.credentials.invalidate(&token);
            }
        }

        Err(CallError::UpstreamStatus {
            service: service.to_string(),
            status: response.status,
            body: response.text(),
        })
    }

    // 优先使用 M2M 令牌，失败时回退到静态认证
    async fn credential_for(&self, service: &str) -> Result<Option<Credential>, CallError> {
        let overrides = self.config.service(service);
        let static_auth = overrides
            .and_then(|s| s.auth.as_ref())
            .and_then(Credential::from_auth);

        if !overrides.map_or(true, |s| s.use_m2m) {
            return Ok(static_auth);
        }

        match self.credentials.token(service).await {
            Ok(Some(token)) => Ok(Some(Credential::Bearer(token))),
            Ok(None) => Ok(static_auth),
            Err(e) => match static_auth {
                Some(credential) => {
                    warn!(
                        "M2M token unavailable for service '{}', falling back to static credentials: {}",
                        service, e
                    );
                    Ok(Some(credential))
                }
                None => Err(e),
            },
        }
    }

    fn build_request(
        &self,
        descriptor: &CallDescriptor,
        credential: Option<Credential>,
        attempt_timeout: Duration,
    ) -> TransportRequest {
        let service = descriptor.service();
        let mut headers = descriptor.request_headers().clone();

        if let Some(overrides) = self.config.service(service) {
            apply_header_ops(&mut headers, &overrides.headers);
        }

        // 沿用调用方的关联 ID
        let correlation = HeaderName::from_static(http_headers::CORRELATION_ID);
        if !headers.contains_key(&correlation) {
            if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
                headers.insert(correlation, value);
            }
        }

        TransportRequest {
            method: descriptor.method().clone(),
            url: format!(
                "{}{}",
                self.config.base_url_for(service),
                descriptor.endpoint()
            ),
            headers,
            body: descriptor.request_body().cloned(),
            credential,
            timeout: attempt_timeout,
        }
    }

    fn retry_policy_for(&self, service: &str) -> &RetryPolicy {
        self.service_retry
            .get(service)
            .unwrap_or(&self.default_retry)
    }

    // 记录调用结果
    fn record(
        &self,
        service: &str,
        endpoint: &str,
        result: &Result<ServiceResponse, CallError>,
        retries: u32,
        latency: Duration,
        joined: bool,
    ) {
        let outcome = match result {
            Ok(response) if response.from_cache => CallOutcome::Cached,
            Ok(_) => CallOutcome::Success,
            Err(e) => CallOutcome::Failure(e.label()),
        };

        let label = match outcome {
            _ if joined => outcome_labels::DEDUPLICATED,
            CallOutcome::Success => outcome_labels::SUCCESS,
            CallOutcome::Cached => outcome_labels::CACHED,
            CallOutcome::Failure(_) => outcome_labels::FAILURE,
        };
        METRICS
            .calls_total()
            .with_label_values(&[service, label])
            .inc();
        METRICS
            .call_duration_seconds()
            .with_label_values(&[service])
            .observe(latency.as_secs_f64());

        if let Err(e) = result {
            METRICS
                .call_errors_total()
                .with_label_values(&[service, e.label()])
                .inc();
            match e {
                CallError::CircuitOpen { .. } | CallError::BulkheadRejected { .. } => {
                    debug!("Call to {}{} rejected: {}", service, endpoint, e);
                }
                _ => error!("Call to {}{} failed: {}", service, endpoint, e),
            }
        }

        self.recorder
            .record_call(service, endpoint, outcome, latency, retries);
    }
}

// 缓存命中的非成功响应仍按失败返回
fn into_result(response: ServiceResponse) -> Result<ServiceResponse, CallError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(CallError::UpstreamStatus {
            service: response.service.clone(),
            status: response.status,
            body: response.text(),
        })
    }
}

// 读请求与缓存键一致，写请求附加方法和请求体摘要
fn dedup_key(descriptor: &CallDescriptor, key: &CacheKey) -> String {
    if *descriptor.method() == Method::GET {
        return key.as_str().to_string();
    }
    let digest = descriptor.request_body().map_or(0, |body| xxh3_64(body));
    format!("{}:{}:{:016x}", descriptor.method(), key.as_str(), digest)
}
