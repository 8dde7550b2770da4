use crate::{config::BulkheadConfig, error::CallError, metrics::METRICS};
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// 单个服务的隔板
///
/// 并行上限由信号量控制，超出上限的调用最多排队 `max_queued` 个，
/// 队列也满时立即拒绝。
pub struct Bulkhead {
    service: String,
    limit: usize,
    max_queued: usize,
    semaphore: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
}

/// 隔板占用许可，析构时释放名额
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    service: String,
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        METRICS
            .bulkhead_in_flight()
            .with_label_values(&[&self.service])
            .dec();
    }
}

// 排队位置，等待被取消时同样释放
struct QueueSlot(Arc<AtomicUsize>);

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Bulkhead {
    pub fn new(service: impl Into<String>, limit: usize, max_queued: usize) -> Self {
        Self {
            service: service.into(),
            limit,
            max_queued,
            semaphore: Arc::new(Semaphore::new(limit)),
            queued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 并行上限
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 当前可用名额
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 当前排队数
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// 获取调用名额，必要时排队等待
    pub async fn acquire(&self) -> Result<BulkheadPermit, CallError> {
        if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
            return Ok(self.wrap(permit));
        }

        // 占用排队位置
        let max_queued = self.max_queued;
        let reserved = self
            .queued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < max_queued).then_some(current + 1)
            });
        if reserved.is_err() {
            METRICS
                .bulkhead_rejected_total()
                .with_label_values(&[&self.service])
                .inc();
            debug!(
                "Bulkhead for service '{}' is full ({} running, {} queued)",
                self.service, self.limit, self.max_queued
            );
            return Err(CallError::BulkheadRejected {
                service: self.service.clone(),
            });
        }
        let _slot = QueueSlot(Arc::clone(&self.queued));

        // 信号量不会被关闭
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| CallError::BulkheadRejected {
                service: self.service.clone(),
            })?;

        Ok(self.wrap(permit))
    }

    fn wrap(&self, permit: OwnedSemaphorePermit) -> BulkheadPermit {
        METRICS
            .bulkhead_in_flight()
            .with_label_values(&[&self.service])
            .inc();
        BulkheadPermit {
            _permit: permit,
            service: self.service.clone(),
        }
    }
}

/// 按服务划分的隔板集合
pub struct BulkheadRegistry {
    config: BulkheadConfig,
    bulkheads: DashMap<String, Arc<Bulkhead>>,
}

impl BulkheadRegistry {
    pub fn new(config: BulkheadConfig) -> Self {
        Self {
            config,
            bulkheads: DashMap::new(),
        }
    }

    /// 获取服务的隔板，不存在时按配置创建
    pub fn get_or_create(&self, service: &str) -> Arc<Bulkhead> {
        if let Some(bulkhead) = self.bulkheads.get(service) {
            return Arc::clone(bulkhead.value());
        }
        self.bulkheads
            .entry(service.to_string())
            .or_insert_with(|| {
                Arc::new(Bulkhead::new(
                    service,
                    self.config.limit_for(service),
                    self.config.max_queued_requests,
                ))
            })
            .clone()
    }
}
