use crate::{
    error::{CallError, FailureKind},
    metrics::METRICS,
};
use parking_lot::Mutex;
use std::{collections::HashMap, future::Future, sync::Arc};
use tokio::sync::watch;
use tracing::debug;

type Slot<T> = watch::Receiver<Option<Result<T, CallError>>>;
type InFlight<T> = Arc<Mutex<HashMap<String, Slot<T>>>>;

/// 合并结果
pub struct Shared<T> {
    pub result: Result<T, CallError>,
    // 是否加入了已有的调用
    pub joined: bool,
}

/// 进行中请求合并器
///
/// 同一键的并发调用只执行一次。首个调用者的执行放在独立任务中，
/// 即使它被取消，其他等待者仍能拿到结果。
pub struct Deduplicator<T> {
    inflight: InFlight<T>,
}

impl<T> Default for Deduplicator<T> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

// 任务结束（包括 panic）时移除分组
struct GroupGuard<T> {
    inflight: InFlight<T>,
    key: String,
}

impl<T> Drop for GroupGuard<T> {
    fn drop(&mut self) {
        self.inflight.lock().remove(&self.key);
    }
}

impl<T> Deduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前进行中的分组数
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }

    /// 执行或加入 `key` 对应的调用
    ///
    /// 只有首个调用者的 `make` 会被调用。加入者收到的失败包装为
    /// [`CallError::Deduplication`]。
    pub async fn run<F, Fut>(&self, service: &str, key: &str, make: F) -> Shared<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CallError>> + Send + 'static,
    {
        let (mut rx, joined) = {
            let mut inflight = self.inflight.lock();
            match inflight.get(key) {
                Some(rx) => (rx.clone(), true),
                None => {
                    let (tx, rx) = watch::channel(None);
                    inflight.insert(key.to_string(), rx.clone());

                    let guard = GroupGuard {
                        inflight: Arc::clone(&self.inflight),
                        key: key.to_string(),
                    };
                    let fut = make();
                    tokio::spawn(async move {
                        let result = fut.await;
                        // 先移除分组再发布结果
                        drop(guard);
                        let _ = tx.send(Some(result));
                    });
                    (rx, false)
                }
            }
        };

        if joined {
            debug!("Joined in-flight call '{}'", key);
            METRICS
                .deduplicated_total()
                .with_label_values(&[service])
                .inc();
        }

        let result = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone().unwrap_or_else(|| Err(aborted(service))),
            Err(_) => Err(aborted(service)),
        };

        let result = match result {
            Err(source) if joined => Err(CallError::Deduplication {
                key: key.to_string(),
                source: Box::new(source),
            }),
            other => other,
        };

        Shared { result, joined }
    }
}

// 共享执行异常终止
fn aborted(service: &str) -> CallError {
    CallError::Transport {
        service: service.to_string(),
        kind: FailureKind::Request,
        message: "shared in-flight call was aborted".to_string(),
    }
}
