use crate::{
    config::{BackoffStrategy, RetryConfig},
    error::{CallError, FailureKind},
    metrics::METRICS,
};
use rand::Rng;
use std::{future::Future, time::Duration};
use tracing::{debug, warn};

/// 带重试的执行结果
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, CallError>,
    // 实际发起的尝试次数（含首次调用）
    pub attempts: u32,
}

impl<T> Attempted<T> {
    /// 重试次数（不含首次调用）
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// 重试策略
///
/// 由 [`RetryConfig`] 构建，负责计算退避间隔、判断错误是否可重试，
/// 并按顺序执行多次尝试。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    strategy: BackoffStrategy,
    initial_delay: Duration,
    max_delay: Duration,
    retryable_status_codes: Vec<u16>,
    retryable_failures: Vec<FailureKind>,
    use_jitter: bool,
    jitter_factor: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_retries + 1,
            strategy: config.backoff_strategy,
            initial_delay: Duration::from_millis(config.initial_delay),
            max_delay: Duration::from_millis(config.max_delay),
            retryable_status_codes: config.retryable_status_codes.clone(),
            retryable_failures: config.retryable_failures.clone(),
            use_jitter: config.use_jitter,
            jitter_factor: config.jitter_factor,
        }
    }

    /// 最大尝试次数（含首次调用）
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 判断错误是否可以重试
    pub fn is_retryable(&self, err: &CallError) -> bool {
        match err {
            CallError::Transport { kind, .. } => self.retryable_failures.contains(kind),
            CallError::UpstreamStatus { status, .. } => {
                self.retryable_status_codes.contains(status)
            }
            _ => false,
        }
    }

    /// 计算第 `retry` 次重试前的等待时间（从 1 开始计数）
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let n = retry.max(1);
        let initial = self.initial_delay.as_millis() as f64;

        let base = match self.strategy {
            BackoffStrategy::Linear => initial * n as f64,
            BackoffStrategy::Exponential | BackoffStrategy::ExponentialJitter => {
                // 指数上限防止溢出，之后总会被 max_delay 截断
                initial * 2f64.powi((n - 1).min(62) as i32)
            }
            BackoffStrategy::Fibonacci => initial * fibonacci(n) as f64,
        };

        let max = self.max_delay.as_millis() as f64;
        let mut delay = base.min(max);

        if self.use_jitter || self.strategy == BackoffStrategy::ExponentialJitter {
            delay = self.apply_jitter(delay).min(max);
        }

        Duration::from_millis(delay.max(0.0) as u64)
    }

    // 在 [1-f, 1+f] 范围内随机缩放
    fn apply_jitter(&self, delay: f64) -> f64 {
        let factor = self.jitter_factor.clamp(0.0, 1.0);
        if factor == 0.0 {
            return delay;
        }
        let offset = rand::thread_rng().gen_range(-factor..=factor);
        delay * (1.0 + offset)
    }

    /// 按策略执行操作
    ///
    /// `op` 接收当前尝试序号（从 1 开始）。尝试严格串行，
    /// 可重试错误在用尽所有尝试后包装为 [`CallError::RetryExhausted`]。
    pub async fn execute<F, Fut, T>(&self, service: &str, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let mut attempt = 1;

        loop {
            let err = match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            "Call to service '{}' succeeded on attempt {}/{}",
                            service, attempt, self.max_attempts
                        );
                    }
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) => err,
            };

            if !self.is_retryable(&err) {
                return Attempted {
                    result: Err(err),
                    attempts: attempt,
                };
            }

            if attempt >= self.max_attempts {
                // 未配置重试时直接返回原始错误
                let result = if self.max_attempts > 1 {
                    warn!(
                        "Retries exhausted for service '{}' after {} attempts: {}",
                        service, attempt, err
                    );
                    Err(CallError::RetryExhausted {
                        service: service.to_string(),
                        attempts: attempt,
                        last: Box::new(err),
                    })
                } else {
                    Err(err)
                };
                return Attempted {
                    result,
                    attempts: attempt,
                };
            }

            let delay = self.delay_for_retry(attempt);
            debug!(
                "Attempt {}/{} to service '{}' failed ({}), retrying in {:?}",
                attempt, self.max_attempts, service, err, delay
            );
            METRICS.retries_total().with_label_values(&[service]).inc();

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

// fib(1) = fib(2) = 1
fn fibonacci(n: u32) -> u64 {
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n.min(90) {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    a
}
