use crate::{
    config::M2mConfig,
    error::{AppError, CallError},
    metrics::METRICS,
    r#const::{m2m_limits, token_labels},
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::Instant;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemHandle};
use tracing::{debug, info, warn};

/// 凭据提供者
///
/// M2M 关闭时使用 [`NoopCredentialProvider`]，调用只带静态认证。
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// 获取调用 `service` 时附加的 Bearer 令牌
    async fn token(&self, service: &str) -> Result<Option<String>, CallError>;

    /// 令牌被下游拒绝 (401) 后作废
    fn invalidate(&self, token: &str);
}

/// 空凭据提供者
pub struct NoopCredentialProvider;

#[async_trait]
impl CredentialProvider for NoopCredentialProvider {
    async fn token(&self, _service: &str) -> Result<Option<String>, CallError> {
        Ok(None)
    }

    fn invalidate(&self, _token: &str) {}
}

/// M2M 访问令牌
#[derive(Debug, Clone)]
pub struct M2mToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Instant,
    pub scopes: Vec<String>,
}

impl M2mToken {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    // 距离过期不足 `window` 时需要刷新
    fn needs_refresh(&self, window: Duration) -> bool {
        Instant::now() + window >= self.expires_at
    }
}

// 令牌端点响应
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Default)]
struct TokenSlot {
    token: RwLock<Option<M2mToken>>,
    // 同一身份同时只有一个刷新
    refresh: tokio::sync::Mutex<()>,
    // 已完成的刷新次数
    generation: AtomicU64,
    // 最近一次刷新失败的原因，成功后清空
    last_failure: RwLock<Option<String>>,
}

impl TokenSlot {
    fn fresh(&self, window: Duration) -> Option<String> {
        self.token
            .read()
            .as_ref()
            .filter(|t| !t.needs_refresh(window))
            .map(|t| t.access_token.clone())
    }

    fn unexpired(&self) -> Option<String> {
        self.token
            .read()
            .as_ref()
            .filter(|t| !t.is_expired())
            .map(|t| t.access_token.clone())
    }
}

/// 客户端凭据令牌管理器
pub struct TokenManager {
    config: M2mConfig,
    client: reqwest::Client,
    refresh_window: Duration,
    slots: DashMap<String, Arc<TokenSlot>>,
}

impl TokenManager {
    pub fn new(config: M2mConfig, client: reqwest::Client) -> Self {
        info!(
            "M2M token manager enabled for client '{}' via {}",
            config.client_id, config.token_endpoint
        );
        Self {
            refresh_window: Duration::from_secs(config.refresh_before_expiry),
            config,
            client,
            slots: DashMap::new(),
        }
    }

    fn slot(&self) -> Arc<TokenSlot> {
        self.slots
            .entry(self.config.client_id.clone())
            .or_default()
            .clone()
    }

    /// 当前缓存的令牌
    pub fn current(&self) -> Option<M2mToken> {
        self.slots
            .get(&self.config.client_id)
            .and_then(|slot| {
                let token = slot.token.read().clone();
                token
            })
    }

    /// 获取有效令牌，进入刷新窗口时刷新
    ///
    /// 刷新失败时依次使用尚未过期的旧令牌和 `fallbackToken`，
    /// 都没有时返回认证错误。
    pub async fn access_token(&self, service: &str) -> Result<String, CallError> {
        let slot = self.slot();
        if let Some(token) = slot.fresh(self.refresh_window) {
            return Ok(token);
        }

        let seen = slot.generation.load(Ordering::Acquire);
        let _guard = slot.refresh.lock().await;
        // 等待期间可能已被其他调用刷新
        if let Some(token) = slot.fresh(self.refresh_window) {
            return Ok(token);
        }

        // 等待期间完成的刷新失败了，沿用它的结果
        if slot.generation.load(Ordering::Acquire) != seen {
            let failure = slot.last_failure.read().clone();
            if let Some(message) = failure {
                debug!("Sharing the outcome of a failed M2M token refresh: {}", message);
                return self.refresh_failed(&slot, service, message);
            }
        }

        let outcome = self.exchange().await;
        let result = match outcome {
            Ok(token) => {
                let access_token = token.access_token.clone();
                *slot.token.write() = Some(token);
                *slot.last_failure.write() = None;
                METRICS
                    .token_refresh_total()
                    .with_label_values(&[&self.config.client_id, token_labels::REFRESHED])
                    .inc();
                Ok(access_token)
            }
            Err(message) => {
                METRICS
                    .token_refresh_total()
                    .with_label_values(&[&self.config.client_id, token_labels::FAILED])
                    .inc();
                *slot.last_failure.write() = Some(message.clone());
                self.refresh_failed(&slot, service, message)
            }
        };
        slot.generation.fetch_add(1, Ordering::Release);
        result
    }

    // 刷新失败：依次尝试未过期的旧令牌和回退令牌
    fn refresh_failed(
        &self,
        slot: &TokenSlot,
        service: &str,
        message: String,
    ) -> Result<String, CallError> {
        if let Some(token) = slot.unexpired() {
            warn!(
                "M2M token refresh failed ({}), reusing the current token until it expires",
                message
            );
            return Ok(token);
        }

        if let Some(fallback) = &self.config.fallback_token {
            warn!(
                "M2M token refresh failed ({}), using the configured fallback token",
                message
            );
            METRICS
                .token_refresh_total()
                .with_label_values(&[&self.config.client_id, token_labels::FALLBACK])
                .inc();
            return Ok(fallback.clone());
        }

        Err(CallError::Authentication {
            service: service.to_string(),
            message,
        })
    }

    /// 后台刷新：只在令牌缺失或进入刷新窗口时交换
    pub async fn refresh_if_needed(&self) -> Result<(), CallError> {
        self.access_token("m2m").await.map(|_| ())
    }

    // 客户端凭据交换
    async fn exchange(&self) -> Result<M2mToken, String> {
        let scope = self.config.scopes.join(" ");
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }

        debug!("Requesting M2M token from {}", self.config.token_endpoint);
        let response = self
            .client
            .post(&self.config.token_endpoint)
            .timeout(Duration::from_secs(m2m_limits::TOKEN_REQUEST_TIMEOUT))
            .form(&form)
            .send()
            .await
            .map_err(|e| format!("token request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("token endpoint responded with status {}", status));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid token response: {}", e))?;

        let lifetime = body.expires_in.unwrap_or(self.config.token_lifetime);
        let scopes = match body.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => self.config.scopes.clone(),
        };

        debug!("Obtained M2M token valid for {}s", lifetime);
        Ok(M2mToken {
            access_token: body.access_token,
            token_type: body.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
            scopes,
        })
    }
}

#[async_trait]
impl CredentialProvider for TokenManager {
    async fn token(&self, service: &str) -> Result<Option<String>, CallError> {
        self.access_token(service).await.map(Some)
    }

    fn invalidate(&self, token: &str) {
        if let Some(slot) = self.slots.get(&self.config.client_id) {
            let mut current = slot.token.write();
            // 只作废被拒绝的那个令牌
            if current.as_ref().is_some_and(|t| t.access_token == token) {
                warn!("M2M token was rejected by a downstream service, invalidating it");
                *current = None;
            }
        }
    }
}

/// 后台令牌刷新子系统
pub struct TokenRefresher {
    manager: Arc<TokenManager>,
    interval: Duration,
}

impl TokenRefresher {
    pub fn new(manager: Arc<TokenManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }
}

#[async_trait]
impl IntoSubsystem<AppError> for TokenRefresher {
    async fn run(self, subsys: SubsystemHandle) -> Result<(), AppError> {
        info!(
            "M2M token refresher started, checking every {:?}",
            self.interval
        );
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.manager.refresh_if_needed().await {
                        warn!("Background M2M token refresh failed: {}", e);
                    }
                }
                _ = subsys.on_shutdown_requested() => {
                    info!("Shutdown requested, stopping M2M token refresher");
                    return Ok(());
                }
            }
        }
    }
}
