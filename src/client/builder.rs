use crate::{
    breaker::BreakerRegistry,
    bulkhead::BulkheadRegistry,
    cache::{CacheStore, ResponseCache},
    client::{create_http_client, HttpTransport, Transport},
    config::Config,
    dedup::Deduplicator,
    error::AppError,
    m2m::{CredentialProvider, NoopCredentialProvider, TokenManager},
    metrics::{CallRecorder, MetricsAggregator, NoopRecorder},
    retry::RetryPolicy,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

use super::manager::{CommunicationManager, Inner};

/// 通信管理器构建器
///
/// 各组件默认按配置创建，测试时可替换传输层、缓存存储、凭据提供者和记录器。
pub struct CommunicationManagerBuilder {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    recorder: Option<Arc<dyn CallRecorder>>,
}

impl CommunicationManagerBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            transport: None,
            cache_store: None,
            credentials: None,
            recorder: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 替换缓存存储（缓存关闭时忽略）
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn CallRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn build(self) -> Result<CommunicationManager, AppError> {
        let config = Arc::new(self.config);
        let client = create_http_client(&config.http_client)?;

        // 传输层
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(client.clone())),
        };

        // 响应缓存
        let cache = match self.cache_store {
            Some(store) if config.caching.enabled => {
                ResponseCache::with_store(&config.caching, store)?
            }
            _ => ResponseCache::from_config(&config.caching)?,
        };

        // M2M 令牌
        let token_manager = if config.m2m.enabled {
            info!(
                "M2M token manager enabled, clientId={}, endpoint={}",
                config.m2m.client_id, config.m2m.token_endpoint
            );
            Some(Arc::new(TokenManager::new(config.m2m.clone(), client)))
        } else {
            None
        };
        let credentials: Arc<dyn CredentialProvider> = match (self.credentials, &token_manager) {
            (Some(credentials), _) => credentials,
            (None, Some(manager)) => Arc::clone(manager) as Arc<dyn CredentialProvider>,
            (None, None) => Arc::new(NoopCredentialProvider),
        };

        // 调用统计
        let recorder: Arc<dyn CallRecorder> = match self.recorder {
            Some(recorder) => recorder,
            None if config.telemetry.enabled => {
                Arc::new(MetricsAggregator::new(&config.telemetry))
            }
            None => Arc::new(NoopRecorder),
        };

        // 预先构建重试策略
        let default_retry = RetryPolicy::from_config(&config.retry_policy);
        let mut service_retry = HashMap::new();
        for service in config.services.keys() {
            let retry = config.retry_config_for(service);
            debug!(
                "Service '{}' retry policy: maxRetries={}, backoff={}",
                service,
                retry.max_retries,
                retry.backoff_strategy.as_str()
            );
            service_retry.insert(service.clone(), RetryPolicy::from_config(retry));
        }

        info!(
            "Communication manager initialized, {} service overrides, gateway={}",
            config.services.len(),
            config.use_gateway
        );

        Ok(CommunicationManager::from_inner(Inner {
            breakers: BreakerRegistry::new(Arc::clone(&config)),
            bulkheads: BulkheadRegistry::new(config.bulkhead.clone()),
            config,
            transport,
            cache,
            dedup: Deduplicator::new(),
            credentials,
            token_manager,
            recorder,
            default_retry,
            service_retry,
        }))
    }
}
