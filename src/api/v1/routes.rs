use crate::api::v1::{
    auth::auth_middleware,
    handlers::{cache, circuits, stats},
};
use crate::client::CommunicationManager;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub const STATS_PREFIX: &str = "/stats";
pub const STATS_BY_SERVICE_PREFIX: &str = "/stats/{service}";
pub const CIRCUITS_PREFIX: &str = "/circuits";
pub const CACHE_INVALIDATE_PREFIX: &str = "/cache/invalidate";

/// 创建API v1路由
pub fn api_routes(manager: CommunicationManager, auth_token: Option<String>) -> Router {
    Router::new()
        // 调用统计
        .route(STATS_PREFIX, get(stats::get_stats))
        .route(STATS_BY_SERVICE_PREFIX, get(stats::get_service_stats))
        // 熔断器状态
        .route(CIRCUITS_PREFIX, get(circuits::list_circuits))
        // 缓存管理
        .route(CACHE_INVALIDATE_PREFIX, post(cache::invalidate_cache))
        .layer(middleware::from_fn_with_state(auth_token, auth_middleware))
        .with_state(manager)
}
