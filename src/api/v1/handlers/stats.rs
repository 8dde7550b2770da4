use crate::{
    api::v1::models::{ApiResponse, StatsOverview},
    client::CommunicationManager,
    metrics::ServiceMetricsSnapshot,
    r#const::api::error_types,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

/// 获取全局汇总及所有服务统计
pub async fn get_stats(
    State(manager): State<CommunicationManager>,
) -> Json<ApiResponse<StatsOverview>> {
    let services = manager.all_service_metrics();
    let summary = manager.metrics_summary();
    info!("API: Retrieved stats for {} services", services.len());
    Json(ApiResponse::success_with_data(
        StatsOverview { summary, services },
        "Stats retrieved",
    ))
}

/// 获取单个服务统计
pub async fn get_service_stats(
    State(manager): State<CommunicationManager>,
    Path(service): Path<String>,
) -> Response {
    match manager.service_metrics(&service) {
        Some(snapshot) => {
            info!("API: Retrieved stats for service '{}'", service);
            ApiResponse::<ServiceMetricsSnapshot>::success_with_data(snapshot, "Stats retrieved")
                .into_response()
        }
        None => {
            warn!("API: No stats recorded for service '{}'", service);
            ApiResponse::<()>::error(
                StatusCode::NOT_FOUND,
                error_types::NOT_FOUND,
                format!("No calls recorded for service '{}'", service),
            )
            .into_response()
        }
    }
}
