use crate::{api::v1::models::ApiResponse, breaker::CircuitSnapshot, client::CommunicationManager};
use axum::{extract::State, Json};
use tracing::debug;

/// 获取所有熔断器状态
pub async fn list_circuits(
    State(manager): State<CommunicationManager>,
) -> Json<ApiResponse<Vec<CircuitSnapshot>>> {
    let circuits = manager.circuits();
    debug!("API: Retrieved {} circuit breakers", circuits.len());
    Json(ApiResponse::success_with_data(circuits, "Circuits retrieved"))
}
