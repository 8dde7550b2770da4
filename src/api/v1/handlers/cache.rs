use crate::{
    api::v1::models::{ApiResponse, InvalidateRequest, InvalidateResult},
    client::CommunicationManager,
    r#const::api::error_types,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

/// 按键、通配符或正则使缓存失效
pub async fn invalidate_cache(
    State(manager): State<CommunicationManager>,
    Json(request): Json<InvalidateRequest>,
) -> Response {
    let result = match (request.key, request.pattern, request.regex) {
        (Some(key), None, None) => Ok(manager.invalidate_key(&key).await as usize),
        (None, Some(pattern), None) => manager.invalidate_pattern(&pattern).await,
        (None, None, Some(regex)) => manager.invalidate_regex(&regex).await,
        _ => {
            return bad_request("Exactly one of 'key', 'pattern' or 'regex' must be provided");
        }
    };

    match result {
        Ok(removed) => {
            info!("API: Invalidated {} cache entries", removed);
            ApiResponse::success_with_data(InvalidateResult { removed }, "Cache invalidated")
                .into_response()
        }
        Err(e) => bad_request(&e.to_string()),
    }
}

fn bad_request(message: &str) -> Response {
    warn!("API: Invalid cache invalidation request: {}", message);
    ApiResponse::<()>::error(StatusCode::BAD_REQUEST, error_types::BAD_REQUEST, message)
        .into_response()
}
