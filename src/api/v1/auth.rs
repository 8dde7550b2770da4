use crate::{api::v1::models::ApiResponse, r#const::api::error_types};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Bearer 令牌认证中间件
pub async fn auth_middleware(
    State(auth_token): State<Option<String>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiResponse<()>> {
    // 未设置令牌时跳过认证
    let Some(expected_token) = auth_token else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.trim() == expected_token);

    match provided {
        Some(true) => Ok(next.run(request).await),
        Some(false) => {
            warn!("API: Rejected request with an invalid bearer token");
            Err(ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                error_types::UNAUTHORIZED,
                "Invalid bearer token",
            ))
        }
        None => Err(ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            error_types::UNAUTHORIZED,
            "Bearer authentication required",
        )),
    }
}
