use crate::{
    metrics::{GlobalMetricsSummary, ServiceMetricsSnapshot},
    r#const::api::response_status,
};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// API 统一响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// HTTP 状态码
    pub code: u16,
    /// 响应状态 ("success" 或 "error")
    pub status: String,
    /// 人类可读的消息
    pub message: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// 错误详情 (仅在错误时存在)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// 错误详情结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// 错误类型
    pub r#type: String,
    /// 错误消息
    pub message: String,
}

/// 统计总览
#[derive(Debug, Serialize)]
pub struct StatsOverview {
    pub summary: GlobalMetricsSummary,
    pub services: Vec<ServiceMetricsSnapshot>,
}

/// 缓存失效请求，三选一
#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
}

/// 缓存失效结果
#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateResult {
    pub removed: usize,
}

impl<T> ApiResponse<T> {
    /// 创建一个成功响应，带数据
    pub fn success_with_data(data: T, message: impl Into<String>) -> Self {
        Self {
            code: 200,
            status: response_status::SUCCESS.to_string(),
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    /// 创建一个错误响应
    pub fn error(
        status_code: StatusCode,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> ApiResponse<()> {
        ApiResponse {
            code: status_code.as_u16(),
            status: response_status::ERROR.to_string(),
            message: "".to_string(),
            data: None,
            error: Some(ErrorDetail {
                r#type: error_type.into(),
                message: message.into(),
            }),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status_code =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status_code, Json(self)).into_response()
    }
}
