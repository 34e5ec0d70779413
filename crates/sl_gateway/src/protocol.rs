//! HTTP 协议定义

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use sl_core::SignLoomError;

/// `GET /` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
    /// 当前使用的识别器
    pub detector: String,
}

impl StatusResponse {
    pub fn running(detector: impl Into<String>) -> Self {
        Self {
            message: "Sign Language Detection API is running".to_string(),
            detector: detector.into(),
        }
    }
}

/// `GET /history` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// 手势名称，最新在前
    pub history: Vec<String>,
}

/// 接口错误
#[derive(Debug)]
pub enum ApiError {
    /// 缺少 `image` 字段或内容为空
    NoImage,
    /// 上传体读取失败 (如超出大小上限)
    Upload { status: StatusCode, detail: String },
    /// 限流拒绝
    Busy(String),
    /// 识别失败
    Processing(SignLoomError),
}

impl From<SignLoomError> for ApiError {
    fn from(err: SignLoomError) -> Self {
        match err {
            SignLoomError::RateLimited(msg) => ApiError::Busy(msg),
            other => ApiError::Processing(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NoImage => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "No image provided" })),
            )
                .into_response(),
            ApiError::Upload { status, detail } => {
                (status, Json(serde_json::json!({ "detail": detail }))).into_response()
            }
            ApiError::Busy(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "detail": msg })),
            )
                .into_response(),
            ApiError::Processing(err) => {
                tracing::error!(error = %err, "image processing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "detail": "Image processing failed" })),
                )
                    .into_response()
            }
        }
    }
}
