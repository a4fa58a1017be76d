//! 统一错误处理
//!
//! 提供应用级错误类型和响应结构：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResponse`] - API 响应结构
//!
//! # 错误分类
//!
//! | 分类 | 说明 |
//! |------|------|
//! | 同步写路径 | `InvalidTransition`、`NotFound`、`Validation` — 作为返回值交给调用方分支处理 |
//! | 连接生命周期 | `ChannelWriteFailure` — 内部处理为断连，不向发布方传播 |
//! | 系统错误 | `Internal` |
//!
//! # 使用示例
//!
//! ```ignore
//! // 返回错误
//! Err(AppError::not_found("Order o-1 not tracked"))
//!
//! // 返回成功响应
//! Ok(Json(AppResponse::success(data)))
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::tracking::OrderStatus;
use tracing::error;

/// Application-level Result type
pub type AppResult<T> = Result<T, AppError>;

/// API 统一响应结构
///
/// ```json
/// {
///   "code": "0000",
///   "message": "success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// 错误码 (0000 表示成功)
    pub code: String,
    /// 消息
    pub message: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> AppResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            code: "0000".to_string(),
            message: "success".to_string(),
            data: Some(data),
        }
    }

    /// 创建错误响应
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 同步写路径 (4xx) ==========
    /// 非法状态转换 (409)，不产生任何变更或事件
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// 资源不存在 (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 验证失败 (400)
    #[error("Validation failed: {0}")]
    Validation(String),

    // ========== 连接生命周期 (内部处理，不进 HTTP 响应) ==========
    /// 推送连接写入失败或超时，按断连处理
    #[error("Channel write failure: {0}")]
    ChannelWriteFailure(String),

    // ========== 系统错误 (5xx) ==========
    /// 内部错误 (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, "E2409"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "E2404"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "E2400"),
            // 连接错误不应走到 HTTP 响应；兜底按 500 处理
            AppError::ChannelWriteFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E0002"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E0001"),
        };

        if status.is_server_error() {
            error!("{}", self);
        }

        let body: AppResponse<()> = AppResponse::error(code, self.to_string());
        (status, Json(body)).into_response()
    }
}
