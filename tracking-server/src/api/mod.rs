//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查接口
//! - [`tracking`] - 追踪接口（状态写入、位置上报、快照轮询、live 通道）

pub mod health;
pub mod tracking;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

use crate::core::ServerState;
use axum::Router;

/// 汇总所有 API 路由
pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(tracking::router())
}
