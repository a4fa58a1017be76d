//! Tracking API Module
//!
//! 写路径（状态、位置）返回显式结果；读路径（快照）永不修改状态；
//! live 路径升级为 WebSocket 长连接。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Tracking router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tracking", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Apply a status transition
        .route("/status", post(handler::apply_status))
        // Record a courier GPS ping
        .route("/location", post(handler::record_location))
        // Polling snapshot (fallback path)
        .route("/snapshot/{order_id}", get(handler::get_snapshot))
        // Long-lived push channel
        .route("/live/{order_id}", get(handler::live))
}
