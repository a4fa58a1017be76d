//! Tracking API Handlers

use axum::{
    Json,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use shared::location::CourierLocation;
use shared::tracking::{OrderStatus, TrackingRecord, TrackingSnapshot};
use tokio_util::sync::CancellationToken;

use crate::core::ServerState;
use crate::live::WsSink;
use crate::location::RecordOutcome;
use crate::utils::{AppError, AppResponse, AppResult};

/// 状态转换请求
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub order_id: String,
    pub target_status: OrderStatus,
    #[serde(default)]
    pub message: Option<String>,
    /// 触发者标识（上游已验证）
    #[serde(default = "default_actor")]
    pub actor: String,
}

fn default_actor() -> String {
    "backend".to_string()
}

/// 位置上报响应
#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub outcome: RecordOutcome,
}

/// 快照响应，附带建议的最小轮询间隔
#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub snapshot: TrackingSnapshot,
    /// 客户端不应以低于该间隔的频率轮询
    pub poll_interval_secs: u64,
}

/// Apply a status transition
///
/// 非法转换返回 409，不产生任何变更或事件。
pub async fn apply_status(
    State(state): State<ServerState>,
    Json(req): Json<TransitionRequest>,
) -> AppResult<Json<AppResponse<TrackingRecord>>> {
    if req.order_id.is_empty() {
        return Err(AppError::validation("order_id must not be empty"));
    }

    let record = state
        .tracking()
        .apply_transition(&req.order_id, req.target_status, req.message, &req.actor)
        .await?;
    Ok(Json(AppResponse::success(record)))
}

/// Record a courier GPS ping
///
/// 旧样本返回 `stale`，对调用方的工作流不是错误。
pub async fn record_location(
    State(state): State<ServerState>,
    Json(sample): Json<CourierLocation>,
) -> AppResult<Json<AppResponse<LocationResponse>>> {
    if sample.courier_id.is_empty() {
        return Err(AppError::validation("courier_id must not be empty"));
    }

    let outcome = state.locations().record_sample(sample);
    Ok(Json(AppResponse::success(LocationResponse { outcome })))
}

/// Polling snapshot (shared with the live channel's first frame)
pub async fn get_snapshot(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<AppResponse<SnapshotResponse>>> {
    let snapshot = state.tracking().snapshot(&order_id).await?;
    Ok(Json(AppResponse::success(SnapshotResponse {
        snapshot,
        poll_interval_secs: state.config().poll_interval_secs,
    })))
}

/// Open a live channel (WebSocket upgrade)
pub async fn live(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, order_id, socket))
}

async fn handle_socket(state: ServerState, order_id: String, socket: WebSocket) {
    let (sink, mut stream) = socket.split();
    let cancel = CancellationToken::new();

    // 读半边只用来探测客户端断开
    let reader_cancel = cancel.clone();
    let reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
        reader_cancel.cancel();
    });

    match state
        .live()
        .open(&order_id, WsSink::new(sink), cancel.clone())
        .await
    {
        Ok(final_state) => {
            tracing::debug!(order_id = %order_id, state = ?final_state, "Live channel finished");
        }
        Err(e) => {
            // 典型情况：订单不在追踪中，升级后立即关闭
            tracing::debug!(order_id = %order_id, "Live channel rejected: {}", e);
        }
    }

    cancel.cancel();
    let _ = reader.await;
}
