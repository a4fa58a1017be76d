//! Tracking record - per-order delivery state with append-only history

use super::status::OrderStatus;
use crate::location::GeoPoint;
use serde::{Deserialize, Serialize};

/// 状态历史条目 - 只追加，永不修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    /// Status after this change
    pub status: OrderStatus,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Optional human-facing note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Who triggered the change (audit snapshot)
    pub actor: String,
}

/// Order tracking record - one per order under active tracking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingRecord {
    /// Order ID (immutable)
    pub order_id: String,
    /// Current status
    pub status: OrderStatus,
    /// Append-only status history, monotonic timestamps
    pub status_history: Vec<StatusHistoryEntry>,
    /// Recomputed on each transition; None once terminal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_time: Option<i64>,
    /// Set once a courier is assigned, never cleared (audit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<String>,
    /// Fixed at tracking start (immutable)
    pub customer_target_location: GeoPoint,
    /// Display progress for the current status
    pub progress: u8,
    /// When tracking started (Unix milliseconds)
    pub created_at: i64,
    /// Last mutation timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl TrackingRecord {
    /// 创建追踪记录，写入基线历史条目
    pub fn new(
        order_id: impl Into<String>,
        status: OrderStatus,
        target: GeoPoint,
        courier_id: Option<String>,
        now: i64,
    ) -> Self {
        let order_id = order_id.into();
        let estimated_delivery_time = status.eta_offset_minutes().map(|m| now + m * 60_000);
        Self {
            order_id,
            status,
            status_history: vec![StatusHistoryEntry {
                status,
                timestamp: now,
                message: None,
                actor: "system".to_string(),
            }],
            estimated_delivery_time,
            courier_id,
            customer_target_location: target,
            progress: status.progress_percentage(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 追加一次成功转换
    ///
    /// 调用方必须先用 [`OrderStatus::can_transition_to`] 校验；
    /// 这里只做纯粹的状态演进。
    pub fn advance(
        &mut self,
        target: OrderStatus,
        message: Option<String>,
        actor: impl Into<String>,
        now: i64,
    ) {
        self.status = target;
        self.progress = target.progress_percentage();
        self.estimated_delivery_time = target.eta_offset_minutes().map(|m| now + m * 60_000);
        self.status_history.push(StatusHistoryEntry {
            status: target,
            timestamp: now,
            message,
            actor: actor.into(),
        });
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> GeoPoint {
        GeoPoint { lat: 41.0, lng: 2.0 }
    }

    #[test]
    fn new_record_has_baseline_history() {
        let r = TrackingRecord::new("o-1", OrderStatus::Confirmed, target(), None, 1_000);
        assert_eq!(r.status, OrderStatus::Confirmed);
        assert_eq!(r.status_history.len(), 1);
        assert_eq!(r.progress, 10);
        // CONFIRMED 的 ETA = now + 40min
        assert_eq!(r.estimated_delivery_time, Some(1_000 + 40 * 60_000));
    }

    #[test]
    fn advance_appends_and_recomputes_eta() {
        let mut r = TrackingRecord::new("o-1", OrderStatus::Confirmed, target(), None, 1_000);
        r.advance(OrderStatus::Preparing, Some("kitchen ack".into()), "ops", 2_000);
        assert_eq!(r.status, OrderStatus::Preparing);
        assert_eq!(r.status_history.len(), 2);
        assert_eq!(r.status_history[1].message.as_deref(), Some("kitchen ack"));
        assert_eq!(r.estimated_delivery_time, Some(2_000 + 30 * 60_000));
        assert_eq!(r.updated_at, 2_000);
    }

    #[test]
    fn terminal_status_clears_eta() {
        let mut r = TrackingRecord::new("o-1", OrderStatus::Nearby, target(), None, 1_000);
        r.advance(OrderStatus::Delivered, None, "courier", 2_000);
        assert_eq!(r.estimated_delivery_time, None);
        assert_eq!(r.progress, 100);
    }
}
