//! Live channel wire frames
//!
//! 服务端到客户端的推送帧。连接打开后的第一帧永远是 `snapshot`，
//! 之后是 `status_changed` / `location_updated` 事件帧，空闲期间
//! 穿插 `heartbeat` 帧。
//!
//! ```json
//! { "seq": 7, "kind": "status_changed", "order_id": "o-1",
//!   "timestamp": 1735689600000, "payload": { ... } }
//! ```

use crate::tracking::{TrackingEvent, TrackingSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// 快照帧 (连接打开后的第一帧)
    Snapshot,
    /// 状态变更事件帧
    StatusChanged,
    /// 位置更新事件帧
    LocationUpdated,
    /// 心跳帧 (无业务数据)
    Heartbeat,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Snapshot => write!(f, "snapshot"),
            FrameKind::StatusChanged => write!(f, "status_changed"),
            FrameKind::LocationUpdated => write!(f, "location_updated"),
            FrameKind::Heartbeat => write!(f, "heartbeat"),
        }
    }
}

/// One server-to-client push frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveFrame {
    /// Event seq; snapshot frames carry the seq already consumed for the
    /// order (subsequent event frames are strictly greater), heartbeats 0
    pub seq: u64,
    pub kind: FrameKind,
    pub order_id: String,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Frame body; absent for heartbeats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl LiveFrame {
    /// 快照帧
    pub fn snapshot(snapshot: &TrackingSnapshot, seq: u64) -> Self {
        Self {
            seq,
            kind: FrameKind::Snapshot,
            order_id: snapshot.record.order_id.clone(),
            timestamp: snapshot.taken_at,
            payload: Some(
                serde_json::to_value(snapshot).expect("snapshot serialization cannot fail"),
            ),
        }
    }

    /// 事件帧，kind 取自 payload 变体
    pub fn from_event(event: &TrackingEvent) -> Self {
        let kind = if event.is_status_changed() {
            FrameKind::StatusChanged
        } else {
            FrameKind::LocationUpdated
        };
        Self {
            seq: event.seq,
            kind,
            order_id: event.order_id.clone(),
            timestamp: event.timestamp,
            payload: Some(
                serde_json::to_value(&event.payload).expect("event serialization cannot fail"),
            ),
        }
    }

    /// 心跳帧
    pub fn heartbeat(order_id: impl Into<String>, now: i64) -> Self {
        Self {
            seq: 0,
            kind: FrameKind::Heartbeat,
            order_id: order_id.into(),
            timestamp: now,
            payload: None,
        }
    }

    /// 序列化为 JSON 文本 (WebSocket text frame)
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("frame serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::GeoPoint;
    use crate::tracking::{OrderStatus, TrackingRecord};

    #[test]
    fn heartbeat_has_no_payload() {
        let frame = LiveFrame::heartbeat("o-1", 42);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["kind"], "heartbeat");
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn snapshot_frame_round_trips() {
        let record = TrackingRecord::new(
            "o-1",
            OrderStatus::Confirmed,
            GeoPoint { lat: 1.0, lng: 2.0 },
            None,
            100,
        );
        let snap = TrackingSnapshot {
            record,
            courier_location: None,
            taken_at: 100,
        };
        let frame = LiveFrame::snapshot(&snap, 5);
        let back: LiveFrame = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(back.kind, FrameKind::Snapshot);
        assert_eq!(back.seq, 5);
        assert_eq!(back.order_id, "o-1");
    }
}
