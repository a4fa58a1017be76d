//! Tracking events - immutable facts published on the event bus
//!
//! 每个订单有独立的严格递增 `seq`，事件总线是唯一的 seq 生成者。
//! 任何单个订阅者观察到的 seq 无空洞、不回退。

use super::status::OrderStatus;
use crate::location::CourierLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracking event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingEvent {
    /// Event unique ID
    pub event_id: String,
    /// Per-order sequence number (strictly increasing, gap-free)
    pub seq: u64,
    /// Order this event belongs to
    pub order_id: String,
    /// Server timestamp (Unix milliseconds) - set when the event is created
    pub timestamp: i64,
    /// Event payload
    pub payload: EventPayload,
}

impl TrackingEvent {
    pub fn kind(&self) -> &'static str {
        match self.payload {
            EventPayload::StatusChanged { .. } => "status_changed",
            EventPayload::LocationUpdated { .. } => "location_updated",
        }
    }

    pub fn is_status_changed(&self) -> bool {
        matches!(self.payload, EventPayload::StatusChanged { .. })
    }
}

impl fmt::Display for TrackingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} {}", self.order_id, self.seq, self.kind())
    }
}

/// Event payload variants - closed union, decoded exhaustively
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    StatusChanged {
        /// Status after the transition
        status: OrderStatus,
        /// Status before the transition
        previous: OrderStatus,
        /// Optional transition note
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Who triggered the transition
        actor: String,
        /// Display progress for the new status
        progress: u8,
        /// Recomputed ETA (Unix milliseconds), absent once terminal
        #[serde(skip_serializing_if = "Option::is_none")]
        estimated_delivery_time: Option<i64>,
    },
    LocationUpdated {
        /// Courier the sample belongs to
        courier_id: String,
        /// The accepted sample
        location: CourierLocation,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_tagged_union() {
        let payload = EventPayload::StatusChanged {
            status: OrderStatus::Preparing,
            previous: OrderStatus::Confirmed,
            message: None,
            actor: "ops".into(),
            progress: 25,
            estimated_delivery_time: Some(1),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "STATUS_CHANGED");
        assert_eq!(json["status"], "PREPARING");

        let back: EventPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn kind_matches_payload_variant() {
        let ev = TrackingEvent {
            event_id: "e-1".into(),
            seq: 3,
            order_id: "o-1".into(),
            timestamp: 0,
            payload: EventPayload::LocationUpdated {
                courier_id: "C1".into(),
                location: CourierLocation {
                    courier_id: "C1".into(),
                    lat: 0.0,
                    lng: 0.0,
                    timestamp: 0,
                    accuracy: None,
                    speed: None,
                    heading: None,
                },
            },
        };
        assert_eq!(ev.kind(), "location_updated");
        assert!(!ev.is_status_changed());
    }
}
