//! Tracking snapshot - point-in-time reconstruction for (re)synchronization
//!
//! 轮询接口和 live channel 打开时的首帧共用同一个快照结构，
//! 避免两条路径各自演化出不同的"真相"。

use super::record::TrackingRecord;
use crate::location::CourierLocation;
use serde::{Deserialize, Serialize};

/// Full point-in-time view of an order's tracking state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingSnapshot {
    /// The tracking record as of now
    pub record: TrackingRecord,
    /// Latest courier position, present only while the courier is en route
    /// (IN_TRANSIT / OUT_FOR_DELIVERY / NEARBY) and a courier is assigned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_location: Option<CourierLocation>,
    /// Snapshot timestamp (Unix milliseconds)
    pub taken_at: i64,
}
