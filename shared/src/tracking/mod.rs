//! Order tracking domain types
//!
//! - [`OrderStatus`] - 配送状态机
//! - [`TrackingRecord`] - 订单追踪记录 (append-only 历史)
//! - [`TrackingEvent`] - 追踪事件 (per-order seq)
//! - [`TrackingSnapshot`] - 轮询/重连快照

pub mod event;
pub mod record;
pub mod snapshot;
pub mod status;

pub use event::{EventPayload, TrackingEvent};
pub use record::{StatusHistoryEntry, TrackingRecord};
pub use snapshot::TrackingSnapshot;
pub use status::OrderStatus;
