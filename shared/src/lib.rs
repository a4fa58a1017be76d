//! Shared types for the delivery tracking engine
//!
//! Wire-visible types used by both the tracking server and its clients:
//! the order status machine, tracking records and snapshots, courier
//! location samples, tracking events and live-channel frames.

pub mod frame;
pub mod location;
pub mod tracking;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use frame::{FrameKind, LiveFrame};
pub use location::{CourierLocation, GeoPoint};
pub use tracking::{
    EventPayload, OrderStatus, StatusHistoryEntry, TrackingEvent, TrackingRecord,
    TrackingSnapshot,
};
