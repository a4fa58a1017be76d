//! 事件总线 - per-order 有序扇出
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       EventBus                           │
//! │  DashMap<order_id, OrderTopic>                           │
//! │     OrderTopic = Mutex { next_seq, subscribers[] }       │
//! │                                                          │
//! │  broadcast::Sender<Arc<TrackingEvent>>  (firehose)       │
//! └────────────┬────────────────────────────┬────────────────┘
//!              │ bounded mpsc (per sub)     │ broadcast
//!              ▼                            ▼
//!       Live Channels              Notification Dispatcher
//! ```
//!
//! # 扇出策略
//!
//! - seq 在每个订单的互斥区内分配，总线是唯一的 seq 生成者
//! - 订阅者出站缓冲是有界 mpsc，`try_send` 写满即丢弃该订阅者
//!   （慢消费者被隔离，永远不会反压发布方或其他订阅者）
//! - firehose 是 best-effort broadcast，滞后的消费者收到 Lagged

mod bus;

pub use bus::{EventBus, Subscription};
