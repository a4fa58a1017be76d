//! Live channel - 每个观看者一条长连接
//!
//! # 架构
//!
//! ```text
//!          ┌─────────────────────┐
//!          │   FrameSink Trait   │  ◄── 可插拔实现
//!          └─────────┬───────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!      WsSink            MemorySink
//!   (WebSocket 推送)    (同进程/测试)
//! ```
//!
//! # 连接生命周期
//!
//! ```text
//! Connecting ──snapshot 写入成功──► Open ──┬── 客户端断开 ──► Draining ─┐
//!     │                                   ├── 写入失败 ────► Closing ──┤
//!     └── snapshot 写入失败 ─► Closing ───┤── 总线丢弃(溢出) ► Closing ─┤
//!                                         ▼                           ▼
//!                                      (unsubscribe)               Closed
//! ```
//!
//! 打开即快照：`Open` 后的第一帧永远是快照帧，之后才转发总线事件，
//! 新连接永远不会是空白的。重连由客户端负责，每次重连都从新快照开始，
//! 不存在跨连接的 seq 续传。

mod channel;
mod sink;

pub use channel::{ChannelState, LiveChannel, LiveChannelManager};
pub use sink::{FrameSink, MemorySink, WsSink};
