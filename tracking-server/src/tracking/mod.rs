//! 订单追踪 - 状态机应用与快照
//!
//! [`TrackingManager`] 是所有状态写入的唯一入口：
//!
//! ```text
//! apply_transition(order_id, target, ...)
//!     ├─ 1. 懒加载追踪记录 (首次触达时从 OrderDirectory 水合)
//!     ├─ 2. 校验 target 是否为合法后继
//!     ├─ 3. 追加历史、更新状态、重算 ETA
//!     ├─ 4. 发布 status_changed 事件 (publish-then-acknowledge)
//!     └─ 5. 返回新记录
//! ```
//!
//! 读路径 (`snapshot`) 与 live channel 首帧共用一套实现。

mod manager;

pub use manager::TrackingManager;
