//! 通知分发 - 把总线事件变成离散的用户提醒
//!
//! 与连续的位置流不同，这里只在状态变化时产生一条提醒：
//!
//! - 只消费 `status_changed`（位置 tick 频繁且对人无意义，永不提醒）
//! - 按订单记录最近提醒过的 seq，小于等于该值的事件一律抑制
//!   （覆盖重复投递和重连后快照重述当前状态两种情况）
//! - 提醒面不可用时每个订单最多挂起一条（latest-wins），恢复后
//!   恰好补发一条，不堆积历史提醒

mod dispatcher;

pub use dispatcher::{Alert, AlertSink, NotificationDispatcher, RecordingAlertSink, TracingAlertSink};
