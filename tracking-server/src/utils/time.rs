//! 时间工具 - 全链路统一 Unix millis
//!
//! 事件时间戳、历史条目、ETA 一律使用服务器侧 `i64` Unix 毫秒，
//! 客户端时钟只出现在位置样本里（仅用于新旧比较，不做换算）。

/// 当前 Unix 毫秒时间戳
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
