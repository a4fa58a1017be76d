//! 配送状态机
//!
//! 主链单向推进，`CANCELLED` 是唯一分支（任意非终态可达）：
//!
//! ```text
//! CONFIRMED → PREPARING → IN_TRANSIT → OUT_FOR_DELIVERY → NEARBY → DELIVERED
//!     └──────────┴───────────┴──────────────┴───────────────┘
//!                            ▼
//!                        CANCELLED
//! ```
//!
//! 跳级（如 CONFIRMED → DELIVERED）一律拒绝，只有直接后继合法。
//! `DELIVERED` 和 `CANCELLED` 是终态，任何离开终态的转换都非法。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order delivery status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 已确认 (进入追踪的起点)
    Confirmed,
    /// 备餐中
    Preparing,
    /// 已发出
    InTransit,
    /// 配送员派送中
    OutForDelivery,
    /// 即将送达
    Nearby,
    /// 已送达 (终态)
    Delivered,
    /// 已取消 (终态，任意非终态可达)
    Cancelled,
}

impl OrderStatus {
    /// 是否终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// 主链上的直接后继
    ///
    /// 终态和 `Cancelled` 没有后继。
    pub fn successor(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::InTransit),
            OrderStatus::InTransit => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Nearby),
            OrderStatus::Nearby => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// 判断到 `target` 的转换是否合法
    ///
    /// 合法当且仅当 `target` 是直接后继，或当前非终态且 `target` 为
    /// `Cancelled`。跳级不合法。
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if target == OrderStatus::Cancelled {
            return true;
        }
        self.successor() == Some(target)
    }

    /// 展示用进度百分比（非权威状态）
    pub fn progress_percentage(&self) -> u8 {
        match self {
            OrderStatus::Confirmed => 10,
            OrderStatus::Preparing => 25,
            OrderStatus::InTransit => 45,
            OrderStatus::OutForDelivery => 65,
            OrderStatus::Nearby => 85,
            OrderStatus::Delivered => 100,
            OrderStatus::Cancelled => 0,
        }
    }

    /// 预计剩余配送时间（分钟），用于重算 ETA
    ///
    /// 终态没有 ETA。
    pub fn eta_offset_minutes(&self) -> Option<i64> {
        match self {
            OrderStatus::Confirmed => Some(40),
            OrderStatus::Preparing => Some(30),
            OrderStatus::InTransit => Some(20),
            OrderStatus::OutForDelivery => Some(10),
            OrderStatus::Nearby => Some(5),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// 该状态下是否应随快照附带配送员位置
    pub fn is_courier_visible(&self) -> bool {
        matches!(
            self,
            OrderStatus::InTransit | OrderStatus::OutForDelivery | OrderStatus::Nearby
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Confirmed => write!(f, "CONFIRMED"),
            OrderStatus::Preparing => write!(f, "PREPARING"),
            OrderStatus::InTransit => write!(f, "IN_TRANSIT"),
            OrderStatus::OutForDelivery => write!(f, "OUT_FOR_DELIVERY"),
            OrderStatus::Nearby => write!(f, "NEARBY"),
            OrderStatus::Delivered => write!(f, "DELIVERED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}
