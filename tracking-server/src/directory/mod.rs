//! 外部持久层端口 (order directory)
//!
//! 追踪引擎不拥有订单数据；进程重启后一切状态从外部持久层按需重建。
//! 第一次触达某个订单时，用 [`OrderDirectory::load_order`] 懒加载
//! 追踪记录的种子数据。
//!
//! [`MemoryDirectory`] 是同进程实现，用于测试或单机部署。

use async_trait::async_trait;
use dashmap::DashMap;
use shared::location::GeoPoint;
use shared::tracking::OrderStatus;
use std::fmt;

use crate::utils::AppResult;

/// 从持久层加载的订单种子数据
#[derive(Debug, Clone)]
pub struct OrderSeed {
    /// Order ID
    pub order_id: String,
    /// 进入追踪时的状态
    pub status: OrderStatus,
    /// 已分配的配送员 (可能尚未分配)
    pub courier_id: Option<String>,
    /// 客户收货坐标
    pub customer_target_location: GeoPoint,
}

/// 订单持久层端口
///
/// 调用方身份验证发生在上游，这里收到的请求一律视为已授权。
#[async_trait]
pub trait OrderDirectory: Send + Sync + fmt::Debug {
    /// 加载订单种子数据；不存在返回 `None`
    async fn load_order(&self, order_id: &str) -> AppResult<Option<OrderSeed>>;

    /// 查询订单当前分配的配送员
    async fn load_assigned_courier(&self, order_id: &str) -> AppResult<Option<String>>;
}

/// 内存实现 - 测试和单机部署用
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    orders: DashMap<String, OrderSeed>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个订单种子
    pub fn insert(&self, seed: OrderSeed) {
        self.orders.insert(seed.order_id.clone(), seed);
    }

    /// 更新配送员分配
    pub fn assign_courier(&self, order_id: &str, courier_id: impl Into<String>) {
        if let Some(mut seed) = self.orders.get_mut(order_id) {
            seed.courier_id = Some(courier_id.into());
        }
    }
}

#[async_trait]
impl OrderDirectory for MemoryDirectory {
    async fn load_order(&self, order_id: &str) -> AppResult<Option<OrderSeed>> {
        Ok(self.orders.get(order_id).map(|s| s.clone()))
    }

    async fn load_assigned_courier(&self, order_id: &str) -> AppResult<Option<String>> {
        Ok(self
            .orders
            .get(order_id)
            .and_then(|s| s.courier_id.clone()))
    }
}
