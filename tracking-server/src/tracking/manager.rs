//! TrackingManager - 状态转换处理与记录生命周期

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use shared::tracking::{EventPayload, OrderStatus, TrackingRecord, TrackingSnapshot};

use crate::bus::EventBus;
use crate::directory::OrderDirectory;
use crate::location::LocationStore;
use crate::utils::{AppError, AppResult, now_millis};

/// 追踪记录注册表 + 状态机写入口
#[derive(Debug)]
pub struct TrackingManager {
    /// 活跃追踪记录 (order_id -> record)，per-order 互斥
    records: DashMap<String, Arc<Mutex<TrackingRecord>>>,
    bus: Arc<EventBus>,
    locations: Arc<LocationStore>,
    directory: Arc<dyn OrderDirectory>,
    /// 送达后保留窗口 (毫秒)
    retention_window_ms: i64,
}

impl TrackingManager {
    pub fn new(
        bus: Arc<EventBus>,
        locations: Arc<LocationStore>,
        directory: Arc<dyn OrderDirectory>,
        retention_window_ms: i64,
    ) -> Self {
        Self {
            records: DashMap::new(),
            bus,
            locations,
            directory,
            retention_window_ms,
        }
    }

    /// 应用一次状态转换
    ///
    /// 非法转换返回 [`AppError::InvalidTransition`]，不产生任何变更、
    /// 不发布任何事件。成功时事件已在返回前入队（publish-then-ack：
    /// 调用方观察到成功即可确定事件在总线上）。
    pub async fn apply_transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        message: Option<String>,
        actor: &str,
    ) -> AppResult<TrackingRecord> {
        let record = self.get_or_hydrate(order_id).await?;

        // 进入配送链路时刷新配送员分配（锁外完成 IO）
        let courier_refresh = if target == OrderStatus::InTransit {
            self.directory.load_assigned_courier(order_id).await?
        } else {
            None
        };

        let mut guard = record.lock();
        if !guard.status.can_transition_to(target) {
            return Err(AppError::InvalidTransition {
                from: guard.status,
                to: target,
            });
        }

        if guard.courier_id.is_none()
            && let Some(courier_id) = courier_refresh
        {
            self.locations.register_assignment(&courier_id, order_id);
            guard.courier_id = Some(courier_id);
        }

        let previous = guard.status;
        let now = now_millis();
        guard.advance(target, message.clone(), actor, now);

        // 持有 per-order 锁发布，保证事件顺序与转换顺序一致；
        // publish 是非阻塞入队，临界区不会被订阅者拖长
        self.bus.publish(
            order_id,
            EventPayload::StatusChanged {
                status: target,
                previous,
                message,
                actor: actor.to_string(),
                progress: guard.progress,
                estimated_delivery_time: guard.estimated_delivery_time,
            },
        );

        tracing::info!(
            order_id = %order_id,
            from = %previous,
            to = %target,
            actor = %actor,
            "Status transition applied"
        );

        Ok(guard.clone())
    }

    /// 轮询快照（live channel 首帧同样走这里）
    ///
    /// 纯读；配送员在途（IN_TRANSIT / OUT_FOR_DELIVERY / NEARBY）且已
    /// 分配时附带最新位置。
    pub async fn snapshot(&self, order_id: &str) -> AppResult<TrackingSnapshot> {
        let record = self.get_or_hydrate(order_id).await?;
        let record = record.lock().clone();

        let courier_location = match (&record.courier_id, record.status.is_courier_visible()) {
            (Some(courier_id), true) => self.locations.latest(courier_id),
            _ => None,
        };

        Ok(TrackingSnapshot {
            record,
            courier_location,
            taken_at: now_millis(),
        })
    }

    /// 驱逐过期记录，返回驱逐数量
    ///
    /// - `DELIVERED`：超过保留窗口后驱逐（窗口内迟到的观看者还能拉快照）
    /// - `CANCELLED`：下一次清扫即驱逐
    pub fn evict_expired(&self, now: i64) -> usize {
        let mut evicted = Vec::new();

        self.records.retain(|order_id, record| {
            let guard = record.lock();
            let expired = match guard.status {
                OrderStatus::Cancelled => true,
                OrderStatus::Delivered => guard.updated_at + self.retention_window_ms <= now,
                _ => false,
            };
            if expired {
                evicted.push((order_id.clone(), guard.courier_id.clone()));
            }
            !expired
        });

        for (order_id, courier_id) in &evicted {
            self.bus.remove_topic(order_id);
            if let Some(courier_id) = courier_id {
                self.locations.unregister_assignment(courier_id, order_id);
            }
            tracing::debug!(order_id = %order_id, "Tracking record evicted");
        }

        evicted.len()
    }

    /// 当前追踪中的记录数
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// 首次触达时从持久层水合追踪记录
    async fn get_or_hydrate(&self, order_id: &str) -> AppResult<Arc<Mutex<TrackingRecord>>> {
        if let Some(record) = self.records.get(order_id) {
            return Ok(record.clone());
        }

        let seed = self
            .directory
            .load_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} is not tracked", order_id)))?;

        if let Some(courier_id) = &seed.courier_id {
            self.locations.register_assignment(courier_id, order_id);
        }

        // 并发水合竞争时保留先写入的那份
        let record = self
            .records
            .entry(order_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(order_id = %order_id, status = %seed.status, "Hydrated tracking record");
                Arc::new(Mutex::new(TrackingRecord::new(
                    order_id,
                    seed.status,
                    seed.customer_target_location,
                    seed.courier_id.clone(),
                    now_millis(),
                )))
            })
            .clone();

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{MemoryDirectory, OrderSeed};
    use shared::location::GeoPoint;

    fn setup() -> (Arc<EventBus>, Arc<MemoryDirectory>, TrackingManager) {
        let bus = Arc::new(EventBus::new(8, 16));
        let locations = Arc::new(LocationStore::new(Arc::clone(&bus)));
        let directory = Arc::new(MemoryDirectory::new());
        let manager = TrackingManager::new(
            Arc::clone(&bus),
            locations,
            Arc::clone(&directory) as Arc<dyn OrderDirectory>,
            300_000,
        );
        (bus, directory, manager)
    }

    fn seed(order_id: &str, status: OrderStatus) -> OrderSeed {
        OrderSeed {
            order_id: order_id.into(),
            status,
            courier_id: None,
            customer_target_location: GeoPoint { lat: 41.0, lng: 2.0 },
        }
    }

    #[tokio::test]
    async fn legal_transition_appends_history_and_publishes() {
        let (bus, directory, manager) = setup();
        directory.insert(seed("o-1", OrderStatus::Confirmed));
        let mut sub = bus.subscribe("o-1");

        let record = manager
            .apply_transition("o-1", OrderStatus::Preparing, Some("ack".into()), "ops")
            .await
            .unwrap();

        assert_eq!(record.status, OrderStatus::Preparing);
        assert_eq!(record.status_history.len(), 2);

        let ev = sub.receiver.recv().await.unwrap();
        assert_eq!(ev.seq, 1);
        assert!(ev.is_status_changed());
    }

    #[tokio::test]
    async fn skip_is_rejected_without_mutation_or_event() {
        let (bus, directory, manager) = setup();
        directory.insert(seed("o-1", OrderStatus::Confirmed));

        let err = manager
            .apply_transition("o-1", OrderStatus::Delivered, None, "ops")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        // 无变更、无事件
        let snap = manager.snapshot("o-1").await.unwrap();
        assert_eq!(snap.record.status, OrderStatus::Confirmed);
        assert_eq!(snap.record.status_history.len(), 1);
        assert_eq!(bus.current_seq("o-1"), 0);
    }

    #[tokio::test]
    async fn terminal_state_rejects_everything() {
        let (_, directory, manager) = setup();
        directory.insert(seed("o-1", OrderStatus::Nearby));
        manager
            .apply_transition("o-1", OrderStatus::Delivered, None, "courier")
            .await
            .unwrap();

        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Cancelled,
        ] {
            let err = manager
                .apply_transition("o-1", target, None, "ops")
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidTransition { .. }));
        }
    }

    #[tokio::test]
    async fn history_matches_successful_transitions_exactly() {
        let (_, directory, manager) = setup();
        directory.insert(seed("o-1", OrderStatus::Confirmed));

        manager
            .apply_transition("o-1", OrderStatus::Preparing, None, "ops")
            .await
            .unwrap();
        // 两次失败的尝试
        let _ = manager
            .apply_transition("o-1", OrderStatus::Delivered, None, "ops")
            .await;
        let _ = manager
            .apply_transition("o-1", OrderStatus::Confirmed, None, "ops")
            .await;
        manager
            .apply_transition("o-1", OrderStatus::InTransit, None, "ops")
            .await
            .unwrap();

        let snap = manager.snapshot("o-1").await.unwrap();
        let statuses: Vec<_> = snap.record.status_history.iter().map(|h| h.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::InTransit
            ]
        );
        // 时间戳单调不减
        let times: Vec<_> = snap.record.status_history.iter().map(|h| h.timestamp).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn courier_assignment_survives_delivery() {
        let (_, directory, manager) = setup();
        let mut s = seed("o-1", OrderStatus::Preparing);
        s.courier_id = Some("C1".into());
        directory.insert(s);

        manager
            .apply_transition("o-1", OrderStatus::InTransit, None, "ops")
            .await
            .unwrap();
        manager
            .apply_transition("o-1", OrderStatus::OutForDelivery, None, "courier")
            .await
            .unwrap();
        manager
            .apply_transition("o-1", OrderStatus::Nearby, None, "courier")
            .await
            .unwrap();
        let record = manager
            .apply_transition("o-1", OrderStatus::Delivered, None, "courier")
            .await
            .unwrap();

        // 审计要求：送达后 courier_id 不清除
        assert_eq!(record.courier_id.as_deref(), Some("C1"));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (_, _, manager) = setup();
        let err = manager
            .apply_transition("ghost", OrderStatus::Preparing, None, "ops")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delivered_records_evict_after_retention_window() {
        let (_, directory, manager) = setup();
        directory.insert(seed("o-1", OrderStatus::Nearby));
        let record = manager
            .apply_transition("o-1", OrderStatus::Delivered, None, "courier")
            .await
            .unwrap();
        assert_eq!(manager.record_count(), 1);

        // 窗口内不驱逐
        assert_eq!(manager.evict_expired(record.updated_at + 1_000), 0);
        // 窗口过后驱逐
        assert_eq!(manager.evict_expired(record.updated_at + 300_000), 1);
        assert_eq!(manager.record_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_records_evict_on_next_sweep() {
        let (_, directory, manager) = setup();
        directory.insert(seed("o-1", OrderStatus::Confirmed));
        let record = manager
            .apply_transition("o-1", OrderStatus::Cancelled, None, "customer")
            .await
            .unwrap();

        assert_eq!(manager.evict_expired(record.updated_at), 1);
        assert_eq!(manager.record_count(), 0);
    }
}
