//! 位置存储实现

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use shared::location::CourierLocation;
use shared::tracking::EventPayload;

use crate::bus::EventBus;

/// `record_sample` 的结果 - 显式返回值，调用方据此分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// 样本被接受并已发布事件
    Accepted,
    /// 样本不比已存的新，被丢弃（非致命）
    Stale,
}

/// 位置存储
#[derive(Debug)]
pub struct LocationStore {
    /// 每个配送员的最新样本槽位
    slots: DashMap<String, CourierLocation>,
    /// 配送员 -> 当前关联的订单集合（位置事件按订单扇出）
    assignments: DashMap<String, HashSet<String>>,
    bus: Arc<EventBus>,
}

impl LocationStore {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            slots: DashMap::new(),
            assignments: DashMap::new(),
            bus,
        }
    }

    /// 记录一条位置样本
    ///
    /// 槽位更新在 entry 临界区内完成（per-key 比较并置换）；
    /// 接受后为该配送员当前关联的每个订单发布 `location_updated`。
    pub fn record_sample(&self, sample: CourierLocation) -> RecordOutcome {
        let courier_id = sample.courier_id.clone();

        match self.slots.entry(courier_id.clone()) {
            Entry::Occupied(mut entry) => {
                if !sample.is_newer_than(entry.get()) {
                    tracing::debug!(
                        courier_id = %courier_id,
                        stored = entry.get().timestamp,
                        received = sample.timestamp,
                        "Stale location sample dropped"
                    );
                    return RecordOutcome::Stale;
                }
                entry.insert(sample.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(sample.clone());
            }
        }

        for order_id in self.orders_for(&courier_id) {
            self.bus.publish(
                &order_id,
                EventPayload::LocationUpdated {
                    courier_id: courier_id.clone(),
                    location: sample.clone(),
                },
            );
        }

        RecordOutcome::Accepted
    }

    /// 查询配送员的最新样本
    pub fn latest(&self, courier_id: &str) -> Option<CourierLocation> {
        self.slots.get(courier_id).map(|s| s.clone())
    }

    /// 登记配送员与订单的关联（配送员被指派时调用）
    pub fn register_assignment(&self, courier_id: &str, order_id: &str) {
        self.assignments
            .entry(courier_id.to_string())
            .or_default()
            .insert(order_id.to_string());
    }

    /// 解除配送员与订单的关联（记录驱逐时调用）
    pub fn unregister_assignment(&self, courier_id: &str, order_id: &str) {
        if let Some(mut orders) = self.assignments.get_mut(courier_id) {
            orders.remove(order_id);
        }
    }

    fn orders_for(&self, courier_id: &str) -> Vec<String> {
        self.assignments
            .get(courier_id)
            .map(|orders| orders.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(courier: &str, ts: i64) -> CourierLocation {
        CourierLocation {
            courier_id: courier.into(),
            lat: 41.38,
            lng: 2.17,
            timestamp: ts,
            accuracy: Some(8.0),
            speed: Some(4.2),
            heading: Some(90.0),
        }
    }

    fn store() -> LocationStore {
        LocationStore::new(Arc::new(EventBus::new(8, 16)))
    }

    #[tokio::test]
    async fn out_of_order_samples_keep_latest() {
        let store = store();

        // T2 先到，T1 后到 (T1 < T2)
        assert_eq!(store.record_sample(sample("C1", 200)), RecordOutcome::Accepted);
        assert_eq!(store.record_sample(sample("C1", 100)), RecordOutcome::Stale);

        assert_eq!(store.latest("C1").unwrap().timestamp, 200);
    }

    #[tokio::test]
    async fn duplicate_timestamp_is_stale() {
        let store = store();
        assert_eq!(store.record_sample(sample("C1", 100)), RecordOutcome::Accepted);
        assert_eq!(store.record_sample(sample("C1", 100)), RecordOutcome::Stale);
    }

    #[tokio::test]
    async fn unknown_courier_has_no_sample() {
        assert!(store().latest("nobody").is_none());
    }

    #[tokio::test]
    async fn accepted_sample_fans_out_per_assigned_order() {
        let bus = Arc::new(EventBus::new(8, 16));
        let store = LocationStore::new(Arc::clone(&bus));
        store.register_assignment("C1", "o-1");
        store.register_assignment("C1", "o-2");

        let mut sub1 = bus.subscribe("o-1");
        let mut sub2 = bus.subscribe("o-2");

        store.record_sample(sample("C1", 100));

        let ev1 = sub1.receiver.recv().await.unwrap();
        let ev2 = sub2.receiver.recv().await.unwrap();
        assert_eq!(ev1.kind(), "location_updated");
        assert_eq!(ev2.kind(), "location_updated");
        // 两个订单的 seq 互相独立
        assert_eq!(ev1.seq, 1);
        assert_eq!(ev2.seq, 1);
    }

    #[tokio::test]
    async fn stale_sample_publishes_nothing() {
        let bus = Arc::new(EventBus::new(8, 16));
        let store = LocationStore::new(Arc::clone(&bus));
        store.register_assignment("C1", "o-1");

        store.record_sample(sample("C1", 200));
        store.record_sample(sample("C1", 100));

        assert_eq!(bus.current_seq("o-1"), 1);
    }
}
