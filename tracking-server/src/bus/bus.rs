//! 事件总线核心实现

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use shared::tracking::{EventPayload, TrackingEvent};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::utils::now_millis;

/// 单个订阅者的扇出槽位
#[derive(Debug)]
struct SubscriberSlot {
    id: Uuid,
    sender: mpsc::Sender<Arc<TrackingEvent>>,
}

/// 单个订单的主题：seq 计数器 + 订阅者集合
///
/// 整个结构放在一把 per-order 锁里，publish 的临界区只覆盖本订单，
/// 不同订单之间没有任何锁竞争。
#[derive(Debug, Default)]
struct OrderTopic {
    /// 已分配的最后一个 seq（0 表示尚未发布过事件）
    last_seq: u64,
    subscribers: Vec<SubscriberSlot>,
}

/// 一次订阅的接收端，由 live channel 独占持有
#[derive(Debug)]
pub struct Subscription {
    /// Subscription ID
    pub id: Uuid,
    /// Order being watched
    pub order_id: String,
    /// 订阅者出站缓冲的接收端
    pub receiver: mpsc::Receiver<Arc<TrackingEvent>>,
    /// 订阅瞬间该订单已消费到的 seq（快照帧携带此值）
    pub snapshot_seq: u64,
}

/// 事件总线 - 负责 seq 分配和 per-order 扇出
#[derive(Debug)]
pub struct EventBus {
    /// 订单主题注册表 (order_id -> topic)
    topics: DashMap<String, Arc<Mutex<OrderTopic>>>,
    /// 全局事件广播（通知分发器消费）
    firehose: broadcast::Sender<Arc<TrackingEvent>>,
    /// 每个订阅者的出站缓冲容量
    queue_capacity: usize,
}

impl EventBus {
    /// 创建事件总线
    pub fn new(queue_capacity: usize, firehose_capacity: usize) -> Self {
        let (firehose, _) = broadcast::channel(firehose_capacity);
        Self {
            topics: DashMap::new(),
            firehose,
            queue_capacity,
        }
    }

    /// 发布事件
    ///
    /// 在订单主题的互斥区内分配下一个 seq，然后非阻塞地投递给该订单的
    /// 每个订阅者。缓冲写满的订阅者当场被丢弃（溢出，只记日志），它必须
    /// 重连并通过快照重新同步。已关闭的接收端顺手剪掉，所以断连的
    /// 订阅者最多只会留存到下一次 publish。
    ///
    /// 发布方的成功定义是"总线接受了事件"，与订阅者是否收到无关。
    pub fn publish(&self, order_id: &str, payload: EventPayload) -> Arc<TrackingEvent> {
        let topic = self.topic(order_id);
        let mut guard = topic.lock();

        guard.last_seq += 1;
        let event = Arc::new(TrackingEvent {
            event_id: Uuid::new_v4().to_string(),
            seq: guard.last_seq,
            order_id: order_id.to_string(),
            timestamp: now_millis(),
            payload,
        });

        guard.subscribers.retain(|slot| {
            match slot.sender.try_send(Arc::clone(&event)) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        order_id = %order_id,
                        subscription_id = %slot.id,
                        "Subscriber overrun, dropping from fan-out set"
                    );
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(
                        order_id = %order_id,
                        subscription_id = %slot.id,
                        "Subscriber gone, pruning"
                    );
                    false
                }
            }
        });
        drop(guard);

        // firehose 没有消费者时 send 返回 Err，属正常情况
        let _ = self.firehose.send(Arc::clone(&event));
        event
    }

    /// 订阅一个订单的事件流
    ///
    /// 返回的 [`Subscription`] 携带订阅瞬间的 seq 水位；之后投递的
    /// 所有事件 seq 严格大于该水位。
    pub fn subscribe(&self, order_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        // 每次订阅都是一条全新的独立订阅（新 id、新缓冲、当前水位）；
        // 重连不续传旧流
        let id = Uuid::new_v4();

        let topic = self.topic(order_id);
        let mut guard = topic.lock();
        guard.subscribers.push(SubscriberSlot { id, sender: tx });
        let snapshot_seq = guard.last_seq;
        drop(guard);

        tracing::debug!(order_id = %order_id, subscription_id = %id, "Subscriber registered");

        Subscription {
            id,
            order_id: order_id.to_string(),
            receiver: rx,
            snapshot_seq,
        }
    }

    /// 取消订阅
    ///
    /// 未知的订阅者是 no-op，不是错误。
    pub fn unsubscribe(&self, order_id: &str, subscription_id: Uuid) {
        if let Some(topic) = self.topics.get(order_id) {
            let mut guard = topic.lock();
            guard.subscribers.retain(|slot| slot.id != subscription_id);
        }
    }

    /// 订阅全局事件广播（通知分发器专用）
    pub fn subscribe_firehose(&self) -> broadcast::Receiver<Arc<TrackingEvent>> {
        self.firehose.subscribe()
    }

    /// 当前订单的订阅者数量
    pub fn subscriber_count(&self, order_id: &str) -> usize {
        self.topics
            .get(order_id)
            .map(|t| t.lock().subscribers.len())
            .unwrap_or(0)
    }

    /// 当前订单已分配到的 seq（未发布过事件为 0）
    pub fn current_seq(&self, order_id: &str) -> u64 {
        self.topics
            .get(order_id)
            .map(|t| t.lock().last_seq)
            .unwrap_or(0)
    }

    /// 移除订单主题（记录被驱逐时调用）
    ///
    /// 剩余订阅者的接收端会观察到通道关闭。
    pub fn remove_topic(&self, order_id: &str) {
        self.topics.remove(order_id);
    }

    fn topic(&self, order_id: &str) -> Arc<Mutex<OrderTopic>> {
        self.topics
            .entry(order_id.to_string())
            .or_default()
            .clone()
    }
}
