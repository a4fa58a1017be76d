//! Notification dispatcher implementation

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::tracking::{EventPayload, OrderStatus, TrackingEvent};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::utils::AppResult;

/// 用户提醒 - 交给外部通知面的三元组（外加状态，便于客户端路由）
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub order_id: String,
    pub status: OrderStatus,
}

impl Alert {
    /// 按状态生成固定文案
    fn for_status(order_id: &str, status: OrderStatus) -> Self {
        let (title, body) = match status {
            OrderStatus::Confirmed => ("Order confirmed", "We've received your order."),
            OrderStatus::Preparing => ("Order update", "The restaurant is preparing your order."),
            OrderStatus::InTransit => ("Order update", "Your order is on its way."),
            OrderStatus::OutForDelivery => ("Order update", "The courier is heading to you."),
            OrderStatus::Nearby => ("Almost there", "Your courier is nearby. Get ready!"),
            OrderStatus::Delivered => ("Delivered", "Your order has been delivered. Enjoy!"),
            OrderStatus::Cancelled => ("Order cancelled", "Your order has been cancelled."),
        };
        Self {
            title: title.to_string(),
            body: body.to_string(),
            order_id: order_id.to_string(),
            status,
        }
    }
}

/// 外部通知面端口（浏览器推送、应用内 toast 等）
///
/// 分发器只产出 `(title, body, metadata)`，不关心如何呈现。
#[async_trait]
pub trait AlertSink: Send + Sync + fmt::Debug {
    async fn deliver_alert(&self, alert: &Alert) -> AppResult<()>;

    /// 通知面当前是否可用（未授权/未就绪时返回 false）
    fn is_available(&self) -> bool {
        true
    }
}

/// 默认实现 - 结构化日志输出
#[derive(Debug, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn deliver_alert(&self, alert: &Alert) -> AppResult<()> {
        tracing::info!(
            order_id = %alert.order_id,
            status = %alert.status,
            title = %alert.title,
            "Alert: {}",
            alert.body
        );
        Ok(())
    }
}

/// 记录实现 - 测试和同进程验证用
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<Alert>>,
    available: AtomicBool,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn deliver_alert(&self, alert: &Alert) -> AppResult<()> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// 通知分发器 - 后台消费 firehose
pub struct NotificationDispatcher {
    receiver: broadcast::Receiver<Arc<TrackingEvent>>,
    sink: Arc<dyn AlertSink>,
    shutdown_token: CancellationToken,
    /// 每个订单最近提醒过的 seq
    last_alerted: HashMap<String, u64>,
    /// 通知面不可用期间每个订单挂起的最新事件
    pending: HashMap<String, Arc<TrackingEvent>>,
}

impl NotificationDispatcher {
    pub fn new(
        receiver: broadcast::Receiver<Arc<TrackingEvent>>,
        sink: Arc<dyn AlertSink>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            sink,
            shutdown_token,
            last_alerted: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// 后台运行，直到收到关闭信号
    pub async fn run(mut self) {
        tracing::info!("Notification dispatcher started");
        let mut flush_tick = tokio::time::interval(Duration::from_secs(5));
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Notification dispatcher shutting down");
                    break;
                }

                _ = flush_tick.tick() => {
                    self.flush_pending().await;
                }

                result = self.receiver.recv() => {
                    match result {
                        Ok(event) => self.handle_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // 滞后只影响提醒，不影响权威状态
                            tracing::warn!(skipped = n, "Notification dispatcher lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    async fn handle_event(&mut self, event: Arc<TrackingEvent>) {
        // 位置 tick 永不提醒
        let EventPayload::StatusChanged { status, .. } = &event.payload else {
            return;
        };
        let status = *status;

        // 同一或更早的事件已提醒过 → 抑制（重复投递 / 快照重述）
        if let Some(&last) = self.last_alerted.get(&event.order_id)
            && event.seq <= last
        {
            tracing::debug!(
                order_id = %event.order_id,
                seq = event.seq,
                last_alerted = last,
                "Duplicate status event suppressed"
            );
            return;
        }

        if !self.sink.is_available() {
            // 每个订单只挂起最新一条，不堆积历史
            self.pending.insert(event.order_id.clone(), event);
            return;
        }

        self.flush_pending().await;
        self.deliver(&event.order_id, event.seq, status).await;
    }

    /// 通知面恢复后，每个挂起的订单恰好补发一条
    async fn flush_pending(&mut self) {
        if self.pending.is_empty() || !self.sink.is_available() {
            return;
        }
        for (order_id, event) in std::mem::take(&mut self.pending) {
            let EventPayload::StatusChanged { status, .. } = &event.payload else {
                continue;
            };
            let status = *status;
            if self
                .last_alerted
                .get(&order_id)
                .is_some_and(|&last| event.seq <= last)
            {
                continue;
            }
            self.deliver(&order_id, event.seq, status).await;
        }
    }

    async fn deliver(&mut self, order_id: &str, seq: u64, status: OrderStatus) {
        let alert = Alert::for_status(order_id, status);
        match self.sink.deliver_alert(&alert).await {
            Ok(()) => {
                self.last_alerted.insert(order_id.to_string(), seq);
            }
            Err(e) => {
                // 投递失败不重试（通知是 best-effort），留给下一条状态事件
                tracing::warn!(order_id = %order_id, "Alert delivery failed: {}", e);
            }
        }
    }
}
