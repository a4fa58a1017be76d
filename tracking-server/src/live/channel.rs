//! 连接任务与状态机

use std::sync::Arc;
use std::time::Duration;

use shared::frame::LiveFrame;
use tokio::time::{Instant, MissedTickBehavior, timeout};
use tokio_util::sync::CancellationToken;

use super::sink::FrameSink;
use crate::bus::{EventBus, Subscription};
use crate::tracking::TrackingManager;
use crate::utils::{AppError, AppResult, now_millis};

/// 连接状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// 已订阅，快照尚未写出
    Connecting,
    /// 快照已写出，正在转发事件
    Open,
    /// 客户端主动断开，停止转发
    Draining,
    /// 写失败或被总线丢弃，停止转发
    Closing,
    /// 已退订并关闭
    Closed,
}

/// 一条 live 连接的服务端任务
///
/// 独占持有自己的 [`Subscription`]；任务结束时保证退订，
/// 断连的订阅者最多只会在总线上留存到下一次 publish。
pub struct LiveChannel {
    subscription: Subscription,
    bus: Arc<EventBus>,
    state: ChannelState,
    heartbeat_interval: Duration,
    /// 单次写入的最后期限（heartbeat × dead multiplier）；
    /// 超过即认定连接死亡，主动拆除
    write_deadline: Duration,
    cancel: CancellationToken,
}

impl LiveChannel {
    pub fn new(
        subscription: Subscription,
        bus: Arc<EventBus>,
        heartbeat_interval: Duration,
        dead_multiplier: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            subscription,
            bus,
            state: ChannelState::Connecting,
            heartbeat_interval,
            write_deadline: heartbeat_interval * dead_multiplier.max(1),
            cancel,
        }
    }

    /// 运行连接直到断开；返回进入 `Closed` 前的最后一个状态
    ///
    /// 第一帧是快照帧（seq = 订阅水位），之后是事件帧与心跳帧。
    pub async fn run<S: FrameSink>(mut self, mut sink: S, snapshot_frame: LiveFrame) -> ChannelState {
        let order_id = self.subscription.order_id.clone();
        let subscription_id = self.subscription.id;

        // Connecting → Open：快照先行，新连接永不空白
        if let Err(e) = self.write(&mut sink, &snapshot_frame).await {
            tracing::debug!(order_id = %order_id, "Snapshot write failed: {}", e);
            self.state = ChannelState::Closing;
        } else {
            self.state = ChannelState::Open;
        }

        let mut last_write = Instant::now();
        let mut heartbeat = tokio::time::interval(self.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.state == ChannelState::Open {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    // 客户端走了，一帧都不再排
                    self.state = ChannelState::Draining;
                }

                maybe_event = self.subscription.receiver.recv() => {
                    match maybe_event {
                        Some(event) => {
                            let frame = LiveFrame::from_event(&event);
                            match self.write(&mut sink, &frame).await {
                                Ok(()) => last_write = Instant::now(),
                                Err(e) => {
                                    tracing::debug!(
                                        order_id = %order_id,
                                        subscription_id = %subscription_id,
                                        "Event write failed, closing: {}", e
                                    );
                                    self.state = ChannelState::Closing;
                                }
                            }
                        }
                        // 总线把我们丢了（溢出）或主题被驱逐；
                        // 客户端必须重连并用新快照重同步
                        None => self.state = ChannelState::Closing,
                    }
                }

                _ = heartbeat.tick() => {
                    if last_write.elapsed() >= self.heartbeat_interval {
                        let frame = LiveFrame::heartbeat(order_id.clone(), now_millis());
                        match self.write(&mut sink, &frame).await {
                            Ok(()) => last_write = Instant::now(),
                            Err(e) => {
                                tracing::debug!(
                                    order_id = %order_id,
                                    subscription_id = %subscription_id,
                                    "Heartbeat write failed, closing: {}", e
                                );
                                self.state = ChannelState::Closing;
                            }
                        }
                    }
                }
            }
        }

        let final_state = self.state;
        self.bus.unsubscribe(&order_id, subscription_id);
        let _ = sink.close().await;
        self.state = ChannelState::Closed;

        tracing::debug!(
            order_id = %order_id,
            subscription_id = %subscription_id,
            state = ?final_state,
            "Live channel closed"
        );
        final_state
    }

    async fn write<S: FrameSink>(&self, sink: &mut S, frame: &LiveFrame) -> AppResult<()> {
        match timeout(self.write_deadline, sink.write_frame(frame)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::ChannelWriteFailure(format!(
                "write exceeded {:?} deadline",
                self.write_deadline
            ))),
        }
    }
}

/// Live channel 管理器 - 打开连接的唯一入口
#[derive(Debug, Clone)]
pub struct LiveChannelManager {
    bus: Arc<EventBus>,
    tracking: Arc<TrackingManager>,
    heartbeat_interval: Duration,
    dead_multiplier: u32,
}

impl LiveChannelManager {
    pub fn new(
        bus: Arc<EventBus>,
        tracking: Arc<TrackingManager>,
        heartbeat_interval: Duration,
        dead_multiplier: u32,
    ) -> Self {
        Self {
            bus,
            tracking,
            heartbeat_interval,
            dead_multiplier,
        }
    }

    /// 打开一条 live 连接并运行到结束
    ///
    /// 先订阅再取快照：订阅之后发布的事件 seq 一定大于快照水位，
    /// 订阅者按 seq 应用即可，不丢也不重。
    pub async fn open<S: FrameSink>(
        &self,
        order_id: &str,
        sink: S,
        cancel: CancellationToken,
    ) -> AppResult<ChannelState> {
        let subscription = self.bus.subscribe(order_id);
        let snapshot_seq = subscription.snapshot_seq;

        let snapshot = match self.tracking.snapshot(order_id).await {
            Ok(s) => s,
            Err(e) => {
                self.bus.unsubscribe(order_id, subscription.id);
                return Err(e);
            }
        };

        let channel = LiveChannel::new(
            subscription,
            Arc::clone(&self.bus),
            self.heartbeat_interval,
            self.dead_multiplier,
            cancel,
        );
        let frame = LiveFrame::snapshot(&snapshot, snapshot_seq);
        Ok(channel.run(sink, frame).await)
    }
}
