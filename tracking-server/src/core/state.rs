//! 服务器状态 - 持有所有服务的单例引用

use std::sync::Arc;
use std::time::Duration;

use crate::bus::EventBus;
use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::directory::OrderDirectory;
use crate::live::LiveChannelManager;
use crate::location::LocationStore;
use crate::notify::{AlertSink, NotificationDispatcher};
use crate::tracking::TrackingManager;
use crate::utils::now_millis;

/// 服务器状态 - 追踪引擎的核心数据结构
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Arc<Config> | 配置项 (不可变) |
/// | bus | Arc<EventBus> | 事件总线 (seq 分配 + 扇出) |
/// | locations | Arc<LocationStore> | 配送员位置槽位 |
/// | tracking | Arc<TrackingManager> | 追踪记录与状态机 |
/// | live | Arc<LiveChannelManager> | live 连接入口 |
/// | alert_sink | Arc<dyn AlertSink> | 外部通知面端口 |
#[derive(Debug, Clone)]
pub struct ServerState {
    config: Arc<Config>,
    bus: Arc<EventBus>,
    locations: Arc<LocationStore>,
    tracking: Arc<TrackingManager>,
    live: Arc<LiveChannelManager>,
    alert_sink: Arc<dyn AlertSink>,
}

impl ServerState {
    /// 装配所有服务
    ///
    /// 持久层和通知面是外部协作者，由调用方注入。
    pub fn initialize(
        config: &Config,
        directory: Arc<dyn OrderDirectory>,
        alert_sink: Arc<dyn AlertSink>,
    ) -> Self {
        let bus = Arc::new(EventBus::new(
            config.subscriber_queue_capacity,
            config.firehose_capacity,
        ));
        let locations = Arc::new(LocationStore::new(Arc::clone(&bus)));
        let tracking = Arc::new(TrackingManager::new(
            Arc::clone(&bus),
            Arc::clone(&locations),
            directory,
            (config.retention_window_secs * 1000) as i64,
        ));
        let live = Arc::new(LiveChannelManager::new(
            Arc::clone(&bus),
            Arc::clone(&tracking),
            Duration::from_secs(config.heartbeat_interval_secs),
            config.heartbeat_dead_multiplier,
        ));

        Self {
            config: Arc::new(config.clone()),
            bus,
            locations,
            tracking,
            live,
            alert_sink,
        }
    }

    /// 启动后台任务（通知分发器 + 过期记录清扫）
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let dispatcher = NotificationDispatcher::new(
            self.bus.subscribe_firehose(),
            Arc::clone(&self.alert_sink),
            tasks.shutdown_token(),
        );
        tasks.spawn("notification_dispatcher", TaskKind::Worker, async move {
            dispatcher.run().await;
        });

        let tracking = Arc::clone(&self.tracking);
        let interval = Duration::from_secs(self.config.eviction_interval_secs);
        let token = tasks.shutdown_token();
        tasks.spawn("record_eviction", TaskKind::Periodic, async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => {
                        let evicted = tracking.evict_expired(now_millis());
                        if evicted > 0 {
                            tracing::info!(evicted, "Evicted expired tracking records");
                        }
                    }
                }
            }
        });
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn locations(&self) -> &Arc<LocationStore> {
        &self.locations
    }

    pub fn tracking(&self) -> &Arc<TrackingManager> {
        &self.tracking
    }

    pub fn live(&self) -> &Arc<LiveChannelManager> {
        &self.live
    }
}
