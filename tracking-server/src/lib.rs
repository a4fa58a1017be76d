//! Tracking Server - 实时订单追踪与配送通知引擎
//!
//! # 架构概述
//!
//! 后端上报的配送事件（状态变更、GPS ping）经由进程内事件总线，
//! 有序、去重地扇出到每个订单的所有观看者；无法保持长连接的客户端
//! 退化为轮询同一套快照实现。
//!
//! ```text
//! POST status ──► TrackingManager ──┐
//! POST location ─► LocationStore ───┤ publish
//!                                   ▼
//!                               EventBus ──┬─► Live Channels (WS)
//!                                          └─► NotificationDispatcher
//! GET snapshot ──► TrackingManager::snapshot (纯读，与 live 首帧共用)
//! ```
//!
//! # 模块结构
//!
//! ```text
//! tracking-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── api/           # HTTP/WS 路由和处理器
//! ├── bus/           # 事件总线 (seq 分配 + per-order 扇出)
//! ├── tracking/      # 状态机应用与追踪记录
//! ├── location/      # 配送员位置 latest-wins 槽位
//! ├── live/          # live 连接任务与 FrameSink 抽象
//! ├── notify/        # 通知分发器
//! ├── directory/     # 外部持久层端口
//! └── utils/         # 错误、日志、时间工具
//! ```

pub mod api;
pub mod bus;
pub mod core;
pub mod directory;
pub mod live;
pub mod location;
pub mod notify;
pub mod tracking;
pub mod utils;

// Re-export 公共类型
pub use bus::{EventBus, Subscription};
pub use core::{BackgroundTasks, Config, Server, ServerState, TaskKind};
pub use directory::{MemoryDirectory, OrderDirectory, OrderSeed};
pub use live::{ChannelState, LiveChannel, LiveChannelManager, MemorySink};
pub use location::{LocationStore, RecordOutcome};
pub use notify::{Alert, AlertSink, RecordingAlertSink, TracingAlertSink};
pub use tracking::TrackingManager;
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置进程环境 (dotenv + 日志)
pub fn setup_environment() {
    dotenv::dotenv().ok();
    init_logger();
}

/// 打印启动横幅
pub fn print_banner() {
    println!(
        r"
  ╔═══════════════════════════════════════╗
  ║   Delivery Tracking Server  v{}    ║
  ╚═══════════════════════════════════════╝
",
        env!("CARGO_PKG_VERSION")
    );
}
