/// 服务器配置 - 追踪引擎的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP/WS 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | HEARTBEAT_INTERVAL_SECS | 25 | live channel 心跳间隔(秒) |
/// | HEARTBEAT_DEAD_MULTIPLIER | 3 | 判定连接死亡的心跳倍数 |
/// | SUBSCRIBER_QUEUE_CAPACITY | 32 | 每个订阅者的出站缓冲容量 |
/// | FIREHOSE_CAPACITY | 1024 | 全局事件广播通道容量 |
/// | RETENTION_WINDOW_SECS | 300 | 送达后记录保留窗口(秒) |
/// | EVICTION_INTERVAL_SECS | 60 | 过期记录清扫间隔(秒) |
/// | POLL_INTERVAL_SECS | 5 | 轮询接口建议的最小拉取间隔(秒) |
///
/// # 示例
///
/// ```ignore
/// HTTP_PORT=8080 HEARTBEAT_INTERVAL_SECS=15 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP/WS API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === Live channel ===
    /// 心跳间隔 (秒)：该窗口内没有真实事件时发送 keep-alive 帧
    pub heartbeat_interval_secs: u64,
    /// 连续 N 个心跳窗口没有成功写入则主动拆除连接
    pub heartbeat_dead_multiplier: u32,

    // === Event bus ===
    /// 每个订阅者的出站缓冲容量；写满即丢弃订阅者（防止慢消费者反压总线）
    pub subscriber_queue_capacity: usize,
    /// 通知分发器消费的全局广播通道容量
    pub firehose_capacity: usize,

    // === Record lifecycle ===
    /// 送达后记录保留窗口 (秒)，供迟到的观看者拉取快照
    pub retention_window_secs: u64,
    /// 过期记录清扫任务的运行间隔 (秒)
    pub eviction_interval_secs: u64,

    // === Polling facade ===
    /// 返回给轮询客户端的建议最小拉取间隔 (秒)
    pub poll_interval_secs: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            http_port: env_parse("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            heartbeat_interval_secs: env_parse("HEARTBEAT_INTERVAL_SECS", 25),
            heartbeat_dead_multiplier: env_parse("HEARTBEAT_DEAD_MULTIPLIER", 3),
            subscriber_queue_capacity: env_parse("SUBSCRIBER_QUEUE_CAPACITY", 32),
            firehose_capacity: env_parse("FIREHOSE_CAPACITY", 1024),
            retention_window_secs: env_parse("RETENTION_WINDOW_SECS", 300),
            eviction_interval_secs: env_parse("EVICTION_INTERVAL_SECS", 60),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", 5),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            environment: "development".into(),
            heartbeat_interval_secs: 25,
            heartbeat_dead_multiplier: 3,
            subscriber_queue_capacity: 32,
            firehose_capacity: 1024,
            retention_window_secs: 300,
            eviction_interval_secs: 60,
            poll_interval_secs: 5,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
