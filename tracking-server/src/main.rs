use std::sync::Arc;

use tracking_server::{
    Config, MemoryDirectory, Server, ServerState, TracingAlertSink, print_banner,
    setup_environment,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 日志)
    setup_environment();

    // 打印横幅
    print_banner();

    tracing::info!("🛵 Tracking server starting...");

    // 2. 加载配置
    let config = Config::from_env();

    // 3. 初始化服务器状态
    //
    // 单机部署默认用内存持久层和日志通知面；
    // 接真实持久层/推送面时在这里替换注入。
    let directory = Arc::new(MemoryDirectory::new());
    let alert_sink = Arc::new(TracingAlertSink);
    let state = ServerState::initialize(&config, directory, alert_sink);

    // 4. 启动 HTTP/WS 服务器 (Server::run 会自动启动后台任务)
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
