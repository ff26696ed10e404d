// ==========================================
// 销售预算报表系统 - HTTP 服务入口
// ==========================================
// 环境变量: SALES_REPORT_DB_PATH / SALES_REPORT_BIND / RUST_LOG
// ==========================================

use std::sync::Arc;

use anyhow::Context;
use sales_budget_report::app::{build_router, get_bind_addr, get_default_db_path, AppState};
use sales_budget_report::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", sales_budget_report::APP_NAME);
    tracing::info!("系统版本: {}", sales_budget_report::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let app_state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let router = build_router(Arc::new(app_state));

    let bind_addr = get_bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("无法监听地址 {}", bind_addr))?;
    tracing::info!("HTTP 服务已启动: http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    tracing::info!("HTTP 服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听退出信号: {}", e);
    }
}
