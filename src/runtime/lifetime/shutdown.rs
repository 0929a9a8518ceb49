use std::time::Duration;

use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::startup::StartupContext;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 单个任务超时时间（秒）
const TASK_TIMEOUT_SECS: u64 = 10;

/// 等待 Ctrl+C，然后关闭所有后台任务
pub async fn listen_for_shutdown(ctx: StartupContext) {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping background tasks..."),
        Err(e) => warn!(
            "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
            e
        ),
    }

    if timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), shutdown(ctx))
        .await
        .is_err()
    {
        error!(
            "Shutdown timed out after {} seconds, abandoning remaining tasks",
            SHUTDOWN_TIMEOUT_SECS
        );
    }
}

/// 发送停止信号、关闭总线（结束订阅循环），再逐个等待任务退出
pub async fn shutdown(ctx: StartupContext) {
    let StartupContext { bus, tasks, .. } = ctx;

    for (name, stop) in tasks.stops {
        if stop.send(()).is_err() {
            warn!("Task {} already exited before stop signal", name);
        }
    }

    if let Some(bus) = &bus
        && let Err(e) = bus.close().await
    {
        error!("Failed to close invalidation bus: {}", e);
    }

    for (name, handle) in tasks.handles {
        match timeout(Duration::from_secs(TASK_TIMEOUT_SECS), handle).await {
            Ok(Ok(())) => info!("Task {} stopped", name),
            Ok(Err(e)) => error!("Task {} failed: {}", name, e),
            Err(_) => error!(
                "Task {} did not stop within {} seconds",
                name, TASK_TIMEOUT_SECS
            ),
        }
    }

    info!("All background tasks stopped");
}
