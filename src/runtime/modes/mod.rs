//! 运行模式：常驻服务与一次性 CLI 命令

use anyhow::Result;
use tracing::info;

use crate::config::StaticConfig;
use crate::runtime::{listen_for_shutdown, prepare_startup};

/// 常驻模式：启动后台任务，直到收到 Ctrl+C
pub async fn run_serve(config: &StaticConfig) -> Result<()> {
    let ctx = prepare_startup(config).await?;
    info!(
        "ShortVault running with {} store, press Ctrl+C to stop",
        ctx.store.backend_name()
    );
    listen_for_shutdown(ctx).await;
    Ok(())
}

#[cfg(feature = "cli")]
pub async fn run_cli(
    cmd: crate::cli::Commands,
    config: &StaticConfig,
) -> std::result::Result<(), crate::interfaces::cli::CliError> {
    crate::interfaces::cli::run_cli_command(cmd, config).await
}
