//! 命令行接口模块
//!
//! 一次性命令只构建组件、不启动后台任务，执行单个操作后退出。

pub mod commands;

use std::fmt;

use crate::cli::{Commands, ConfigCommands};
use crate::config::StaticConfig;
use crate::runtime::{StartupContext, build_context};
use commands::{
    create_link, delete_link, generate_config, get_link, run_health, run_sweep, show_config,
    show_stats,
};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// 格式化为纯文本输出
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// 格式化为彩色输出
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::VaultError> for CliError {
    fn from(err: crate::errors::VaultError) -> Self {
        use crate::errors::VaultError;
        match err {
            VaultError::Validation(msg) => CliError::ParseError(msg),
            VaultError::BackendUnavailable(_)
            | VaultError::DatabaseConfig(_)
            | VaultError::DatabaseOperation(_)
            | VaultError::FileOperation(_)
            | VaultError::Serialization(_) => CliError::StorageError(err.to_string()),
            other => CliError::CommandError(other.to_string()),
        }
    }
}

async fn connect(config: &StaticConfig) -> Result<StartupContext, CliError> {
    build_context(config)
        .await
        .map_err(|e| CliError::StorageError(format!("{:#}", e)))
}

/// 执行一次性命令，`serve` 由二进制入口处理
pub async fn run_cli_command(cmd: Commands, config: &StaticConfig) -> Result<(), CliError> {
    // 生成配置不需要连接任何后端
    if let Commands::Config { action } = cmd {
        return match action {
            ConfigCommands::Generate { output_path, force } => {
                generate_config(output_path, force).await
            }
            ConfigCommands::Show => show_config(config),
        };
    }

    let ctx = connect(config).await?;
    match cmd {
        Commands::Create {
            target_url,
            alias,
            expire_after,
        } => create_link(&ctx, target_url, alias, expire_after).await,
        Commands::Get { id } => get_link(&ctx, &id).await,
        Commands::Delete { id, secret } => delete_link(&ctx, &id, &secret).await,
        Commands::Stats { id } => show_stats(&ctx, &id).await,
        Commands::Sweep { dry_run } => run_sweep(&ctx, dry_run).await,
        Commands::Health { json } => run_health(&ctx, json).await,
        Commands::Serve | Commands::Config { .. } => Err(CliError::CommandError(
            "Command must be dispatched by the binary entry point".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::VaultError;

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            CliError::from(VaultError::validation("bad url")),
            CliError::ParseError(_)
        ));
        assert!(matches!(
            CliError::from(VaultError::file_operation("disk full")),
            CliError::StorageError(_)
        ));
        assert!(matches!(
            CliError::from(VaultError::not_found("x")),
            CliError::CommandError(_)
        ));
    }

    #[test]
    fn test_format_simple() {
        let err = CliError::CommandError("boom".to_string());
        assert_eq!(err.format_simple(), "Command error: boom");
        assert_eq!(err.to_string(), "Command error: boom");
    }
}
