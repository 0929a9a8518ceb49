//! 配置命令：generate / show

use std::path::Path;

use colored::Colorize;

use crate::config::{DEFAULT_CONFIG_PATH, StaticConfig};
use crate::interfaces::cli::CliError;

/// 生成示例配置文件
pub async fn generate_config(output_path: Option<String>, force: bool) -> Result<(), CliError> {
    let path = output_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    if Path::new(&path).exists() && !force {
        return Err(CliError::CommandError(format!(
            "{} already exists, use --force to overwrite",
            path
        )));
    }

    println!(
        "{} {}",
        "Generating configuration file...".yellow(),
        path.blue()
    );

    match StaticConfig::default().save_to_file(&path) {
        Ok(()) => {
            println!(
                "  {} {}",
                "Configuration file generated successfully".green(),
                path.blue()
            );
            Ok(())
        }
        Err(e) => {
            println!(
                "  {} {}",
                "Failed to generate configuration file".red(),
                e.to_string().red()
            );
            Err(CliError::CommandError(format!(
                "Unable to write configuration file: {}",
                e
            )))
        }
    }
}

/// 打印生效的配置（配置文件 + 环境变量覆盖）
pub fn show_config(config: &StaticConfig) -> Result<(), CliError> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| CliError::CommandError(format!("Failed to serialize config: {}", e)))?;
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_refuses_overwrite_without_force() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml").display().to_string();

        generate_config(Some(path.clone()), false).await.unwrap();
        assert!(Path::new(&path).exists());

        assert!(generate_config(Some(path.clone()), false).await.is_err());
        generate_config(Some(path), true).await.unwrap();
    }
}
