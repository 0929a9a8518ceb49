use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::{CacheMode, PubSubBackend, StaticConfig};
use crate::errors::{Result, VaultError};

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 获取全局配置实例
///
/// 返回配置的 Arc 指针，不持有任何锁。未调用 `init_config` 时使用默认值。
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// 从 `path`（或 `CONFIG_PATH`、`config.toml`）初始化全局配置
///
/// 重复调用保留首次加载的配置
pub fn init_config(path: Option<&str>) -> Arc<StaticConfig> {
    let env_path = std::env::var("CONFIG_PATH").ok();
    let path = path
        .map(str::to_string)
        .or(env_path)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::load(&path)))
        .load_full()
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 SV，分隔符 __
            .add_source(
                Environment::with_prefix("SV")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 检查后端组合是否合法
    ///
    /// 共享缓存必须有一条失效总线，否则各进程的本地副本永远不会被淘汰。
    pub fn validate(&self) -> Result<()> {
        if self.backends.cache == CacheMode::Shared && self.backends.pubsub == PubSubBackend::None
        {
            return Err(VaultError::database_config(
                "cache = \"shared\" requires a pubsub backend (redis or memory)",
            ));
        }
        if self.id_generator.length == 0 {
            return Err(VaultError::database_config(
                "id_generator.length must be greater than 0",
            ));
        }
        if self.id_generator.max_attempts == 0 {
            return Err(VaultError::database_config(
                "id_generator.max_attempts must be greater than 0",
            ));
        }
        if self.expiration.check_interval_secs == 0 || self.heartbeat.interval_secs == 0 {
            return Err(VaultError::database_config(
                "background task intervals must be greater than 0",
            ));
        }
        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VaultError::serialization(format!("TOML encode failed: {}", e)))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheMode, PersistentBackend, PubSubBackend, StatsBackend};

    #[test]
    fn test_defaults() {
        let config = StaticConfig::default();
        assert_eq!(config.backends.persistent, PersistentBackend::File);
        assert_eq!(config.backends.stats, StatsBackend::Memory);
        assert_eq!(config.backends.pubsub, PubSubBackend::None);
        assert_eq!(config.backends.cache, CacheMode::Local);
        assert_eq!(config.expiration.check_interval_secs, 300);
        assert!(!config.expiration.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shared_cache_requires_pubsub() {
        let mut config = StaticConfig::default();
        config.backends.cache = CacheMode::Shared;
        assert!(config.validate().is_err());

        config.backends.pubsub = PubSubBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shortvault.toml");
        std::fs::write(
            &path,
            r#"
[backends]
persistent = "database"
cache = "shared"
pubsub = "redis"

[expiration]
check_interval_secs = 60
dry_run = true
"#,
        )
        .unwrap();

        let config = StaticConfig::load(path.to_str().unwrap());
        assert_eq!(config.backends.persistent, PersistentBackend::Database);
        assert_eq!(config.backends.cache, CacheMode::Shared);
        assert_eq!(config.backends.pubsub, PubSubBackend::Redis);
        assert_eq!(config.expiration.check_interval_secs, 60);
        assert!(config.expiration.dry_run);
        // 未指定的字段使用默认值
        assert_eq!(config.id_generator.length, 6);
    }

    #[test]
    fn test_sample_config_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        StaticConfig::default().save_to_file(&path).unwrap();

        let loaded = StaticConfig::load(path.to_str().unwrap());
        assert_eq!(loaded.database.redis.key_prefix, "sv:");
        assert_eq!(loaded.blocked_hosts, vec!["localhost".to_string()]);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!(
            "Redis".parse::<PersistentBackend>().unwrap(),
            PersistentBackend::Redis
        );
        let err = "mongo".parse::<PersistentBackend>().unwrap_err();
        assert!(err.contains("'mongo'"));
        assert!(err.contains("file") && err.contains("redis"));
        assert_eq!(CacheMode::Shared.to_string(), "shared");
    }
}
