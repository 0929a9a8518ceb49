use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

/// 持久化存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumIter, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PersistentBackend {
    /// 嵌入式单文件存储
    #[default]
    File,
    /// 关系型数据库（SQLite / MySQL / PostgreSQL）
    Database,
    /// Redis 键值存储，原生 TTL
    Redis,
    /// 进程内键值存储，原生 TTL
    Memory,
}

/// 统计计数器后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumIter, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatsBackend {
    Redis,
    #[default]
    Memory,
    None,
}

/// 失效广播总线后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumIter, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PubSubBackend {
    Redis,
    Memory,
    #[default]
    None,
}

/// 缓存层类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumIter, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CacheMode {
    /// 进程内缓存，仅适用于单进程部署
    #[default]
    Local,
    /// 通过失效总线在多个进程间保持一致
    Shared,
    None,
}

macro_rules! impl_from_str_lowercase {
    ($ty:ty, $label:expr) => {
        impl std::str::FromStr for $ty {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                use strum::IntoEnumIterator;
                let lower = s.to_lowercase();
                <$ty>::iter()
                    .find(|v| v.as_ref() == lower)
                    .ok_or_else(|| {
                        let valid: Vec<String> =
                            <$ty>::iter().map(|v| v.as_ref().to_string()).collect();
                        format!("Invalid {}: '{}'. Valid: {}", $label, s, valid.join(", "))
                    })
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_ref())
            }
        }
    };
}

impl_from_str_lowercase!(PersistentBackend, "persistent backend");
impl_from_str_lowercase!(StatsBackend, "stats backend");
impl_from_str_lowercase!(PubSubBackend, "pubsub backend");
impl_from_str_lowercase!(CacheMode, "cache mode");

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 优先级：ENV > config.toml > 默认值
/// ENV 前缀：SV，分隔符：__
/// 示例：SV__BACKENDS__PERSISTENT=redis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub expiration: ExpirationConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub id_generator: IdGeneratorConfig,
    #[serde(default = "default_blocked_hosts")]
    pub blocked_hosts: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            backends: BackendsConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            expiration: ExpirationConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            id_generator: IdGeneratorConfig::default(),
            blocked_hosts: default_blocked_hosts(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendsConfig {
    #[serde(default)]
    pub persistent: PersistentBackend,
    #[serde(default)]
    pub stats: StatsBackend,
    #[serde(default)]
    pub pubsub: PubSubBackend,
    #[serde(default)]
    pub cache: CacheMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub file: FileConfig,
    #[serde(default)]
    pub sql: SqlConfig,
    #[serde(default)]
    pub redis: RedisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_file_path")]
    pub path: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: default_file_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 负缓存 TTL（秒），0 表示关闭负缓存
    #[serde(default = "default_negative_ttl_secs")]
    pub negative_ttl_secs: u64,
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
    /// 重新订阅前的初始等待（毫秒），0 表示立即重连
    #[serde(default)]
    pub resubscribe_backoff_ms: u64,
    #[serde(default = "default_resubscribe_max_backoff_ms")]
    pub resubscribe_max_backoff_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            negative_ttl_secs: default_negative_ttl_secs(),
            channel_prefix: default_channel_prefix(),
            resubscribe_backoff_ms: 0,
            resubscribe_max_backoff_ms: default_resubscribe_max_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirationConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_heartbeat_interval_secs(),
            timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGeneratorConfig {
    #[serde(default = "default_id_length")]
    pub length: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_secret_length")]
    pub secret_length: usize,
}

impl Default for IdGeneratorConfig {
    fn default() -> Self {
        Self {
            length: default_id_length(),
            max_attempts: default_max_attempts(),
            secret_length: default_secret_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub enable_rotation: bool,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            enable_rotation: false,
            max_backups: default_max_backups(),
        }
    }
}

fn default_blocked_hosts() -> Vec<String> {
    vec!["localhost".to_string()]
}

fn default_file_path() -> String {
    "shortvault.db.json".to_string()
}

fn default_database_url() -> String {
    "sqlite://shortvault.sqlite?mode=rwc".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_redis_key_prefix() -> String {
    "sv:".to_string()
}

fn default_negative_ttl_secs() -> u64 {
    30
}

fn default_channel_prefix() -> String {
    "shortvault:cache".to_string()
}

fn default_resubscribe_max_backoff_ms() -> u64 {
    5000
}

fn default_check_interval_secs() -> u64 {
    300
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_heartbeat_timeout_ms() -> u64 {
    2000
}

fn default_id_length() -> usize {
    6
}

fn default_max_attempts() -> u32 {
    16
}

fn default_secret_length() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}
