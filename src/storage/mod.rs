//! 持久化层：记录存储契约、统计计数契约与各后端实现

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::cache::RecordCache;
use crate::config::{PersistentBackend, StaticConfig, StatsBackend};
use crate::errors::Result;

pub mod backend;
pub mod cached;
pub mod models;

pub use backend::{DatabaseStore, FileStore, MemoryStats, MemoryStore, RedisStore};
pub use cached::CachedStore;
pub use models::{LinkPool, LinkStats, RedirectTemplate, ShortRecord};

/// 元数据键：上次过期扫描完成时间
pub const LAST_EXPIRATION_CHECK_KEY: &str = "last_expiration_check";

/// 短链接记录存储
///
/// 每个后端都实现同一套契约。`save` 按 ID 无条件覆盖，
/// 可用性检查由调用方在写入前完成。
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// 引擎自带按键过期（不需要过期扫描）
    fn supports_native_ttl(&self) -> bool {
        false
    }

    async fn save(&self, record: &ShortRecord) -> Result<()>;

    async fn find(&self, id: &str) -> Result<Option<ShortRecord>>;

    /// 删除不存在的 ID 不是错误
    async fn delete(&self, id: &str) -> Result<()>;

    /// ID 未被占用，或占用它的记录已过期
    async fn is_available(&self, id: &str) -> Result<bool> {
        Ok(match self.find(id).await? {
            None => true,
            Some(record) => record.is_expired(),
        })
    }

    async fn find_expired(&self) -> Result<Vec<ShortRecord>>;

    async fn last_expiration_check(&self) -> Result<Option<DateTime<Utc>>>;

    async fn update_last_expiration_check(&self, at: DateTime<Utc>) -> Result<()>;

    async fn find_templates(&self) -> Result<Vec<RedirectTemplate>>;

    async fn save_template(&self, template: &RedirectTemplate) -> Result<()>;

    async fn find_pool(&self, id: &str) -> Result<Option<LinkPool>>;

    async fn save_pool(&self, pool: &LinkPool) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

/// 访问计数存储
#[async_trait]
pub trait StatsStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn add_stats(&self, id: &str) -> Result<()>;

    async fn find_stats(&self, id: &str) -> Result<Option<LinkStats>>;

    async fn delete_stats(&self, id: &str) -> Result<()>;

    /// 写入一个短 TTL 的哨兵值，证明后端可写
    async fn heartbeat(&self) -> Result<()>;
}

pub struct StorageFactory;

impl StorageFactory {
    /// 按配置创建记录存储
    ///
    /// 没有原生 TTL 的后端（file / database）在提供缓存时会被 `CachedStore` 包装，
    /// redis 与 memory 本身就是键值缓存，直接使用。
    pub async fn create_record_store(
        config: &StaticConfig,
        cache: Option<Arc<dyn RecordCache>>,
    ) -> Result<Arc<dyn RecordStore>> {
        let backend = config.backends.persistent;
        let store: Arc<dyn RecordStore> = match backend {
            PersistentBackend::File => {
                Arc::new(FileStore::open(&config.database.file.path).await?)
            }
            PersistentBackend::Database => {
                Arc::new(DatabaseStore::new(&config.database.sql).await?)
            }
            PersistentBackend::Redis => Arc::new(
                RedisStore::connect(
                    &config.database.redis.url,
                    &config.database.redis.key_prefix,
                )
                .await?,
            ),
            PersistentBackend::Memory => Arc::new(MemoryStore::new()),
        };

        info!(
            "Record store initialized: {} (native ttl: {})",
            store.backend_name(),
            store.supports_native_ttl()
        );

        match cache {
            Some(cache) if !store.supports_native_ttl() => {
                info!("Write-through cache enabled: {}", cache.cache_name());
                Ok(Arc::new(CachedStore::new(store, cache)))
            }
            _ => Ok(store),
        }
    }

    /// 按配置创建统计存储，`none` 时返回 `None`
    pub async fn create_stats_store(config: &StaticConfig) -> Result<Option<Arc<dyn StatsStore>>> {
        let stats: Option<Arc<dyn StatsStore>> = match config.backends.stats {
            StatsBackend::Redis => Some(Arc::new(
                RedisStore::connect(
                    &config.database.redis.url,
                    &config.database.redis.key_prefix,
                )
                .await?,
            )),
            StatsBackend::Memory => Some(Arc::new(MemoryStats::new())),
            StatsBackend::None => None,
        };

        if let Some(stats) = &stats {
            info!("Stats store initialized: {}", stats.backend_name());
        }
        Ok(stats)
    }
}
