//! Redis 后端：原生按键 TTL，兼做统计计数与心跳
//!
//! 键布局（均带 `key_prefix`）：
//! - `url::{id}`：记录 JSON，临时链接以 `EX` 设置剩余寿命
//! - `stats::{id}::count:g` / `stats::{id}::count:60`：累计与最近一小时计数
//! - `templates`：哈希表，字段为模板 URL
//! - `pool::{id}`：短码池 JSON
//! - `meta::{key}` / `heartbeat`

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info};

use super::RECENT_WINDOW_SECS;
use crate::errors::{Result, VaultError};
use crate::storage::{
    LAST_EXPIRATION_CHECK_KEY, LinkPool, LinkStats, RecordStore, RedirectTemplate, ShortRecord,
    StatsStore,
};

const HEARTBEAT_TTL_SECS: u64 = 1;

pub struct RedisStore {
    manager: ConnectionManager,
    key_prefix: String,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, key_prefix: &str) -> Result<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            VaultError::database_config(format!("Invalid Redis URL '{}': {}", redis_url, e))
        })?;
        let manager = ConnectionManager::new(client).await.map_err(|e| {
            VaultError::backend_unavailable(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut conn = manager.clone();
        conn.ping::<()>().await?;

        Ok(Self {
            manager,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}{}", self.key_prefix, suffix)
    }

    fn url_key(&self, id: &str) -> String {
        self.key(&format!("url::{}", id))
    }

    fn total_key(&self, id: &str) -> String {
        self.key(&format!("stats::{}::count:g", id))
    }

    fn recent_key(&self, id: &str) -> String {
        self.key(&format!("stats::{}::count:60", id))
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    fn supports_native_ttl(&self) -> bool {
        true
    }

    async fn save(&self, record: &ShortRecord) -> Result<()> {
        let key = self.url_key(&record.id);
        let payload = serde_json::to_string(record)?;
        let mut conn = self.manager.clone();

        // 已经过期的记录不写入
        if record.is_expired() {
            conn.del::<_, ()>(&key).await?;
        } else {
            match record.remaining_ttl_secs() {
                Some(ttl) => conn.set_ex::<_, _, ()>(&key, payload, ttl.max(1)).await?,
                None => conn.set::<_, _, ()>(&key, payload).await?,
            }
        }

        debug!("Short URL saved to Redis: {}", record.id);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<ShortRecord>> {
        let mut conn = self.manager.clone();
        let data: Option<String> = conn.get(self.url_key(id)).await?;
        Ok(data.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(self.url_key(id)).await?;
        Ok(())
    }

    /// 过期由 Redis 自己回收
    async fn find_expired(&self) -> Result<Vec<ShortRecord>> {
        Ok(Vec::new())
    }

    async fn last_expiration_check(&self) -> Result<Option<DateTime<Utc>>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn
            .get(self.key(&format!("meta::{}", LAST_EXPIRATION_CHECK_KEY)))
            .await?;
        value
            .map(|v| {
                DateTime::parse_from_rfc3339(&v)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| VaultError::serialization(e.to_string()))
            })
            .transpose()
    }

    async fn update_last_expiration_check(&self, at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(
            self.key(&format!("meta::{}", LAST_EXPIRATION_CHECK_KEY)),
            at.to_rfc3339(),
        )
        .await?;
        Ok(())
    }

    async fn find_templates(&self) -> Result<Vec<RedirectTemplate>> {
        let mut conn = self.manager.clone();
        let all: HashMap<String, String> = conn.hgetall(self.key("templates")).await?;
        all.values()
            .map(|v| serde_json::from_str(v).map_err(VaultError::from))
            .collect()
    }

    async fn save_template(&self, template: &RedirectTemplate) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.hset::<_, _, _, ()>(
            self.key("templates"),
            &template.template_url,
            serde_json::to_string(template)?,
        )
        .await?;
        Ok(())
    }

    async fn find_pool(&self, id: &str) -> Result<Option<LinkPool>> {
        let mut conn = self.manager.clone();
        let data: Option<String> = conn.get(self.key(&format!("pool::{}", id))).await?;
        Ok(data.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    async fn save_pool(&self, pool: &LinkPool) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(
            self.key(&format!("pool::{}", pool.id)),
            serde_json::to_string(pool)?,
        )
        .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.ping::<()>().await?;
        Ok(())
    }
}

#[async_trait]
impl StatsStore for RedisStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    /// 最近计数在首次创建时设置一小时过期，之后的递增不刷新过期时间
    async fn add_stats(&self, id: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.incr::<_, _, ()>(self.total_key(id), 1).await?;

        let recent_key = self.recent_key(id);
        let recent: u64 = conn.incr(&recent_key, 1).await?;
        if recent == 1 {
            conn.expire::<_, ()>(&recent_key, RECENT_WINDOW_SECS as i64)
                .await?;
        }
        Ok(())
    }

    async fn find_stats(&self, id: &str) -> Result<Option<LinkStats>> {
        let mut conn = self.manager.clone();
        let total: Option<u64> = conn.get(self.total_key(id)).await?;
        let Some(total) = total else {
            return Ok(None);
        };
        let recent: Option<u64> = conn.get(self.recent_key(id)).await?;
        Ok(Some(LinkStats {
            total,
            recent: recent.unwrap_or(0),
        }))
    }

    async fn delete_stats(&self, id: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(&[self.total_key(id), self.recent_key(id)])
            .await?;
        Ok(())
    }

    async fn heartbeat(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(self.key("heartbeat"), 1, HEARTBEAT_TTL_SECS)
            .await?;
        Ok(())
    }
}
