//! 写穿缓存装饰器
//!
//! 存储调用缓存，缓存从不调用存储。缓存失败只记录日志，
//! 不会让底层的读写失败。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{trace, warn};

use super::{LinkPool, RecordStore, RedirectTemplate, ShortRecord};
use crate::cache::{CacheResult, RecordCache};
use crate::errors::Result;

pub struct CachedStore {
    inner: Arc<dyn RecordStore>,
    cache: Arc<dyn RecordCache>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn RecordStore>, cache: Arc<dyn RecordCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<dyn RecordCache> {
        &self.cache
    }
}

#[async_trait]
impl RecordStore for CachedStore {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    fn supports_native_ttl(&self) -> bool {
        self.inner.supports_native_ttl()
    }

    async fn save(&self, record: &ShortRecord) -> Result<()> {
        self.inner.save(record).await?;
        if let Err(e) = self.cache.update_cache(record).await {
            warn!("Cache update failed for {}: {}", record.id, e);
        }
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<ShortRecord>> {
        match self.cache.get(id).await {
            CacheResult::Found(record) => return Ok(Some(record)),
            CacheResult::NotFound => return Ok(None),
            CacheResult::Miss => trace!("Cache miss, loading {} from {}", id, self.backend_name()),
        }

        let found = self.inner.find(id).await?;
        let populated = match &found {
            Some(record) => self.cache.update_cache(record).await,
            None => self.cache.mark_absent(id).await,
        };
        if let Err(e) = populated {
            warn!("Cache population failed for {}: {}", id, e);
        }
        Ok(found)
    }

    /// 可用性判断直接查询底层存储，不受负缓存或失效消息丢失影响
    async fn is_available(&self, id: &str) -> Result<bool> {
        self.inner.is_available(id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id).await?;
        if let Err(e) = self.cache.break_cache(id).await {
            warn!("Cache invalidation failed for {}: {}", id, e);
        }
        Ok(())
    }

    async fn find_expired(&self) -> Result<Vec<ShortRecord>> {
        self.inner.find_expired().await
    }

    async fn last_expiration_check(&self) -> Result<Option<DateTime<Utc>>> {
        self.inner.last_expiration_check().await
    }

    async fn update_last_expiration_check(&self, at: DateTime<Utc>) -> Result<()> {
        self.inner.update_last_expiration_check(at).await
    }

    async fn find_templates(&self) -> Result<Vec<RedirectTemplate>> {
        self.inner.find_templates().await
    }

    async fn save_template(&self, template: &RedirectTemplate) -> Result<()> {
        self.inner.save_template(template).await
    }

    async fn find_pool(&self, id: &str) -> Result<Option<LinkPool>> {
        self.inner.find_pool(id).await
    }

    async fn save_pool(&self, pool: &LinkPool) -> Result<()> {
        self.inner.save_pool(pool).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}
