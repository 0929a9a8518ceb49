//! 进程内后端
//!
//! `MemoryStore` 用 moka 的逐条过期策略实现原生 TTL；
//! `MemoryStats` 用 dashmap 保存累计计数，最近计数放在按写入时间过期的 moka 缓存里。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;
use tracing::trace;

use super::RECENT_WINDOW_SECS;
use crate::errors::Result;
use crate::storage::{
    LAST_EXPIRATION_CHECK_KEY, LinkPool, LinkStats, RecordStore, RedirectTemplate, ShortRecord,
    StatsStore,
};

/// 按记录自身的 `expires_at` 计算剩余寿命
struct RecordExpiry;

impl RecordExpiry {
    fn remaining(record: &ShortRecord) -> Option<Duration> {
        record
            .expires_at
            .map(|exp| (exp - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

impl Expiry<String, ShortRecord> for RecordExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &ShortRecord,
        _created_at: Instant,
    ) -> Option<Duration> {
        Self::remaining(value)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &ShortRecord,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Self::remaining(value)
    }
}

pub struct MemoryStore {
    records: Cache<String, ShortRecord>,
    meta: DashMap<String, DateTime<Utc>>,
    templates: DashMap<String, RedirectTemplate>,
    pools: DashMap<String, LinkPool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Cache::builder().expire_after(RecordExpiry).build(),
            meta: DashMap::new(),
            templates: DashMap::new(),
            pools: DashMap::new(),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn supports_native_ttl(&self) -> bool {
        true
    }

    async fn save(&self, record: &ShortRecord) -> Result<()> {
        self.records.insert(record.id.clone(), record.clone()).await;
        trace!("Short URL saved in memory: {}", record.id);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<ShortRecord>> {
        Ok(self.records.get(id).await)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records.invalidate(id).await;
        Ok(())
    }

    async fn find_expired(&self) -> Result<Vec<ShortRecord>> {
        Ok(Vec::new())
    }

    async fn last_expiration_check(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.meta.get(LAST_EXPIRATION_CHECK_KEY).map(|v| *v))
    }

    async fn update_last_expiration_check(&self, at: DateTime<Utc>) -> Result<()> {
        self.meta.insert(LAST_EXPIRATION_CHECK_KEY.to_string(), at);
        Ok(())
    }

    async fn find_templates(&self) -> Result<Vec<RedirectTemplate>> {
        Ok(self.templates.iter().map(|e| e.value().clone()).collect())
    }

    async fn save_template(&self, template: &RedirectTemplate) -> Result<()> {
        self.templates
            .insert(template.template_url.clone(), template.clone());
        Ok(())
    }

    async fn find_pool(&self, id: &str) -> Result<Option<LinkPool>> {
        Ok(self.pools.get(id).map(|p| p.value().clone()))
    }

    async fn save_pool(&self, pool: &LinkPool) -> Result<()> {
        self.pools.insert(pool.id.clone(), pool.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MemoryStats {
    totals: DashMap<String, u64>,
    /// 条目自创建起 `window` 后过期，递增不会刷新过期时间
    recent: Cache<String, Arc<AtomicU64>>,
    heartbeat: Cache<String, ()>,
}

impl Default for MemoryStats {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(RECENT_WINDOW_SECS))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            totals: DashMap::new(),
            recent: Cache::builder().time_to_live(window).build(),
            heartbeat: Cache::builder()
                .time_to_live(Duration::from_secs(1))
                .build(),
        }
    }
}

#[async_trait]
impl StatsStore for MemoryStats {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn add_stats(&self, id: &str) -> Result<()> {
        *self.totals.entry(id.to_string()).or_insert(0) += 1;

        let counter = self
            .recent
            .get_with(id.to_string(), async { Arc::new(AtomicU64::new(0)) })
            .await;
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn find_stats(&self, id: &str) -> Result<Option<LinkStats>> {
        let Some(total) = self.totals.get(id).map(|t| *t) else {
            return Ok(None);
        };
        let recent = self
            .recent
            .get(id)
            .await
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0);
        Ok(Some(LinkStats { total, recent }))
    }

    async fn delete_stats(&self, id: &str) -> Result<()> {
        self.totals.remove(id);
        self.recent.invalidate(id).await;
        Ok(())
    }

    async fn heartbeat(&self) -> Result<()> {
        self.heartbeat.insert("heartbeat".to_string(), ()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn record(id: &str, expires_at: Option<DateTime<Utc>>) -> ShortRecord {
        ShortRecord {
            id: id.to_string(),
            target_url: "https://example.com".to_string(),
            created_at: Utc::now(),
            expires_at,
            secret: "s".to_string(),
        }
    }

    #[tokio::test]
    async fn test_native_ttl_evicts_record() {
        let store = MemoryStore::new();
        store
            .save(&record(
                "short",
                Some(Utc::now() + ChronoDuration::milliseconds(200)),
            ))
            .await
            .unwrap();
        store.save(&record("forever", None)).await.unwrap();
        assert!(store.find("short").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(store.find("short").await.unwrap().is_none());
        assert!(store.find("forever").await.unwrap().is_some());
        assert!(store.find_expired().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_total_and_recent() {
        let stats = MemoryStats::new();
        assert!(stats.find_stats("abc").await.unwrap().is_none());

        for _ in 0..5 {
            stats.add_stats("abc").await.unwrap();
        }
        let s = stats.find_stats("abc").await.unwrap().unwrap();
        assert_eq!(s, LinkStats { total: 5, recent: 5 });

        stats.delete_stats("abc").await.unwrap();
        assert!(stats.find_stats("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_window_resets_only_after_ttl() {
        let stats = MemoryStats::with_window(Duration::from_millis(300));
        stats.add_stats("abc").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        stats.add_stats("abc").await.unwrap();
        // 窗口从第一次创建开始计算，第二次递增不会延长
        assert_eq!(stats.find_stats("abc").await.unwrap().unwrap().recent, 2);

        tokio::time::sleep(Duration::from_millis(250)).await;
        let s = stats.find_stats("abc").await.unwrap().unwrap();
        assert_eq!(s.total, 2);
        assert_eq!(s.recent, 0);

        stats.add_stats("abc").await.unwrap();
        let s = stats.find_stats("abc").await.unwrap().unwrap();
        assert_eq!(s, LinkStats { total: 3, recent: 1 });
    }
}
