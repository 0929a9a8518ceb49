use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use super::{CacheResult, RecordCache};
use crate::errors::Result;
use crate::storage::ShortRecord;

#[derive(Debug, Clone)]
enum Entry {
    Present(ShortRecord),
    /// 负缓存标记，到期后视为未缓存
    Absent(Instant),
}

/// 每写入这么多个负缓存标记，清理一次已到期的标记
const PRUNE_EVERY: usize = 256;

/// 进程内缓存，仅适用于单进程部署
///
/// 所有读写都经过同一把互斥锁，不会观察到部分更新。
pub struct LocalCache {
    entries: Mutex<HashMap<String, Entry>>,
    negative_ttl: Duration,
    marks_since_prune: AtomicUsize,
}

impl LocalCache {
    /// `negative_ttl_secs` 为 0 时不做负缓存
    pub fn new(negative_ttl_secs: u64) -> Self {
        trace!("LocalCache initialized: negative_ttl={}s", negative_ttl_secs);
        Self::with_negative_ttl(Duration::from_secs(negative_ttl_secs))
    }

    pub(crate) fn with_negative_ttl(negative_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            negative_ttl,
            marks_since_prune: AtomicUsize::new(0),
        }
    }

    pub fn lookup(&self, id: &str) -> CacheResult {
        let mut entries = self.entries.lock();
        match entries.get(id) {
            Some(Entry::Present(record)) => CacheResult::Found(record.clone()),
            Some(Entry::Absent(until)) if *until > Instant::now() => CacheResult::NotFound,
            Some(Entry::Absent(_)) => {
                entries.remove(id);
                CacheResult::Miss
            }
            None => CacheResult::Miss,
        }
    }

    pub fn insert(&self, record: ShortRecord) {
        self.entries
            .lock()
            .insert(record.id.clone(), Entry::Present(record));
    }

    /// 移除缓存项，仅当移除的是真实记录时返回 true
    pub fn remove(&self, id: &str) -> bool {
        matches!(self.entries.lock().remove(id), Some(Entry::Present(_)))
    }

    pub fn mark_absent_local(&self, id: &str) {
        if self.negative_ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let until = now + self.negative_ttl;
        let mut entries = self.entries.lock();
        // 已有真实记录时不覆盖，避免和并发写入竞争
        if !matches!(entries.get(id), Some(Entry::Present(_))) {
            entries.insert(id.to_string(), Entry::Absent(until));
        }

        if self.marks_since_prune.fetch_add(1, Ordering::Relaxed) + 1 >= PRUNE_EVERY {
            self.marks_since_prune.store(0, Ordering::Relaxed);
            let before = entries.len();
            entries.retain(|_, e| !matches!(e, Entry::Absent(at) if *at <= now));
            trace!("Pruned {} expired negative entries", before - entries.len());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[async_trait]
impl RecordCache for LocalCache {
    async fn get(&self, id: &str) -> CacheResult {
        let result = self.lookup(id);
        match &result {
            CacheResult::Found(_) => trace!("Local cache hit: {}", id),
            CacheResult::NotFound => trace!("Local negative cache hit: {}", id),
            CacheResult::Miss => trace!("Local cache miss: {}", id),
        }
        result
    }

    async fn update_cache(&self, record: &ShortRecord) -> Result<()> {
        self.insert(record.clone());
        Ok(())
    }

    async fn break_cache(&self, id: &str) -> Result<bool> {
        Ok(self.remove(id))
    }

    async fn mark_absent(&self, id: &str) -> Result<()> {
        self.mark_absent_local(id);
        Ok(())
    }

    fn cache_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str) -> ShortRecord {
        ShortRecord {
            id: id.to_string(),
            target_url: format!("https://example.com/{}", id),
            created_at: Utc::now(),
            expires_at: None,
            secret: "s".to_string(),
        }
    }

    #[tokio::test]
    async fn test_update_get_break() {
        let cache = LocalCache::new(30);
        assert_eq!(cache.get("a").await, CacheResult::Miss);

        let rec = record("a");
        cache.update_cache(&rec).await.unwrap();
        assert_eq!(cache.get("a").await, CacheResult::Found(rec));

        assert!(cache.break_cache("a").await.unwrap());
        assert!(!cache.break_cache("a").await.unwrap());
        assert_eq!(cache.get("a").await, CacheResult::Miss);
    }

    #[tokio::test]
    async fn test_negative_entry_replaced_by_update() {
        let cache = LocalCache::new(30);
        cache.mark_absent("gone").await.unwrap();
        assert_eq!(cache.get("gone").await, CacheResult::NotFound);
        // 负缓存标记不算真实记录
        assert!(!cache.remove("gone"));

        cache.mark_absent("gone").await.unwrap();
        let rec = record("gone");
        cache.update_cache(&rec).await.unwrap();
        assert_eq!(cache.get("gone").await, CacheResult::Found(rec));
    }

    #[tokio::test]
    async fn test_mark_absent_does_not_clobber_present() {
        let cache = LocalCache::new(30);
        let rec = record("x");
        cache.update_cache(&rec).await.unwrap();
        cache.mark_absent("x").await.unwrap();
        assert_eq!(cache.get("x").await, CacheResult::Found(rec));
    }

    #[tokio::test]
    async fn test_negative_cache_disabled() {
        let cache = LocalCache::new(0);
        cache.mark_absent("gone").await.unwrap();
        assert_eq!(cache.get("gone").await, CacheResult::Miss);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_negative_entries_are_pruned() {
        let cache = LocalCache::with_negative_ttl(Duration::from_millis(20));
        let rec = record("kept");
        cache.insert(rec.clone());
        for i in 0..PRUNE_EVERY - 1 {
            cache.mark_absent_local(&format!("scan-{}", i));
        }
        assert_eq!(cache.len(), PRUNE_EVERY);

        std::thread::sleep(Duration::from_millis(50));
        // 触发清理的这次写入本身保留
        cache.mark_absent_local("fresh");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("fresh"), CacheResult::NotFound);
        assert_eq!(cache.lookup("kept"), CacheResult::Found(rec));
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = std::sync::Arc::new(LocalCache::new(30));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.insert(record(&format!("{}-{}", t, i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
