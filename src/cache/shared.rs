use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, trace, warn};

use super::message::{InvalidationMessage, InvalidationOp};
use super::{CacheResult, LocalCache, RecordCache};
use crate::bus::{InvalidationBus, MessageHandler};
use crate::config::CacheConfig;
use crate::errors::{Result, VaultError};
use crate::storage::ShortRecord;

/// 跨进程共享缓存
///
/// 本地副本与 `LocalCache` 相同；每次写入或失效后再把消息广播给其它进程，
/// 由各自的订阅循环淘汰或替换本地副本。只保证最终一致：在消息送达前，
/// 其它进程可能返回旧值。
pub struct SharedCache {
    local: Arc<LocalCache>,
    bus: Arc<dyn InvalidationBus>,
    origin: String,
    channel_prefix: String,
    backoff: Duration,
    max_backoff: Duration,
}

impl SharedCache {
    pub fn new(bus: Arc<dyn InvalidationBus>, config: &CacheConfig) -> Self {
        let origin = uuid::Uuid::new_v4().to_string();
        debug!("SharedCache created with origin {}", origin);
        Self {
            local: Arc::new(LocalCache::new(config.negative_ttl_secs)),
            bus,
            origin,
            channel_prefix: config.channel_prefix.clone(),
            backoff: Duration::from_millis(config.resubscribe_backoff_ms),
            max_backoff: Duration::from_millis(config.resubscribe_max_backoff_ms),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    pub fn channels(&self) -> Vec<String> {
        vec![
            InvalidationOp::Updated.channel(&self.channel_prefix),
            InvalidationOp::Deleted.channel(&self.channel_prefix),
        ]
    }

    async fn broadcast(&self, op: InvalidationOp, message: InvalidationMessage) -> Result<()> {
        let channel = op.channel(&self.channel_prefix);
        let payload = message.encode()?;
        self.bus
            .publish(&channel, &payload)
            .await
            .map_err(|e| VaultError::cache_write(format!("publish to {} failed: {}", channel, e)))?;
        debug!("Published invalidation on {} for {}", channel, message.id);
        Ok(())
    }

    fn handler(&self) -> MessageHandler {
        let local = self.local.clone();
        let origin = self.origin.clone();
        let prefix = self.channel_prefix.clone();
        Arc::new(move |channel: &str, payload: &str| {
            apply_invalidation(&local, &origin, &prefix, channel, payload)
        })
    }

    /// 订阅循环，直到总线被关闭才返回
    ///
    /// 订阅因任何其它原因结束都会立即重新订阅，不设重试上限。
    /// 配置了 `resubscribe_backoff_ms` 时，连续失败按指数退避，最长 `resubscribe_max_backoff_ms`。
    pub async fn run_subscription(&self) {
        let channels = self.channels();
        let mut failures: u32 = 0;

        loop {
            let started = Instant::now();
            let result = self.bus.subscribe(&channels, self.handler()).await;

            match result {
                Err(VaultError::BusClosed(_)) => {
                    info!("Invalidation bus closed, subscription loop stopped");
                    return;
                }
                Err(e) => warn!("Invalidation subscription failed: {}", e),
                Ok(()) => warn!("Invalidation subscription ended unexpectedly"),
            }

            // 持续过一段时间的订阅视为健康，重置退避
            if started.elapsed() > self.max_backoff {
                failures = 0;
            }
            failures = failures.saturating_add(1);

            let delay = resubscribe_delay(self.backoff, self.max_backoff, failures);
            warn!(
                "Re-subscribing to {:?} (attempt {}, delay {:?})",
                channels, failures, delay
            );
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn resubscribe_delay(base: Duration, max: Duration, failures: u32) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let factor = 2u32.saturating_pow(failures.saturating_sub(1).min(16));
    base.saturating_mul(factor).min(max)
}

/// 把一条来自其它进程的失效消息应用到本地副本
fn apply_invalidation(local: &LocalCache, origin: &str, prefix: &str, channel: &str, payload: &str) {
    let Some(op) = InvalidationOp::from_channel(prefix, channel) else {
        trace!("Ignoring message on unrelated channel {}", channel);
        return;
    };
    let Some(message) = InvalidationMessage::decode(payload) else {
        warn!("Ignoring undecodable invalidation on {}", channel);
        return;
    };
    if message.origin == origin {
        trace!("Ignoring own invalidation for {}", message.id);
        return;
    }

    debug!(
        "Received invalidation {:?} for {} from {}",
        op, message.id, message.origin
    );
    match (op, message.record) {
        (InvalidationOp::Updated, Some(record)) if record.id == message.id => local.insert(record),
        _ => {
            local.remove(&message.id);
        }
    }
}

#[async_trait]
impl RecordCache for SharedCache {
    async fn get(&self, id: &str) -> CacheResult {
        self.local.get(id).await
    }

    async fn update_cache(&self, record: &ShortRecord) -> Result<()> {
        self.local.insert(record.clone());
        self.broadcast(
            InvalidationOp::Updated,
            InvalidationMessage::updated(&self.origin, record),
        )
        .await
    }

    async fn break_cache(&self, id: &str) -> Result<bool> {
        let existed = self.local.remove(id);
        self.broadcast(
            InvalidationOp::Deleted,
            InvalidationMessage::deleted(&self.origin, id),
        )
        .await?;
        Ok(existed)
    }

    /// 负缓存只在本进程生效，不广播
    async fn mark_absent(&self, id: &str) -> Result<()> {
        self.local.mark_absent_local(id);
        Ok(())
    }

    fn cache_name(&self) -> &'static str {
        "shared"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use chrono::Utc;

    fn record(id: &str, target: &str) -> ShortRecord {
        ShortRecord {
            id: id.to_string(),
            target_url: target.to_string(),
            created_at: Utc::now(),
            expires_at: None,
            secret: "s".to_string(),
        }
    }

    #[test]
    fn test_resubscribe_delay() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(1000);
        assert_eq!(resubscribe_delay(Duration::ZERO, max, 5), Duration::ZERO);
        assert_eq!(resubscribe_delay(base, max, 1), Duration::from_millis(100));
        assert_eq!(resubscribe_delay(base, max, 3), Duration::from_millis(400));
        assert_eq!(resubscribe_delay(base, max, 30), max);
    }

    #[test]
    fn test_apply_invalidation() {
        let local = LocalCache::new(30);
        let rec = record("a", "https://one.example");
        local.insert(rec.clone());

        // 自己发出的消息被忽略
        let own = InvalidationMessage::deleted("me", "a").encode().unwrap();
        apply_invalidation(&local, "me", "p", "p:deleted", &own);
        assert_eq!(local.lookup("a"), CacheResult::Found(rec.clone()));

        // 其它进程的更新替换本地副本
        let newer = record("a", "https://two.example");
        let payload = InvalidationMessage::updated("peer", &newer).encode().unwrap();
        apply_invalidation(&local, "me", "p", "p:updated", &payload);
        assert_eq!(local.lookup("a"), CacheResult::Found(newer));

        // 裸 ID 负载同样可以删除
        apply_invalidation(&local, "me", "p", "p:deleted", "a");
        assert_eq!(local.lookup("a"), CacheResult::Miss);
    }

    #[tokio::test]
    async fn test_publish_failure_is_cache_write_error() {
        let bus = Arc::new(MemoryBus::new());
        let cache = SharedCache::new(bus.clone(), &CacheConfig::default());
        bus.close().await.unwrap();

        let rec = record("a", "https://example.com");
        let err = cache.update_cache(&rec).await.unwrap_err();
        assert!(matches!(err, VaultError::CacheWrite(_)));
        // 本地副本仍然更新
        assert_eq!(cache.get("a").await, CacheResult::Found(rec));
    }

    #[tokio::test]
    async fn test_run_subscription_stops_on_close() {
        let bus = Arc::new(MemoryBus::new());
        let cache = Arc::new(SharedCache::new(bus.clone(), &CacheConfig::default()));
        let handle = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.run_subscription().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        bus.close().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
