//! 短链接服务
//!
//! 在记录存储、统计存储和 ID 生成器之上提供创建、解析、删除和统计查询。

use std::sync::Arc;

use chrono::{Duration, Utc};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::config::StaticConfig;
use crate::errors::{Result, VaultError};
use crate::storage::{LinkStats, RecordStore, ShortRecord, StatsStore};
use crate::utils::{IdGenerator, generate_token, unambiguous, validate_alias, validate_target_url};

/// 创建短链接的请求
#[derive(Debug, Clone, Default)]
pub struct CreateLinkRequest {
    pub target_url: String,
    /// 自定义 ID，为 `None` 或空白时自动生成
    pub preferred_alias: Option<String>,
    /// 有效期（秒），`<= 0` 表示永久链接
    pub expire_after_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct LinkCreateResult {
    pub record: ShortRecord,
    /// ID 是否为自动生成
    pub generated_id: bool,
}

pub struct LinkService {
    store: Arc<dyn RecordStore>,
    stats: Option<Arc<dyn StatsStore>>,
    generator: IdGenerator,
    secret_length: usize,
    blocked_hosts: Vec<String>,
}

impl LinkService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        stats: Option<Arc<dyn StatsStore>>,
        config: &StaticConfig,
    ) -> Self {
        Self {
            store,
            stats,
            generator: IdGenerator::from_config(&config.id_generator),
            secret_length: config.id_generator.secret_length.max(1),
            blocked_hosts: config.blocked_hosts.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn stats_store(&self) -> Option<&Arc<dyn StatsStore>> {
        self.stats.as_ref()
    }

    /// 创建短链接
    ///
    /// 占用检查与写入不是原子操作，两个创建方同时抢占同一空闲别名时都能通过检查，后写入者覆盖前者。
    pub async fn create(&self, req: CreateLinkRequest) -> Result<LinkCreateResult> {
        let target = validate_target_url(&req.target_url, &self.blocked_hosts)?;

        let alias = req
            .preferred_alias
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let (id, generated_id) = match alias {
            Some(alias) => {
                validate_alias(&alias)?;
                if !self.store.is_available(&alias).await? {
                    return Err(VaultError::conflict(format!(
                        "Short ID '{}' is already taken",
                        alias
                    )));
                }
                (alias, false)
            }
            None => {
                let store = self.store.clone();
                let generated = self
                    .generator
                    .generate_short_id_async(|candidate| {
                        let store = store.clone();
                        async move { store.is_available(&candidate).await }
                    })
                    .await?;
                match generated {
                    Some(id) => (id, true),
                    None => {
                        return Err(VaultError::id_space_exhausted(format!(
                            "No free short ID found after {} attempts, try again",
                            self.generator.max_attempts()
                        )));
                    }
                }
            }
        };

        let now = Utc::now();
        let expires_at = if req.expire_after_seconds > 0 {
            let expires_at = Duration::try_seconds(req.expire_after_seconds)
                .and_then(|ttl| now.checked_add_signed(ttl))
                .ok_or_else(|| VaultError::validation("expire_after_seconds is out of range"))?;
            Some(expires_at)
        } else {
            None
        };

        let record = ShortRecord {
            id,
            target_url: target.to_string(),
            created_at: now,
            expires_at,
            secret: generate_token(self.secret_length, unambiguous),
        };

        self.store.save(&record).await?;
        info!(
            "Created short URL '{}' -> '{}' (expires: {:?})",
            record.id, record.target_url, record.expires_at
        );

        Ok(LinkCreateResult {
            record,
            generated_id,
        })
    }

    /// 查询未过期的链接并记录访问，统计失败只记录日志
    pub async fn resolve(&self, id: &str) -> Result<ShortRecord> {
        let record = self
            .store
            .find(id)
            .await?
            .filter(|r| !r.is_expired())
            .ok_or_else(|| VaultError::not_found(format!("Short URL '{}' not found", id)))?;

        if let Some(stats) = &self.stats
            && let Err(e) = stats.add_stats(id).await
        {
            warn!("Failed to record hit for {}: {}", id, e);
        }

        debug!("Resolved '{}' -> '{}'", id, record.target_url);
        Ok(record)
    }

    /// 校验密钥后删除链接，锁定链接（密钥为空）不可删除
    pub async fn delete(&self, id: &str, secret: &str) -> Result<()> {
        let record = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| VaultError::not_found(format!("Short URL '{}' not found", id)))?;

        if record.is_locked() {
            return Err(VaultError::locked(format!(
                "Short URL '{}' is locked and cannot be deleted",
                id
            )));
        }
        if !bool::from(record.secret.as_bytes().ct_eq(secret.as_bytes())) {
            return Err(VaultError::unauthorized(format!(
                "Invalid secret for short URL '{}'",
                id
            )));
        }

        self.store.delete(id).await?;
        if let Some(stats) = &self.stats {
            stats.delete_stats(id).await?;
        }

        info!("Deleted short URL '{}'", id);
        Ok(())
    }

    /// 已有链接的访问计数，从未被访问时为零
    pub async fn stats(&self, id: &str) -> Result<LinkStats> {
        if self.store.find(id).await?.is_none() {
            return Err(VaultError::not_found(format!(
                "Short URL '{}' not found",
                id
            )));
        }

        match &self.stats {
            Some(stats) => Ok(stats.find_stats(id).await?.unwrap_or_default()),
            None => Ok(LinkStats::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStats, MemoryStore};

    fn service() -> LinkService {
        LinkService::new(
            Arc::new(MemoryStore::new()),
            Some(Arc::new(MemoryStats::new())),
            &StaticConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_create_permanent_with_alias() {
        let svc = service();
        let created = svc
            .create(CreateLinkRequest {
                target_url: "https://example.com".to_string(),
                preferred_alias: Some("abc".to_string()),
                expire_after_seconds: 0,
            })
            .await
            .unwrap();

        assert!(!created.generated_id);
        assert_eq!(created.record.id, "abc");
        assert!(created.record.expires_at.is_none());
        assert_eq!(created.record.secret.len(), 32);
    }

    #[tokio::test]
    async fn test_create_rejects_blocked_host_and_taken_alias() {
        let svc = service();
        let err = svc
            .create(CreateLinkRequest {
                target_url: "http://localhost/admin".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));

        let req = CreateLinkRequest {
            target_url: "https://example.com".to_string(),
            preferred_alias: Some("taken".to_string()),
            expire_after_seconds: 60,
        };
        svc.create(req.clone()).await.unwrap();
        let err = svc.create(req).await.unwrap_err();
        assert!(matches!(err, VaultError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_generated_id_and_expiry() {
        let svc = service();
        let created = svc
            .create(CreateLinkRequest {
                target_url: "https://example.com".to_string(),
                preferred_alias: Some("   ".to_string()),
                expire_after_seconds: 3600,
            })
            .await
            .unwrap();
        assert!(created.generated_id);
        assert_eq!(created.record.id.len(), 6);
        assert!(created.record.is_temporary());
    }

    #[tokio::test]
    async fn test_delete_checks_secret_and_lock() {
        let svc = service();
        let created = svc
            .create(CreateLinkRequest {
                target_url: "https://example.com".to_string(),
                preferred_alias: Some("abc".to_string()),
                expire_after_seconds: 0,
            })
            .await
            .unwrap();

        let err = svc.delete("abc", "wrong").await.unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized(_)));

        svc.delete("abc", &created.record.secret).await.unwrap();
        assert!(matches!(
            svc.resolve("abc").await.unwrap_err(),
            VaultError::NotFound(_)
        ));

        let locked = ShortRecord {
            secret: String::new(),
            ..created.record
        };
        svc.store().save(&locked).await.unwrap();
        let err = svc.delete("abc", "").await.unwrap_err();
        assert!(matches!(err, VaultError::Locked(_)));
    }

    #[tokio::test]
    async fn test_resolve_counts_hits() {
        let svc = service();
        svc.create(CreateLinkRequest {
            target_url: "https://example.com".to_string(),
            preferred_alias: Some("hits".to_string()),
            expire_after_seconds: 0,
        })
        .await
        .unwrap();

        assert_eq!(svc.stats("hits").await.unwrap(), LinkStats::default());
        for _ in 0..3 {
            svc.resolve("hits").await.unwrap();
        }
        let stats = svc.stats("hits").await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.recent, 3);
        assert!(matches!(
            svc.stats("missing").await.unwrap_err(),
            VaultError::NotFound(_)
        ));
    }
}
