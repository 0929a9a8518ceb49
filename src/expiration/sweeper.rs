use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::ExpirationConfig;
use crate::errors::Result;
use crate::storage::{RecordStore, StatsStore};

/// 单次扫描结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_found: usize,
    pub deleted: usize,
    /// dry-run 模式下只报告、不删除的记录
    pub dry_run_candidates: Vec<String>,
    pub failed: usize,
}

pub struct ExpirationSweeper {
    store: Arc<dyn RecordStore>,
    stats: Option<Arc<dyn StatsStore>>,
    interval: Duration,
    dry_run: bool,
}

impl ExpirationSweeper {
    pub fn new(
        store: Arc<dyn RecordStore>,
        stats: Option<Arc<dyn StatsStore>>,
        config: &ExpirationConfig,
    ) -> Self {
        Self {
            store,
            stats,
            interval: Duration::from_secs(config.check_interval_secs),
            dry_run: config.dry_run,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// 扫描一次
    ///
    /// 删除走正常的删除路径，缓存失效随之触发。单条删除失败只计数，不中断扫描；
    /// 已提交的删除不会回滚。
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let expired = self.store.find_expired().await?;
        let mut report = SweepReport {
            expired_found: expired.len(),
            ..Default::default()
        };

        for record in expired {
            if self.dry_run {
                info!(
                    "[dry-run] Expired short URL {} (expired at {:?}) would be deleted",
                    record.id, record.expires_at
                );
                report.dry_run_candidates.push(record.id);
                continue;
            }

            match self.store.delete(&record.id).await {
                Ok(()) => {
                    report.deleted += 1;
                    if let Some(stats) = &self.stats
                        && let Err(e) = stats.delete_stats(&record.id).await
                    {
                        warn!("Failed to delete stats of {}: {}", record.id, e);
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to delete expired short URL {}: {}", record.id, e);
                }
            }
        }

        self.store.update_last_expiration_check(Utc::now()).await?;

        info!(
            "Expiration sweep finished: found={}, deleted={}, dry_run={}, failed={}",
            report.expired_found,
            report.deleted,
            report.dry_run_candidates.len(),
            report.failed
        );
        Ok(report)
    }

    /// 输出上次扫描距今多久
    pub async fn log_last_check(&self) -> Option<DateTime<Utc>> {
        match self.store.last_expiration_check().await {
            Ok(Some(at)) => {
                let age = Utc::now() - at;
                info!(
                    "Last expiration check: {} ({}s ago)",
                    at.to_rfc3339(),
                    age.num_seconds()
                );
                Some(at)
            }
            Ok(None) => {
                info!("No expiration check has been recorded yet");
                None
            }
            Err(e) => {
                warn!("Failed to read last expiration check: {}", e);
                None
            }
        }
    }

    /// 周期运行，直到收到停止信号（或发送端被丢弃）
    ///
    /// 正在执行的一轮扫描会先完成，再检查停止信号。
    pub async fn run(self, mut stop: oneshot::Receiver<()>) {
        info!(
            "Expiration sweeper started: interval={:?}, dry_run={}",
            self.interval, self.dry_run
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!("Expiration sweep failed: {}", e);
                    }
                }
            }
        }

        info!("Expiration sweeper stopped");
    }
}
