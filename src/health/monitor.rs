use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::bus::InvalidationBus;
use crate::config::HeartbeatConfig;
use crate::errors::Result;
use crate::storage::{RecordStore, StatsStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub healthy: bool,
    pub backend: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 聚合健康报告
///
/// 只包含已配置的组件；任一已配置组件超时或出错即为不健康。
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub checked_at: DateTime<Utc>,
    pub components: BTreeMap<String, ComponentStatus>,
}

pub struct HealthMonitor {
    store: Option<Arc<dyn RecordStore>>,
    stats: Option<Arc<dyn StatsStore>>,
    bus: Option<Arc<dyn InvalidationBus>>,
    timeout: Duration,
    interval: Duration,
    latest: RwLock<Option<HealthReport>>,
}

impl HealthMonitor {
    pub fn new(config: &HeartbeatConfig) -> Self {
        Self {
            store: None,
            stats: None,
            bus: None,
            timeout: Duration::from_millis(config.timeout_ms),
            interval: Duration::from_secs(config.interval_secs),
            latest: RwLock::new(None),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_stats(mut self, stats: Option<Arc<dyn StatsStore>>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_bus(mut self, bus: Option<Arc<dyn InvalidationBus>>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 探测所有已配置组件并更新最新报告
    pub async fn check_health(&self) -> HealthReport {
        let mut components = BTreeMap::new();

        if let Some(store) = &self.store {
            let status = probe(store.backend_name(), self.timeout, store.ping()).await;
            components.insert("store".to_string(), status);
        }
        if let Some(stats) = &self.stats {
            // 写入短 TTL 哨兵，验证可写而不只是可连接
            let status = probe(stats.backend_name(), self.timeout, stats.heartbeat()).await;
            components.insert("stats".to_string(), status);
        }
        if let Some(bus) = &self.bus {
            let status = probe(bus.bus_name(), self.timeout, bus.heartbeat()).await;
            components.insert("bus".to_string(), status);
        }

        let report = HealthReport {
            healthy: components.values().all(|c| c.healthy),
            checked_at: Utc::now(),
            components,
        };

        for (name, status) in report.components.iter().filter(|(_, s)| !s.healthy) {
            warn!(
                "Heartbeat failed for {} ({}): {}",
                name,
                status.backend,
                status.error.as_deref().unwrap_or("unknown error")
            );
        }

        *self.latest.write() = Some(report.clone());
        report
    }

    /// 最近一次检查结果，尚未检查过时为 `None`
    pub fn latest(&self) -> Option<HealthReport> {
        self.latest.read().clone()
    }

    /// 周期检查，直到收到停止信号
    pub async fn run(self: Arc<Self>, mut stop: oneshot::Receiver<()>) {
        info!("Heartbeat monitor started: interval={:?}", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let report = self.check_health().await;
                    debug!("Heartbeat: healthy={}", report.healthy);
                }
            }
        }

        info!("Heartbeat monitor stopped");
    }
}

async fn probe<F>(backend: &str, timeout: Duration, check: F) -> ComponentStatus
where
    F: Future<Output = Result<()>>,
{
    let started = Instant::now();
    let result = tokio::time::timeout(timeout, check).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let error = match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some(format!("timeout after {}ms", timeout.as_millis())),
    };

    ComponentStatus {
        healthy: error.is_none(),
        backend: backend.to_string(),
        latency_ms,
        error,
    }
}
