use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::bus::{InvalidationBus, create_bus};
use crate::cache::{LocalCache, RecordCache, SharedCache};
use crate::config::{CacheMode, StaticConfig};
use crate::expiration::ExpirationSweeper;
use crate::health::HealthMonitor;
use crate::services::LinkService;
use crate::storage::{RecordStore, StatsStore, StorageFactory};

/// 已启动的后台任务及其停止信号
#[derive(Default)]
pub struct BackgroundTasks {
    pub(crate) handles: Vec<(&'static str, JoinHandle<()>)>,
    pub(crate) stops: Vec<(&'static str, oneshot::Sender<()>)>,
}

impl BackgroundTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handles.iter().map(|(name, _)| *name).collect()
    }
}

pub struct StartupContext {
    pub config: Arc<StaticConfig>,
    pub store: Arc<dyn RecordStore>,
    pub stats: Option<Arc<dyn StatsStore>>,
    pub bus: Option<Arc<dyn InvalidationBus>>,
    pub cache: Option<Arc<dyn RecordCache>>,
    pub link_service: Arc<LinkService>,
    pub health: Arc<HealthMonitor>,
    pub tasks: BackgroundTasks,
    shared_cache: Option<Arc<SharedCache>>,
}

impl StartupContext {
    /// 新建一个使用相同存储的过期扫描器
    pub fn sweeper(&self) -> ExpirationSweeper {
        ExpirationSweeper::new(
            self.store.clone(),
            self.stats.clone(),
            &self.config.expiration,
        )
    }
}

/// 装配总线、缓存与存储，不启动后台任务
///
/// 任何组件构建失败都是致命错误。
pub async fn build_context(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    config.validate().context("Invalid configuration")?;

    info!(
        "Backends: persistent={}, stats={}, pubsub={}, cache={}",
        config.backends.persistent,
        config.backends.stats,
        config.backends.pubsub,
        config.backends.cache
    );

    let bus = create_bus(config)
        .await
        .context("Failed to create invalidation bus")?;

    let (cache, shared_cache): (Option<Arc<dyn RecordCache>>, Option<Arc<SharedCache>>) =
        match config.backends.cache {
            CacheMode::Local => (
                Some(Arc::new(LocalCache::new(config.cache.negative_ttl_secs))),
                None,
            ),
            CacheMode::Shared => {
                let bus = bus
                    .clone()
                    .ok_or_else(|| anyhow!("Shared cache requires a pubsub backend"))?;
                let shared = Arc::new(SharedCache::new(bus, &config.cache));
                (Some(shared.clone()), Some(shared))
            }
            CacheMode::None => (None, None),
        };

    let store = StorageFactory::create_record_store(config, cache.clone())
        .await
        .context("Failed to create record store")?;
    let stats = StorageFactory::create_stats_store(config)
        .await
        .context("Failed to create stats store")?;

    let link_service = Arc::new(LinkService::new(store.clone(), stats.clone(), config));
    let health = Arc::new(
        HealthMonitor::new(&config.heartbeat)
            .with_store(store.clone())
            .with_stats(stats.clone())
            .with_bus(bus.clone()),
    );

    debug!("Components ready in {:?}", start_time.elapsed());

    Ok(StartupContext {
        config: Arc::new(config.clone()),
        store,
        stats,
        bus,
        cache,
        link_service,
        health,
        tasks: BackgroundTasks::default(),
        shared_cache,
    })
}

/// 装配组件并启动后台任务：共享缓存订阅、过期扫描（仅无原生 TTL 的后端）、心跳
pub async fn prepare_startup(config: &StaticConfig) -> Result<StartupContext> {
    let mut ctx = build_context(config).await?;
    spawn_background_tasks(&mut ctx).await;

    info!(
        "Started {} background task(s): {:?}",
        ctx.tasks.len(),
        ctx.tasks.names()
    );
    Ok(ctx)
}

async fn spawn_background_tasks(ctx: &mut StartupContext) {
    // 订阅循环只会因总线关闭而结束，不需要单独的停止信号
    if let Some(shared) = ctx.shared_cache.clone() {
        let handle = tokio::spawn(async move { shared.run_subscription().await });
        ctx.tasks.handles.push(("cache-subscription", handle));
    }

    if ctx.store.supports_native_ttl() {
        info!(
            "Backend {} expires records natively, expiration sweeper disabled",
            ctx.store.backend_name()
        );
    } else {
        let sweeper = ctx.sweeper();
        sweeper.log_last_check().await;
        let (tx, rx) = oneshot::channel();
        ctx.tasks.stops.push(("expiration-sweeper", tx));
        ctx.tasks
            .handles
            .push(("expiration-sweeper", tokio::spawn(sweeper.run(rx))));
    }

    let (tx, rx) = oneshot::channel();
    ctx.tasks.stops.push(("heartbeat", tx));
    ctx.tasks
        .handles
        .push(("heartbeat", tokio::spawn(ctx.health.clone().run(rx))));
}
