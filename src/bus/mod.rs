//! 失效广播总线
//!
//! 只提供至多一次、无序、不持久的投递：没有订阅者时发布的消息直接丢失。
//! 缓存条目总能从后端重新得到，丢失的消息只会延长陈旧窗口。

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{PubSubBackend, StaticConfig};
use crate::errors::Result;

mod memory;
mod redis;

pub use self::memory::MemoryBus;
pub use self::redis::RedisBus;

/// 消息回调：`(channel, payload)`
pub type MessageHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[async_trait]
pub trait InvalidationBus: Send + Sync {
    fn bus_name(&self) -> &'static str;

    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;

    /// 阻塞订阅，对每条消息调用 `handler`
    ///
    /// 只在订阅结束时返回：连接断开返回 `BackendUnavailable`，
    /// 本地调用 `close` 后返回 `BusClosed`。
    async fn subscribe(&self, channels: &[String], handler: MessageHandler) -> Result<()>;

    /// 关闭总线，所有阻塞中的 `subscribe` 立即返回
    async fn close(&self) -> Result<()>;

    async fn heartbeat(&self) -> Result<()>;
}

/// 按配置创建失效总线，`none` 时返回 `None`
pub async fn create_bus(config: &StaticConfig) -> Result<Option<Arc<dyn InvalidationBus>>> {
    let bus: Option<Arc<dyn InvalidationBus>> = match config.backends.pubsub {
        PubSubBackend::Redis => Some(Arc::new(
            RedisBus::connect(&config.database.redis.url).await?,
        )),
        PubSubBackend::Memory => Some(Arc::new(MemoryBus::new())),
        PubSubBackend::None => None,
    };

    if let Some(bus) = &bus {
        tracing::info!("Invalidation bus initialized: {}", bus.bus_name());
    }
    Ok(bus)
}
