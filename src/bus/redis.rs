use async_trait::async_trait;
use futures_util::StreamExt;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{InvalidationBus, MessageHandler};
use crate::errors::{Result, VaultError};

/// Redis Pub/Sub 总线
///
/// 发布走共享的 `ConnectionManager`，每次订阅单独建立一条 pubsub 连接。
pub struct RedisBus {
    client: Client,
    manager: ConnectionManager,
    closed: watch::Sender<bool>,
}

impl RedisBus {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        info!("Connecting invalidation bus to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            VaultError::database_config(format!("Invalid Redis URL '{}': {}", redis_url, e))
        })?;
        let manager = ConnectionManager::new(client.clone()).await.map_err(|e| {
            VaultError::backend_unavailable(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut conn = manager.clone();
        conn.ping::<()>().await?;

        let (closed, _) = watch::channel(false);
        Ok(Self {
            client,
            manager,
            closed,
        })
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl InvalidationBus for RedisBus {
    fn bus_name(&self) -> &'static str {
        "redis"
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        if self.is_closed() {
            return Err(VaultError::bus_closed("redis bus is closed"));
        }
        let mut conn = self.manager.clone();
        let receivers: i64 = conn.publish(channel, payload).await?;
        debug!("Published to {} ({} receivers)", channel, receivers);
        Ok(())
    }

    async fn subscribe(&self, channels: &[String], handler: MessageHandler) -> Result<()> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(VaultError::bus_closed("redis bus is closed"));
        }

        let mut pubsub = self.client.get_async_pubsub().await?;
        for channel in channels {
            pubsub.subscribe(channel).await?;
        }
        debug!("Subscribed to {:?}", channels);

        let mut stream = pubsub.on_message();
        loop {
            tokio::select! {
                _ = closed.wait_for(|c| *c) => {
                    return Err(VaultError::bus_closed("redis bus is closed"));
                }
                msg = stream.next() => match msg {
                    Some(msg) => {
                        let payload: String = match msg.get_payload() {
                            Ok(p) => p,
                            Err(e) => {
                                warn!("Dropping undecodable pubsub payload: {}", e);
                                continue;
                            }
                        };
                        handler(msg.get_channel_name(), &payload);
                    }
                    None => {
                        return Err(VaultError::backend_unavailable(
                            "redis subscription stream ended",
                        ));
                    }
                },
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.send_replace(true);
        Ok(())
    }

    async fn heartbeat(&self) -> Result<()> {
        if self.is_closed() {
            return Err(VaultError::bus_closed("redis bus is closed"));
        }
        let mut conn = self.manager.clone();
        conn.ping::<()>().await?;
        Ok(())
    }
}
