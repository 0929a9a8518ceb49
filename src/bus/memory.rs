use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use super::{InvalidationBus, MessageHandler};
use crate::errors::{Result, VaultError};

const CHANNEL_CAPACITY: usize = 1024;

/// 进程内总线
///
/// 同一个 `MemoryBus` 上的多个订阅者模拟共享同一数据集的多个进程。
pub struct MemoryBus {
    sender: broadcast::Sender<(String, String)>,
    closed: watch::Sender<bool>,
    /// 每次递增都会断开当前所有订阅，模拟网络抖动
    generation: watch::Sender<u64>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (closed, _) = watch::channel(false);
        let (generation, _) = watch::channel(0);
        Self {
            sender,
            closed,
            generation,
        }
    }

    /// 当前活跃订阅数
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// 断开所有活跃订阅，订阅方会收到 `BackendUnavailable`
    pub fn drop_subscribers(&self) {
        self.generation.send_modify(|g| *g += 1);
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl InvalidationBus for MemoryBus {
    fn bus_name(&self) -> &'static str {
        "memory"
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        if self.is_closed() {
            return Err(VaultError::bus_closed("memory bus is closed"));
        }
        // 没有订阅者时 send 返回错误，消息丢失是可接受的
        if self
            .sender
            .send((channel.to_string(), payload.to_string()))
            .is_err()
        {
            debug!("No subscriber for channel {}, message dropped", channel);
        }
        Ok(())
    }

    async fn subscribe(&self, channels: &[String], handler: MessageHandler) -> Result<()> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(VaultError::bus_closed("memory bus is closed"));
        }
        let mut generation = self.generation.subscribe();
        generation.borrow_and_update();
        let mut rx = self.sender.subscribe();

        loop {
            tokio::select! {
                _ = closed.wait_for(|c| *c) => {
                    return Err(VaultError::bus_closed("memory bus is closed"));
                }
                _ = generation.changed() => {
                    return Err(VaultError::backend_unavailable("memory bus subscription dropped"));
                }
                msg = rx.recv() => match msg {
                    Ok((channel, payload)) => {
                        if channels.iter().any(|c| c == &channel) {
                            handler(&channel, &payload);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Memory bus subscriber lagged, {} messages skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(VaultError::bus_closed("memory bus sender dropped"));
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
            return Err(VaultError::bus_closed("memory bus is closed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn wait_for_subscribers(bus: &MemoryBus, n: usize) {
        for _ in 0..100 {
            if bus.subscriber_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscribers never connected");
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_is_lost() {
        let bus = MemoryBus::new();
        assert!(bus.publish("c", "lost").await.is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_filters_channels_and_close_ends_it() {
        let bus = Arc::new(MemoryBus::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let handle = {
            let bus = bus.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let handler: MessageHandler = Arc::new(move |_: &str, _: &str| {
                    seen.fetch_add(1, Ordering::SeqCst);
                });
                bus.subscribe(&["a".to_string()], handler).await
            })
        };
        wait_for_subscribers(&bus, 1).await;

        bus.publish("a", "1").await.unwrap();
        bus.publish("b", "2").await.unwrap();
        bus.publish("a", "3").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        bus.close().await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(VaultError::BusClosed(_))));
        assert!(bus.heartbeat().await.is_err());
        assert!(bus.publish("a", "4").await.is_err());
    }

    #[tokio::test]
    async fn test_drop_subscribers_reports_unavailable() {
        let bus = Arc::new(MemoryBus::new());
        let handle = {
            let bus = bus.clone();
            tokio::spawn(async move {
                bus.subscribe(&["a".to_string()], Arc::new(|_: &str, _: &str| {})).await
            })
        };
        wait_for_subscribers(&bus, 1).await;

        bus.drop_subscribers();
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(VaultError::BackendUnavailable(_))));
    }
}
