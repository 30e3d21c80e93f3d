//! C2 — Block Bus.
//!
//! Polls the canonical chain head through the RPC router and fans the
//! height out to every subscriber in strictly increasing order. Replaces
//! the original's cross-process ZeroMQ PUB/SUB transport with an in-process
//! broadcast channel, since this engine is a single binary.

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::rpc::RpcRouter;

const CHANNEL_CAPACITY: usize = 64;
const FAILURE_BACKOFF: Duration = Duration::from_secs(2);

pub struct BlockBus {
    tx: broadcast::Sender<u64>,
}

impl BlockBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Run the poll loop forever at `poll_interval`. Intended to be spawned
    /// as its own task; returns only if the sender is dropped.
    pub async fn run(&self, router: RpcRouter, poll_interval: Duration) {
        let mut last_height: Option<u64> = None;
        loop {
            match self.poll_once(&router).await {
                Ok(height) => {
                    if last_height.map_or(true, |h| height > h) {
                        last_height = Some(height);
                        debug!("block bus: publishing height {}", height);
                        let _ = self.tx.send(height);
                    }
                    tokio::time::sleep(poll_interval).await;
                }
                Err(e) => {
                    warn!("block bus: poll failed ({}), backing off {:?}", e, FAILURE_BACKOFF);
                    tokio::time::sleep(FAILURE_BACKOFF).await;
                }
            }
        }
    }

    async fn poll_once(&self, router: &RpcRouter) -> anyhow::Result<u64> {
        let url = router.get_handle(false).await;
        let provider = alloy::providers::ProviderBuilder::new().connect_http(url.parse()?);
        use alloy::providers::Provider;
        match provider.get_block_number().await {
            Ok(height) => {
                router.on_success(&url).await;
                Ok(height)
            }
            Err(e) => {
                router.on_hard_error(&url).await;
                Err(e.into())
            }
        }
    }
}

impl Default for BlockBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_heights_in_order() {
        let bus = BlockBus::new();
        let mut rx = bus.subscribe();
        bus.tx.send(100).unwrap();
        bus.tx.send(101).unwrap();
        assert_eq!(rx.recv().await.unwrap(), 100);
        assert_eq!(rx.recv().await.unwrap(), 101);
    }

    #[tokio::test]
    async fn late_subscriber_does_not_replay_history() {
        let bus = BlockBus::new();
        bus.tx.send(100).unwrap();
        let mut rx = bus.subscribe();
        bus.tx.send(101).unwrap();
        assert_eq!(rx.recv().await.unwrap(), 101);
    }
}
