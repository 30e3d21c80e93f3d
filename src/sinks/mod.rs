//! C9 — Sink Interfaces: pluggable, asynchronous event consumers.
//!
//! Hunters and the executor never call a sink directly; they publish onto
//! an `EngineEvent` broadcast channel, and one drainer task per configured
//! sink consumes it independently. A slow or failing sink never blocks the
//! hunter critical path.

pub mod events;
pub mod local;
pub mod persistent;
pub mod remote;

pub use events::{EngineEvent, ExecutionStatus};
pub use local::LocalSink;
pub use persistent::PersistentSink;
pub use remote::RemoteSink;

use tokio::sync::broadcast;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct SinkBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl SinkBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: EngineEvent) {
        // No receivers is a normal startup race, not an error.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

impl Default for SinkBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain the bus into `sink.consume(..)` until the channel is closed.
/// Lagged drops are logged and skipped rather than treated as fatal.
pub async fn run_local_drainer(bus: &SinkBus, sink: LocalSink) {
    let mut rx = bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => sink.consume(&event).await,
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("local sink drainer lagged, dropped {} events", n),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub async fn run_remote_drainer(bus: &SinkBus, sink: RemoteSink) {
    if !sink.is_enabled() {
        return;
    }
    let mut rx = bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => sink.consume(&event).await,
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("remote sink drainer lagged, dropped {} events", n),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub async fn run_persistent_drainer(bus: &SinkBus, sink: PersistentSink) {
    let mut rx = bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => sink.consume(&event).await,
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("persistent sink drainer lagged, dropped {} events", n),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_before_subscribe_is_not_replayed() {
        let bus = SinkBus::new();
        bus.publish(EngineEvent::StateChanged { block_height: 1, from: "peace".into(), to: "war".into() });
        let mut rx = bus.subscribe();
        bus.publish(EngineEvent::StateChanged { block_height: 2, from: "war".into(), to: "peace".into() });
        let received = rx.recv().await.unwrap();
        assert_eq!(received.block_height(), 2);
    }
}
