//! Local sink: structured log lines via `tracing`. Always configured; this
//! is the sink of last resort if every other sink is disabled.

use tracing::{error, info, warn};

use super::events::{EngineEvent, ExecutionStatus};

#[derive(Default)]
pub struct LocalSink;

impl LocalSink {
    pub fn new() -> Self {
        Self
    }

    pub async fn consume(&self, event: &EngineEvent) {
        match event {
            EngineEvent::Spread { block_height, route, gross_usd, net_usd } => {
                info!(block_height, route, gross_usd, net_usd, "spread detected");
            }
            EngineEvent::Execution { block_height, route, net_usd, tx_hash, status } => match status {
                ExecutionStatus::Confirmed => {
                    info!(block_height, route, net_usd, tx_hash = tx_hash.as_deref().unwrap_or(""), "execution confirmed");
                }
                ExecutionStatus::Reverted | ExecutionStatus::SimulationReverted | ExecutionStatus::BroadcastRejected => {
                    warn!(block_height, route, ?status, tx_hash = tx_hash.as_deref().unwrap_or(""), "execution failed");
                }
                ExecutionStatus::Timeout => {
                    warn!(block_height, route, tx_hash = tx_hash.as_deref().unwrap_or(""), "execution timed out awaiting receipt");
                }
            },
            EngineEvent::StateChanged { block_height, from, to } => {
                info!(block_height, from, to, "system state changed");
            }
            EngineEvent::Error { block_height, route, message } => {
                error!(block_height, route = route.as_deref().unwrap_or(""), message, "engine error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn consume_does_not_panic_on_any_variant() {
        let sink = LocalSink::new();
        sink.consume(&EngineEvent::Spread { block_height: 1, route: "r".into(), gross_usd: 1.0, net_usd: 1.0 }).await;
        sink.consume(&EngineEvent::Execution {
            block_height: 1,
            route: "r".into(),
            net_usd: 1.0,
            tx_hash: Some("0xabc".into()),
            status: ExecutionStatus::Confirmed,
        })
        .await;
        sink.consume(&EngineEvent::StateChanged { block_height: 1, from: "peace".into(), to: "war".into() }).await;
        sink.consume(&EngineEvent::Error { block_height: 1, route: None, message: "boom".into() }).await;
    }
}
