//! Remote sink: best-effort webhook posts (Discord-compatible payload).
//! Disabled unless `discord_webhook` is configured. Duplicate events — same
//! dedup key within a 300 s window — are suppressed so a flapping route
//! does not spam the channel.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{error, warn};

use super::events::{EngineEvent, ExecutionStatus};

const SUPPRESSION_WINDOW: Duration = Duration::from_secs(300);

#[derive(Serialize)]
struct WebhookMessage {
    content: String,
}

pub struct RemoteSink {
    webhook_url: Option<String>,
    client: reqwest::Client,
    recent: DashMap<String, Instant>,
}

impl RemoteSink {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self { webhook_url, client: reqwest::Client::new(), recent: DashMap::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub async fn consume(&self, event: &EngineEvent) {
        let Some(url) = &self.webhook_url else {
            return;
        };
        if self.is_duplicate(event) {
            return;
        }

        let content = render(event);
        let message = WebhookMessage { content };
        match self.client.post(url).json(&message).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => warn!("remote sink: webhook returned {}", resp.status()),
            Err(e) => error!("remote sink: webhook post failed: {}", e),
        }
    }

    fn is_duplicate(&self, event: &EngineEvent) -> bool {
        let now = Instant::now();
        let key = event.dedup_key();
        if let Some(last) = self.recent.get(&key) {
            if now.duration_since(*last) < SUPPRESSION_WINDOW {
                return true;
            }
        }
        self.recent.insert(key, now);
        false
    }
}

fn render(event: &EngineEvent) -> String {
    match event {
        EngineEvent::Spread { route, gross_usd, net_usd, .. } => {
            format!("spread {route}: gross=${gross_usd:.2} net=${net_usd:.2}")
        }
        EngineEvent::Execution { route, net_usd, tx_hash, status, .. } => {
            let label = match status {
                ExecutionStatus::Confirmed => "confirmed",
                ExecutionStatus::Reverted => "reverted",
                ExecutionStatus::Timeout => "timed out",
                ExecutionStatus::SimulationReverted => "simulation reverted",
                ExecutionStatus::BroadcastRejected => "broadcast rejected",
            };
            format!("execution {route} {label}: net=${net_usd:.2} tx={}", tx_hash.as_deref().unwrap_or("-"))
        }
        EngineEvent::StateChanged { from, to, .. } => format!("state changed {from} -> {to}"),
        EngineEvent::Error { route, message, .. } => format!("error [{}]: {}", route.as_deref().unwrap_or("-"), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_sink_is_noop() {
        let sink = RemoteSink::new(None);
        assert!(!sink.is_enabled());
        sink.consume(&EngineEvent::StateChanged { block_height: 1, from: "peace".into(), to: "war".into() }).await;
    }

    #[test]
    fn duplicate_within_window_is_suppressed() {
        let sink = RemoteSink::new(Some("http://example.invalid".into()));
        let event = EngineEvent::Spread { block_height: 1, route: "r".into(), gross_usd: 1.0, net_usd: 1.0 };
        assert!(!sink.is_duplicate(&event));
        assert!(sink.is_duplicate(&event));
    }
}
