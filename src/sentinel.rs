//! C3 — Market Sentinel.
//!
//! Gates hunter scan intensity by external volatility. Polls a reference
//! symbol's spot price with a 5s cross-process file cache, and flips a
//! durable WAR/PEACE state file on volatility spikes. Process orchestration
//! of auxiliary scanners is explicitly left to sink subscribers — this
//! component only emits a `StateChanged` event.

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::sinks::events::EngineEvent;
use crate::sinks::SinkBus;

const HEARTBEAT: Duration = Duration::from_secs(60);
const VOLATILITY_THRESHOLD_PCT: f64 = 0.08;
const COOLDOWN: Duration = Duration::from_secs(1200);
const PRICE_CACHE_TTL: Duration = Duration::from_secs(5);
const PRICE_ENDPOINT: &str = "https://api.binance.com/api/v3/ticker/price";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    War,
    Peace,
}

impl SystemState {
    fn as_str(self) -> &'static str {
        match self {
            SystemState::War => "WAR",
            SystemState::Peace => "PEACE",
        }
    }
}

#[derive(Deserialize)]
struct TickerResponse {
    price: String,
}

#[derive(Serialize, Deserialize)]
struct CachedPrice {
    price: f64,
    fetched_at_unix_ms: u128,
}

struct Inner {
    last_price: Option<f64>,
    last_scan: Option<Instant>,
    high_volatility: bool,
    volatility_since: Option<Instant>,
}

/// Market Sentinel (C3). Cheap to clone: internal state is lock-shared.
pub struct MarketSentinel {
    symbol: String,
    state_file: PathBuf,
    price_cache_file: PathBuf,
    http: reqwest::Client,
    inner: RwLock<Inner>,
    sink_bus: SinkBus,
}

impl MarketSentinel {
    pub fn new(symbol: impl Into<String>, state_file: impl Into<PathBuf>, sink_bus: SinkBus) -> Self {
        let symbol = symbol.into();
        let state_file = state_file.into();
        let price_cache_file = state_file.with_file_name(format!("price_cache_{}.json", symbol.to_lowercase()));
        Self {
            symbol,
            state_file,
            price_cache_file,
            http: reqwest::Client::new(),
            inner: RwLock::new(Inner {
                last_price: None,
                last_scan: None,
                high_volatility: false,
                volatility_since: None,
            }),
            sink_bus,
        }
    }

    /// Should the caller scan right now? True on heartbeat elapsed, fetch
    /// failure (failsafe), first call, or a volatility spike. Idempotent —
    /// safe to call repeatedly; only [`update_last_price`] advances baselines.
    pub async fn should_scan(&self) -> bool {
        let now = Instant::now();
        let price = match self.fetch_price().await {
            Ok(p) => p,
            Err(e) => {
                warn!("sentinel: price fetch failed ({}), failing open to scan", e);
                return true;
            }
        };

        let inner = self.inner.read().await;
        let Some(last_price) = inner.last_price else {
            return true;
        };
        let Some(last_scan) = inner.last_scan else {
            return true;
        };
        if now.duration_since(last_scan) >= HEARTBEAT {
            return true;
        }
        let delta_pct = ((price - last_price) / last_price).abs() * 100.0;
        delta_pct > VOLATILITY_THRESHOLD_PCT
    }

    /// Advance `last_price`/`last_scan` after a successful scan, and drive
    /// the WAR/PEACE state machine off the same observation. Each transition
    /// is published as a `StateChanged` event; auxiliary process
    /// orchestration is entirely the subscriber's business.
    pub async fn update_last_price(&self, block_height: u64) -> anyhow::Result<()> {
        let price = self.fetch_price().await?;
        let now = Instant::now();

        let delta_pct = {
            let inner = self.inner.read().await;
            inner.last_price.map(|lp| ((price - lp) / lp).abs() * 100.0)
        };

        let mut inner = self.inner.write().await;
        let spiked = delta_pct.map_or(false, |d| d > VOLATILITY_THRESHOLD_PCT);
        if spiked {
            if !inner.high_volatility {
                info!("sentinel: volatility spike ({:.3}%), entering WAR", delta_pct.unwrap());
                self.write_state(SystemState::War)?;
                self.sink_bus.publish(EngineEvent::StateChanged {
                    block_height,
                    from: SystemState::Peace.as_str().into(),
                    to: SystemState::War.as_str().into(),
                });
            }
            inner.high_volatility = true;
            inner.volatility_since = Some(now);
        } else if inner.high_volatility {
            let calm_for = inner.volatility_since.map_or(Duration::ZERO, |since| now.duration_since(since));
            if calm_for >= COOLDOWN {
                info!("sentinel: calm for {:?}, returning to PEACE", calm_for);
                self.write_state(SystemState::Peace)?;
                self.sink_bus.publish(EngineEvent::StateChanged {
                    block_height,
                    from: SystemState::War.as_str().into(),
                    to: SystemState::Peace.as_str().into(),
                });
                inner.high_volatility = false;
                inner.volatility_since = None;
            }
        }

        inner.last_price = Some(price);
        inner.last_scan = Some(now);
        Ok(())
    }

    pub async fn is_high_volatility(&self) -> bool {
        self.inner.read().await.high_volatility
    }

    /// 5s cache shared across every process that imports this state file's
    /// directory, so a fleet of collaborators polling the same symbol don't
    /// each hammer the price endpoint independently.
    async fn fetch_price(&self) -> anyhow::Result<f64> {
        if let Some(price) = self.read_price_cache() {
            return Ok(price);
        }

        let url = format!("{}?symbol={}", PRICE_ENDPOINT, self.symbol);
        let resp: TickerResponse = self.http.get(&url).send().await?.json().await?;
        let price: f64 = resp.price.parse()?;

        self.write_price_cache(price)?;
        Ok(price)
    }

    fn read_price_cache(&self) -> Option<f64> {
        let raw = std::fs::read_to_string(&self.price_cache_file).ok()?;
        let cached: CachedPrice = serde_json::from_str(&raw).ok()?;
        let age_ms = now_unix_ms().saturating_sub(cached.fetched_at_unix_ms);
        (age_ms < PRICE_CACHE_TTL.as_millis()).then_some(cached.price)
    }

    fn write_price_cache(&self, price: f64) -> anyhow::Result<()> {
        let cached = CachedPrice { price, fetched_at_unix_ms: now_unix_ms() };
        let tmp = self.price_cache_file.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string(&cached)?)?;
        std::fs::rename(&tmp, &self.price_cache_file)?;
        Ok(())
    }

    /// Atomic write: write to a sibling temp file then rename, so readers
    /// never observe a partially written state file.
    fn write_state(&self, state: SystemState) -> anyhow::Result<()> {
        let tmp = self.state_file.with_extension("tmp");
        std::fs::write(&tmp, state.as_str())?;
        std::fs::rename(&tmp, &self.state_file)?;
        Ok(())
    }
}

fn now_unix_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_scan_true_on_first_call() {
        let dir = std::env::temp_dir().join(format!("sentinel-test-{}", std::process::id()));
        let sentinel = MarketSentinel::new("ETHUSDT", dir.join(".system_state"), SinkBus::new());
        let inner = sentinel.inner.read().await;
        assert!(inner.last_price.is_none());
    }

    #[test]
    fn state_file_write_is_atomic_rename() {
        let dir = tempdir_path();
        std::fs::create_dir_all(&dir).unwrap();
        let state_file = dir.join(".system_state");
        let sentinel = MarketSentinel::new("ETHUSDT", state_file.clone(), SinkBus::new());
        sentinel.write_state(SystemState::War).unwrap();
        assert_eq!(std::fs::read_to_string(&state_file).unwrap(), "WAR");
        assert!(!state_file.with_extension("tmp").exists());
        sentinel.write_state(SystemState::Peace).unwrap();
        assert_eq!(std::fs::read_to_string(&state_file).unwrap(), "PEACE");
        std::fs::remove_dir_all(&dir).ok();
    }

    fn tempdir_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sentinel-atomic-{}", std::process::id()))
    }

    #[test]
    fn price_cache_round_trips_across_instances() {
        let dir = std::env::temp_dir().join(format!("sentinel-price-cache-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let state_file = dir.join(".system_state");
        let writer = MarketSentinel::new("ETHUSDT", &state_file, SinkBus::new());
        writer.write_price_cache(3123.45).unwrap();

        // A second instance pointed at the same state-file directory — the
        // whole point of a cross-process cache — sees the same value.
        let reader = MarketSentinel::new("ETHUSDT", &state_file, SinkBus::new());
        assert_eq!(reader.read_price_cache(), Some(3123.45));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn war_transition_publishes_state_changed() {
        let dir = std::env::temp_dir().join(format!("sentinel-state-changed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let state_file = dir.join(".system_state");
        let sink_bus = SinkBus::new();
        let mut rx = sink_bus.subscribe();
        let sentinel = MarketSentinel::new("ETHUSDT", &state_file, sink_bus);

        {
            let mut inner = sentinel.inner.write().await;
            inner.last_price = Some(100.0);
            inner.last_scan = Some(Instant::now());
        }
        sentinel.write_price_cache(110.0).unwrap();
        sentinel.update_last_price(42).await.unwrap();

        let event = rx.try_recv().unwrap();
        assert!(matches!(event, EngineEvent::StateChanged { block_height: 42, ref from, ref to } if from == "PEACE" && to == "WAR"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
