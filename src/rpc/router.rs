//! RpcRouter: tiered endpoint selection, rate-limit/error absorption, and
//! the 60s background health ranker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::Result;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::rpc::endpoint::{premium_backoff_secs, Endpoint, Tier};

const RANK_INTERVAL: Duration = Duration::from_secs(60);
const PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Used by [`RpcRouter::on_rate_limited`]/[`on_hard_error`] to vary the
/// jitter term of the premium backoff formula without pulling in `rand`
/// as a new dependency; callers may also pass a fixed jitter in tests.
fn jitter_from_strikes(strikes: u32) -> f64 {
    // Deterministic pseudo-jitter in [0.1, 1.0), derived from the strike
    // count so repeated backoffs don't all line up on the same instant.
    0.1 + ((strikes as f64 * 0.37).fract()) * 0.9
}

struct Inner {
    premium: Endpoint,
    free: Vec<Endpoint>,
}

/// Tiered RPC router (C1). Cheap to clone — internal state is `Arc`-shared.
#[derive(Clone)]
pub struct RpcRouter {
    inner: Arc<RwLock<Inner>>,
}

impl RpcRouter {
    pub fn new(premium_url: impl Into<String>, free_urls: Vec<String>) -> Self {
        let premium = Endpoint::new(premium_url, Tier::Premium, 0);
        let free = free_urls
            .into_iter()
            .enumerate()
            .map(|(i, url)| Endpoint::new(url, Tier::Free, i))
            .collect();
        Self { inner: Arc::new(RwLock::new(Inner { premium, free })) }
    }

    /// Spawn the 60s background ranker. Returns the task handle so the
    /// caller can hold it for graceful shutdown.
    pub fn spawn_ranker(&self) -> tokio::task::JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RANK_INTERVAL);
            loop {
                ticker.tick().await;
                router.rank_free_endpoints().await;
            }
        })
    }

    /// Ping every non-blacklisted free endpoint (un-blacklisting expired
    /// entries first) and re-sort by `(is_blacklisted, latency)` with a
    /// stable tie-break on configured order.
    pub async fn rank_free_endpoints(&self) {
        let now = Instant::now();
        let urls: Vec<(usize, String)> = {
            let mut inner = self.inner.write().await;
            for ep in inner.free.iter_mut() {
                ep.maybe_unblacklist(now);
            }
            inner
                .free
                .iter()
                .enumerate()
                .filter(|(_, ep)| !ep.is_blacklisted(now))
                .map(|(i, ep)| (i, ep.url.clone()))
                .collect()
        };

        let mut latencies = vec![f64::INFINITY; urls.len()];
        for (slot, (_, url)) in urls.iter().enumerate() {
            latencies[slot] = probe_latency(url).await;
        }

        let mut inner = self.inner.write().await;
        for ((idx, _), latency) in urls.into_iter().zip(latencies) {
            inner.free[idx].latency = latency;
        }
        inner.free.sort_by(|a, b| {
            let a_key = (a.is_blacklisted(now), ordered_float(a.latency), a.order);
            let b_key = (b.is_blacklisted(now), ordered_float(b.latency), b.order);
            a_key.cmp(&b_key)
        });
        debug!("rpc router: re-ranked {} free endpoints", inner.free.len());
    }

    /// Return the preferred endpoint URL. `critical` (or a volatile market)
    /// forces the premium lane; otherwise the best-ranked non-blacklisted
    /// free endpoint is used, degrading to premium with a warning if every
    /// free endpoint is blacklisted.
    pub async fn get_handle(&self, critical: bool) -> String {
        let inner = self.inner.read().await;
        if critical {
            return inner.premium.url.clone();
        }
        let now = Instant::now();
        match inner.free.iter().find(|ep| !ep.is_blacklisted(now)) {
            Some(ep) => ep.url.clone(),
            None => {
                warn!("rpc router: all free endpoints blacklisted, degrading to premium");
                inner.premium.url.clone()
            }
        }
    }

    /// Build a live `Provider` for whichever endpoint `get_handle` currently
    /// prefers. Callers should request a fresh handle per read rather than
    /// caching across blocks, since ranking can change between calls.
    pub async fn provider(&self, critical: bool) -> Result<impl Provider + Clone> {
        let url = self.get_handle(critical).await;
        Ok(ProviderBuilder::new().connect_http(url.parse()?))
    }

    pub async fn on_rate_limited(&self, url: &str) {
        self.strike(url).await;
    }

    pub async fn on_hard_error(&self, url: &str) {
        self.strike(url).await;
    }

    async fn strike(&self, url: &str) {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        if inner.premium.url == url {
            inner.premium.strikes += 1;
            let wait = premium_backoff_secs(inner.premium.strikes, jitter_from_strikes(inner.premium.strikes));
            warn!("rpc router: premium endpoint backing off {:.2}s (strike {})", wait, inner.premium.strikes);
            return;
        }
        if let Some(ep) = inner.free.iter_mut().find(|ep| ep.url == url) {
            ep.record_strike(now);
            if ep.is_blacklisted(now) {
                warn!("rpc router: blacklisting free endpoint {} for {}s", url, crate::rpc::endpoint::BLACKLIST_SECS);
            }
        }
    }

    pub async fn on_success(&self, url: &str) {
        let mut inner = self.inner.write().await;
        if let Some(ep) = inner.free.iter_mut().find(|ep| ep.url == url) {
            ep.record_success();
        } else if inner.premium.url == url {
            inner.premium.strikes = 0;
        }
    }
}

async fn probe_latency(url: &str) -> f64 {
    let parsed = match url.parse() {
        Ok(u) => u,
        Err(_) => return f64::INFINITY,
    };
    let provider = ProviderBuilder::new().connect_http(parsed);
    let start = Instant::now();
    match timeout(PING_TIMEOUT, provider.get_block_number()).await {
        Ok(Ok(_)) => start.elapsed().as_secs_f64(),
        Ok(Err(e)) => {
            debug!("rpc router: probe failed for {}: {}", url, e);
            f64::INFINITY
        }
        Err(_) => {
            debug!("rpc router: probe timed out for {}", url);
            f64::INFINITY
        }
    }
}

/// Total-ordering wrapper for f64 latency comparisons (NaN never occurs here).
fn ordered_float(f: f64) -> impl Ord {
    ordered_float::OrderedF64(f)
}

mod ordered_float {
    #[derive(PartialEq, PartialOrd)]
    pub struct OrderedF64(pub f64);
    impl Eq for OrderedF64 {}
    impl Ord for OrderedF64 {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_handle_returns_premium_when_critical() {
        let router = RpcRouter::new("http://premium", vec!["http://free1".into()]);
        assert_eq!(router.get_handle(true).await, "http://premium");
    }

    #[tokio::test]
    async fn get_handle_degrades_to_premium_when_all_free_blacklisted() {
        let router = RpcRouter::new("http://premium", vec!["http://free1".into()]);
        router.on_rate_limited("http://free1").await;
        router.on_rate_limited("http://free1").await;
        router.on_rate_limited("http://free1").await;
        assert_eq!(router.get_handle(false).await, "http://premium");
    }

    #[tokio::test]
    async fn get_handle_prefers_free_when_available() {
        let router = RpcRouter::new("http://premium", vec!["http://free1".into()]);
        assert_eq!(router.get_handle(false).await, "http://free1");
    }
}
