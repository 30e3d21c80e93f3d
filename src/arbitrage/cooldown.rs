//! Route-Failure Ledger — suppress failed arbitrage routes with escalating backoff.
//!
//! Prevents hammering the same structurally-dead route every block. A
//! route's blacklist window escalates 5x per consecutive failure, capped at
//! `max_cooldown`, and resets instantly on a success.
//!
//! This tracks wall-clock time rather than block count: the external
//! interface contract states route cooldowns in seconds (600s for two-leg
//! routes), and the hunters already run on a wall-clock block-bus tick
//! rather than a block-number-indexed one, so `Instant`-based expiry keeps
//! this ledger's units consistent with the rest of the executor path.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

struct CooldownEntry {
    last_failed: Instant,
    cooldown: Duration,
    failure_count: u32,
}

/// Escalation multiplier per consecutive failure.
const ESCALATION_FACTOR: u32 = 5;

/// Route-failure ledger with escalating backoff, keyed by route fingerprint.
pub struct RouteCooldown {
    entries: HashMap<String, CooldownEntry>,
    initial_cooldown: Duration,
    max_cooldown: Duration,
}

impl RouteCooldown {
    /// `initial_cooldown` of `Duration::ZERO` disables cooldown tracking entirely.
    pub fn new(initial_cooldown: Duration, max_cooldown: Duration) -> Self {
        Self { entries: HashMap::new(), initial_cooldown, max_cooldown }
    }

    pub fn is_cooled_down(&self, fingerprint: &str, now: Instant) -> bool {
        if self.initial_cooldown.is_zero() {
            return false;
        }
        self.entries
            .get(fingerprint)
            .map(|e| now < e.last_failed + e.cooldown)
            .unwrap_or(false)
    }

    pub fn record_failure(&mut self, fingerprint: &str, now: Instant) {
        if self.initial_cooldown.is_zero() {
            return;
        }
        let entry = self.entries.entry(fingerprint.to_string()).or_insert_with(|| CooldownEntry {
            last_failed: now,
            cooldown: Duration::ZERO,
            failure_count: 0,
        });
        entry.failure_count += 1;
        entry.last_failed = now;
        let escalated = self.initial_cooldown.saturating_mul(ESCALATION_FACTOR.saturating_pow(entry.failure_count.saturating_sub(1)));
        entry.cooldown = escalated.min(self.max_cooldown);
        debug!("route cooldown: {} failure #{}, suppressed for {:?}", fingerprint, entry.failure_count, entry.cooldown);
    }

    pub fn record_success(&mut self, fingerprint: &str) {
        if self.entries.remove(fingerprint).is_some() {
            info!("route cooldown reset: {} (trade succeeded)", fingerprint);
        }
    }

    pub fn cleanup(&mut self, now: Instant) {
        let before = self.entries.len();
        self.entries.retain(|_, e| now < e.last_failed + e.cooldown);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("route cooldown cleanup: removed {} expired entries", removed);
        }
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn no_cooldown_initially() {
        let cd = RouteCooldown::new(secs(10), secs(1800));
        assert!(!cd.is_cooled_down("ARB/camelot-sushi", Instant::now()));
    }

    #[test]
    fn cooldown_after_failure_expires() {
        let mut cd = RouteCooldown::new(secs(10), secs(1800));
        let t0 = Instant::now();
        cd.record_failure("ARB/camelot-sushi", t0);
        assert!(cd.is_cooled_down("ARB/camelot-sushi", t0 + secs(9)));
        assert!(!cd.is_cooled_down("ARB/camelot-sushi", t0 + secs(11)));
    }

    #[test]
    fn escalating_backoff_matches_5x_factor() {
        let mut cd = RouteCooldown::new(secs(10), secs(1800));
        let pair = "GMX/sushi-camelot";
        let t0 = Instant::now();

        cd.record_failure(pair, t0);
        assert!(cd.is_cooled_down(pair, t0 + secs(9)));
        assert!(!cd.is_cooled_down(pair, t0 + secs(10)));

        let t1 = t0 + secs(20);
        cd.record_failure(pair, t1);
        assert!(cd.is_cooled_down(pair, t1 + secs(49)));
        assert!(!cd.is_cooled_down(pair, t1 + secs(50)));
    }

    #[test]
    fn success_resets_cooldown() {
        let mut cd = RouteCooldown::new(secs(10), secs(1800));
        let t0 = Instant::now();
        cd.record_failure("WETH/sushi-camelot", t0);
        assert!(cd.is_cooled_down("WETH/sushi-camelot", t0 + secs(1)));
        cd.record_success("WETH/sushi-camelot");
        assert!(!cd.is_cooled_down("WETH/sushi-camelot", t0 + secs(1)));
        assert_eq!(cd.active_count(), 0);
    }

    #[test]
    fn different_routes_independent() {
        let mut cd = RouteCooldown::new(secs(10), secs(1800));
        let t0 = Instant::now();
        cd.record_failure("WETH/sushi-camelot", t0);
        assert!(!cd.is_cooled_down("GMX/sushi-camelot", t0 + secs(1)));
    }

    #[test]
    fn disabled_when_zero() {
        let mut cd = RouteCooldown::new(Duration::ZERO, secs(1800));
        let t0 = Instant::now();
        cd.record_failure("WETH/sushi-camelot", t0);
        assert!(!cd.is_cooled_down("WETH/sushi-camelot", t0));
    }

    #[test]
    fn cleanup_removes_expired() {
        let mut cd = RouteCooldown::new(secs(10), secs(1800));
        let t0 = Instant::now();
        cd.record_failure("WETH/sushi-camelot", t0);
        cd.record_failure("GMX/sushi-camelot", t0 + secs(5));
        assert_eq!(cd.active_count(), 2);
        cd.cleanup(t0 + secs(11));
        assert_eq!(cd.active_count(), 1);
        cd.cleanup(t0 + secs(20));
        assert_eq!(cd.active_count(), 0);
    }
}
