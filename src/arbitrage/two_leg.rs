//! C5 — Two-Leg Arbitrage Hunter: `USDC -> T -> USDC` across DEX pairings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use alloy::primitives::U256;

use crate::arbitrage::cooldown::RouteCooldown;
use crate::filters::WhitelistFilter;
use crate::graph::ArbGraph;
use crate::quote::{QuoteEngine, QuoteRequest};
use crate::sinks::events::EngineEvent;
use crate::types::to_human;

use super::FLASHLOAN_FEE_BPS;

/// A profitable (or near-miss) two-leg route, ready to hand to the executor.
#[derive(Debug, Clone)]
pub struct TwoLegOpportunity {
    pub target_symbol: String,
    pub buy_venue: String,
    pub buy_fee: u32,
    pub sell_venue: String,
    pub sell_fee: u32,
    pub leg_a_out: U256,
    pub leg_b_out: U256,
    pub gross_raw: i128,
    pub spread_pct: f64,
    pub net_usd: f64,
}

impl TwoLegOpportunity {
    pub fn leg_a_min_out(&self) -> U256 {
        // 99.5% of the quoted leg-A output (50 bps slippage allowance).
        self.leg_a_out * U256::from(995u64) / U256::from(1000u64)
    }

    pub fn leg_b_min_out(&self, flashloan: U256) -> U256 {
        flashloan + flashloan * U256::from(FLASHLOAN_FEE_BPS) / U256::from(10_000u64)
    }

    pub fn fingerprint(&self) -> String {
        format!("{}/{}-{}", self.target_symbol, self.buy_venue, self.sell_venue)
    }
}

/// Pure profit math, factored out so it can be exercised without a live RPC.
/// `gross_raw = out_usdc - flashloan - flashloan*5/10000`, matching the
/// external interface contract's integer settlement math exactly.
pub fn compute_gross_raw(flashloan: U256, leg_b_out: U256) -> i128 {
    let fee = flashloan * U256::from(FLASHLOAN_FEE_BPS) / U256::from(10_000u64);
    let cost = flashloan + fee;
    leg_b_out.to::<i128>() - cost.to::<i128>()
}

pub fn spread_pct(gross_raw: i128, flashloan: U256) -> f64 {
    gross_raw as f64 / flashloan.to::<u128>() as f64 * 100.0
}

/// `gas_cost_usd = 500_000 gas * gas_price_wei * eth_price / 1e18 * 1.5` safety multiplier.
pub fn gas_cost_usd(gas_price_wei: u64, eth_price_usd: f64) -> f64 {
    const GAS_UNITS: f64 = 500_000.0;
    const SAFETY_MULTIPLIER: f64 = 1.5;
    GAS_UNITS * gas_price_wei as f64 * eth_price_usd / 1e18 * SAFETY_MULTIPLIER
}

pub struct TwoLegHunter {
    pub flashloan_usdc: U256,
    pub min_profit_usd: f64,
    pub cooldown: Mutex<RouteCooldown>,
    pub whitelist: Option<Arc<WhitelistFilter>>,
}

impl TwoLegHunter {
    pub fn new(flashloan_usdc: U256, min_profit_usd: f64, cooldown: RouteCooldown) -> Self {
        Self { flashloan_usdc, min_profit_usd, cooldown: Mutex::new(cooldown), whitelist: None }
    }

    pub fn with_whitelist(mut self, whitelist: Option<Arc<WhitelistFilter>>) -> Self {
        self.whitelist = whitelist;
        self
    }

    /// Route succeeded on-chain: clear its failure ledger entry.
    pub fn record_success(&self, fingerprint: &str) {
        self.cooldown.lock().unwrap().record_success(fingerprint);
    }

    /// Route failed simulation or broadcast: bump its escalating backoff.
    pub fn record_failure(&self, fingerprint: &str) {
        self.cooldown.lock().unwrap().record_failure(fingerprint, Instant::now());
    }

    /// Run one full scan cycle: Leg A batch, reduce to best-per-venue,
    /// Leg B batch against every non-same-venue pairing, then rank by net
    /// profit. Routes currently in the failure ledger are skipped.
    pub async fn scan_once(&self, graph: &ArbGraph, quotes: &QuoteEngine, eth_price_usd: f64, gas_price_wei: u64) -> anyhow::Result<Vec<TwoLegOpportunity>> {
        let now = Instant::now();
        let targets = graph.targets();

        let mut leg_a_requests = Vec::new();
        for target in &targets {
            for venue in &graph.venues {
                for &fee in &venue.fee_tiers {
                    leg_a_requests.push(QuoteRequest {
                        venue: venue.name.clone(),
                        fee,
                        token_in: graph.usdc.address,
                        token_out: target.address,
                        amount_in: self.flashloan_usdc,
                    });
                }
            }
        }
        let leg_a_results = quotes.batch_quote(&graph.venues, &leg_a_requests, self.whitelist.as_deref(), 50_000_000).await?;

        // best_leg_a[(target, venue)] = (amount_out, fee)
        let mut best_leg_a: HashMap<(String, String), (U256, u32)> = HashMap::new();
        for (req, out) in leg_a_requests.iter().zip(leg_a_results.iter()) {
            let target_symbol = targets.iter().find(|t| t.address == req.token_out).map(|t| t.symbol.clone()).unwrap_or_default();
            let key = (target_symbol, req.venue.clone());
            let entry = best_leg_a.entry(key).or_insert((U256::ZERO, req.fee));
            if *out > entry.0 {
                *entry = (*out, req.fee);
            }
        }

        let mut leg_b_requests = Vec::new();
        let mut leg_b_meta = Vec::new();
        for ((target_symbol, buy_venue), (amount, buy_fee)) in &best_leg_a {
            if amount.is_zero() {
                continue;
            }
            let target = targets.iter().find(|t| &t.symbol == target_symbol).unwrap();
            for sell_venue in &graph.venues {
                if &sell_venue.name == buy_venue {
                    continue;
                }
                for &fee in &sell_venue.fee_tiers {
                    let fp = format!("{}/{}-{}", target_symbol, buy_venue, sell_venue.name);
                    if self.cooldown.lock().unwrap().is_cooled_down(&fp, now) {
                        continue;
                    }
                    leg_b_requests.push(QuoteRequest {
                        venue: sell_venue.name.clone(),
                        fee,
                        token_in: target.address,
                        token_out: graph.usdc.address,
                        amount_in: *amount,
                    });
                    leg_b_meta.push((target_symbol.clone(), buy_venue.clone(), *buy_fee, sell_venue.name.clone(), fee, *amount));
                }
            }
        }
        let leg_b_results = quotes.batch_quote(&graph.venues, &leg_b_requests, self.whitelist.as_deref(), 50_000_000).await?;

        let mut opportunities = Vec::new();
        for (meta, leg_b_out) in leg_b_meta.into_iter().zip(leg_b_results) {
            let (target_symbol, buy_venue, buy_fee, sell_venue, sell_fee, leg_a_out) = meta;
            if leg_b_out.is_zero() {
                continue;
            }
            let gross_raw = compute_gross_raw(self.flashloan_usdc, leg_b_out);
            let spread = spread_pct(gross_raw, self.flashloan_usdc);
            if spread <= 0.05 {
                continue;
            }
            let gross_usd = gross_raw as f64 / 1e6;
            let net_usd = gross_usd - gas_cost_usd(gas_price_wei, eth_price_usd);
            opportunities.push(TwoLegOpportunity {
                target_symbol,
                buy_venue,
                buy_fee,
                sell_venue,
                sell_fee,
                leg_a_out,
                leg_b_out,
                gross_raw,
                spread_pct: spread,
                net_usd,
            });
        }

        opportunities.sort_by(|a, b| b.net_usd.partial_cmp(&a.net_usd).unwrap_or(std::cmp::Ordering::Equal));
        Ok(opportunities)
    }

    pub fn is_dispatchable(&self, opp: &TwoLegOpportunity) -> bool {
        opp.net_usd >= self.min_profit_usd
    }

    pub fn spread_event(&self, opp: &TwoLegOpportunity, block_height: u64) -> EngineEvent {
        EngineEvent::Spread {
            block_height,
            route: opp.fingerprint(),
            gross_usd: opp.gross_raw as f64 / 1e6,
            net_usd: opp.net_usd,
        }
    }

    /// Human-readable summary, matching the notional USD units the rest of
    /// the engine uses for logging.
    pub fn describe(&self, opp: &TwoLegOpportunity) -> String {
        format!(
            "{} buy@{} sell@{} gross={:.2} net={:.2}",
            opp.target_symbol,
            opp.buy_venue,
            opp.sell_venue,
            to_human(U256::try_from(opp.gross_raw.max(0)).unwrap_or(U256::ZERO), 6),
            opp.net_usd
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scenario 1: healthy two-leg arb.
    #[test]
    fn scenario_1_healthy_two_leg_arb() {
        let flashloan = U256::from(1_000_000_000u64);
        let leg_b_out = U256::from(1_010_500_000u64);
        let gross_raw = compute_gross_raw(flashloan, leg_b_out);
        assert_eq!(gross_raw, 10_000_000);
        let gross_usd = gross_raw as f64 / 1e6;
        assert!((gross_usd - 10.00).abs() < 1e-9);

        let gas_usd = gas_cost_usd(10_000_000, 3000.0); // 0.01 gwei
        let net = gross_usd - gas_usd;
        assert!(net >= 5.0);

        let opp = TwoLegOpportunity {
            target_symbol: "ARB".into(),
            buy_venue: "x".into(),
            buy_fee: 500,
            sell_venue: "y".into(),
            sell_fee: 500,
            leg_a_out: U256::from(1_000u64) * U256::from(10u64).pow(U256::from(18u64)),
            leg_b_out,
            gross_raw,
            spread_pct: spread_pct(gross_raw, flashloan),
            net_usd: net,
        };
        assert_eq!(opp.leg_a_min_out(), U256::from(995u64) * U256::from(10u64).pow(U256::from(18u64)));
        assert_eq!(opp.leg_b_min_out(flashloan), U256::from(1_000_500_000u64));
    }

    // Scenario 2: unprofitable two-leg arb.
    #[test]
    fn scenario_2_unprofitable_two_leg() {
        let flashloan = U256::from(1_000_000_000u64);
        let leg_b_out = U256::from(1_000_300_000u64);
        let gross_raw = compute_gross_raw(flashloan, leg_b_out);
        assert_eq!(gross_raw, -200_000);
    }

    #[test]
    fn is_dispatchable_respects_min_profit() {
        let hunter = TwoLegHunter::new(U256::from(1_000_000_000u64), 5.0, RouteCooldown::new(std::time::Duration::from_secs(600), std::time::Duration::from_secs(1800)));
        let mut opp = TwoLegOpportunity {
            target_symbol: "ARB".into(),
            buy_venue: "x".into(),
            buy_fee: 500,
            sell_venue: "y".into(),
            sell_fee: 500,
            leg_a_out: U256::ZERO,
            leg_b_out: U256::ZERO,
            gross_raw: 0,
            spread_pct: 0.0,
            net_usd: 4.99,
        };
        assert!(!hunter.is_dispatchable(&opp));
        opp.net_usd = 5.00;
        assert!(hunter.is_dispatchable(&opp));
    }
}
