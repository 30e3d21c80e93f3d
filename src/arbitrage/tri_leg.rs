//! C6 — Tri-Leg Arbitrage Hunter: `USDC -> hub -> target -> USDC` and
//! `USDC -> target -> hub -> USDC` across three Multicall3 stages.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use alloy::primitives::U256;

use crate::arbitrage::cooldown::RouteCooldown;
use crate::filters::WhitelistFilter;
use crate::graph::ArbGraph;
use crate::quote::{QuoteEngine, QuoteRequest};
use crate::sinks::events::EngineEvent;

use super::FLASHLOAN_FEE_BPS;

const GAS_OVERRIDE: u64 = 300_000_000;
const GAS_UNITS: f64 = 1_000_000.0;
const SAFETY_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteShape {
    /// `USDC -> hub -> target -> USDC`
    HubFirst,
    /// `USDC -> target -> hub -> USDC`
    TargetFirst,
}

#[derive(Debug, Clone)]
pub struct TriLegOpportunity {
    pub shape: RouteShape,
    pub sym1: String,
    pub sym2: String,
    pub dex1: String,
    pub fee1: u32,
    pub dex2: String,
    pub fee2: u32,
    pub dex3: String,
    pub fee3: u32,
    pub leg1_out: U256,
    pub leg2_out: U256,
    pub leg3_out: U256,
    pub gross_raw: i128,
    pub net_usd: f64,
}

impl TriLegOpportunity {
    pub fn fingerprint(&self) -> String {
        format!("{:?}/{}-{}/{}-{}-{}", self.shape, self.sym1, self.sym2, self.dex1, self.dex2, self.dex3)
    }
}

pub fn compute_gross_raw(flashloan: U256, leg3_out: U256) -> i128 {
    let fee = flashloan * U256::from(FLASHLOAN_FEE_BPS) / U256::from(10_000u64);
    let cost = flashloan + fee;
    leg3_out.to::<i128>() - cost.to::<i128>()
}

pub fn gas_cost_usd(gas_price_wei: u64, eth_price_usd: f64) -> f64 {
    GAS_UNITS * gas_price_wei as f64 * eth_price_usd / 1e18 * SAFETY_MULTIPLIER
}

pub struct TriLegHunter {
    pub flashloan_usdc: U256,
    pub min_profit_usd: f64,
    pub cooldown: Mutex<RouteCooldown>,
    pub whitelist: Option<Arc<WhitelistFilter>>,
}

impl TriLegHunter {
    pub fn new(flashloan_usdc: U256, min_profit_usd: f64, cooldown: RouteCooldown) -> Self {
        Self { flashloan_usdc, min_profit_usd, cooldown: Mutex::new(cooldown), whitelist: None }
    }

    pub fn with_whitelist(mut self, whitelist: Option<Arc<WhitelistFilter>>) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn record_success(&self, fingerprint: &str) {
        self.cooldown.lock().unwrap().record_success(fingerprint);
    }

    pub fn record_failure(&self, fingerprint: &str) {
        self.cooldown.lock().unwrap().record_failure(fingerprint, Instant::now());
    }

    pub async fn scan_once(&self, graph: &ArbGraph, quotes: &QuoteEngine, eth_price_usd: f64, gas_price_wei: u64) -> anyhow::Result<Vec<TriLegOpportunity>> {
        let now = Instant::now();
        let targets = graph.targets();
        let hubs: Vec<_> = graph.hubs.iter().filter_map(|h| graph.token_by_symbol(h)).collect();

        // Stage 1: USDC -> X for every hub and target.
        let mut stage1_reqs = Vec::new();
        let mut legs: Vec<crate::types::Token> = hubs.iter().chain(targets.iter()).map(|t| (*t).clone()).collect();
        legs.dedup_by(|a, b| a.symbol == b.symbol);
        for token in &legs {
            for venue in &graph.venues {
                for &fee in &venue.fee_tiers {
                    stage1_reqs.push(QuoteRequest {
                        venue: venue.name.clone(),
                        fee,
                        token_in: graph.usdc.address,
                        token_out: token.address,
                        amount_in: self.flashloan_usdc,
                    });
                }
            }
        }
        let stage1_out = quotes.batch_quote(&graph.venues, &stage1_reqs, self.whitelist.as_deref(), GAS_OVERRIDE).await?;

        let mut best_leg1: HashMap<(String, String), (U256, u32)> = HashMap::new();
        for (req, out) in stage1_reqs.iter().zip(stage1_out.iter()) {
            let sym = legs.iter().find(|t| t.address == req.token_out).map(|t| t.symbol.clone()).unwrap_or_default();
            let entry = best_leg1.entry((sym, req.venue.clone())).or_insert((U256::ZERO, req.fee));
            if *out > entry.0 {
                *entry = (*out, req.fee);
            }
        }

        // Stage 2: X -> Y for both route shapes.
        let mut shapes: Vec<(RouteShape, String, String)> = Vec::new();
        for hub in &hubs {
            for target in &targets {
                shapes.push((RouteShape::HubFirst, hub.symbol.clone(), target.symbol.clone()));
                shapes.push((RouteShape::TargetFirst, target.symbol.clone(), hub.symbol.clone()));
            }
        }

        let mut stage2_reqs = Vec::new();
        let mut stage2_meta = Vec::new();
        for (shape, sym1, sym2) in &shapes {
            let token1 = legs.iter().find(|t| &t.symbol == sym1).unwrap();
            let token2 = legs.iter().find(|t| &t.symbol == sym2).unwrap();
            for venue1 in &graph.venues {
                let Some((amount1, fee1)) = best_leg1.get(&(sym1.clone(), venue1.name.clone())) else {
                    continue;
                };
                if amount1.is_zero() {
                    continue;
                }
                for venue2 in &graph.venues {
                    for &fee2 in &venue2.fee_tiers {
                        stage2_reqs.push(QuoteRequest {
                            venue: venue2.name.clone(),
                            fee: fee2,
                            token_in: token1.address,
                            token_out: token2.address,
                            amount_in: *amount1,
                        });
                        stage2_meta.push((*shape, sym1.clone(), sym2.clone(), venue1.name.clone(), *fee1, venue2.name.clone(), fee2, *amount1));
                    }
                }
            }
        }
        let stage2_out = quotes.batch_quote(&graph.venues, &stage2_reqs, self.whitelist.as_deref(), GAS_OVERRIDE).await?;

        let mut best_leg2: HashMap<(RouteShape, String, String, String, String), (U256, u32, u32, u32)> = HashMap::new();
        for (meta, out) in stage2_meta.iter().zip(stage2_out.iter()) {
            let (shape, sym1, sym2, dex1, fee1, dex2, fee2, _amount1) = meta;
            let key = (*shape, sym1.clone(), sym2.clone(), dex1.clone(), dex2.clone());
            let entry = best_leg2.entry(key).or_insert((U256::ZERO, *fee1, *fee2, 0));
            if *out > entry.0 {
                *entry = (*out, *fee1, *fee2, 0);
            }
        }

        // Stage 3: Y -> USDC.
        let mut stage3_reqs = Vec::new();
        let mut stage3_meta = Vec::new();
        for ((shape, sym1, sym2, dex1, dex2), (amount2, fee1, fee2, _)) in &best_leg2 {
            if amount2.is_zero() {
                continue;
            }
            let fp_base = format!("{:?}/{}-{}/{}-{}", shape, sym1, sym2, dex1, dex2);
            if self.cooldown.lock().unwrap().is_cooled_down(&fp_base, now) {
                continue;
            }
            let token2 = legs.iter().find(|t| &t.symbol == sym2).unwrap();
            for venue3 in &graph.venues {
                for &fee3 in &venue3.fee_tiers {
                    stage3_reqs.push(QuoteRequest {
                        venue: venue3.name.clone(),
                        fee: fee3,
                        token_in: token2.address,
                        token_out: graph.usdc.address,
                        amount_in: *amount2,
                    });
                    stage3_meta.push((*shape, sym1.clone(), sym2.clone(), dex1.clone(), *fee1, dex2.clone(), *fee2, venue3.name.clone(), fee3, *amount2));
                }
            }
        }
        let stage3_out = quotes.batch_quote(&graph.venues, &stage3_reqs, self.whitelist.as_deref(), GAS_OVERRIDE).await?;

        let mut opportunities = Vec::new();
        for (meta, leg3_out) in stage3_meta.into_iter().zip(stage3_out) {
            let (shape, sym1, sym2, dex1, fee1, dex2, fee2, dex3, fee3, leg2_out) = meta;
            if leg3_out.is_zero() {
                continue;
            }
            let gross_raw = compute_gross_raw(self.flashloan_usdc, leg3_out);
            let gross_usd = gross_raw as f64 / 1e6;
            let net_usd = gross_usd - gas_cost_usd(gas_price_wei, eth_price_usd);
            let leg1_out = best_leg1.get(&(sym1.clone(), dex1.clone())).map(|(a, _)| *a).unwrap_or(U256::ZERO);
            let fingerprint = format!("{:?}/{}-{}/{}-{}-{}", shape, sym1, sym2, dex1, dex2, dex3);
            if self.cooldown.lock().unwrap().is_cooled_down(&fingerprint, now) {
                continue;
            }
            opportunities.push(TriLegOpportunity {
                shape,
                sym1,
                sym2,
                dex1,
                fee1,
                dex2,
                fee2,
                dex3,
                fee3,
                leg1_out,
                leg2_out,
                leg3_out,
                gross_raw,
                net_usd,
            });
        }

        opportunities.sort_by(|a, b| b.net_usd.partial_cmp(&a.net_usd).unwrap_or(std::cmp::Ordering::Equal));
        Ok(opportunities)
    }

    pub fn is_dispatchable(&self, opp: &TriLegOpportunity) -> bool {
        opp.net_usd >= self.min_profit_usd
    }

    /// Only the single highest-net-profit route is ever dispatched per
    /// block; every other candidate is logged as a spread and skipped.
    pub fn select_best<'a>(&self, opportunities: &'a [TriLegOpportunity]) -> Option<&'a TriLegOpportunity> {
        opportunities.iter().filter(|o| self.is_dispatchable(o)).max_by(|a, b| a.net_usd.partial_cmp(&b.net_usd).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn spread_event(&self, opp: &TriLegOpportunity, block_height: u64) -> EngineEvent {
        EngineEvent::Spread {
            block_height,
            route: opp.fingerprint(),
            gross_usd: opp.gross_raw as f64 / 1e6,
            net_usd: opp.net_usd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opp(net_usd: f64) -> TriLegOpportunity {
        TriLegOpportunity {
            shape: RouteShape::HubFirst,
            sym1: "WETH".into(),
            sym2: "ARB".into(),
            dex1: "uniswap-v3".into(),
            fee1: 500,
            dex2: "sushi-v3".into(),
            fee2: 3000,
            dex3: "camelot".into(),
            fee3: 0,
            leg1_out: U256::ZERO,
            leg2_out: U256::ZERO,
            leg3_out: U256::ZERO,
            gross_raw: 0,
            net_usd,
        }
    }

    // Scenario 6: two candidates tie in iteration order but differ in net
    // profit; only the strictly better one is selected.
    #[test]
    fn scenario_6_best_route_selection() {
        let hunter = TriLegHunter::new(U256::from(1_000_000_000u64), 1.0, RouteCooldown::new(std::time::Duration::from_secs(600), std::time::Duration::from_secs(1800)));
        let candidates = vec![opp(2.50), opp(2.75)];
        let best = hunter.select_best(&candidates).unwrap();
        assert_eq!(best.net_usd, 2.75);
    }

    #[test]
    fn below_min_profit_is_never_selected() {
        let hunter = TriLegHunter::new(U256::from(1_000_000_000u64), 1.0, RouteCooldown::new(std::time::Duration::from_secs(600), std::time::Duration::from_secs(1800)));
        let candidates = vec![opp(0.50)];
        assert!(hunter.select_best(&candidates).is_none());
    }

    #[test]
    fn gas_cost_uses_one_million_gas_units() {
        let cost_a = gas_cost_usd(10_000_000, 3000.0);
        let cost_b = super::super::two_leg::gas_cost_usd(10_000_000, 3000.0);
        assert!(cost_a > cost_b);
    }
}
