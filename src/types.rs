//! Core domain types: tokens, venues, routes, and the small set of
//! value objects shared across the router, quote engine, and hunters.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A token participating in the arb graph. Decimals are required up front;
/// nothing in this crate queries `decimals()` on the hot path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self { symbol: symbol.into(), address, decimals }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// The three quoter/router ABI shapes this engine knows how to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VenueKind {
    /// Uniswap/SushiSwap V3-style: fixed fee tiers, QuoterV2 ABI.
    ConstantProductV3,
    /// Camelot-style Algebra pools: single dynamic-fee pool per pair, no fee param on quote.
    AlgebraDynamicFee,
    /// Curve-style stable pool: `get_dy(i, j, dx)` keyed by per-pool asset slot index.
    StableCurvePool,
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueKind::ConstantProductV3 => write!(f, "constant-product-v3"),
            VenueKind::AlgebraDynamicFee => write!(f, "algebra-dynamic-fee"),
            VenueKind::StableCurvePool => write!(f, "stable-curve-pool"),
        }
    }
}

/// A DEX venue: a quoter/router pair plus the fee tiers it exposes.
/// For `AlgebraDynamicFee` venues `fee_tiers` is a single sentinel `[0]`
/// since the pool's fee is read on-chain, not selected by the caller.
/// For `StableCurvePool` venues `asset_slots` maps token address → pool index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    pub kind: VenueKind,
    pub quoter: Address,
    pub router: Address,
    pub fee_tiers: Vec<u32>,
    #[serde(default)]
    pub asset_slots: Option<std::collections::HashMap<Address, i128>>,
}

impl Venue {
    /// Curve-style slot lookup; `None` means this venue cannot quote the pair at all.
    pub fn slot_of(&self, token: &Address) -> Option<i128> {
        self.asset_slots.as_ref()?.get(token).copied()
    }
}

/// One hop of a Route: which venue, which fee tier, token in/out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteLeg {
    pub venue: String,
    pub fee: u32,
    pub token_in: Address,
    pub token_out: Address,
    /// Expected output from the most recent quote cycle, in token_out base-units.
    pub amount_out: U256,
}

/// A candidate arbitrage route: 2 legs (two-leg hunter) or 3 legs (tri-leg hunter).
/// Always starts and ends at USDC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub legs: Vec<RouteLeg>,
}

impl Route {
    /// Canonical fingerprint used by the route-failure ledger, e.g.
    /// `"ARB/camelot-fusion"` for two legs or `"WETH-GMX/sushi-v3/camelot"` for three.
    pub fn fingerprint(&self) -> String {
        let path: Vec<String> = self.legs.iter().map(|l| format!("{:#x}", l.token_out)).collect();
        let venues: Vec<&str> = self.legs.iter().map(|l| l.venue.as_str()).collect();
        format!("{}/{}", path.join("-"), venues.join("-"))
    }

    pub fn final_amount_out(&self) -> U256 {
        self.legs.last().map(|l| l.amount_out).unwrap_or(U256::ZERO)
    }
}

/// Which lending-protocol ABI shape a liquidation target speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolKind {
    /// Aave-V2 style: `getUserAccountData` returns an 18-decimal health factor directly.
    AaveV2,
    /// Compound-V2 style: `getAccountLiquidity` returns (error, liquidity, shortfall);
    /// health factor is a derived proxy, not a direct on-chain value.
    CompoundV2,
}

/// Borrower promotion tier. A borrower is in exactly one of these at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorrowerTier {
    /// Danger: hf in (1.000, T1_MAX]. Scanned every block.
    Tier1,
    /// Watchlist: hf in (T1_MAX, T2_MAX]. Scanned every 10 blocks.
    Tier2,
}

/// A borrower record as tracked by the Liquidation Hunter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Borrower {
    pub address: Address,
    pub tier: BorrowerTier,
    pub last_health_factor: f64,
}

/// Per-asset snapshot used to pick the largest-debt / largest-collateral asset
/// for a liquidation call.
#[derive(Debug, Clone)]
pub struct UserAssetSnapshot {
    pub asset: Address,
    pub underlying_balance: U256,
    pub variable_debt: U256,
    pub stable_debt: U256,
    pub price_usd: f64,
}

impl UserAssetSnapshot {
    pub fn debt_value_usd(&self, decimals: u8) -> f64 {
        let total = self.variable_debt.saturating_add(self.stable_debt);
        to_human(total, decimals) * self.price_usd
    }

    pub fn collateral_value_usd(&self, decimals: u8) -> f64 {
        to_human(self.underlying_balance, decimals) * self.price_usd
    }
}

/// Convert a base-unit integer amount to a human-denominated float for
/// display and threshold comparisons only — never used in settlement math.
pub fn to_human(amount: U256, decimals: u8) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let amount_f: f64 = amount.to::<u128>() as f64;
    amount_f / scale
}

/// Sentinel fee-tier marker used by `AlgebraDynamicFee` venues, whose quoter
/// takes no explicit fee argument.
pub const ALGEBRA_FEE_SENTINEL: u32 = 0;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn route_fingerprint_stable_for_same_path() {
        let token = Address::from_str("0x912CE59144191C1204E64559FE8253a0e49E6548").unwrap();
        let leg = RouteLeg {
            venue: "camelot".into(),
            fee: 0,
            token_in: Address::ZERO,
            token_out: token,
            amount_out: U256::from(1u64),
        };
        let route = Route { legs: vec![leg] };
        assert_eq!(route.fingerprint(), format!("{:#x}/camelot", token));
    }

    #[test]
    fn to_human_scales_by_decimals() {
        let amount = U256::from(1_500_000u64);
        assert!((to_human(amount, 6) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn debt_value_usd_sums_variable_and_stable() {
        let snap = UserAssetSnapshot {
            asset: Address::ZERO,
            underlying_balance: U256::ZERO,
            variable_debt: U256::from(400_000_000u64),
            stable_debt: U256::from(100_000_000u64),
            price_usd: 1.0,
        };
        assert!((snap.debt_value_usd(6) - 500.0).abs() < 1e-6);
    }
}
