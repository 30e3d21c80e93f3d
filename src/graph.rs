//! Arb Graph — the static token/venue registry the Quote Engine draws its
//! call matrix from. Compile-time config per the data model: tokens and
//! venues are fixed; the graph itself is never materialized as a
//! persistent structure, only walked edge-by-edge per block.

use alloy::primitives::Address;
use std::collections::HashMap;
use std::str::FromStr;

use crate::types::{Token, Venue, VenueKind};

/// Arbitrum One USDC (native, 6 decimals).
pub const USDC_ADDRESS: &str = "0xaf88d065e77c8cC2239327C5EDb3A432268e5831";

pub struct ArbGraph {
    pub usdc: Token,
    pub tokens: Vec<Token>,
    pub venues: Vec<Venue>,
    /// Hub tokens used as the middle leg of tri-leg routes. Default {WETH, ARB}.
    pub hubs: Vec<String>,
}

impl ArbGraph {
    pub fn token_by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.symbol == symbol)
    }

    pub fn venue_by_name(&self, name: &str) -> Option<&Venue> {
        self.venues.iter().find(|v| v.name == name)
    }

    /// Target tokens for the tri-leg hunter: every non-USDC, non-hub token.
    pub fn targets(&self) -> Vec<&Token> {
        self.tokens
            .iter()
            .filter(|t| t.symbol != self.usdc.symbol && !self.hubs.contains(&t.symbol))
            .collect()
    }

    /// Default Arbitrum One deployment: USDC, a handful of major tokens, and
    /// one venue of each supported kind. Real deployments load this from a
    /// config file; the defaults here exist so the engine has a working
    /// graph with no external config, matching the source's hardcoded
    /// `TOKENS`/`HUBS` tables.
    pub fn arbitrum_default() -> Self {
        let addr = |s: &str| Address::from_str(s).expect("hardcoded address must parse");
        let usdc = Token::new("USDC", addr(USDC_ADDRESS), 6);
        let tokens = vec![
            Token::new("USDT", addr("0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"), 6),
            Token::new("DAI", addr("0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1"), 18),
            Token::new("WETH", addr("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"), 18),
            Token::new("ARB", addr("0x912CE59144191C1204E64559FE8253a0e49E6548"), 18),
            Token::new("MAGIC", addr("0x539bdE0d7Dbd336b79148AA742883198BBF60342"), 18),
            Token::new("GMX", addr("0xfc5A1A6EB076a2C7aD06eD22C90d7E710E35ad0a"), 18),
            Token::new("RDNT", addr("0x3082CC23568eA640225c2467653dB90e9250AaA0"), 18),
            Token::new("JOE", addr("0x371c7ec6D8039ff7933a2AA28EB827Ffe1F52f07"), 18),
            Token::new("GNS", addr("0x18c11FD286C5EC11c3b683Caa813B77f5163A122"), 18),
        ];

        let venues = vec![
            Venue {
                name: "uniswap-v3".into(),
                kind: VenueKind::ConstantProductV3,
                quoter: addr("0x61fFE014bA17989E743c5F6cB21bF9697530B21e"),
                router: addr("0xE592427A0AEce92De3Edee1F18E0157C05861564"),
                fee_tiers: vec![100, 500, 3000, 10000],
                asset_slots: None,
            },
            Venue {
                name: "sushi-v3".into(),
                kind: VenueKind::ConstantProductV3,
                quoter: addr("0x0524E833cCD057e4d7A296e3aaAb9f7675964Ce1"),
                router: addr("0x8A21F6768C1f8075791D08546Dadf6daA0bE820c"),
                fee_tiers: vec![500, 3000, 10000],
                asset_slots: None,
            },
            Venue {
                name: "camelot".into(),
                kind: VenueKind::AlgebraDynamicFee,
                quoter: addr("0x0Fc73040b26E9bC8514fA028D998E73A254Fa76E"),
                router: addr("0x1F721E2E82F6676FCE4eA07A5958cF098D339e18"),
                fee_tiers: vec![0],
                asset_slots: None,
            },
            Venue {
                name: "curve-2pool".into(),
                kind: VenueKind::StableCurvePool,
                quoter: addr("0x7f90122BF0700F9E7e1F688fe926940E8839F353"),
                router: addr("0x7f90122BF0700F9E7e1F688fe926940E8839F353"),
                fee_tiers: vec![0],
                asset_slots: Some(HashMap::from([
                    (usdc.address, 0i128),
                    (addr("0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"), 1i128),
                ])),
            },
        ];

        Self { usdc, tokens, venues, hubs: vec!["WETH".into(), "ARB".into()] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_excludes_usdc_and_hubs() {
        let graph = ArbGraph::arbitrum_default();
        let symbols: Vec<&str> = graph.targets().iter().map(|t| t.symbol.as_str()).collect();
        assert!(!symbols.contains(&"USDC"));
        assert!(!symbols.contains(&"WETH"));
        assert!(!symbols.contains(&"ARB"));
        assert!(symbols.contains(&"GMX"));
    }

    #[test]
    fn curve_venue_has_slots_for_stables_only() {
        let graph = ArbGraph::arbitrum_default();
        let curve = graph.venue_by_name("curve-2pool").unwrap();
        assert!(curve.slot_of(&graph.usdc.address).is_some());
        let weth = graph.token_by_symbol("WETH").unwrap();
        assert!(curve.slot_of(&weth.address).is_none());
    }
}
