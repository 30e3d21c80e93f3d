//! Typed configuration, loaded from `.env` + process environment via clap's
//! `env` feature. Every tunable named in the external-interfaces contract
//! has a documented field and a compile-time default.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "arb-sentinel", version, about = "Arbitrum One MEV engine")]
pub struct Config {
    /// Primary (premium) read/write RPC endpoint.
    #[arg(long, env = "PRIMARY_RPC")]
    pub primary_rpc: String,

    /// Comma-separated list of free-tier fallback RPC endpoints.
    #[arg(long, env = "FALLBACK_RPCS", value_delimiter = ',')]
    pub fallback_rpcs: Vec<String>,

    /// Optional dedicated endpoint override for the sniper (T1) scan lane.
    #[arg(long, env = "SNIPER_RPC")]
    pub sniper_rpc: Option<String>,

    /// Optional dedicated endpoint override for the scout/scanner lane.
    #[arg(long, env = "SCANNER_RPC")]
    pub scanner_rpc: Option<String>,

    /// Signing key for broadcast transactions. Required only when execution
    /// is enabled; discovery-only (dry-run) deployments may omit it.
    #[arg(long, env = "PRIVATE_KEY")]
    pub private_key: Option<String>,

    #[arg(long, env = "DEX_ARBITRAGEUR_ADDRESS")]
    pub two_leg_executor: Option<Address>,

    #[arg(long, env = "TRI_ARBITRAGEUR_ADDRESS")]
    pub tri_leg_executor: Option<Address>,

    #[arg(long, env = "LIQUIDATOR_ADDRESS")]
    pub liquidator: Option<Address>,

    #[arg(long, env = "RADIANT_LIQUIDATOR_ADDRESS")]
    pub radiant_liquidator: Option<Address>,

    #[arg(long, env = "LODESTAR_LIQUIDATOR_ADDRESS")]
    pub lodestar_liquidator: Option<Address>,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    #[arg(long, env = "DISCORD_WEBHOOK")]
    pub discord_webhook: Option<String>,

    /// Minimum net profit (USD) to dispatch a two-leg arb.
    #[arg(long, env = "MIN_PROFIT_USD", default_value_t = 5.00)]
    pub min_profit_usd: f64,

    /// Minimum net profit (USD) to dispatch a tri-leg arb.
    #[arg(long, env = "MIN_PROFIT_USD_TRI", default_value_t = 1.00)]
    pub min_profit_usd_tri: f64,

    /// Minimum total debt value (USD) to dispatch a liquidation.
    #[arg(long, env = "MIN_LIQUIDATION_DEBT_USD", default_value_t = 50.00)]
    pub min_liquidation_debt_usd: f64,

    /// Flashloan notional size for two-leg/tri-leg scans, in USDC base-units (6 decimals).
    #[arg(long, env = "FLASHLOAN_USDC_AMOUNT", default_value_t = 1_000_000_000)]
    pub flashloan_usdc_amount: u64,

    /// Block-poll cadence for the Block Bus, in milliseconds.
    #[arg(long, env = "BLOCK_POLL_MS", default_value_t = 500)]
    pub block_poll_ms: u64,

    /// Liquidation scout pass cadence, in blocks.
    #[arg(long, env = "SCOUT_PASS_BLOCKS", default_value_t = 10)]
    pub scout_pass_blocks: u64,

    /// Path to the external borrower target-list JSON (tier_1_danger/tier_2_watchlist).
    #[arg(long, env = "TARGETS_FILE")]
    pub targets_file: Option<String>,

    /// Path to the optional pool whitelist/blacklist JSON.
    #[arg(long, env = "WHITELIST_FILE")]
    pub whitelist_file: Option<String>,

    /// Path to the WAR/PEACE system state file.
    #[arg(long, env = "SYSTEM_STATE_FILE", default_value = ".system_state")]
    pub system_state_file: String,

    /// Reference symbol polled by the market sentinel (e.g. "ETHUSDT").
    #[arg(long, env = "SENTINEL_SYMBOL", default_value = "ETHUSDT")]
    pub sentinel_symbol: String,

    /// Native ETH price in USD, used for gas-cost-in-USD conversion.
    /// Refreshed out of band; this is only the startup default.
    #[arg(long, env = "ETH_PRICE_USD", default_value_t = 3000.0)]
    pub eth_price_usd: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let cfg = Config::try_parse().context("failed to parse configuration")?;
        if cfg.primary_rpc.is_empty() {
            anyhow::bail!("PRIMARY_RPC must not be empty");
        }
        Ok(cfg)
    }

    /// True when enough is configured to sign and broadcast transactions.
    pub fn execution_enabled(&self) -> bool {
        self.private_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_required_args() {
        let cfg = Config::try_parse_from([
            "arb-sentinel",
            "--primary-rpc",
            "https://example.invalid",
        ])
        .unwrap();
        assert_eq!(cfg.primary_rpc, "https://example.invalid");
        assert_eq!(cfg.min_profit_usd, 5.00);
        assert!(!cfg.execution_enabled());
    }
}
