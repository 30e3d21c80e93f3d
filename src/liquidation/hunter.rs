//! C7 — Liquidation Hunter: Aave-V2/Compound-V2 health-factor polling with
//! a sniper pass (every block, T1) and a scout pass (every 10 blocks, T2).

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol_types::SolCall;
use anyhow::Result;
use tracing::warn;

use crate::contracts::{IAaveLendingPool, IAaveProtocolDataProvider, IComptroller, ICToken, IMulticall3};
use crate::rpc::RpcRouter;
use crate::sinks::events::EngineEvent;
use crate::types::{ProtocolKind, UserAssetSnapshot};

use super::targets::TargetList;

pub const SCOUT_INTERVAL_BLOCKS: u64 = 10;
const LIQUIDATION_FEE: u32 = 3000;
const AMOUNT_OUT_MIN_BPS_OF_DEBT: u64 = 9800;

/// A liquidation candidate ready for the Executor.
#[derive(Debug, Clone)]
pub struct LiquidationOpportunity {
    pub user: Address,
    pub debt_asset: Address,
    pub collateral_asset: Address,
    pub debt_amount: U256,
    pub fee: u32,
    pub amount_out_minimum: U256,
    pub sqrt_price_limit_x96: U256,
    pub debt_value_usd: f64,
}

impl LiquidationOpportunity {
    pub fn fingerprint(&self) -> String {
        format!("liquidation/{:#x}", self.user)
    }
}

/// Aave shape: `hf = healthFactor / 1e18`.
pub fn aave_health_factor(health_factor: U256) -> f64 {
    health_factor.to::<u128>() as f64 / 1e18
}

/// Compound shape has no native health factor; derive a comparable proxy.
/// `shortfall > 0` is liquidatable, `liquidity < 500e18` is watch-tier,
/// otherwise healthy — the exact thresholds the source used.
pub fn compound_health_factor_proxy(liquidity: U256, shortfall: U256) -> f64 {
    if !shortfall.is_zero() {
        0.5
    } else if liquidity < U256::from(500u64) * U256::from(10u64).pow(U256::from(18u64)) {
        1.1
    } else {
        2.0
    }
}

pub fn amount_out_minimum(debt_amount: U256) -> U256 {
    debt_amount * U256::from(AMOUNT_OUT_MIN_BPS_OF_DEBT) / U256::from(10_000u64)
}

pub struct LiquidationHunter {
    pub protocol: ProtocolKind,
    pub lending_pool: Address,
    pub data_provider: Address,
    pub comptroller: Address,
    pub min_debt_usd: f64,
    pub targets: TargetList,
}

impl LiquidationHunter {
    pub fn new(protocol: ProtocolKind, lending_pool: Address, data_provider: Address, comptroller: Address, min_debt_usd: f64, targets: TargetList) -> Self {
        Self { protocol, lending_pool, data_provider, comptroller, min_debt_usd, targets }
    }

    /// Sniper pass: poll every T1 address's health factor via Multicall3.
    pub async fn sniper_pass(&self, router: &RpcRouter, multicall: Address, gas_override: u64) -> Result<Vec<(Address, f64)>> {
        self.poll_health_factors(router, multicall, gas_override, self.targets.tier1.iter().copied().collect()).await
    }

    /// Scout pass: same poll over T2, run only every `SCOUT_INTERVAL_BLOCKS`.
    pub async fn scout_pass(&self, router: &RpcRouter, multicall: Address, gas_override: u64, block_height: u64) -> Result<Vec<(Address, f64)>> {
        if block_height % SCOUT_INTERVAL_BLOCKS != 0 {
            return Ok(Vec::new());
        }
        self.poll_health_factors(router, multicall, gas_override, self.targets.tier2.iter().copied().collect()).await
    }

    async fn poll_health_factors(&self, router: &RpcRouter, multicall: Address, gas_override: u64, addresses: Vec<Address>) -> Result<Vec<(Address, f64)>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let calls: Vec<IMulticall3::Call> = addresses
            .iter()
            .map(|&addr| match self.protocol {
                ProtocolKind::AaveV2 => IMulticall3::Call {
                    target: self.lending_pool,
                    callData: IAaveLendingPool::getUserAccountDataCall { user: addr }.abi_encode().into(),
                },
                ProtocolKind::CompoundV2 => IMulticall3::Call {
                    target: self.comptroller,
                    callData: IComptroller::getAccountLiquidityCall { account: addr }.abi_encode().into(),
                },
            })
            .collect();

        let url = router.get_handle(false).await;
        let provider = alloy::providers::ProviderBuilder::new().connect_http(url.parse()?);
        let call = IMulticall3::tryAggregateCall { requireSuccess: false, calls };
        let tx = alloy::rpc::types::TransactionRequest::default().to(multicall).input(call.abi_encode().into()).gas_limit(gas_override);
        let raw = provider.call(tx).await.map_err(|e| anyhow::anyhow!("liquidation multicall failed: {}", e))?;
        let decoded = IMulticall3::tryAggregateCall::abi_decode_returns(&raw)?;

        let mut results = Vec::with_capacity(addresses.len());
        for (addr, result) in addresses.into_iter().zip(decoded) {
            if !result.success {
                continue;
            }
            let hf = match self.protocol {
                ProtocolKind::AaveV2 => {
                    IAaveLendingPool::getUserAccountDataCall::abi_decode_returns(&result.returnData).ok().map(|r| aave_health_factor(r.healthFactor))
                }
                ProtocolKind::CompoundV2 => {
                    IComptroller::getAccountLiquidityCall::abi_decode_returns(&result.returnData).ok().map(|r| compound_health_factor_proxy(r.liquidity, r.shortfall))
                }
            };
            if let Some(hf) = hf {
                results.push((addr, hf));
            }
        }
        Ok(results)
    }

    /// For every T1 address with `0 < hf < 1.0`, analyze per-asset exposure
    /// to pick the largest-USD debt/collateral pair.
    pub async fn analyze_candidates(&self, router: &RpcRouter, candidates: &[(Address, f64)], reserves: &[(Address, f64)]) -> Result<Vec<LiquidationOpportunity>> {
        let mut opportunities = Vec::new();
        for &(user, hf) in candidates {
            if !(hf > 0.0 && hf < 1.0) {
                continue;
            }
            if let Some(opp) = self.analyze_user(router, user, reserves).await? {
                if opp.debt_value_usd >= self.min_debt_usd {
                    opportunities.push(opp);
                } else {
                    warn!("liquidation candidate {:#x} below min debt USD gate ({:.2} < {:.2})", user, opp.debt_value_usd, self.min_debt_usd);
                }
            }
        }
        Ok(opportunities)
    }

    async fn analyze_user(&self, router: &RpcRouter, user: Address, reserves: &[(Address, f64)]) -> Result<Option<LiquidationOpportunity>> {
        let mut snapshots: HashMap<Address, UserAssetSnapshot> = HashMap::new();
        let url = router.get_handle(false).await;
        let provider = alloy::providers::ProviderBuilder::new().connect_http(url.parse()?);

        for &(asset, price_usd) in reserves {
            let snapshot = match self.protocol {
                ProtocolKind::AaveV2 => {
                    let contract = IAaveProtocolDataProvider::new(self.data_provider, provider.clone());
                    let r = contract.getUserReserveData(asset, user).call().await;
                    match r {
                        Ok(d) => UserAssetSnapshot {
                            asset,
                            underlying_balance: d.currentATokenBalance,
                            variable_debt: d.currentVariableDebt,
                            stable_debt: d.currentStableDebt,
                            price_usd,
                        },
                        Err(_) => continue,
                    }
                }
                ProtocolKind::CompoundV2 => {
                    let contract = ICToken::new(asset, provider.clone());
                    let r = contract.getAccountSnapshot(user).call().await;
                    match r {
                        Ok(d) => UserAssetSnapshot {
                            asset,
                            underlying_balance: d.cTokenBalance,
                            variable_debt: d.borrowBalance,
                            stable_debt: U256::ZERO,
                            price_usd,
                        },
                        Err(_) => continue,
                    }
                }
            };
            snapshots.insert(asset, snapshot);
        }

        let decimals = 18u8;
        let debt = snapshots.values().max_by(|a, b| a.debt_value_usd(decimals).partial_cmp(&b.debt_value_usd(decimals)).unwrap());
        let collateral = snapshots.values().max_by(|a, b| a.collateral_value_usd(decimals).partial_cmp(&b.collateral_value_usd(decimals)).unwrap());

        match (debt, collateral) {
            (Some(debt), Some(collateral)) if !debt.variable_debt.is_zero() || !debt.stable_debt.is_zero() => {
                let debt_amount = debt.variable_debt + debt.stable_debt;
                Ok(Some(LiquidationOpportunity {
                    user,
                    debt_asset: debt.asset,
                    collateral_asset: collateral.asset,
                    debt_amount,
                    fee: LIQUIDATION_FEE,
                    amount_out_minimum: amount_out_minimum(debt_amount),
                    sqrt_price_limit_x96: U256::ZERO,
                    debt_value_usd: debt.debt_value_usd(decimals),
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn execution_event(&self, opp: &LiquidationOpportunity, block_height: u64, net_usd: f64) -> EngineEvent {
        EngineEvent::Spread {
            block_height,
            route: opp.fingerprint(),
            gross_usd: opp.debt_value_usd,
            net_usd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scenario 3: liquidation sniper hit.
    #[test]
    fn scenario_3_aave_health_factor_below_one() {
        let hf_raw = U256::from(950_000_000_000_000_000u64); // 0.95e18
        let hf = aave_health_factor(hf_raw);
        assert!((hf - 0.95).abs() < 1e-9);
        assert!(hf < 1.0 && hf > 0.0);
    }

    #[test]
    fn scenario_3_amount_out_minimum_is_98_pct_of_debt() {
        let debt = U256::from(500_000_000u64); // 500 * 1e6
        let min_out = amount_out_minimum(debt);
        assert_eq!(min_out, U256::from(490_000_000u64));
    }

    #[test]
    fn compound_shortfall_is_always_liquidatable() {
        let hf = compound_health_factor_proxy(U256::ZERO, U256::from(1u64));
        assert_eq!(hf, 0.5);
    }

    #[test]
    fn compound_low_liquidity_is_watch_tier() {
        let hf = compound_health_factor_proxy(U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64)), U256::ZERO);
        assert_eq!(hf, 1.1);
    }

    #[test]
    fn compound_healthy_above_threshold() {
        let hf = compound_health_factor_proxy(U256::from(1000u64) * U256::from(10u64).pow(U256::from(18u64)), U256::ZERO);
        assert_eq!(hf, 2.0);
    }

    // Scenario 4: scout promotion health factors.
    #[test]
    fn scenario_4_scout_health_factors_match_fixture() {
        let hf_a = aave_health_factor(U256::from(1_030_000_000_000_000_000u64));
        let hf_b = aave_health_factor(U256::from(1_150_000_000_000_000_000u64));
        assert!((hf_a - 1.03).abs() < 1e-9);
        assert!((hf_b - 1.15).abs() < 1e-9);
        assert!(hf_a < super::super::targets::T1_MAX);
        assert!(hf_b < super::super::targets::T2_MAX && hf_b >= super::super::targets::T1_MAX);
    }
}
