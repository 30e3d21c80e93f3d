//! C8 — Executor: payload assembly, pre-flight simulation, nonce-serialized
//! broadcast, and receipt classification.

use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::contracts::{ILiquidatorExecutor, ITriLegArbExecutor, ITwoLegArbExecutor};
use crate::error::EngineError;
use crate::rpc::RpcRouter;
use crate::sinks::events::{EngineEvent, ExecutionStatus};

const RECEIPT_TIMEOUT: Duration = Duration::from_secs(30);

const GAS_TWO_LEG: u64 = 800_000;
const GAS_TRI_LEG: u64 = 1_200_000;
const GAS_LIQUIDATION: u64 = 2_500_000;

const PRIORITY_FEE_ARB_WEI: u128 = 10_000_000; // 0.01 gwei
const PRIORITY_FEE_LIQUIDATION_WEI: u128 = 500_000_000; // 0.5 gwei

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxClass {
    TwoLeg,
    TriLeg,
    Liquidation,
}

impl TxClass {
    fn static_gas_limit(self) -> u64 {
        match self {
            TxClass::TwoLeg => GAS_TWO_LEG,
            TxClass::TriLeg => GAS_TRI_LEG,
            TxClass::Liquidation => GAS_LIQUIDATION,
        }
    }

    fn priority_fee_wei(self) -> u128 {
        match self {
            TxClass::Liquidation => PRIORITY_FEE_LIQUIDATION_WEI,
            TxClass::TwoLeg | TxClass::TriLeg => PRIORITY_FEE_ARB_WEI,
        }
    }
}

/// Two-leg payload: `ArbParams = (routerA, calldataA, routerB, calldataB, token)`.
pub fn encode_two_leg_params(router_a: Address, calldata_a: Bytes, router_b: Address, calldata_b: Bytes, token: Address) -> Bytes {
    use alloy::sol_types::SolValue;
    (router_a, calldata_a, router_b, calldata_b, token).abi_encode_params().into()
}

pub fn build_two_leg_call(executor: Address, token: Address, flashloan_amount: U256, params: Bytes) -> (Address, Bytes) {
    let call = ITwoLegArbExecutor::requestFlashLoanCall { token, amount: flashloan_amount, params };
    (executor, Bytes::from(call.abi_encode()))
}

pub fn build_tri_leg_call(executor: Address, token: Address, flashloan_amount: U256, routes: Vec<ITriLegArbExecutor::Route>) -> (Address, Bytes) {
    let call = ITriLegArbExecutor::requestFlashLoanCall { token, amount: flashloan_amount, routes };
    (executor, Bytes::from(call.abi_encode()))
}

#[allow(clippy::too_many_arguments)]
pub fn build_liquidation_call(
    executor: Address,
    user: Address,
    debt_asset: Address,
    collateral_asset: Address,
    debt_amount: U256,
    fee: u32,
    amount_out_minimum: U256,
    sqrt_price_limit_x96: U256,
) -> (Address, Bytes) {
    let call = ILiquidatorExecutor::requestFlashLoanCall {
        user,
        debtAsset: debt_asset,
        collateralAsset: collateral_asset,
        debtAmount: debt_amount,
        fee,
        amountOutMinimum: amount_out_minimum,
        sqrtPriceLimitX96: sqrt_price_limit_x96.to::<alloy::primitives::U160>(),
    };
    (executor, Bytes::from(call.abi_encode()))
}

pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub tx_hash: Option<String>,
}

pub struct Executor {
    router: RpcRouter,
    signer: Option<PrivateKeySigner>,
    nonce_lock: Mutex<()>,
}

impl Executor {
    pub fn new(router: RpcRouter, private_key: Option<&str>) -> Result<Self> {
        let signer = private_key.map(|k| k.parse::<PrivateKeySigner>()).transpose()?;
        Ok(Self { router, signer, nonce_lock: Mutex::new(()) })
    }

    pub fn execution_enabled(&self) -> bool {
        self.signer.is_some()
    }

    /// `eth_call` pre-flight against the built transaction. A revert aborts
    /// the broadcast entirely; the caller should emit an `Execution` event
    /// with `ExecutionStatus::SimulationReverted` and stop.
    pub async fn simulate(&self, to: Address, calldata: &Bytes) -> Result<(), EngineError> {
        let url = self.router.get_handle(true).await;
        let provider = alloy::providers::ProviderBuilder::new()
            .connect_http(url.parse().map_err(|e| EngineError::Network { endpoint: url.clone(), source: anyhow::anyhow!("{e}") })?);
        let tx = TransactionRequest::default().to(to).input(calldata.clone().into());
        provider
            .call(tx)
            .await
            .map_err(|e| EngineError::SimulationReverted { reason: e.to_string() })?;
        Ok(())
    }

    /// Sign and broadcast, serialized on the wallet nonce. Awaits the
    /// receipt with a 30 s deadline; a missed deadline classifies as
    /// `Timeout`, not `Reverted` — the tx may still land later.
    pub async fn broadcast(&self, to: Address, calldata: Bytes, class: TxClass) -> Result<ExecutionOutcome, EngineError> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| EngineError::ConfigMissing("PRIVATE_KEY not configured, execution disabled".into()))?;

        let _guard = self.nonce_lock.lock().await;
        let url = self.router.get_handle(true).await;
        let wallet = EthereumWallet::from(signer);
        let provider = alloy::providers::ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(url.parse().map_err(|e| EngineError::Network { endpoint: url.clone(), source: anyhow::anyhow!("{e}") })?);

        let base_fee = provider
            .get_gas_price()
            .await
            .map_err(|e| EngineError::Network { endpoint: url.clone(), source: e.into() })?;
        let priority = class.priority_fee_wei();
        let max_fee = base_fee.saturating_add(priority);

        let mut tx = TransactionRequest::default()
            .to(to)
            .input(calldata.into())
            .max_fee_per_gas(max_fee)
            .max_priority_fee_per_gas(priority);

        match provider.estimate_gas(tx.clone()).await {
            Ok(estimated) => tx = tx.gas_limit(estimated),
            Err(e) => {
                warn!("gas estimation reverted ({}), falling back to static limit", e);
                tx = tx.gas_limit(class.static_gas_limit());
            }
        }

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| EngineError::BroadcastRejected { reason: e.to_string() })?;
        let tx_hash = format!("{:#x}", pending.tx_hash());
        info!(tx_hash, ?class, "broadcast sent, awaiting receipt");

        match tokio::time::timeout(RECEIPT_TIMEOUT, pending.get_receipt()).await {
            Ok(Ok(receipt)) if receipt.status() => Ok(ExecutionOutcome { status: ExecutionStatus::Confirmed, tx_hash: Some(tx_hash) }),
            Ok(Ok(_)) => Ok(ExecutionOutcome { status: ExecutionStatus::Reverted, tx_hash: Some(tx_hash) }),
            Ok(Err(e)) => Err(EngineError::TxReverted { tx_hash: format!("{tx_hash} ({e})") }),
            Err(_) => Ok(ExecutionOutcome { status: ExecutionStatus::Timeout, tx_hash: Some(tx_hash) }),
        }
    }

    pub fn execution_event(&self, outcome: &ExecutionOutcome, block_height: u64, route: String, net_usd: f64) -> EngineEvent {
        EngineEvent::Execution { block_height, route, net_usd, tx_hash: outcome.tx_hash.clone(), status: outcome.status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn static_gas_limits_match_per_class_budget() {
        assert_eq!(TxClass::TwoLeg.static_gas_limit(), 800_000);
        assert_eq!(TxClass::TriLeg.static_gas_limit(), 1_200_000);
        assert_eq!(TxClass::Liquidation.static_gas_limit(), 2_500_000);
    }

    #[test]
    fn priority_fee_differs_for_liquidation_vs_arb() {
        assert_eq!(TxClass::Liquidation.priority_fee_wei(), 500_000_000);
        assert_eq!(TxClass::TwoLeg.priority_fee_wei(), 10_000_000);
        assert_eq!(TxClass::TriLeg.priority_fee_wei(), 10_000_000);
    }

    #[test]
    fn build_two_leg_call_targets_the_configured_executor() {
        let executor = Address::from_str("0x0000000000000000000000000000000000000001").unwrap();
        let token = Address::from_str("0xaf88d065e77c8cC2239327C5EDb3A432268e5831").unwrap();
        let (to, data) = build_two_leg_call(executor, token, U256::from(1_000_000_000u64), Bytes::new());
        assert_eq!(to, executor);
        assert!(!data.is_empty());
    }

    #[tokio::test]
    async fn broadcast_without_signer_is_config_error() {
        let router = RpcRouter::new("http://example.invalid".into(), vec![]);
        let executor = Executor::new(router, None).unwrap();
        assert!(!executor.execution_enabled());
        let err = executor.broadcast(Address::ZERO, Bytes::new(), TxClass::TwoLeg).await.unwrap_err();
        assert!(matches!(err, EngineError::ConfigMissing(_)));
    }
}
