//! Multicall3 batch dispatch: chunk requests into groups of <= 15, submit
//! concurrently with a gas override, and decode results back onto the
//! caller's request list by index — the only mapping from submission order
//! back to `(token_in, token_out, venue, fee)` is that index, so requests
//! and results are never reordered independently.

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol_types::SolCall;
use anyhow::Result;
use std::str::FromStr;
use tracing::warn;

use crate::contracts::IMulticall3;
use crate::filters::WhitelistFilter;
use crate::rpc::RpcRouter;
use crate::types::Venue;

use super::venue::{decode_quote_result, encode_quote_call};

pub const MULTICALL3_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";
const CHUNK_SIZE: usize = 15;

#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub venue: String,
    pub fee: u32,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
}

pub struct QuoteEngine {
    router: RpcRouter,
    multicall: Address,
}

impl QuoteEngine {
    pub fn new(router: RpcRouter) -> Self {
        Self { router, multicall: Address::from_str(MULTICALL3_ADDRESS).expect("canonical address must parse") }
    }

    /// Quote every request, returning `U256::ZERO` in-place for any request
    /// that was rejected by the whitelist, references an unknown venue, or
    /// reverted on-chain. `gas_override` is 50_000_000 for two-leg scans and
    /// 300_000_000 for tri-leg per the call-batch contract.
    pub async fn batch_quote(&self, venues: &[Venue], requests: &[QuoteRequest], whitelist: Option<&WhitelistFilter>, gas_override: u64) -> Result<Vec<U256>> {
        let mut results = vec![U256::ZERO; requests.len()];
        let mut calls = Vec::with_capacity(requests.len());
        let mut slot_of_request = Vec::with_capacity(requests.len());

        for (idx, req) in requests.iter().enumerate() {
            let Some(venue) = venues.iter().find(|v| v.name == req.venue) else {
                continue;
            };
            if let Some(wl) = whitelist {
                let pair = format!("{:#x}-{:#x}", req.token_in, req.token_out);
                if !wl.is_pool_allowed(&venue.quoter, req.fee, &pair) {
                    continue;
                }
            }
            let Some((target, calldata)) = encode_quote_call(venue, req.token_in, req.token_out, req.amount_in, req.fee) else {
                continue;
            };
            calls.push(IMulticall3::Call { target, callData: calldata });
            slot_of_request.push(idx);
        }

        for (chunk_calls, chunk_slots) in calls.chunks(CHUNK_SIZE).zip(slot_of_request.chunks(CHUNK_SIZE)) {
            match self.dispatch_chunk(chunk_calls.to_vec(), gas_override).await {
                Ok(chunk_results) => {
                    for (slot, (success, data)) in chunk_slots.iter().zip(chunk_results) {
                        let req = &requests[*slot];
                        let venue = venues.iter().find(|v| v.name == req.venue).unwrap();
                        results[*slot] = decode_quote_result(venue, success, &data);
                    }
                }
                Err(e) => {
                    warn!("quote engine: multicall chunk failed: {}", e);
                }
            }
        }

        Ok(results)
    }

    async fn dispatch_chunk(&self, calls: Vec<IMulticall3::Call>, gas_override: u64) -> Result<Vec<(bool, Vec<u8>)>> {
        let url = self.router.get_handle(false).await;
        let provider = alloy::providers::ProviderBuilder::new().connect_http(url.parse()?);

        let call = IMulticall3::tryAggregateCall { requireSuccess: false, calls };
        let tx = alloy::rpc::types::TransactionRequest::default()
            .to(self.multicall)
            .input(call.abi_encode().into())
            .gas_limit(gas_override);

        let raw = provider.call(tx).await.map_err(|e| {
            anyhow::anyhow!("multicall eth_call failed: {}", e)
        })?;
        let decoded = IMulticall3::tryAggregateCall::abi_decode_returns(&raw)?;
        Ok(decoded.into_iter().map(|r| (r.success, r.returnData.to_vec())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multicall_address_matches_canonical_deployment() {
        assert_eq!(MULTICALL3_ADDRESS, "0xcA11bde05977b3631167028862bE2a173976CA11");
    }

    #[test]
    fn chunk_size_is_fifteen() {
        assert_eq!(CHUNK_SIZE, 15);
    }
}
