//! Per-venue-kind swap calldata encoding, targeting `venue.router` rather
//! than `venue.quoter` — the execution-time counterpart to
//! [`crate::quote::venue::encode_quote_call`].

use alloy::primitives::{Address, Bytes, U160, U256};
use alloy::sol_types::SolCall;

use crate::contracts::{IAlgebraSwapRouter, ICurvePool, ISwapRouter};
use crate::types::{Venue, VenueKind};

/// Encode a single swap call against `venue`. Returns `None` for a
/// `StableCurvePool` venue that lacks a slot for either token, same as the
/// quote-side encoder.
#[allow(clippy::too_many_arguments)]
pub fn encode_swap_call(
    venue: &Venue,
    token_in: Address,
    token_out: Address,
    fee: u32,
    recipient: Address,
    deadline: U256,
    amount_in: U256,
    amount_out_minimum: U256,
) -> Option<(Address, Bytes)> {
    match venue.kind {
        VenueKind::ConstantProductV3 => {
            let call = ISwapRouter::exactInputSingleCall {
                params: ISwapRouter::ExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    fee,
                    recipient,
                    deadline,
                    amountIn: amount_in,
                    amountOutMinimum: amount_out_minimum,
                    sqrtPriceLimitX96: U160::ZERO,
                },
            };
            Some((venue.router, Bytes::from(call.abi_encode())))
        }
        VenueKind::AlgebraDynamicFee => {
            let call = IAlgebraSwapRouter::exactInputSingleCall {
                params: IAlgebraSwapRouter::ExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    recipient,
                    deadline,
                    amountIn: amount_in,
                    amountOutMinimum: amount_out_minimum,
                    limitSqrtPrice: U160::ZERO,
                },
            };
            Some((venue.router, Bytes::from(call.abi_encode())))
        }
        VenueKind::StableCurvePool => {
            let i = venue.slot_of(&token_in)?;
            let j = venue.slot_of(&token_out)?;
            let call = ICurvePool::exchangeCall { i, j, dx: amount_in, min_dy: amount_out_minimum };
            Some((venue.router, Bytes::from(call.abi_encode())))
        }
    }
}

/// A deadline a fixed window past whatever moment the caller samples; swap
/// calldata is built and broadcast within the same block cycle, so a wide
/// buffer is plenty.
pub fn deadline_from_unix_secs(now_unix_secs: u64, buffer_secs: u64) -> U256 {
    U256::from(now_unix_secs + buffer_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn v3_venue() -> Venue {
        Venue {
            name: "uniswap-v3".into(),
            kind: VenueKind::ConstantProductV3,
            quoter: Address::ZERO,
            router: Address::from_str("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45").unwrap(),
            fee_tiers: vec![500],
            asset_slots: None,
        }
    }

    #[test]
    fn v3_swap_targets_the_venue_router_not_the_quoter() {
        let venue = v3_venue();
        let (to, data) = encode_swap_call(&venue, Address::ZERO, Address::ZERO, 500, Address::ZERO, U256::from(1u64), U256::from(1u64), U256::ZERO).unwrap();
        assert_eq!(to, venue.router);
        assert!(!data.is_empty());
    }

    #[test]
    fn curve_venue_without_slot_is_skipped() {
        let venue = Venue {
            name: "curve".into(),
            kind: VenueKind::StableCurvePool,
            quoter: Address::ZERO,
            router: Address::ZERO,
            fee_tiers: vec![0],
            asset_slots: Some(std::collections::HashMap::new()),
        };
        let token = Address::from_str("0x912CE59144191C1204E64559FE8253a0e49E6548").unwrap();
        assert!(encode_swap_call(&venue, token, Address::ZERO, 0, Address::ZERO, U256::ZERO, U256::from(1u64), U256::ZERO).is_none());
    }
}
