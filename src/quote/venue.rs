//! Per-venue-kind calldata encoding and return-data decoding.

use alloy::primitives::{Address, Bytes, U160, U256};
use alloy::sol_types::SolCall;

use crate::contracts::{IAlgebraQuoter, ICurvePool, IQuoterV2};
use crate::types::{Venue, VenueKind};

/// Encode a single quote call against `venue` for the given leg. Returns
/// `None` for a `StableCurvePool` venue that lacks a slot for either token
/// (the engine skips the edge rather than submitting a doomed call).
pub fn encode_quote_call(venue: &Venue, token_in: Address, token_out: Address, amount_in: U256, fee: u32) -> Option<(Address, Bytes)> {
    match venue.kind {
        VenueKind::ConstantProductV3 => {
            let call = IQuoterV2::quoteExactInputSingleCall {
                params: IQuoterV2::QuoteExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    amountIn: amount_in,
                    fee,
                    sqrtPriceLimitX96: U160::ZERO,
                },
            };
            Some((venue.quoter, Bytes::from(call.abi_encode())))
        }
        VenueKind::AlgebraDynamicFee => {
            let call = IAlgebraQuoter::quoteExactInputSingleCall {
                tokenIn: token_in,
                tokenOut: token_out,
                amountIn: amount_in,
                limitSqrtPrice: U160::ZERO,
            };
            Some((venue.quoter, Bytes::from(call.abi_encode())))
        }
        VenueKind::StableCurvePool => {
            let i = venue.slot_of(&token_in)?;
            let j = venue.slot_of(&token_out)?;
            let call = ICurvePool::get_dyCall { i, j, dx: amount_in };
            Some((venue.quoter, Bytes::from(call.abi_encode())))
        }
    }
}

/// Decode a Multicall3 `(success, returnData)` tuple into an output amount.
/// A failed call or empty return bytes decodes to zero ("no route"), which
/// callers treat identically to a pruned edge.
pub fn decode_quote_result(venue: &Venue, success: bool, return_data: &[u8]) -> U256 {
    if !success || return_data.is_empty() {
        return U256::ZERO;
    }
    let decoded = match venue.kind {
        VenueKind::ConstantProductV3 => {
            IQuoterV2::quoteExactInputSingleCall::abi_decode_returns(return_data).ok().map(|r| r.amountOut)
        }
        VenueKind::AlgebraDynamicFee => {
            IAlgebraQuoter::quoteExactInputSingleCall::abi_decode_returns(return_data).ok().map(|r| r.amountOut)
        }
        VenueKind::StableCurvePool => {
            ICurvePool::get_dyCall::abi_decode_returns(return_data).ok()
        }
    };
    decoded.unwrap_or(U256::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VenueKind;
    use std::str::FromStr;

    fn v3_venue() -> Venue {
        Venue {
            name: "uniswap-v3".into(),
            kind: VenueKind::ConstantProductV3,
            quoter: Address::ZERO,
            router: Address::ZERO,
            fee_tiers: vec![500],
            asset_slots: None,
        }
    }

    #[test]
    fn failed_call_decodes_to_zero() {
        let venue = v3_venue();
        assert_eq!(decode_quote_result(&venue, false, &[1, 2, 3]), U256::ZERO);
    }

    #[test]
    fn empty_return_decodes_to_zero() {
        let venue = v3_venue();
        assert_eq!(decode_quote_result(&venue, true, &[]), U256::ZERO);
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
        assert!(encode_quote_call(&venue, token, Address::ZERO, U256::from(1u64), 0).is_none());
    }
}
