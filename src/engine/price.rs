//! WAD fixed-point price and slippage metrics. No floating point anywhere.

use crate::protocols::{ReservePair, TradeDirection};
use crate::utils::constants::{BPS_DENOMINATOR, WAD_U256};
use crate::utils::math::mul_div_saturating;
use alloy::primitives::U256;

/// `numerator * WAD / denominator`; 0 when the denominator reserve is empty.
pub fn mid_price_wad(numerator_reserve: U256, denominator_reserve: U256) -> U256 {
    if denominator_reserve.is_zero() {
        return U256::ZERO;
    }
    mul_div_saturating(numerator_reserve, WAD_U256, denominator_reserve)
}

/// Spot price of the output asset in units of the input asset.
pub fn mid_price_for(reserves: &ReservePair, direction: TradeDirection) -> U256 {
    mid_price_wad(
        reserves.of(direction.input_asset()),
        reserves.of(direction.output_asset()),
    )
}

/// Realized `amount_in / amount_out`, WAD scaled. Undefined (`None`) for a zero output.
pub fn exec_price_wad(amount_in: U256, amount_out: U256) -> Option<U256> {
    if amount_out.is_zero() {
        return None;
    }
    Some(mul_div_saturating(amount_in, WAD_U256, amount_out))
}

/// `|exec - mid| * 10_000 / mid`; 0 when `mid` is 0.
pub fn slippage_bps(mid: U256, exec: U256) -> U256 {
    if mid.is_zero() {
        return U256::ZERO;
    }
    let delta = if exec >= mid { exec - mid } else { mid - exec };
    mul_div_saturating(delta, U256::from(BPS_DENOMINATOR), mid)
}
