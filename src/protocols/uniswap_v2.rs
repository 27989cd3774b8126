use crate::utils::constants::{
    UNISWAP_V2_FEE_DENOMINATOR, UNISWAP_V2_FEE_MULTIPLIER, UNISWAP_V2_MAX_RESERVE,
};
use crate::utils::math::{extend_to_512, truncate_to_256};
use alloy::primitives::U256;

/// Uniswap V2 constant product quote: dy = (dx * 997 * y) / (1000 * x + dx * 997)
/// Arithmetic in 512-bit so no reserve/input combination can overflow the intermediate.
/// Returns `None` for empty reserves or a zero input.
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Option<U256> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }
    let fee = extend_to_512(U256::from(UNISWAP_V2_FEE_MULTIPLIER));
    let base = extend_to_512(U256::from(UNISWAP_V2_FEE_DENOMINATOR));

    let amount_in_with_fee = extend_to_512(amount_in) * fee;
    let numerator = amount_in_with_fee * extend_to_512(reserve_out);
    let denominator = extend_to_512(reserve_in) * base + amount_in_with_fee;

    truncate_to_256(numerator / denominator)
}

/// Post-swap invariant enforced by the pair:
/// (balance0 * 1000 - amount0In * 3) * (balance1 * 1000 - amount1In * 3) >= reserve0 * reserve1 * 1000^2
pub fn satisfies_fee_adjusted_k(
    balance_a: U256,
    balance_b: U256,
    amount_a_in: U256,
    amount_b_in: U256,
    reserve_a: U256,
    reserve_b: U256,
) -> bool {
    let base = extend_to_512(U256::from(UNISWAP_V2_FEE_DENOMINATOR));
    let fee_cut = extend_to_512(U256::from(
        UNISWAP_V2_FEE_DENOMINATOR - UNISWAP_V2_FEE_MULTIPLIER,
    ));

    let scaled_a = extend_to_512(balance_a) * base;
    let scaled_b = extend_to_512(balance_b) * base;
    let cut_a = extend_to_512(amount_a_in) * fee_cut;
    let cut_b = extend_to_512(amount_b_in) * fee_cut;
    if cut_a > scaled_a || cut_b > scaled_b {
        return false;
    }
    let adjusted_a = scaled_a - cut_a;
    let adjusted_b = scaled_b - cut_b;

    let lhs = adjusted_a.checked_mul(adjusted_b);
    let rhs = (extend_to_512(reserve_a) * extend_to_512(reserve_b)).checked_mul(base * base);
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => lhs >= rhs,
        // Reserves are uint112, so the product side can only overflow for absurd balances.
        _ => false,
    }
}

/// Reserves are stored as uint112; anything larger cannot be synced.
pub fn fits_reserve(value: U256) -> bool {
    value <= UNISWAP_V2_MAX_RESERVE
}
