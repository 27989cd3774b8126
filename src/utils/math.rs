//! Shared fixed-point helpers.
//! Rule: concrete 256-bit arithmetic that must not overflow or divide by zero lives here.

use alloy::primitives::{U256, U512};

/// Zero-extend a 256-bit word to 512 bits.
pub fn extend_to_512(value: U256) -> U512 {
    let limbs = value.as_limbs();
    U512::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3], 0, 0, 0, 0])
}

/// Narrow a 512-bit word back to 256 bits, `None` if any high limb is set.
pub fn truncate_to_256(value: U512) -> Option<U256> {
    let limbs = value.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return None;
    }
    Some(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

/// `a * b / denominator` with a 512-bit intermediate product.
///
/// Returns `None` when the denominator is zero or the quotient does not fit in 256 bits.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    let product = extend_to_512(a) * extend_to_512(b);
    truncate_to_256(product / extend_to_512(denominator))
}

/// `ceil(a * b / denominator)`, same failure modes as [`mul_div`].
pub fn mul_div_up(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    let product = extend_to_512(a) * extend_to_512(b);
    let den = extend_to_512(denominator);
    let mut quotient = product / den;
    if !(product % den).is_zero() {
        quotient += U512::from(1u64);
    }
    truncate_to_256(quotient)
}

/// `a * b / denominator`, saturating at `U256::MAX` on overflow and returning 0 on a zero
/// denominator.
pub fn mul_div_saturating(a: U256, b: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::ZERO;
    }
    mul_div(a, b, denominator).unwrap_or(U256::MAX)
}
