//! Occupancy-bitmap transitions as a protocol-agnostic proxy for "a loan slot changed state".
//!
//! The count is direction-agnostic: a liquidated slot and a newly originated slot both count
//! as one flip.

use crate::utils::constants::OCCUPANCY_BITMAP_WIDTH;
use alloy::primitives::U256;

pub fn population_count(bitmap: U256) -> u32 {
    bitmap.count_ones() as u32
}

pub fn symmetric_difference(a: U256, b: U256) -> U256 {
    a ^ b
}

pub fn liquidation_count(before: U256, after: U256) -> u32 {
    let flips = population_count(symmetric_difference(before, after));
    debug_assert!(flips <= OCCUPANCY_BITMAP_WIDTH);
    flips
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liquidation_count_of_overlapping_bitmaps() {
        let before = U256::from(0b1010u64);
        let after = U256::from(0b1100u64);
        assert_eq!(symmetric_difference(before, after), U256::from(0b0110u64));
        assert_eq!(liquidation_count(before, after), 2);
    }

    #[test]
    fn test_liquidation_count_is_zero_for_identical_bitmaps() {
        let bitmap = U256::from(0xdead_beefu64);
        assert_eq!(liquidation_count(bitmap, bitmap), 0);
    }

    #[test]
    fn test_liquidation_count_full_width() {
        assert_eq!(population_count(U256::MAX), OCCUPANCY_BITMAP_WIDTH);
        assert_eq!(liquidation_count(U256::ZERO, U256::MAX), OCCUPANCY_BITMAP_WIDTH);
    }
}
