use super::bitmap::{liquidation_count, population_count, symmetric_difference};
use super::price::{exec_price_wad, slippage_bps};
use crate::protocols::{BlackBoxProtocol, ReservePair};
use crate::utils::constants::BPS_DENOMINATOR;
use crate::utils::math::mul_div_saturating;
use alloy::primitives::U256;
use serde::Serialize;

/// Protocol state sampled immediately before or after a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateObservation {
    pub bitmap: U256,
    pub reserves: ReservePair,
}

impl StateObservation {
    pub fn capture<W: BlackBoxProtocol + ?Sized>(world: &W) -> Self {
        Self {
            bitmap: world.occupancy_bitmap(),
            reserves: world.reserves(),
        }
    }
}

/// One curve row. Built once per trial and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    pub trade_size: U256,
    pub max_out: U256,
    pub liquidations: u32,
    pub popcount_before: u32,
    pub popcount_after: u32,
    pub bitmap_before: U256,
    pub bitmap_after: U256,
    pub bitmap_xor: U256,
    pub reserves_before: ReservePair,
    pub reserves_after: ReservePair,
    pub mid_price_wad: U256,
    pub exec_price_wad: U256,
    pub slippage_bps: U256,
}

impl TrialRecord {
    /// Row for a trial that could not execute: nothing moved, no price was realized.
    pub fn unfilled(trade_size: U256, before: &StateObservation, mid_price_wad: U256) -> Self {
        let popcount = population_count(before.bitmap);
        Self {
            trade_size,
            max_out: U256::ZERO,
            liquidations: 0,
            popcount_before: popcount,
            popcount_after: popcount,
            bitmap_before: before.bitmap,
            bitmap_after: before.bitmap,
            bitmap_xor: U256::ZERO,
            reserves_before: before.reserves,
            reserves_after: before.reserves,
            mid_price_wad,
            exec_price_wad: U256::ZERO,
            slippage_bps: U256::ZERO,
        }
    }

    pub fn filled(
        trade_size: U256,
        max_out: U256,
        before: &StateObservation,
        after: &StateObservation,
        mid_price_wad: U256,
    ) -> Self {
        let exec = exec_price_wad(trade_size, max_out).unwrap_or(U256::ZERO);
        Self {
            trade_size,
            max_out,
            liquidations: liquidation_count(before.bitmap, after.bitmap),
            popcount_before: population_count(before.bitmap),
            popcount_after: population_count(after.bitmap),
            bitmap_before: before.bitmap,
            bitmap_after: after.bitmap,
            bitmap_xor: symmetric_difference(before.bitmap, after.bitmap),
            reserves_before: before.reserves,
            reserves_after: after.reserves,
            mid_price_wad,
            exec_price_wad: exec,
            slippage_bps: slippage_bps(mid_price_wad, exec),
        }
    }

    pub fn is_filled(&self) -> bool {
        !self.max_out.is_zero()
    }
}

/// Ordered trade sizes for one sweep. Fixed before the sweep starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrialInputSet {
    magnitudes: Vec<U256>,
}

impl TrialInputSet {
    pub fn new(magnitudes: Vec<U256>) -> Self {
        Self { magnitudes }
    }

    /// `start, start * g, start * g^2, ...` with `g = growth_bps / 10_000`.
    ///
    /// The sequence is forced strictly increasing (a step that rounds down to no growth is
    /// bumped by one) and stops early once it saturates at `U256::MAX`.
    pub fn geometric(start: U256, growth_bps: u32, count: usize) -> Self {
        let mut magnitudes = Vec::with_capacity(count);
        let mut current = start;
        for _ in 0..count {
            if magnitudes.last().is_some_and(|prev: &U256| *prev >= current) {
                break;
            }
            magnitudes.push(current);
            let grown = mul_div_saturating(
                current,
                U256::from(growth_bps),
                U256::from(BPS_DENOMINATOR),
            );
            current = if grown > current {
                grown
            } else {
                current.saturating_add(U256::from(1u64))
            };
        }
        Self { magnitudes }
    }

    pub fn magnitudes(&self) -> &[U256] {
        &self.magnitudes
    }

    pub fn iter(&self) -> impl Iterator<Item = &U256> {
        self.magnitudes.iter()
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }
}

impl FromIterator<U256> for TrialInputSet {
    fn from_iter<I: IntoIterator<Item = U256>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
