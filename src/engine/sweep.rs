//! Trial sweep: one boundary search plus at most one real execution per trade size, each trial
//! bracketed by an outer checkpoint so every trial starts from the same baseline.

use super::maximizer::BoundaryMaximizer;
use super::oracle::FeasibilityOracle;
use super::price::mid_price_for;
use super::records::{StateObservation, TrialInputSet, TrialRecord};
use super::{swap_exact_in, World};
use crate::error::{CheckpointMisuse, EngineError, Result};
use crate::protocols::TradeDirection;
use crate::sink::CurveSink;
use alloy::primitives::{Address, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPlan {
    pub direction: TradeDirection,
    pub trader: Address,
}

#[derive(Debug, Clone)]
pub struct SweepDriver {
    maximizer: BoundaryMaximizer,
    plan: SweepPlan,
}

impl SweepDriver {
    pub fn new(maximizer: BoundaryMaximizer, plan: SweepPlan) -> Self {
        Self { maximizer, plan }
    }

    pub fn plan(&self) -> &SweepPlan {
        &self.plan
    }

    pub fn run<W: World + ?Sized>(
        &self,
        world: &mut W,
        inputs: &TrialInputSet,
    ) -> Result<Vec<TrialRecord>> {
        self.drive(world, inputs, None)
    }

    /// Same as [`Self::run`], additionally appending each record to `sink` as it is produced.
    pub fn run_with_sink<W: World + ?Sized>(
        &self,
        world: &mut W,
        inputs: &TrialInputSet,
        sink: &mut dyn CurveSink,
    ) -> Result<Vec<TrialRecord>> {
        self.drive(world, inputs, Some(sink))
    }

    fn drive<W: World + ?Sized>(
        &self,
        world: &mut W,
        inputs: &TrialInputSet,
        mut sink: Option<&mut dyn CurveSink>,
    ) -> Result<Vec<TrialRecord>> {
        let mut oracle = FeasibilityOracle::new();
        let mut records = Vec::with_capacity(inputs.len());

        tracing::info!(
            "[SWEEP] starting {} trials direction={} trader={}",
            inputs.len(),
            self.plan.direction.as_str(),
            self.plan.trader
        );

        for (index, trade_size) in inputs.iter().copied().enumerate() {
            let record = self
                .run_trial(world, &mut oracle, trade_size)
                .map_err(|source| EngineError::Trial {
                    index,
                    magnitude: trade_size,
                    source: Box::new(source),
                })?;

            tracing::debug!(
                "[SWEEP] trial={} size={} max_out={} liquidations={} slippage_bps={}",
                index,
                record.trade_size,
                record.max_out,
                record.liquidations,
                record.slippage_bps
            );

            if let Some(sink) = sink.as_deref_mut() {
                sink.append(&record)?;
            }
            records.push(record);
        }

        let filled = records.iter().filter(|r| r.is_filled()).count();
        let peak = records.iter().map(|r| r.liquidations).max().unwrap_or(0);
        tracing::info!(
            "[SWEEP] done trials={} filled={} peak_liquidations={} probes={} rejected_probes={}",
            records.len(),
            filled,
            peak,
            oracle.probes(),
            oracle.rejections()
        );
        Ok(records)
    }

    fn run_trial<W: World + ?Sized>(
        &self,
        world: &mut W,
        oracle: &mut FeasibilityOracle,
        trade_size: U256,
    ) -> Result<TrialRecord> {
        let depth_before = world.checkpoint_depth();
        let outer = world.snapshot();
        let outer_id = outer.id();

        let measured = self.measure(world, oracle, trade_size);
        let restored = world.restore(outer);
        let record = measured?;
        restored?;

        let depth_after = world.checkpoint_depth();
        if depth_after != depth_before {
            return Err(EngineError::CheckpointMisuse {
                kind: CheckpointMisuse::Leaked,
                id: outer_id,
                depth: depth_after,
            });
        }
        Ok(record)
    }

    fn measure<W: World + ?Sized>(
        &self,
        world: &mut W,
        oracle: &mut FeasibilityOracle,
        trade_size: U256,
    ) -> Result<TrialRecord> {
        let SweepPlan { direction, trader } = self.plan;
        let before = StateObservation::capture(world);
        let mid = mid_price_for(&before.reserves, direction);

        let reserve_out = before.reserves.of(direction.output_asset());
        let upper = reserve_out.saturating_sub(U256::from(1u64));
        let search = self
            .maximizer
            .maximize(oracle, world, U256::ZERO, upper, |w: &mut W, out| {
                swap_exact_in(w, direction, trader, trade_size, out)
            })?;

        let Some(max_out) = search.feasible() else {
            return Ok(TrialRecord::unfilled(trade_size, &before, mid));
        };

        // Real execution from the untouched baseline: every probe above was rolled back.
        if let Err(rejection) = swap_exact_in(world, direction, trader, trade_size, max_out) {
            tracing::warn!(
                "[SWEEP] real execution rejected after feasible probe size={} out={} reason={}",
                trade_size,
                max_out,
                rejection
            );
            return Ok(TrialRecord::unfilled(trade_size, &before, mid));
        }

        let after = StateObservation::capture(world);
        Ok(TrialRecord::filled(trade_size, max_out, &before, &after, mid))
    }
}
