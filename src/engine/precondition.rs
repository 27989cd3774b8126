//! Persistent (never rolled back) setup that moves the protocol into a regime where the sweep's
//! measurements are meaningful: optional price shift, collateral deposit, then dense loan
//! origination.
//!
//! Every step may fail partially. The only hard failure is ending with no active loan slot.

use super::bitmap::population_count;
use super::maximizer::BoundaryMaximizer;
use super::oracle::FeasibilityOracle;
use super::{commit_or_revert, swap_exact_in, World};
use crate::error::{EngineError, PreconditionStep, Result};
use crate::protocols::{Asset, ReservePair, TradeDirection};
use crate::utils::constants::BPS_DENOMINATOR;
use crate::utils::math::mul_div_saturating;
use alloy::primitives::{Address, U256};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceShift {
    pub direction: TradeDirection,
    pub trader: Address,
    pub input: U256,
    pub fraction_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconditionPlan {
    pub price_shift: Option<PriceShift>,
    pub borrower: Address,
    pub collateral_asset: Asset,
    pub collateral: U256,
    /// Exclusive upper bound of the max-loan search.
    pub loan_search_ceiling: U256,
    pub loan_fraction_bps: u32,
    pub loan_cap: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreconditionReport {
    /// Output of the real price-moving trade, if one executed.
    pub price_shift_out: Option<U256>,
    pub collateral_deposited: bool,
    pub max_loan: U256,
    pub loan_size: U256,
    pub loans_created: usize,
    pub bitmap: U256,
    pub reserves: ReservePair,
}

#[derive(Debug, Clone)]
pub struct PreconditioningPhase {
    maximizer: BoundaryMaximizer,
    plan: PreconditionPlan,
}

fn fraction_of(amount: U256, fraction_bps: u32) -> U256 {
    mul_div_saturating(
        amount,
        U256::from(fraction_bps),
        U256::from(BPS_DENOMINATOR),
    )
}

impl PreconditioningPhase {
    pub fn new(maximizer: BoundaryMaximizer, plan: PreconditionPlan) -> Self {
        Self { maximizer, plan }
    }

    pub fn plan(&self) -> &PreconditionPlan {
        &self.plan
    }

    pub fn run<W: World + ?Sized>(&self, world: &mut W) -> Result<PreconditionReport> {
        let mut oracle = FeasibilityOracle::new();

        let price_shift_out = match self.plan.price_shift {
            Some(shift) => self.shift_price(world, &mut oracle, shift)?,
            None => None,
        };
        let collateral_deposited = self.deposit_collateral(world)?;
        let max_loan = self.discover_max_loan(world, &mut oracle)?;
        let loan_size = fraction_of(max_loan, self.plan.loan_fraction_bps);
        let loans_created = self.originate_loans(world, loan_size)?;

        let bitmap = world.occupancy_bitmap();
        if population_count(bitmap) == 0 {
            let (step, magnitude) = if !collateral_deposited {
                (PreconditionStep::DepositCollateral, self.plan.collateral)
            } else if max_loan.is_zero() {
                (PreconditionStep::DiscoverMaxLoan, self.plan.loan_search_ceiling)
            } else {
                (PreconditionStep::OriginateLoans, loan_size)
            };
            tracing::error!(
                "[PRECOND] no active loan slot after preconditioning step={} magnitude={}",
                step,
                magnitude
            );
            return Err(EngineError::PreconditionNotMet {
                step,
                magnitude,
                detail: format!(
                    "no loan slot is active (collateral_deposited={collateral_deposited}, max_loan={max_loan}, loans_created={loans_created})"
                ),
            });
        }

        let report = PreconditionReport {
            price_shift_out,
            collateral_deposited,
            max_loan,
            loan_size,
            loans_created,
            bitmap,
            reserves: world.reserves(),
        };
        tracing::info!(
            "[PRECOND] ready loans={} popcount={} max_loan={} shifted={}",
            report.loans_created,
            population_count(report.bitmap),
            report.max_loan,
            report.price_shift_out.is_some()
        );
        Ok(report)
    }

    fn shift_price<W: World + ?Sized>(
        &self,
        world: &mut W,
        oracle: &mut FeasibilityOracle,
        shift: PriceShift,
    ) -> Result<Option<U256>> {
        let reserve_out = world.reserves().of(shift.direction.output_asset());
        let upper = reserve_out.saturating_sub(U256::from(1u64));
        let search = self.maximizer.maximize(
            oracle,
            world,
            U256::ZERO,
            upper,
            |w: &mut W, out| swap_exact_in(w, shift.direction, shift.trader, shift.input, out),
        )?;

        let target = fraction_of(search.best, shift.fraction_bps);
        if target.is_zero() {
            tracing::warn!(
                "[PRECOND] price shift skipped: no feasible output for input={}",
                shift.input
            );
            return Ok(None);
        }

        let executed = commit_or_revert(world, |w: &mut W| {
            swap_exact_in(w, shift.direction, shift.trader, shift.input, target)
        })?;
        match executed {
            Ok(()) => {
                tracing::info!(
                    "[PRECOND] price shifted direction={} input={} out={} (max {})",
                    shift.direction.as_str(),
                    shift.input,
                    target,
                    search.best
                );
                Ok(Some(target))
            }
            Err(rejection) => {
                tracing::warn!(
                    "[PRECOND] price shift rejected input={} out={}: {}",
                    shift.input,
                    target,
                    rejection
                );
                Ok(None)
            }
        }
    }

    fn deposit_collateral<W: World + ?Sized>(&self, world: &mut W) -> Result<bool> {
        let borrower = self.plan.borrower;
        let asset = self.plan.collateral_asset;
        let collateral = self.plan.collateral;
        let deposited = commit_or_revert(world, |w: &mut W| {
            w.act_as(borrower);
            w.mint(asset, borrower, collateral)?;
            w.deposit_collateral(collateral, borrower)
        })?;
        match deposited {
            Ok(()) => Ok(true),
            Err(rejection) => {
                tracing::warn!(
                    "[PRECOND] step={} amount={} rejected: {}",
                    PreconditionStep::DepositCollateral,
                    collateral,
                    rejection
                );
                Ok(false)
            }
        }
    }

    fn discover_max_loan<W: World + ?Sized>(
        &self,
        world: &mut W,
        oracle: &mut FeasibilityOracle,
    ) -> Result<U256> {
        let borrower = self.plan.borrower;
        let search = self.maximizer.maximize(
            oracle,
            world,
            U256::ZERO,
            self.plan.loan_search_ceiling,
            |w: &mut W, amount| {
                w.act_as(borrower);
                w.take_out_loan(amount, borrower, &[])
            },
        )?;
        if search.budget_exhausted {
            tracing::warn!(
                "[PRECOND] max-loan search hit its {} probe budget; using best-so-far {}",
                self.maximizer.max_iterations(),
                search.best
            );
        }
        Ok(search.best)
    }

    fn originate_loans<W: World + ?Sized>(&self, world: &mut W, loan_size: U256) -> Result<usize> {
        if loan_size.is_zero() {
            return Ok(0);
        }
        let borrower = self.plan.borrower;
        let mut created = 0usize;
        while created < self.plan.loan_cap {
            let originated = commit_or_revert(world, |w: &mut W| {
                w.act_as(borrower);
                w.take_out_loan(loan_size, borrower, &[])
            })?;
            if let Err(rejection) = originated {
                tracing::debug!(
                    "[PRECOND] origination stopped after {} loans: {}",
                    created,
                    rejection
                );
                break;
            }
            created += 1;
        }
        Ok(created)
    }
}
