//! Reference lending vault: collateral in asset B, loans in asset A, one occupancy bit per loan.
//!
//! The maximum loan-to-value shrinks linearly with vault utilization, so loans originated later
//! lock more collateral per unit of debt and sit further from their liquidation price. A price
//! drop therefore flips slots progressively instead of all at once.

use crate::protocols::Rejection;
use crate::utils::constants::{BPS_DENOMINATOR, OCCUPANCY_BITMAP_WIDTH, WAD_U256};
use crate::utils::math::{mul_div, mul_div_saturating, mul_div_up};
use alloy::primitives::{Address, U256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultParams {
    /// Max LTV at zero utilization.
    pub base_ltv_bps: u64,
    /// Max LTV at full utilization.
    pub min_ltv_bps: u64,
    /// Loans whose collateral value * threshold falls below their debt are liquidated.
    pub liquidation_threshold_bps: u64,
    pub max_loan_per_slot: U256,
}

impl Default for VaultParams {
    fn default() -> Self {
        Self {
            base_ltv_bps: 8_000,
            min_ltv_bps: 4_000,
            liquidation_threshold_bps: 8_500,
            max_loan_per_slot: U256::from(10_000u64) * WAD_U256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub borrower: Address,
    pub debt: U256,
    pub collateral: U256,
}

/// Accepted loan quote, applied with [`VaultState::originate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanQuote {
    pub slot: usize,
    pub collateral_locked: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VaultState {
    pub free_collateral: BTreeMap<Address, U256>,
    pub liquidity: U256,
    pub total_debt: U256,
    pub seized_collateral: U256,
    pub loans: BTreeMap<usize, Loan>,
    pub bitmap: U256,
}

impl VaultState {
    pub fn with_liquidity(liquidity: U256) -> Self {
        Self {
            liquidity,
            ..Self::default()
        }
    }

    /// total_debt / (total_debt + liquidity) in bps; 0 for an empty vault.
    pub fn utilization_bps(&self) -> u64 {
        let supplied = self.total_debt.saturating_add(self.liquidity);
        let util = mul_div(self.total_debt, U256::from(BPS_DENOMINATOR), supplied)
            .unwrap_or(U256::ZERO);
        u64::try_from(util)
            .unwrap_or(BPS_DENOMINATOR)
            .min(BPS_DENOMINATOR)
    }

    pub fn max_ltv_bps(&self, params: &VaultParams) -> u64 {
        let spread = params.base_ltv_bps.saturating_sub(params.min_ltv_bps);
        params.base_ltv_bps - spread * self.utilization_bps() / BPS_DENOMINATOR
    }

    pub fn collateral_of(&self, borrower: Address) -> U256 {
        self.free_collateral
            .get(&borrower)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn credit_collateral(&mut self, borrower: Address, amount: U256) -> Result<(), Rejection> {
        let current = self.collateral_of(borrower);
        let next = current
            .checked_add(amount)
            .ok_or_else(|| Rejection::new("VAULT: collateral overflow"))?;
        self.free_collateral.insert(borrower, next);
        Ok(())
    }

    fn lowest_free_slot(&self) -> Option<usize> {
        (0..OCCUPANCY_BITMAP_WIDTH as usize).find(|slot| !self.bitmap.bit(*slot))
    }

    /// Validate a loan without mutating anything. `price_wad` is asset A per unit of asset B.
    pub fn quote_loan(
        &self,
        params: &VaultParams,
        borrower: Address,
        amount: U256,
        price_wad: U256,
    ) -> Result<LoanQuote, Rejection> {
        if amount.is_zero() {
            return Err(Rejection::new("VAULT: zero loan"));
        }
        if amount > params.max_loan_per_slot {
            return Err(Rejection::new("VAULT: loan exceeds per-slot cap"));
        }
        if amount > self.liquidity {
            return Err(Rejection::new("VAULT: insufficient liquidity"));
        }
        if price_wad.is_zero() {
            return Err(Rejection::new("VAULT: collateral has no price"));
        }
        let Some(slot) = self.lowest_free_slot() else {
            return Err(Rejection::new("VAULT: no free loan slot"));
        };

        // collateral * price / WAD * ltv / 10_000 >= amount
        let ltv = U256::from(self.max_ltv_bps(params));
        let value_needed = mul_div_up(amount, U256::from(BPS_DENOMINATOR), ltv)
            .ok_or_else(|| Rejection::new("VAULT: ltv disabled"))?;
        let collateral_locked = mul_div_up(value_needed, WAD_U256, price_wad)
            .ok_or_else(|| Rejection::new("VAULT: collateral requirement overflow"))?;
        if collateral_locked > self.collateral_of(borrower) {
            return Err(Rejection::new("VAULT: insufficient collateral"));
        }

        Ok(LoanQuote {
            slot,
            collateral_locked,
        })
    }

    pub fn originate(&mut self, borrower: Address, amount: U256, quote: LoanQuote) {
        let free = self.collateral_of(borrower);
        self.free_collateral
            .insert(borrower, free.saturating_sub(quote.collateral_locked));
        self.liquidity = self.liquidity.saturating_sub(amount);
        self.total_debt = self.total_debt.saturating_add(amount);
        self.bitmap.set_bit(quote.slot, true);
        self.loans.insert(
            quote.slot,
            Loan {
                borrower,
                debt: amount,
                collateral: quote.collateral_locked,
            },
        );
    }

    pub fn is_liquidatable(params: &VaultParams, loan: &Loan, price_wad: U256) -> bool {
        let value = mul_div_saturating(loan.collateral, price_wad, WAD_U256);
        let borrowable = mul_div_saturating(
            value,
            U256::from(params.liquidation_threshold_bps),
            U256::from(BPS_DENOMINATOR),
        );
        borrowable < loan.debt
    }

    /// Clear every slot whose loan is under water at `price_wad`. Debt is written off and the
    /// collateral is seized by the vault. Returns the number of slots cleared.
    pub fn liquidate_unhealthy(&mut self, params: &VaultParams, price_wad: U256) -> u32 {
        let unhealthy: Vec<usize> = self
            .loans
            .iter()
            .filter(|(_, loan)| Self::is_liquidatable(params, loan, price_wad))
            .map(|(slot, _)| *slot)
            .collect();

        for slot in &unhealthy {
            if let Some(loan) = self.loans.remove(slot) {
                self.total_debt = self.total_debt.saturating_sub(loan.debt);
                self.seized_collateral = self.seized_collateral.saturating_add(loan.collateral);
                self.bitmap.set_bit(*slot, false);
            }
        }
        unhealthy.len() as u32
    }
}
