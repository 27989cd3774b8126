//! In-memory reference world: a Uniswap V2 style pair plus the reference lending vault.
//!
//! Every action validates against a scratch copy of the touched state and commits only on
//! success, so a rejected action never leaves a partial effect. The whole [`MarketState`] is
//! journaled for snapshot/restore.

use crate::error::Result;
use crate::protocols::lending::{VaultParams, VaultState};
use crate::protocols::uniswap_v2::{fits_reserve, satisfies_fee_adjusted_k};
use crate::protocols::{ActionResult, Asset, BlackBoxProtocol, Rejection, ReservePair};
use crate::sandbox::{Checkpoint, SandboxState, SnapshotJournal};
use crate::utils::constants::{PAIR_ADDRESS, WAD_U256};
use crate::utils::math::mul_div;
use alloy::primitives::{Address, U256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketParams {
    pub reserve_a: U256,
    pub reserve_b: U256,
    pub vault_liquidity: U256,
    pub vault: VaultParams,
    pub pair: Address,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            reserve_a: U256::from(1_000_000u64) * WAD_U256,
            reserve_b: U256::from(1_000_000u64) * WAD_U256,
            vault_liquidity: U256::from(1_000_000u64) * WAD_U256,
            vault: VaultParams::default(),
            pair: PAIR_ADDRESS,
        }
    }
}

/// Complete mutable world. Cloned wholesale into the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketState {
    pub actor: Address,
    pub balances: BTreeMap<(Asset, Address), U256>,
    pub reserves: ReservePair,
    pub vault: VaultState,
    pub liquidations: u64,
}

impl MarketState {
    fn balance(&self, asset: Asset, owner: Address) -> U256 {
        self.balances
            .get(&(asset, owner))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn set_balance(&mut self, asset: Asset, owner: Address, amount: U256) {
        if amount.is_zero() {
            self.balances.remove(&(asset, owner));
        } else {
            self.balances.insert((asset, owner), amount);
        }
    }

    fn credit(&mut self, asset: Asset, owner: Address, amount: U256) -> ActionResult {
        let next = self
            .balance(asset, owner)
            .checked_add(amount)
            .ok_or_else(|| Rejection::new("TOKEN: balance overflow"))?;
        self.set_balance(asset, owner, next);
        Ok(())
    }

    /// Spot price of B in units of A, WAD scaled. Zero when B reserve is empty.
    fn collateral_price_wad(&self) -> U256 {
        mul_div(self.reserves.reserve_a, WAD_U256, self.reserves.reserve_b).unwrap_or(U256::ZERO)
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedMarket {
    params: MarketParams,
    state: MarketState,
    journal: SnapshotJournal<MarketState>,
}

impl SimulatedMarket {
    pub fn new(params: MarketParams) -> ActionResult<Self> {
        if params.reserve_a.is_zero() || params.reserve_b.is_zero() {
            return Err(Rejection::new("PAIR: reserves must be non-zero"));
        }
        if !fits_reserve(params.reserve_a) || !fits_reserve(params.reserve_b) {
            return Err(Rejection::new("PAIR: reserves exceed uint112"));
        }

        let mut balances = BTreeMap::new();
        balances.insert((Asset::A, params.pair), params.reserve_a);
        balances.insert((Asset::B, params.pair), params.reserve_b);

        let state = MarketState {
            actor: Address::ZERO,
            balances,
            reserves: ReservePair::new(params.reserve_a, params.reserve_b, 0),
            vault: VaultState::with_liquidity(params.vault_liquidity),
            liquidations: 0,
        };

        Ok(Self {
            params,
            state,
            journal: SnapshotJournal::new(),
        })
    }

    pub fn params(&self) -> &MarketParams {
        &self.params
    }

    /// Read-only view of the full world, for equality checks across checkpoints.
    pub fn world_state(&self) -> &MarketState {
        &self.state
    }

    pub fn collateral_price_wad(&self) -> U256 {
        self.state.collateral_price_wad()
    }

    pub fn free_collateral(&self, borrower: Address) -> U256 {
        self.state.vault.collateral_of(borrower)
    }
}

impl SandboxState for SimulatedMarket {
    fn snapshot(&mut self) -> Checkpoint {
        self.journal.capture(&self.state)
    }

    fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.state = self.journal.rewind(checkpoint)?;
        Ok(())
    }

    fn commit(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.journal.discard(checkpoint)
    }

    fn checkpoint_depth(&self) -> usize {
        self.journal.depth()
    }
}

impl BlackBoxProtocol for SimulatedMarket {
    fn act_as(&mut self, actor: Address) {
        self.state.actor = actor;
    }

    fn actor(&self) -> Address {
        self.state.actor
    }

    fn pair_address(&self) -> Address {
        self.params.pair
    }

    fn mint(&mut self, asset: Asset, to: Address, amount: U256) -> ActionResult {
        self.state.credit(asset, to, amount)
    }

    fn transfer(&mut self, asset: Asset, to: Address, amount: U256) -> ActionResult {
        let from = self.state.actor;
        let from_balance = self.state.balance(asset, from);
        if from_balance < amount {
            return Err(Rejection::new("TOKEN: transfer amount exceeds balance"));
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .state
            .balance(asset, to)
            .checked_add(amount)
            .ok_or_else(|| Rejection::new("TOKEN: balance overflow"))?;
        self.state.set_balance(asset, from, from_balance - amount);
        self.state.set_balance(asset, to, to_balance);
        Ok(())
    }

    fn balance_of(&self, asset: Asset, owner: Address) -> U256 {
        self.state.balance(asset, owner)
    }

    fn swap(
        &mut self,
        amount_a_out: U256,
        amount_b_out: U256,
        recipient: Address,
        aux_data: &[u8],
    ) -> ActionResult {
        if amount_a_out.is_zero() && amount_b_out.is_zero() {
            return Err(Rejection::new("UniswapV2: INSUFFICIENT_OUTPUT_AMOUNT"));
        }
        if !aux_data.is_empty() {
            return Err(Rejection::new("UniswapV2: flash swaps unsupported"));
        }
        let pair = self.params.pair;
        if recipient == pair {
            return Err(Rejection::new("UniswapV2: INVALID_TO"));
        }
        let reserves = self.state.reserves;
        if amount_a_out >= reserves.reserve_a || amount_b_out >= reserves.reserve_b {
            return Err(Rejection::new("UniswapV2: INSUFFICIENT_LIQUIDITY"));
        }

        let balance_a = self
            .state
            .balance(Asset::A, pair)
            .checked_sub(amount_a_out)
            .ok_or_else(|| Rejection::new("UniswapV2: TRANSFER_FAILED"))?;
        let balance_b = self
            .state
            .balance(Asset::B, pair)
            .checked_sub(amount_b_out)
            .ok_or_else(|| Rejection::new("UniswapV2: TRANSFER_FAILED"))?;

        let amount_a_in = balance_a.saturating_sub(reserves.reserve_a - amount_a_out);
        let amount_b_in = balance_b.saturating_sub(reserves.reserve_b - amount_b_out);
        if amount_a_in.is_zero() && amount_b_in.is_zero() {
            return Err(Rejection::new("UniswapV2: INSUFFICIENT_INPUT_AMOUNT"));
        }
        if !satisfies_fee_adjusted_k(
            balance_a,
            balance_b,
            amount_a_in,
            amount_b_in,
            reserves.reserve_a,
            reserves.reserve_b,
        ) {
            return Err(Rejection::new("UniswapV2: K"));
        }
        if !fits_reserve(balance_a) || !fits_reserve(balance_b) {
            return Err(Rejection::new("UniswapV2: OVERFLOW"));
        }

        let mut next = self.state.clone();
        next.set_balance(Asset::A, pair, balance_a);
        next.set_balance(Asset::B, pair, balance_b);
        next.credit(Asset::A, recipient, amount_a_out)?;
        next.credit(Asset::B, recipient, amount_b_out)?;
        next.reserves = ReservePair::new(balance_a, balance_b, reserves.freshness + 1);

        let price = next.collateral_price_wad();
        let cleared = next.vault.liquidate_unhealthy(&self.params.vault, price);
        next.liquidations += u64::from(cleared);

        self.state = next;
        Ok(())
    }

    fn deposit_collateral(&mut self, amount: U256, on_behalf_of: Address) -> ActionResult {
        if amount.is_zero() {
            return Err(Rejection::new("VAULT: zero deposit"));
        }
        let from = self.state.actor;
        let balance = self.state.balance(Asset::B, from);
        if balance < amount {
            return Err(Rejection::new("TOKEN: transfer amount exceeds balance"));
        }
        let mut next_vault = self.state.vault.clone();
        next_vault.credit_collateral(on_behalf_of, amount)?;

        self.state.set_balance(Asset::B, from, balance - amount);
        self.state.vault = next_vault;
        Ok(())
    }

    fn take_out_loan(&mut self, amount: U256, to: Address, _aux_data: &[u8]) -> ActionResult {
        let borrower = self.state.actor;
        let price = self.state.collateral_price_wad();
        let quote = self
            .state
            .vault
            .quote_loan(&self.params.vault, borrower, amount, price)?;
        let to_balance = self
            .state
            .balance(Asset::A, to)
            .checked_add(amount)
            .ok_or_else(|| Rejection::new("TOKEN: balance overflow"))?;

        self.state.vault.originate(borrower, amount, quote);
        self.state.set_balance(Asset::A, to, to_balance);
        Ok(())
    }

    fn reserves(&self) -> ReservePair {
        self.state.reserves
    }

    fn occupancy_bitmap(&self) -> U256 {
        self.state.vault.bitmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_market() -> SimulatedMarket {
        SimulatedMarket::new(MarketParams {
            reserve_a: U256::from(200_000u64),
            reserve_b: U256::from(1_000_000u64),
            vault_liquidity: U256::from(1_000_000u64),
            ..MarketParams::default()
        })
        .expect("market")
    }

    fn trader() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn pay_in(market: &mut SimulatedMarket, asset: Asset, amount: u64) {
        market.act_as(trader());
        market
            .mint(asset, trader(), U256::from(amount))
            .expect("mint");
        let pair = market.pair_address();
        market
            .transfer(asset, pair, U256::from(amount))
            .expect("transfer");
    }

    #[test]
    fn test_swap_accepts_quoted_output_and_updates_reserves() {
        let mut market = small_market();
        pay_in(&mut market, Asset::A, 1_000);
        market
            .swap(U256::ZERO, U256::from(4_960u64), trader(), &[])
            .expect("swap");
        let reserves = market.reserves();
        assert_eq!(reserves.reserve_a, U256::from(201_000u64));
        assert_eq!(reserves.reserve_b, U256::from(1_000_000u64 - 4_960));
        assert_eq!(reserves.freshness, 1);
        assert_eq!(
            market.balance_of(Asset::B, trader()),
            U256::from(4_960u64)
        );
    }

    #[test]
    fn test_rejected_swap_leaves_no_partial_effect() {
        let mut market = small_market();
        pay_in(&mut market, Asset::A, 1_000);
        let before = market.world_state().clone();
        let err = market
            .swap(U256::ZERO, U256::from(4_961u64), trader(), &[])
            .expect_err("k violation");
        assert_eq!(err.reason(), "UniswapV2: K");
        assert_eq!(market.world_state(), &before);
    }

    #[test]
    fn test_swap_without_input_is_rejected() {
        let mut market = small_market();
        let err = market
            .swap(U256::ZERO, U256::from(1u64), trader(), &[])
            .expect_err("no input");
        assert!(err.reason().contains("INSUFFICIENT_INPUT_AMOUNT"));
    }

    #[test]
    fn test_snapshot_restore_round_trip_is_exact() {
        let mut market = small_market();
        let before = market.world_state().clone();
        let cp = market.snapshot();
        pay_in(&mut market, Asset::A, 1_000);
        market
            .swap(U256::ZERO, U256::from(100u64), trader(), &[])
            .expect("swap");
        assert_ne!(market.world_state(), &before);
        market.restore(cp).expect("restore");
        assert_eq!(market.world_state(), &before);
        assert_eq!(market.checkpoint_depth(), 0);
    }

    #[test]
    fn test_loan_flow_sets_bitmap_and_price_crash_clears_it() {
        let mut market = SimulatedMarket::new(MarketParams::default()).expect("market");
        let borrower = Address::repeat_byte(0xb0);
        let collateral = U256::from(1_000u64) * WAD_U256;
        market.act_as(borrower);
        market.mint(Asset::B, borrower, collateral).expect("mint");
        market
            .deposit_collateral(collateral, borrower)
            .expect("deposit");
        market
            .take_out_loan(U256::from(500u64) * WAD_U256, borrower, &[])
            .expect("loan");
        assert_eq!(market.occupancy_bitmap(), U256::from(1u64));

        // Dump a large amount of B into the pair to crash the collateral price.
        let dump = U256::from(1_000_000u64) * WAD_U256;
        market.act_as(trader());
        market.mint(Asset::B, trader(), dump).expect("mint");
        let pair = market.pair_address();
        market.transfer(Asset::B, pair, dump).expect("transfer");
        let out = crate::protocols::uniswap_v2::get_amount_out(
            dump,
            market.reserves().reserve_b,
            market.reserves().reserve_a,
        )
        .expect("quote");
        market.swap(out, U256::ZERO, trader(), &[]).expect("swap");

        assert_eq!(market.occupancy_bitmap(), U256::ZERO);
        assert_eq!(market.world_state().liquidations, 1);
    }
}
