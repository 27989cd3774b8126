//! Capability surface of the probed AMM + lending protocol.
//!
//! The engine only ever talks to the protocol through [`BlackBoxProtocol`]. Every fallible
//! operation is atomic: it either applies fully or returns a [`Rejection`] and leaves no trace.

pub mod lending;
pub mod simulated;
pub mod uniswap_v2;

use alloy::primitives::{Address, U256};
use serde::Serialize;
use thiserror::Error;

/// One side of the pair. `A` is token0, `B` is token1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Asset {
    A,
    B,
}

impl Asset {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// AMM balances at a point in time. `freshness` only orders observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReservePair {
    pub reserve_a: U256,
    pub reserve_b: U256,
    pub freshness: u64,
}

impl ReservePair {
    pub fn new(reserve_a: U256, reserve_b: U256, freshness: u64) -> Self {
        Self {
            reserve_a,
            reserve_b,
            freshness,
        }
    }

    pub fn of(&self, asset: Asset) -> U256 {
        match asset {
            Asset::A => self.reserve_a,
            Asset::B => self.reserve_b,
        }
    }
}

/// Which asset is paid into the pair and which is requested out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeDirection {
    AToB,
    BToA,
}

impl TradeDirection {
    pub fn input_asset(self) -> Asset {
        match self {
            Self::AToB => Asset::A,
            Self::BToA => Asset::B,
        }
    }

    pub fn output_asset(self) -> Asset {
        self.input_asset().other()
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::AToB => Self::BToA,
            Self::BToA => Self::AToB,
        }
    }

    /// `(amount_a_out, amount_b_out)` arguments for a swap requesting `amount_out`.
    pub fn requested_outs(self, amount_out: U256) -> (U256, U256) {
        match self {
            Self::AToB => (U256::ZERO, amount_out),
            Self::BToA => (amount_out, U256::ZERO),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AToB => "a_to_b",
            Self::BToA => "b_to_a",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "a_to_b" | "a->b" | "ab" => Some(Self::AToB),
            "b_to_a" | "b->a" | "ba" => Some(Self::BToA),
            _ => None,
        }
    }
}

/// A protocol refusing an action. The reason is carried for logs only; the engine never
/// branches on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Rejection {
    reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

pub type ActionResult<T = ()> = std::result::Result<T, Rejection>;

/// Narrow capability set exposed by the external AMM pair + lending vault.
pub trait BlackBoxProtocol {
    /// Implicit sender for `transfer`, `deposit_collateral` and `take_out_loan`.
    fn act_as(&mut self, actor: Address);
    fn actor(&self) -> Address;

    /// Address the pair pulls swap input from.
    fn pair_address(&self) -> Address;

    fn mint(&mut self, asset: Asset, to: Address, amount: U256) -> ActionResult;
    fn transfer(&mut self, asset: Asset, to: Address, amount: U256) -> ActionResult;
    fn balance_of(&self, asset: Asset, owner: Address) -> U256;

    fn swap(
        &mut self,
        amount_a_out: U256,
        amount_b_out: U256,
        recipient: Address,
        aux_data: &[u8],
    ) -> ActionResult;

    fn deposit_collateral(&mut self, amount: U256, on_behalf_of: Address) -> ActionResult;
    fn take_out_loan(&mut self, amount: U256, to: Address, aux_data: &[u8]) -> ActionResult;

    fn reserves(&self) -> ReservePair;
    fn occupancy_bitmap(&self) -> U256;
}
