//! Exploration engine: feasibility probing, bounded boundary search, per-trial metrics and the
//! sweep / preconditioning drivers built on top of them.

pub mod bitmap;
pub mod maximizer;
pub mod oracle;
pub mod precondition;
pub mod price;
pub mod records;
pub mod sweep;

pub use maximizer::{BoundaryMaximizer, BoundarySearch};
pub use oracle::{Feasibility, FeasibilityOracle, Infeasible};
pub use precondition::{PreconditionPlan, PreconditionReport, PreconditioningPhase, PriceShift};
pub use records::{TrialInputSet, TrialRecord};
pub use sweep::{SweepDriver, SweepPlan};

use crate::error::Result;
use crate::protocols::{ActionResult, BlackBoxProtocol, TradeDirection};
use crate::sandbox::SandboxState;
use alloy::primitives::{Address, U256};

/// Anything the engine can explore: a sandboxed world exposing the protocol surface.
pub trait World: SandboxState + BlackBoxProtocol {}

impl<T: SandboxState + BlackBoxProtocol + ?Sized> World for T {}

/// Fund `trader` with `amount_in`, push it into the pair and request `amount_out` back.
///
/// This is the action both the maximizer probes and the real trial execution run; it is only
/// atomic as a whole when wrapped in a checkpoint.
pub fn swap_exact_in<W: World + ?Sized>(
    world: &mut W,
    direction: TradeDirection,
    trader: Address,
    amount_in: U256,
    amount_out: U256,
) -> ActionResult {
    let input = direction.input_asset();
    let pair = world.pair_address();
    world.act_as(trader);
    world.mint(input, trader, amount_in)?;
    world.transfer(input, pair, amount_in)?;
    let (amount_a_out, amount_b_out) = direction.requested_outs(amount_out);
    world.swap(amount_a_out, amount_b_out, trader, &[])
}

/// Run a persistent action atomically: keep its effects on success, roll back every partial
/// effect on rejection. Only checkpoint misuse escapes as `Err`.
pub fn commit_or_revert<W, T, F>(world: &mut W, action: F) -> Result<ActionResult<T>>
where
    W: SandboxState + ?Sized,
    F: FnOnce(&mut W) -> ActionResult<T>,
{
    let checkpoint = world.snapshot();
    let outcome = action(world);
    match outcome {
        Ok(value) => {
            world.commit(checkpoint)?;
            Ok(Ok(value))
        }
        Err(rejection) => {
            world.restore(checkpoint)?;
            Ok(Err(rejection))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::simulated::{MarketParams, SimulatedMarket};
    use crate::protocols::{Asset, Rejection};

    fn market() -> SimulatedMarket {
        SimulatedMarket::new(MarketParams {
            reserve_a: U256::from(200_000u64),
            reserve_b: U256::from(1_000_000u64),
            ..MarketParams::default()
        })
        .expect("market")
    }

    #[test]
    fn test_swap_exact_in_funds_trader_and_pays_out() {
        let mut world = market();
        let trader = Address::repeat_byte(0x11);
        swap_exact_in(
            &mut world,
            TradeDirection::AToB,
            trader,
            U256::from(1_000u64),
            U256::from(4_960u64),
        )
        .expect("swap");
        assert_eq!(world.balance_of(Asset::B, trader), U256::from(4_960u64));
        assert_eq!(world.balance_of(Asset::A, trader), U256::ZERO);
        assert_eq!(world.reserves().reserve_a, U256::from(201_000u64));
    }

    #[test]
    fn test_commit_or_revert_rolls_back_partial_effects() {
        let mut world = market();
        let before = world.world_state().clone();
        let trader = Address::repeat_byte(0x11);
        let outcome = commit_or_revert(&mut world, |w: &mut SimulatedMarket| {
            swap_exact_in(w, TradeDirection::AToB, trader, U256::from(1_000u64), U256::from(4_961u64))
        })
        .expect("checkpoint discipline");
        assert!(outcome.is_err());
        assert_eq!(world.world_state(), &before);
        assert_eq!(world.checkpoint_depth(), 0);
    }

    #[test]
    fn test_commit_or_revert_keeps_successful_effects() {
        let mut world = market();
        let trader = Address::repeat_byte(0x22);
        let outcome = commit_or_revert(&mut world, |w: &mut SimulatedMarket| -> ActionResult<u8> {
            w.mint(Asset::A, trader, U256::from(7u64))?;
            Ok(7)
        })
        .expect("checkpoint discipline");
        assert_eq!(outcome.map_err(|r: Rejection| r.to_string()), Ok(7));
        assert_eq!(world.balance_of(Asset::A, trader), U256::from(7u64));
        assert_eq!(world.checkpoint_depth(), 0);
    }
}
