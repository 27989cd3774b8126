//! Bounded binary search for the largest feasible magnitude of a black-box action.
//!
//! The search assumes feasibility is monotonic non-increasing over `[lower, upper)`: if `x`
//! is rejected then every `y > x` is rejected too. Under that assumption the result is *the*
//! feasibility boundary. If the real predicate is not monotonic (rounding artifacts on a
//! nonlinear curve, for example), the result is only *a* feasible point.
//!
//! Every probe is a full protocol mutation plus rollback, so the number of probes is capped
//! by `max_iterations`; the cap is the only cancellation mechanism.

use super::oracle::FeasibilityOracle;
use crate::error::Result;
use crate::protocols::ActionResult;
use crate::sandbox::SandboxState;
use crate::utils::constants::DEFAULT_MAX_ITERATIONS;
use alloy::primitives::U256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundarySearch {
    /// Largest accepted magnitude, or 0 when nothing was accepted.
    pub best: U256,
    pub probes: u32,
    /// The iteration cap stopped the search before the bracket closed.
    pub budget_exhausted: bool,
}

impl BoundarySearch {
    /// `None` when the search found nothing. A zero `best` never means "zero is optimal".
    pub fn feasible(&self) -> Option<U256> {
        (!self.best.is_zero()).then_some(self.best)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryMaximizer {
    max_iterations: u32,
}

impl Default for BoundaryMaximizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl BoundaryMaximizer {
    pub const fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn maximize<W, F>(
        &self,
        oracle: &mut FeasibilityOracle,
        world: &mut W,
        lower: U256,
        upper_exclusive: U256,
        mut action: F,
    ) -> Result<BoundarySearch>
    where
        W: SandboxState + ?Sized,
        F: FnMut(&mut W, U256) -> ActionResult,
    {
        let mut lo = lower;
        let mut hi = upper_exclusive;
        let mut best = U256::ZERO;
        let mut probes = 0u32;

        while lo < hi && probes < self.max_iterations {
            let mid = lo + (hi - lo) / U256::from(2u64);
            probes += 1;
            match oracle.probe(world, mid, &mut action)? {
                Ok(()) => {
                    best = mid;
                    lo = mid + U256::from(1u64);
                }
                Err(_) => {
                    if mid.is_zero() {
                        break;
                    }
                    hi = mid;
                }
            }
        }

        let search = BoundarySearch {
            best,
            probes,
            budget_exhausted: lo < hi && probes >= self.max_iterations,
        };
        tracing::debug!(
            "[SEARCH] range=[{}, {}) best={} probes={} exhausted={}",
            lower,
            upper_exclusive,
            search.best,
            search.probes,
            search.budget_exhausted
        );
        Ok(search)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::protocols::Rejection;
    use crate::sandbox::{Checkpoint, SnapshotJournal};

    #[derive(Default)]
    struct Inert {
        journal: SnapshotJournal<()>,
    }

    impl SandboxState for Inert {
        fn snapshot(&mut self) -> Checkpoint {
            self.journal.capture(&())
        }

        fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
            self.journal.rewind(checkpoint)
        }

        fn commit(&mut self, checkpoint: Checkpoint) -> Result<()> {
            self.journal.discard(checkpoint)
        }

        fn checkpoint_depth(&self) -> usize {
            self.journal.depth()
        }
    }

    fn below(limit: u64) -> impl FnMut(&mut Inert, U256) -> ActionResult {
        move |_w, m| {
            if m < U256::from(limit) {
                Ok(())
            } else {
                Err(Rejection::new("over limit"))
            }
        }
    }

    #[test]
    fn test_maximize_finds_exact_boundary() {
        let mut world = Inert::default();
        let mut oracle = FeasibilityOracle::new();
        let search = BoundaryMaximizer::new(64)
            .maximize(
                &mut oracle,
                &mut world,
                U256::ZERO,
                U256::from(1_000u64),
                below(437),
            )
            .expect("search");
        assert_eq!(search.best, U256::from(436u64));
        assert!(!search.budget_exhausted);
        assert_eq!(world.checkpoint_depth(), 0);
    }

    #[test]
    fn test_maximize_returns_zero_when_nothing_is_feasible() {
        let mut world = Inert::default();
        let mut oracle = FeasibilityOracle::new();
        let search = BoundaryMaximizer::new(64)
            .maximize(&mut oracle, &mut world, U256::ZERO, U256::from(1_000u64), below(0))
            .expect("search");
        assert_eq!(search.best, U256::ZERO);
        assert_eq!(search.feasible(), None);
    }

    #[test]
    fn test_maximize_reaches_upper_edge_when_everything_is_feasible() {
        let mut world = Inert::default();
        let mut oracle = FeasibilityOracle::new();
        let search = BoundaryMaximizer::new(64)
            .maximize(
                &mut oracle,
                &mut world,
                U256::ZERO,
                U256::from(1_000u64),
                below(u64::MAX),
            )
            .expect("search");
        assert_eq!(search.best, U256::from(999u64));
    }

    #[test]
    fn test_maximize_empty_range_spends_no_probes() {
        let mut world = Inert::default();
        let mut oracle = FeasibilityOracle::new();
        let search = BoundaryMaximizer::new(64)
            .maximize(&mut oracle, &mut world, U256::from(5u64), U256::from(5u64), below(10))
            .expect("search");
        assert_eq!(search.probes, 0);
        assert_eq!(oracle.probes(), 0);
    }

    #[test]
    fn test_maximize_respects_iteration_budget() {
        let mut world = Inert::default();
        let mut oracle = FeasibilityOracle::new();
        let search = BoundaryMaximizer::new(3)
            .maximize(
                &mut oracle,
                &mut world,
                U256::ZERO,
                U256::from(1u64) << 200usize,
                below(12_345),
            )
            .expect("search");
        assert_eq!(search.probes, 3);
        assert!(search.budget_exhausted);
        assert_eq!(oracle.probes(), 3);
    }

    #[test]
    fn test_maximize_handles_full_width_range() {
        let mut world = Inert::default();
        let mut oracle = FeasibilityOracle::new();
        let search = BoundaryMaximizer::new(512)
            .maximize(&mut oracle, &mut world, U256::ZERO, U256::MAX, below(77))
            .expect("search");
        assert_eq!(search.best, U256::from(76u64));
    }
}
