use crate::error::Result;
use crate::protocols::ActionResult;
use crate::sandbox::SandboxState;
use crate::utils::error::compact_error_message;
use alloy::primitives::U256;

const MAX_REASON_LEN: usize = 160;

/// A probed action was rejected. Why it was rejected is kept for logs only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Infeasible {
    pub magnitude: U256,
    pub reason: String,
}

/// Outcome of one probe. Infeasibility is data, not an error.
pub type Feasibility = std::result::Result<(), Infeasible>;

/// Runs single trial actions inside their own checkpoint and always rolls them back.
#[derive(Debug, Default)]
pub struct FeasibilityOracle {
    probes: u64,
    rejections: u64,
}

impl FeasibilityOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt `action(magnitude)` and restore the pre-probe state regardless of the outcome.
    ///
    /// Only a checkpoint failure escapes as `Err`; every protocol rejection becomes
    /// `Ok(Err(Infeasible))`.
    pub fn probe<W, F>(
        &mut self,
        world: &mut W,
        magnitude: U256,
        action: &mut F,
    ) -> Result<Feasibility>
    where
        W: SandboxState + ?Sized,
        F: FnMut(&mut W, U256) -> ActionResult,
    {
        let checkpoint = world.snapshot();
        let outcome = action(world, magnitude);
        world.restore(checkpoint)?;

        self.probes += 1;
        Ok(outcome.map_err(|rejection| {
            self.rejections += 1;
            Infeasible {
                magnitude,
                reason: compact_error_message(rejection.reason(), MAX_REASON_LEN),
            }
        }))
    }

    pub fn probes(&self) -> u64 {
        self.probes
    }

    pub fn rejections(&self) -> u64 {
        self.rejections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::Rejection;
    use crate::sandbox::{Checkpoint, SnapshotJournal};

    #[derive(Default)]
    struct Counter {
        value: u64,
        journal: SnapshotJournal<u64>,
    }

    impl SandboxState for Counter {
        fn snapshot(&mut self) -> Checkpoint {
            self.journal.capture(&self.value)
        }

        fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
            self.value = self.journal.rewind(checkpoint)?;
            Ok(())
        }

        fn commit(&mut self, checkpoint: Checkpoint) -> Result<()> {
            self.journal.discard(checkpoint)
        }

        fn checkpoint_depth(&self) -> usize {
            self.journal.depth()
        }
    }

    #[test]
    fn test_probe_rolls_back_successful_action() {
        let mut world = Counter::default();
        let mut oracle = FeasibilityOracle::new();
        let mut bump = |w: &mut Counter, m: U256| -> ActionResult {
            w.value += u64::try_from(m).unwrap_or(0);
            Ok(())
        };
        let outcome = oracle
            .probe(&mut world, U256::from(5u64), &mut bump)
            .expect("probe");
        assert!(outcome.is_ok());
        assert_eq!(world.value, 0);
        assert_eq!(world.checkpoint_depth(), 0);
    }

    #[test]
    fn test_probe_rolls_back_partial_effects_of_rejected_action() {
        let mut world = Counter::default();
        let mut oracle = FeasibilityOracle::new();
        let mut half_done = |w: &mut Counter, _m: U256| -> ActionResult {
            w.value = 99;
            Err(Rejection::new("reverted after side effect"))
        };
        let outcome = oracle
            .probe(&mut world, U256::from(1u64), &mut half_done)
            .expect("probe");
        let infeasible = outcome.expect_err("rejected");
        assert_eq!(infeasible.magnitude, U256::from(1u64));
        assert_eq!(infeasible.reason, "reverted after side effect");
        assert_eq!(world.value, 0);
        assert_eq!(oracle.probes(), 1);
        assert_eq!(oracle.rejections(), 1);
    }

    #[test]
    fn test_probe_surfaces_checkpoint_misuse_inside_action() {
        let mut world = Counter::default();
        let mut oracle = FeasibilityOracle::new();
        // An action that leaves its own checkpoint live makes the probe restore out of order.
        let mut leaky = |w: &mut Counter, _m: U256| -> ActionResult {
            std::mem::forget(w.snapshot());
            Ok(())
        };
        let err = oracle
            .probe(&mut world, U256::from(1u64), &mut leaky)
            .expect_err("misuse");
        assert!(err.to_string().contains("out of order"));
    }
}
