use alloy::primitives::U256;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Fatal engine conditions. Protocol rejections never appear here: they are collapsed into
/// `engine::Infeasible` at the point of action.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("checkpoint misuse ({kind}): checkpoint #{id}, live depth {depth}")]
    CheckpointMisuse {
        kind: CheckpointMisuse,
        id: u64,
        depth: usize,
    },
    #[error("minimum precondition not met at step `{step}` (magnitude {magnitude}): {detail}")]
    PreconditionNotMet {
        step: PreconditionStep,
        magnitude: U256,
        detail: String,
    },
    #[error("trial #{index} (trade size {magnitude}) aborted: {source}")]
    Trial {
        index: usize,
        magnitude: U256,
        #[source]
        source: Box<EngineError>,
    },
    #[error("curve sink error: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointMisuse {
    /// A newer checkpoint is still live above the one being restored.
    OutOfOrder,
    /// The handle was never issued by this journal or has already been consumed.
    Stale,
    /// Restore was requested with no live checkpoint at all.
    Empty,
    /// A trial returned with a different number of live checkpoints than it started with.
    Leaked,
}

impl fmt::Display for CheckpointMisuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::OutOfOrder => "restored out of order",
            Self::Stale => "stale or unknown handle",
            Self::Empty => "no live checkpoint",
            Self::Leaked => "checkpoint leaked across trial boundary",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionStep {
    PriceShift,
    DepositCollateral,
    DiscoverMaxLoan,
    OriginateLoans,
}

impl fmt::Display for PreconditionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PriceShift => "price_shift",
            Self::DepositCollateral => "deposit_collateral",
            Self::DiscoverMaxLoan => "discover_max_loan",
            Self::OriginateLoans => "originate_loans",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv encoding failure: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
