use alloy::primitives::{address, Address, U256};

/// Standard WAD (10^18)
pub const WAD_U256: U256 = U256::from_limbs([1000000000000000000, 0, 0, 0]);

/// Basis-point denominator (100% = 10_000 bps)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Uniswap V2 Constants
pub const UNISWAP_V2_FEE_MULTIPLIER: u64 = 997;
pub const UNISWAP_V2_FEE_DENOMINATOR: u64 = 1000;

/// Uniswap V2 reserves are stored as uint112.
pub const UNISWAP_V2_MAX_RESERVE: U256 =
    U256::from_limbs([u64::MAX, 0x0000_ffff_ffff_ffff, 0, 0]);

/// Width of the loan occupancy bitmap.
pub const OCCUPANCY_BITMAP_WIDTH: u32 = 256;

/// Binary-search probe budget. Each probe is a full mutate + rollback.
pub const DEFAULT_MAX_ITERATIONS: u32 = 256;

/// Conservative fraction of a discovered maximum used for real executions (90%).
pub const DEFAULT_EXECUTION_FRACTION_BPS: u32 = 9_000;

/// Maximum loans originated while densifying the occupancy bitmap.
pub const DEFAULT_LOAN_CAP: usize = 64;

pub const DEFAULT_TRIAL_COUNT: usize = 40;
/// Geometric trial growth (x1.5 per step).
pub const DEFAULT_TRIAL_GROWTH_BPS: u32 = 15_000;

/// First trial size: one whole token.
pub const DEFAULT_TRIAL_START: U256 = WAD_U256;

/// Input of the preconditioning price-moving trade (10_000 tokens).
pub const DEFAULT_PRICE_SHIFT_INPUT: U256 = U256::from_limbs([0x19e0c9bab2400000, 0x21e, 0, 0]);

/// Collateral deposited for the borrower before loans are originated (500_000 tokens).
pub const DEFAULT_COLLATERAL: U256 = U256::from_limbs([0xde76676d0800000, 0x69e1, 0, 0]);

pub const DEFAULT_OUTPUT_PATH: &str = "data/liquidation_curve.csv";

/// Reference-world actors.
pub const TRADER: Address = address!("00000000000000000000000000000000000a11ce");
pub const BORROWER: Address = address!("00000000000000000000000000000000000b0b00");
pub const PRICE_MOVER: Address = address!("0000000000000000000000000000000000c0ffee");
pub const PAIR_ADDRESS: Address = address!("000000000000000000000000000000000000fa11");
