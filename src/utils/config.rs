use crate::engine::{PreconditionPlan, PriceShift, SweepPlan, TrialInputSet};
use crate::error::ConfigError;
use crate::protocols::simulated::MarketParams;
use crate::protocols::uniswap_v2::fits_reserve;
use crate::protocols::{Asset, TradeDirection};
use crate::sink::CurveLayout;
use crate::utils::constants::{
    BORROWER, BPS_DENOMINATOR, DEFAULT_COLLATERAL, DEFAULT_EXECUTION_FRACTION_BPS,
    DEFAULT_LOAN_CAP, DEFAULT_MAX_ITERATIONS, DEFAULT_OUTPUT_PATH, DEFAULT_PRICE_SHIFT_INPUT,
    DEFAULT_TRIAL_COUNT, DEFAULT_TRIAL_GROWTH_BPS, DEFAULT_TRIAL_START, OCCUPANCY_BITMAP_WIDTH,
    PRICE_MOVER, TRADER,
};
use alloy::primitives::U256;
use std::path::PathBuf;
use std::str::FromStr;

type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Everything one exploration run needs, read from `EXPLORER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    pub max_iterations: u32,
    pub trial_start: U256,
    pub trial_growth_bps: u32,
    pub trial_count: usize,
    pub sweep_direction: TradeDirection,
    pub price_shift_enabled: bool,
    pub price_shift_input: U256,
    pub price_shift_fraction_bps: u32,
    pub collateral: U256,
    pub loan_fraction_bps: u32,
    pub loan_cap: usize,
    pub curve_layout: CurveLayout,
    pub output_path: PathBuf,
    pub reserve_a: U256,
    pub reserve_b: U256,
    pub vault_liquidity: U256,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        let market = MarketParams::default();
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            trial_start: DEFAULT_TRIAL_START,
            trial_growth_bps: DEFAULT_TRIAL_GROWTH_BPS,
            trial_count: DEFAULT_TRIAL_COUNT,
            sweep_direction: TradeDirection::BToA,
            price_shift_enabled: true,
            price_shift_input: DEFAULT_PRICE_SHIFT_INPUT,
            price_shift_fraction_bps: DEFAULT_EXECUTION_FRACTION_BPS,
            collateral: DEFAULT_COLLATERAL,
            loan_fraction_bps: DEFAULT_EXECUTION_FRACTION_BPS,
            loan_cap: DEFAULT_LOAN_CAP,
            curve_layout: CurveLayout::Liquidation,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            reserve_a: market.reserve_a,
            reserve_b: market.reserve_b,
            vault_liquidity: market.vault_liquidity,
        }
    }
}

fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Trimmed, non-empty value for `key`.
fn lookup_trimmed<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> ConfigResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup_trimmed(lookup, key) {
        Some(value) => value.parse::<T>().map_err(|err| {
            ConfigError::InvalidConfig(format!("{key} must be a number, got `{value}`: {err}"))
        }),
        None => Ok(default),
    }
}

fn parse_with<F, T>(
    lookup: &F,
    key: &str,
    default: T,
    expected: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> ConfigResult<T>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup_trimmed(lookup, key) {
        Some(value) => parse(value.as_str()).ok_or_else(|| {
            ConfigError::InvalidConfig(format!("{key} must be {expected}, got `{value}`"))
        }),
        None => Ok(default),
    }
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> ConfigResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfig(message()))
    }
}

fn ensure_bps(key: &str, value: u32) -> ConfigResult<()> {
    ensure(value > 0 && u64::from(value) <= BPS_DENOMINATOR, || {
        format!("{key} must be in 1..={BPS_DENOMINATOR}, got {value}")
    })
}

impl ExplorerConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            max_iterations: parse_or(&lookup, "EXPLORER_MAX_ITERATIONS", defaults.max_iterations)?,
            trial_start: parse_or(&lookup, "EXPLORER_TRIAL_START", defaults.trial_start)?,
            trial_growth_bps: parse_or(
                &lookup,
                "EXPLORER_TRIAL_GROWTH_BPS",
                defaults.trial_growth_bps,
            )?,
            trial_count: parse_or(&lookup, "EXPLORER_TRIAL_COUNT", defaults.trial_count)?,
            sweep_direction: parse_with(
                &lookup,
                "EXPLORER_SWEEP_DIRECTION",
                defaults.sweep_direction,
                "a_to_b or b_to_a",
                TradeDirection::parse,
            )?,
            price_shift_enabled: parse_with(
                &lookup,
                "EXPLORER_PRICE_SHIFT_ENABLED",
                defaults.price_shift_enabled,
                "a boolean flag",
                parse_bool_flag,
            )?,
            price_shift_input: parse_or(
                &lookup,
                "EXPLORER_PRICE_SHIFT_INPUT",
                defaults.price_shift_input,
            )?,
            price_shift_fraction_bps: parse_or(
                &lookup,
                "EXPLORER_PRICE_SHIFT_FRACTION_BPS",
                defaults.price_shift_fraction_bps,
            )?,
            collateral: parse_or(&lookup, "EXPLORER_COLLATERAL", defaults.collateral)?,
            loan_fraction_bps: parse_or(
                &lookup,
                "EXPLORER_LOAN_FRACTION_BPS",
                defaults.loan_fraction_bps,
            )?,
            loan_cap: parse_or(&lookup, "EXPLORER_LOAN_CAP", defaults.loan_cap)?,
            curve_layout: parse_with(
                &lookup,
                "EXPLORER_CURVE_LAYOUT",
                defaults.curve_layout,
                "liquidation or price_impact",
                CurveLayout::parse,
            )?,
            output_path: lookup_trimmed(&lookup, "EXPLORER_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
            reserve_a: parse_or(&lookup, "EXPLORER_RESERVE_A", defaults.reserve_a)?,
            reserve_b: parse_or(&lookup, "EXPLORER_RESERVE_B", defaults.reserve_b)?,
            vault_liquidity: parse_or(
                &lookup,
                "EXPLORER_VAULT_LIQUIDITY",
                defaults.vault_liquidity,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ensure(self.max_iterations > 0, || {
            "EXPLORER_MAX_ITERATIONS must be positive".to_string()
        })?;
        ensure(!self.trial_start.is_zero(), || {
            "EXPLORER_TRIAL_START must be positive".to_string()
        })?;
        ensure(u64::from(self.trial_growth_bps) > BPS_DENOMINATOR, || {
            format!(
                "EXPLORER_TRIAL_GROWTH_BPS must exceed {BPS_DENOMINATOR} so trial sizes grow, got {}",
                self.trial_growth_bps
            )
        })?;
        ensure(self.trial_count > 0, || {
            "EXPLORER_TRIAL_COUNT must be positive".to_string()
        })?;
        ensure_bps(
            "EXPLORER_PRICE_SHIFT_FRACTION_BPS",
            self.price_shift_fraction_bps,
        )?;
        ensure_bps("EXPLORER_LOAN_FRACTION_BPS", self.loan_fraction_bps)?;
        ensure(
            self.loan_cap > 0 && self.loan_cap <= OCCUPANCY_BITMAP_WIDTH as usize,
            || {
                format!(
                    "EXPLORER_LOAN_CAP must be in 1..={OCCUPANCY_BITMAP_WIDTH}, got {}",
                    self.loan_cap
                )
            },
        )?;
        ensure(!self.collateral.is_zero(), || {
            "EXPLORER_COLLATERAL must be positive".to_string()
        })?;
        for (key, reserve) in [
            ("EXPLORER_RESERVE_A", self.reserve_a),
            ("EXPLORER_RESERVE_B", self.reserve_b),
        ] {
            ensure(!reserve.is_zero() && fits_reserve(reserve), || {
                format!("{key} must be a non-zero uint112, got {reserve}")
            })?;
        }
        if self.price_shift_enabled {
            ensure(!self.price_shift_input.is_zero(), || {
                "EXPLORER_PRICE_SHIFT_INPUT must be positive when the price shift is enabled"
                    .to_string()
            })?;
        }
        Ok(())
    }

    pub fn trial_inputs(&self) -> TrialInputSet {
        TrialInputSet::geometric(self.trial_start, self.trial_growth_bps, self.trial_count)
    }

    pub fn market_params(&self) -> MarketParams {
        MarketParams {
            reserve_a: self.reserve_a,
            reserve_b: self.reserve_b,
            vault_liquidity: self.vault_liquidity,
            ..MarketParams::default()
        }
    }

    /// The price shift trades against the sweep so the sweep starts from a moved price.
    pub fn precondition_plan(&self) -> PreconditionPlan {
        let price_shift = self.price_shift_enabled.then_some(PriceShift {
            direction: self.sweep_direction.reversed(),
            trader: PRICE_MOVER,
            input: self.price_shift_input,
            fraction_bps: self.price_shift_fraction_bps,
        });
        PreconditionPlan {
            price_shift,
            borrower: BORROWER,
            collateral_asset: Asset::B,
            collateral: self.collateral,
            loan_search_ceiling: self.vault_liquidity,
            loan_fraction_bps: self.loan_fraction_bps,
            loan_cap: self.loan_cap,
        }
    }

    pub fn sweep_plan(&self) -> SweepPlan {
        SweepPlan {
            direction: self.sweep_direction,
            trader: TRADER,
        }
    }
}
