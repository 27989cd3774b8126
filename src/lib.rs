//! Regime Explorer library surface.
//!
//! The exploration engine (`engine`) probes an AMM + lending protocol through the narrow
//! capability surface in `protocols`, using the checkpoint discipline in `sandbox` so every
//! probe and every trial is rolled back before the next one starts. Results flow into a
//! `sink::CurveSink` as an ordered liquidation / price-impact curve.
//!
//! `protocols::simulated` provides an in-memory reference world used by the binary, the
//! integration tests and the bench.

pub mod engine;
pub mod error;
pub mod protocols;
pub mod sandbox;
pub mod sink;
pub mod utils;

pub use error::{EngineError, Result};
