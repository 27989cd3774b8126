use anyhow::Context;
use regime_explorer::engine::{BoundaryMaximizer, PreconditioningPhase, SweepDriver};
use regime_explorer::protocols::simulated::SimulatedMarket;
use regime_explorer::sink::{CsvCurveSink, CurveSink};
use regime_explorer::utils::config::ExplorerConfig;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    output_path: PathBuf,
    layout: &'static str,
    trials: usize,
    filled: usize,
    peak_liquidations: u32,
    total_liquidations: u64,
    precondition: regime_explorer::engine::PreconditionReport,
}

fn main() -> anyhow::Result<()> {
    // Load `.env` before anything reads configuration.
    let applied = regime_explorer::utils::env_guard::harden_env_setup();

    // Default to `info` when `RUST_LOG` is unset or invalid to avoid silent startup.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        eprintln!("[STARTUP] RUST_LOG invalid or unset; defaulting to 'info'");
        tracing_subscriber::EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr) // stdout carries the run summary only
        .init();
    tracing::debug!("[STARTUP] applied {} variables from .env", applied);

    let config = ExplorerConfig::from_env().context("loading EXPLORER_* configuration")?;
    tracing::info!(
        "[STARTUP] trials={} growth_bps={} max_iterations={} direction={} layout={} output={}",
        config.trial_count,
        config.trial_growth_bps,
        config.max_iterations,
        config.sweep_direction.as_str(),
        config.curve_layout.as_str(),
        config.output_path.display()
    );

    let mut market = SimulatedMarket::new(config.market_params())
        .context("building the reference market")?;
    let maximizer = BoundaryMaximizer::new(config.max_iterations);

    let precondition = PreconditioningPhase::new(maximizer, config.precondition_plan())
        .run(&mut market)
        .context("preconditioning the reference market")?;

    let mut sink = CsvCurveSink::create(&config.output_path, config.curve_layout)
        .with_context(|| format!("creating {}", config.output_path.display()))?;
    let records = SweepDriver::new(maximizer, config.sweep_plan())
        .run_with_sink(&mut market, &config.trial_inputs(), &mut sink)
        .context("running the trial sweep")?;
    sink.finish()
        .with_context(|| format!("flushing {}", config.output_path.display()))?;

    let summary = RunSummary {
        output_path: config.output_path.clone(),
        layout: config.curve_layout.as_str(),
        trials: records.len(),
        filled: records.iter().filter(|r| r.is_filled()).count(),
        peak_liquidations: records.iter().map(|r| r.liquidations).max().unwrap_or(0),
        total_liquidations: records.iter().map(|r| u64::from(r.liquidations)).sum(),
        precondition,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
