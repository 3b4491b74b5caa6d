#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a scripted Bastion round headlessly.

mod scenario;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

const BUILTIN_SCENARIO: &str = include_str!("../scenarios/meadow.toml");

#[derive(Debug, Parser)]
#[command(name = "bastion", about = "Plays a scripted tower-defense round")]
struct Args {
    /// Scenario file to play. The built-in meadow round is used when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Simulation frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Gives up once this many simulated seconds have passed.
    #[arg(long, default_value_t = 600)]
    max_seconds: u64,

    /// Log filter directive, overriding `RUST_LOG`.
    #[arg(long)]
    log: Option<String>,
}

/// Entry point for the Bastion command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log {
        Some(directive) => EnvFilter::try_new(directive).context("invalid log filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    ensure!(args.fps > 0, "--fps must be positive");

    let source = match &args.scenario {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => BUILTIN_SCENARIO.to_owned(),
    };
    let scenario = Scenario::parse(&source)?;
    let frame = Duration::from_secs(1) / args.fps;
    let report = scenario.play(frame, Duration::from_secs(args.max_seconds))?;

    let verdict = match report.outcome {
        Some(outcome) => format!("{outcome:?}"),
        None => "undecided".to_owned(),
    };
    println!(
        "{verdict} after {:.1}s: wave {}/{}, {} lives, {} money",
        report.elapsed.as_secs_f32(),
        report.status.wave.min(report.status.wave_count),
        report.status.wave_count,
        report.status.lives,
        report.status.money,
    );
    Ok(())
}
