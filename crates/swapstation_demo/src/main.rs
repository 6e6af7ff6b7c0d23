// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless battery-swap station demo.
//!
//! Recreates the animated objects of the station showcase and plays its
//! scenarios on a synthetic frame clock:
//! - Station demo: arm swing, battery pickup, transport, install
//! - Rider swap: the rider trades the bike's old battery for a new one
//!
//! ## Usage
//!
//! `swapstation_demo [settings.ron] [--scenario <name>]`. Without a settings
//! file the defaults are used. `swapstation_demo --init [path]` writes the
//! defaults out for editing. Log verbosity follows `RUST_LOG`.

mod cli;
mod clock;
mod runner;
mod settings;
mod station;

use clap::Parser;
use cli::Cli;
use runner::{DemoError, DemoRunner};
use settings::{DemoSettings, Scenario};
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("swapstation_demo=debug,swapstation_sequencer=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting swap station demo v{}", env!("CARGO_PKG_VERSION"));

    let result = match &cli.init {
        Some(path) => write_default_settings(path),
        None => run(cli.config.as_deref(), cli.scenario),
    };

    if let Err(e) = result {
        tracing::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

fn run(settings_path: Option<&Path>, scenario: Option<Scenario>) -> Result<(), DemoError> {
    let mut settings = match settings_path {
        Some(path) => {
            tracing::info!("Loading settings from {}", path.display());
            DemoSettings::load(path)?
        }
        None => DemoSettings::default(),
    };
    if let Some(scenario) = scenario {
        settings.scenario = scenario;
    }

    tracing::info!(
        "Playing {} at {:.1}ms per frame",
        settings.scenario.display_name(),
        settings.frame_interval_ms
    );

    let mut runner = DemoRunner::new(&settings)?;
    for report in runner.run(settings.scenario)? {
        tracing::info!(
            "{}: {:?} after {} frames ({:.0}ms)",
            report.scenario.display_name(),
            report.outcome,
            report.frames,
            report.duration_ms
        );
    }

    for (name, transform) in runner.scene().objects() {
        tracing::info!(
            "{name}: position {:?}, yaw {:.3}, visible {}",
            transform.position,
            transform.yaw(),
            transform.visible
        );
    }
    tracing::info!("{} frames rendered", runner.frame_count());
    Ok(())
}

/// Write the default settings so they can be edited
fn write_default_settings(path: &Path) -> Result<(), DemoError> {
    DemoSettings::default().save(path)?;
    tracing::info!("Wrote default settings to {}", path.display());
    Ok(())
}
