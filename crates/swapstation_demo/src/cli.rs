// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line arguments.

use crate::settings::Scenario;
use clap::Parser;
use std::path::PathBuf;

/// Headless battery-swap station demo
#[derive(Debug, Parser)]
#[command(name = "swapstation_demo")]
#[command(about = "Plays the battery-swap station animations on a synthetic frame clock")]
#[command(version)]
pub struct Cli {
    /// Settings file (RON). Defaults are used when omitted
    pub config: Option<PathBuf>,

    /// Write the default settings to PATH and exit
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = "swapstation.ron",
        conflicts_with = "config"
    )]
    pub init: Option<PathBuf>,

    /// Play this scenario instead of the one in the settings file
    #[arg(long, value_enum)]
    pub scenario: Option<Scenario>,
}
