// SPDX-License-Identifier: MIT OR Apache-2.0
//! Demo configuration.
//!
//! Loaded from a RON file passed on the command line. Every field is
//! optional; missing fields take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use swapstation_sequencer::{SequencerSettings, SettingsError};

/// Current demo settings format version
pub const DEMO_FORMAT_VERSION: u32 = 1;

/// Which animation to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
pub enum Scenario {
    /// Arm swing, pickup, transport and install, chained
    StationDemo,
    /// Rider swaps the bike battery at the cabinet
    RiderSwap,
    /// Station demo followed by the rider swap
    #[default]
    Both,
}

impl Scenario {
    /// Get display name for this scenario
    pub fn display_name(&self) -> &'static str {
        match self {
            Scenario::StationDemo => "Station demo",
            Scenario::RiderSwap => "Rider swap",
            Scenario::Both => "Station demo + rider swap",
        }
    }
}

/// Settings for the headless demo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Format version
    pub version: u32,
    /// Sequencer tunables
    pub sequencer: SequencerSettings,
    /// Scenario to play
    pub scenario: Scenario,
    /// Time between synthetic frames
    pub frame_interval_ms: f64,
    /// Playback speed multiplier
    pub time_scale: f64,
    /// Pause between rider-swap steps
    pub rider_step_gap_ms: f64,
    /// Give up on a scenario after this many frames
    pub max_frames: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            version: DEMO_FORMAT_VERSION,
            sequencer: SequencerSettings::default(),
            scenario: Scenario::default(),
            frame_interval_ms: 1000.0 / 60.0,
            time_scale: 1.0,
            rider_step_gap_ms: 500.0,
            max_frames: 10_000,
        }
    }
}

impl DemoSettings {
    /// Load demo settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: DemoSettings = ron::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the version and that the frame timing is usable
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.version > DEMO_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: self.version,
                supported: DEMO_FORMAT_VERSION,
            });
        }
        self.sequencer.validate()?;

        const POSITIVE: &str = "must be finite and positive";
        const NON_NEGATIVE: &str = "must be finite and not negative";
        let checks = [
            ("frame_interval_ms", self.frame_interval_ms, self.frame_interval_ms > 0.0, POSITIVE),
            ("time_scale", self.time_scale, self.time_scale >= 0.0, NON_NEGATIVE),
            ("rider_step_gap_ms", self.rider_step_gap_ms, self.rider_step_gap_ms >= 0.0, NON_NEGATIVE),
        ];
        for (field, value, in_range, reason) in checks {
            if !value.is_finite() || !in_range {
                return Err(SettingsError::InvalidValue { field, value, reason });
            }
        }
        Ok(())
    }

    /// Save demo settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
