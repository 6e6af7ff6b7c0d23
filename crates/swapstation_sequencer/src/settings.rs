// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequencer settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Error loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading or writing the file failed
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON for these settings
    #[error("Settings parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization failed
    #[error("Settings serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// A numeric field is out of range or not finite
    #[error("Invalid setting {field} = {value}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Rejected value
        value: f64,
        /// Accepted range
        reason: &'static str,
    },

    /// Written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },
}

/// Tunables shared by every sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerSettings {
    /// Format version
    pub version: u32,
    /// Pause between steps for sequences that do not set their own
    pub default_step_gap_ms: f64,
    /// Trace per-frame progress of every run
    pub log_progress: bool,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            default_step_gap_ms: 0.0,
            log_progress: false,
        }
    }
}

impl SequencerSettings {
    /// Parse settings from a RON string
    pub fn from_ron(content: &str) -> Result<Self, SettingsError> {
        let settings: SequencerSettings = ron::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to pretty RON
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Check the version and that every numeric field is usable
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: self.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        if !self.default_step_gap_ms.is_finite() || self.default_step_gap_ms < 0.0 {
            return Err(SettingsError::InvalidValue {
                field: "default_step_gap_ms",
                value: self.default_step_gap_ms,
                reason: "must be finite and not negative",
            });
        }
        Ok(())
    }
}
