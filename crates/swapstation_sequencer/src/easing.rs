// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing curves and interpolation helpers.

use serde::{Deserialize, Serialize};

/// Timing curve applied to a step's normalized progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Easing {
    /// No shaping, eased progress equals progress
    Linear,
    /// Symmetric quadratic ease-in-out
    #[default]
    EaseInOut,
}

impl Easing {
    /// Map normalized time `t` to eased progress.
    ///
    /// Input is clamped to `[0, 1]` so the output never overshoots.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseInOut => ease_in_out(t),
        }
    }
}

/// Quadratic ease-in-out: `2t²` for the first half, `-1 + (4 - 2t)t` after.
///
/// `ease_in_out(0) == 0`, `ease_in_out(0.5) == 0.5`, `ease_in_out(1) == 1`.
pub fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Linear interpolation between two floats, exact at `t == 0` and `t == 1`
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}
