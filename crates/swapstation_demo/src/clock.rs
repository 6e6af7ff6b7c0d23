// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synthetic frame clock standing in for the browser's animation frames.

/// Emits monotonically increasing frame timestamps in milliseconds
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Wall time between frames
    interval_ms: f64,
    /// Time scale (1.0 = real time)
    time_scale: f64,
    /// Timestamp of the last frame
    now_ms: f64,
    /// Frames emitted so far
    frame_count: u64,
}

impl FrameClock {
    /// Create a clock at time zero
    pub fn new(interval_ms: f64) -> Self {
        let interval_ms = if interval_ms.is_finite() { interval_ms.max(0.001) } else { 1000.0 / 60.0 };
        Self {
            interval_ms,
            time_scale: 1.0,
            now_ms: 0.0,
            frame_count: 0,
        }
    }

    /// Set time scale (clamped to reasonable range, non-finite keeps real time)
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = if scale.is_finite() {
            scale.clamp(0.0, 10.0)
        } else {
            1.0
        };
        self
    }

    /// Advance one frame and return its timestamp
    pub fn advance(&mut self) -> f64 {
        self.frame_count += 1;
        // Derived from the frame count so rounding does not accumulate
        self.now_ms = self.frame_count as f64 * self.interval_ms * self.time_scale;
        self.now_ms
    }

    /// Timestamp of the last frame
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Frames emitted so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
