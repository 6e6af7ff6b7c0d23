// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drives the station scenarios frame by frame.

use crate::clock::FrameClock;
use crate::settings::{DemoSettings, Scenario};
use crate::station;
use swapstation_sequencer::{
    AnimationSequencer, ChainState, RunOutcome, SceneGraph, SequenceChain, SequencerError,
    SettingsError,
};

/// Demo errors
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Sequencer rejected an operation
    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    /// A scenario ran past the frame limit
    #[error("{scenario} did not finish within {frames} frames")]
    FrameLimit {
        /// Scenario name
        scenario: &'static str,
        /// Frames run
        frames: u64,
    },
}

/// Result of playing one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    /// Scenario played
    pub scenario: Scenario,
    /// How it ended
    pub outcome: RunOutcome,
    /// Frames ticked
    pub frames: u64,
    /// Clock time from start to end
    pub duration_ms: f64,
}

/// Owns the sequencer and clock for a demo session
pub struct DemoRunner {
    sequencer: AnimationSequencer<SceneGraph>,
    clock: FrameClock,
    max_frames: u64,
}

impl DemoRunner {
    /// Build the station scene and define every scenario sequence
    pub fn new(settings: &DemoSettings) -> Result<Self, DemoError> {
        let mut sequencer =
            AnimationSequencer::with_settings(station::station_scene(), settings.sequencer.clone());
        for definition in station::station_demo_sequences() {
            sequencer.define(definition)?;
        }
        sequencer.define(station::rider_swap_sequence(settings.rider_step_gap_ms))?;

        Ok(Self {
            sequencer,
            clock: FrameClock::new(settings.frame_interval_ms).with_time_scale(settings.time_scale),
            max_frames: settings.max_frames,
        })
    }

    /// Play a scenario to the end
    pub fn run(&mut self, scenario: Scenario) -> Result<Vec<ScenarioReport>, DemoError> {
        match scenario {
            Scenario::StationDemo => Ok(vec![self.run_station_demo()?]),
            Scenario::RiderSwap => Ok(vec![self.run_rider_swap()?]),
            Scenario::Both => Ok(vec![self.run_station_demo()?, self.run_rider_swap()?]),
        }
    }

    /// Arm swing, pickup, transport and install, each started when the previous completes
    pub fn run_station_demo(&mut self) -> Result<ScenarioReport, DemoError> {
        let mut chain = SequenceChain::new("station_demo", station::STATION_DEMO_STAGES);
        chain.reset(&mut self.sequencer)?;

        let started_at = self.clock.now_ms();
        chain.begin(&mut self.sequencer, started_at)?;

        let mut frames = 0;
        let outcome = loop {
            if frames >= self.max_frames {
                return Err(DemoError::FrameLimit {
                    scenario: Scenario::StationDemo.display_name(),
                    frames,
                });
            }
            let now = self.clock.advance();
            frames += 1;

            self.sequencer.tick(now);
            match chain.poll(&mut self.sequencer, now)? {
                ChainState::Finished => break RunOutcome::Completed,
                ChainState::Aborted { .. } => break RunOutcome::Cancelled,
                ChainState::Idle | ChainState::Running { .. } => {}
            }
        };

        Ok(self.report(Scenario::StationDemo, outcome, frames, started_at))
    }

    /// Rider swap, restarted from the declared initial transforms
    pub fn run_rider_swap(&mut self) -> Result<ScenarioReport, DemoError> {
        let started_at = self.clock.now_ms();
        let mut completion = self.sequencer.restart(station::RIDER_SWAP, started_at)?;

        let mut frames = 0;
        let outcome = loop {
            if frames >= self.max_frames {
                self.sequencer.reset(station::RIDER_SWAP)?;
                return Err(DemoError::FrameLimit {
                    scenario: Scenario::RiderSwap.display_name(),
                    frames,
                });
            }
            let now = self.clock.advance();
            frames += 1;

            self.sequencer.tick(now);
            if let Some(outcome) = completion.try_outcome() {
                break outcome;
            }
        };

        Ok(self.report(Scenario::RiderSwap, outcome, frames, started_at))
    }

    /// Current scene state
    pub fn scene(&self) -> &SceneGraph {
        self.sequencer.registry()
    }

    /// Frames ticked since the runner was created
    pub fn frame_count(&self) -> u64 {
        self.clock.frame_count()
    }

    fn report(&self, scenario: Scenario, outcome: RunOutcome, frames: u64, started_at: f64) -> ScenarioReport {
        tracing::debug!("{} ended: {:?}", scenario.display_name(), outcome);
        ScenarioReport {
            scenario,
            outcome,
            frames,
            duration_ms: self.clock.now_ms() - started_at,
        }
    }
}
