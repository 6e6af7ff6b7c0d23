// SPDX-License-Identifier: MIT OR Apache-2.0
//! Chains of independent sequences run one after another.

use crate::scene::SceneObjectRegistry;
use crate::sequence::{Completion, RunOutcome};
use crate::sequencer::{AnimationSequencer, Result, SequencerError};

/// Progress of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainState {
    /// Not started
    #[default]
    Idle,
    /// Stage `stage` is running
    Running {
        /// Index of the running stage
        stage: usize,
    },
    /// Every stage completed
    Finished,
    /// A stage was cancelled before completing
    Aborted {
        /// Index of the cancelled stage
        stage: usize,
    },
}

impl ChainState {
    /// Whether a stage is running
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Ordered list of sequence names where each stage starts when the previous completes
#[derive(Debug)]
pub struct SequenceChain {
    /// Chain name, used in logs
    pub name: String,
    stages: Vec<String>,
    state: ChainState,
    current: Option<Completion>,
}

impl SequenceChain {
    /// Create a chain over the named stages
    pub fn new<S: Into<String>>(name: impl Into<String>, stages: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            stages: stages.into_iter().map(Into::into).collect(),
            state: ChainState::Idle,
            current: None,
        }
    }

    /// Stage names in order
    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    /// Current state
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Start the first stage.
    ///
    /// Returns false without doing anything if the chain is already running.
    pub fn begin<R: SceneObjectRegistry>(
        &mut self,
        sequencer: &mut AnimationSequencer<R>,
        now_ms: f64,
    ) -> Result<bool> {
        if self.state.is_running() {
            tracing::debug!("Chain '{}' already running, ignoring begin", self.name);
            return Ok(false);
        }
        if let Some(unknown) = self
            .stages
            .iter()
            .find(|stage| sequencer.definition(stage).is_none())
        {
            return Err(SequencerError::UnknownSequence(unknown.clone()));
        }
        if self.stages.is_empty() {
            self.state = ChainState::Finished;
            return Ok(true);
        }

        tracing::info!("Chain '{}' started ({} stages)", self.name, self.stages.len());
        self.start_stage(sequencer, 0, now_ms)?;
        Ok(true)
    }

    /// Check the running stage and start the next one if it completed.
    ///
    /// Call after [`AnimationSequencer::tick`] with the same timestamp so the
    /// next stage starts on the frame the previous one finished.
    pub fn poll<R: SceneObjectRegistry>(
        &mut self,
        sequencer: &mut AnimationSequencer<R>,
        now_ms: f64,
    ) -> Result<ChainState> {
        let ChainState::Running { stage } = self.state else {
            return Ok(self.state);
        };
        let Some(outcome) = self.current.as_mut().and_then(Completion::try_outcome) else {
            return Ok(self.state);
        };
        self.current = None;

        match outcome {
            RunOutcome::Completed if stage + 1 < self.stages.len() => {
                self.start_stage(sequencer, stage + 1, now_ms)?;
            }
            RunOutcome::Completed => {
                tracing::info!("Chain '{}' finished", self.name);
                self.state = ChainState::Finished;
            }
            RunOutcome::Cancelled => {
                tracing::info!(
                    "Chain '{}' aborted at stage {} ('{}')",
                    self.name,
                    stage,
                    self.stages[stage]
                );
                self.state = ChainState::Aborted { stage };
            }
        }
        Ok(self.state)
    }

    /// Cancel the running stage; the chain aborts once the cancellation lands
    pub fn cancel<R: SceneObjectRegistry>(&mut self, sequencer: &mut AnimationSequencer<R>) -> bool {
        match self.state {
            ChainState::Running { stage } => sequencer.cancel(&self.stages[stage]),
            _ => false,
        }
    }

    /// Reset every stage in reverse order and return to idle
    pub fn reset<R: SceneObjectRegistry>(&mut self, sequencer: &mut AnimationSequencer<R>) -> Result<()> {
        for stage in self.stages.iter().rev() {
            sequencer.reset(stage)?;
        }
        self.current = None;
        self.state = ChainState::Idle;
        Ok(())
    }

    fn start_stage<R: SceneObjectRegistry>(
        &mut self,
        sequencer: &mut AnimationSequencer<R>,
        stage: usize,
        now_ms: f64,
    ) -> Result<()> {
        let completion = sequencer.start(&self.stages[stage], now_ms)?;
        tracing::debug!("Chain '{}' stage {} ('{}')", self.name, stage, self.stages[stage]);
        self.current = Some(completion);
        self.state = ChainState::Running { stage };
        Ok(())
    }
}
