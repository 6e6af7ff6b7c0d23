// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named sequences of steps and their runs.

use crate::scene::{SceneObjectRegistry, Transform};
use crate::step::{Span, Step};
use futures::channel::oneshot;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use uuid::Uuid;

/// Error raised when a sequence definition is rejected
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// A step or initial value references a handle the registry lacks
    #[error("Sequence '{sequence}' references missing handle '{handle}'")]
    MissingHandle {
        /// Sequence name
        sequence: String,
        /// Missing handle name
        handle: String,
    },

    /// A sequence with this name is already defined
    #[error("Sequence already defined: {0}")]
    DuplicateSequence(String),

    /// The sequence has no steps
    #[error("Sequence '{0}' has no steps")]
    EmptySequence(String),
}

/// Declarative, named list of steps
#[derive(Debug, Clone)]
pub struct SequenceDefinition {
    /// Sequence name
    pub name: String,
    /// Steps in execution order
    steps: Vec<Step>,
    /// Transforms restored on reset, by handle
    initial: IndexMap<String, Transform>,
    /// Pause between steps; falls back to the sequencer default when unset
    pub step_gap_ms: Option<f64>,
}

impl SequenceDefinition {
    /// Create an empty definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            initial: IndexMap::new(),
            step_gap_ms: None,
        }
    }

    /// Append a step
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Declare the transform a handle returns to on reset
    pub fn with_initial(mut self, handle: impl Into<String>, transform: Transform) -> Self {
        self.initial.insert(handle.into(), transform);
        self
    }

    /// Set the pause inserted between consecutive steps
    pub fn with_step_gap(mut self, gap_ms: f64) -> Self {
        self.step_gap_ms = Some(gap_ms);
        self
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Get a step by index
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Number of steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Sum of all step durations, ignoring gaps and degenerate steps
    pub fn total_duration_ms(&self) -> f64 {
        self.steps
            .iter()
            .filter(|s| !s.is_degenerate())
            .map(|s| s.duration_ms)
            .sum()
    }

    /// Declared initial transforms
    pub fn initial_transforms(&self) -> impl Iterator<Item = (&str, &Transform)> {
        self.initial.iter().map(|(name, t)| (name.as_str(), t))
    }

    /// Every handle the sequence references, deduplicated, in first-use order
    pub fn handles(&self) -> IndexSet<&str> {
        self.steps
            .iter()
            .flat_map(Step::handles)
            .chain(self.initial.keys().map(String::as_str))
            .collect()
    }

    /// Check every referenced handle exists and capture missing initial values.
    pub(crate) fn validate<R: SceneObjectRegistry + ?Sized>(
        &mut self,
        registry: &R,
    ) -> Result<(), DefinitionError> {
        if self.steps.is_empty() {
            return Err(DefinitionError::EmptySequence(self.name.clone()));
        }

        let mut captured = Vec::new();
        for handle in self.handles() {
            let Some(transform) = registry.transform(handle) else {
                return Err(DefinitionError::MissingHandle {
                    sequence: self.name.clone(),
                    handle: handle.to_string(),
                });
            };
            if !self.initial.contains_key(handle) {
                captured.push((handle.to_string(), *transform));
            }
        }
        self.initial.extend(captured);

        for (index, step) in self.steps.iter().enumerate() {
            if step.is_degenerate() {
                tracing::warn!(
                    "Sequence '{}' step {} ('{}') has non-positive duration {}ms, it will complete instantly",
                    self.name,
                    index,
                    step.label,
                    step.duration_ms
                );
            }
        }

        Ok(())
    }
}

/// Unique identifier for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new random run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every step reached full progress
    Completed,
    /// The run was cancelled, paused or reset
    Cancelled,
}

/// Observable state of a named sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequenceStatus {
    /// No run
    Idle,
    /// A step is animating
    Running {
        /// Current step index
        step: usize,
        /// Linear progress reported by the last tick
        progress: f32,
    },
    /// Between steps
    Waiting {
        /// Index of the next step
        step: usize,
        /// Timestamp the next step starts at
        resume_at_ms: f64,
    },
    /// Cancelled, torn down on the next tick
    Cancelling {
        /// Step index when cancelled
        step: usize,
    },
}

impl SequenceStatus {
    /// Whether a run exists and has not been cancelled
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running { .. } | Self::Waiting { .. })
    }

    /// Current step index, if a run exists
    pub fn step(&self) -> Option<usize> {
        match self {
            Self::Idle => None,
            Self::Running { step, .. } | Self::Waiting { step, .. } | Self::Cancelling { step } => {
                Some(*step)
            }
        }
    }
}

/// Completion signal of a run.
///
/// Resolves to [`RunOutcome::Completed`] once the last step finishes, or to
/// [`RunOutcome::Cancelled`] if the run is torn down first.
#[derive(Debug)]
pub struct Completion {
    run_id: RunId,
    receiver: oneshot::Receiver<RunOutcome>,
    outcome: Option<RunOutcome>,
}

impl Completion {
    /// Run this completion belongs to
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Outcome if the run has ended, without blocking
    pub fn try_outcome(&mut self) -> Option<RunOutcome> {
        if self.outcome.is_none() {
            self.outcome = match self.receiver.try_recv() {
                Ok(outcome) => outcome,
                Err(oneshot::Canceled) => Some(RunOutcome::Cancelled),
            };
        }
        self.outcome
    }
}

impl Future for Completion {
    type Output = RunOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.outcome {
            return Poll::Ready(outcome);
        }
        let outcome = match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => outcome,
            Poll::Ready(Err(oneshot::Canceled)) => RunOutcome::Cancelled,
            Poll::Pending => return Poll::Pending,
        };
        self.outcome = Some(outcome);
        Poll::Ready(outcome)
    }
}

/// Phase of the current step
#[derive(Debug, Clone, Copy, PartialEq)]
enum RunPhase {
    /// Step animating since `started_at_ms`
    Running { started_at_ms: f64 },
    /// Gap before the step starts
    Waiting { resume_at_ms: f64 },
}

/// What a single tick did to a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TickResult {
    /// Step still animating or waiting
    Pending,
    /// Step `from` completed and `to` is next
    Advanced { from: usize, to: usize },
    /// Last step completed
    Finished,
}

/// One live execution of a sequence
#[derive(Debug)]
pub(crate) struct SequenceRun {
    pub(crate) id: RunId,
    step: usize,
    phase: RunPhase,
    spans: Option<Vec<Span>>,
    progress: f32,
    cancelled: bool,
    waiters: Vec<oneshot::Sender<RunOutcome>>,
}

impl SequenceRun {
    pub(crate) fn new(now_ms: f64) -> Self {
        Self {
            id: RunId::new(),
            step: 0,
            phase: RunPhase::Running { started_at_ms: now_ms },
            spans: None,
            progress: 0.0,
            cancelled: false,
            waiters: Vec::new(),
        }
    }

    /// Register another waiter for this run
    pub(crate) fn completion(&mut self) -> Completion {
        let (sender, receiver) = oneshot::channel();
        self.waiters.push(sender);
        Completion {
            run_id: self.id,
            receiver,
            outcome: None,
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub(crate) fn step(&self) -> usize {
        self.step
    }

    pub(crate) fn status(&self) -> SequenceStatus {
        if self.cancelled {
            return SequenceStatus::Cancelling { step: self.step };
        }
        match self.phase {
            RunPhase::Running { .. } => SequenceStatus::Running {
                step: self.step,
                progress: self.progress,
            },
            RunPhase::Waiting { resume_at_ms } => SequenceStatus::Waiting {
                step: self.step,
                resume_at_ms,
            },
        }
    }

    /// Resolve every waiter with `outcome`, consuming the run
    pub(crate) fn finish(self, outcome: RunOutcome) {
        for waiter in self.waiters {
            // Waiters that dropped their completion no longer care
            let _ = waiter.send(outcome);
        }
    }

    /// Advance by one frame. Must not be called on a cancelled run.
    pub(crate) fn advance<R: SceneObjectRegistry + ?Sized>(
        &mut self,
        definition: &SequenceDefinition,
        registry: &mut R,
        now_ms: f64,
        gap_ms: f64,
    ) -> TickResult {
        if !now_ms.is_finite() {
            tracing::warn!(
                "Sequence '{}' ticked with non-finite time {}, skipping frame",
                definition.name,
                now_ms
            );
            return TickResult::Pending;
        }

        let started_at_ms = match self.phase {
            RunPhase::Running { started_at_ms } => started_at_ms,
            RunPhase::Waiting { resume_at_ms } => {
                if now_ms < resume_at_ms {
                    return TickResult::Pending;
                }
                self.phase = RunPhase::Running {
                    started_at_ms: resume_at_ms,
                };
                resume_at_ms
            }
        };

        let Some(step) = definition.step(self.step) else {
            return TickResult::Finished;
        };

        let elapsed_ms = now_ms - started_at_ms;
        if !elapsed_ms.is_finite() {
            tracing::warn!(
                "Sequence '{}' step {} started at non-finite time {}, skipping frame",
                definition.name,
                self.step,
                started_at_ms
            );
            return TickResult::Pending;
        }

        let spans = self.spans.get_or_insert_with(|| step.resolve(&*registry));
        let progress = step.progress(elapsed_ms);
        let eased = step.easing.apply(progress);

        for write in step.evaluate(spans, eased) {
            match registry.transform_mut(&write.handle) {
                Some(transform) => write.channel.set(transform, write.value),
                None => tracing::warn!(
                    "Sequence '{}' lost handle '{}' mid-run, skipping write",
                    definition.name,
                    write.handle
                ),
            }
        }
        self.progress = progress;

        if progress < 1.0 {
            return TickResult::Pending;
        }

        for action in &step.on_complete {
            if !action.run(registry) {
                tracing::warn!(
                    "Sequence '{}' lost handle '{}' mid-run, skipping completion action",
                    definition.name,
                    action.handle()
                );
            }
        }

        let from = self.step;
        self.step += 1;
        self.spans = None;
        self.progress = 0.0;

        if self.step >= definition.step_count() {
            return TickResult::Finished;
        }

        self.phase = if gap_ms > 0.0 {
            RunPhase::Waiting {
                resume_at_ms: now_ms + gap_ms,
            }
        } else {
            RunPhase::Running { started_at_ms: now_ms }
        };

        TickResult::Advanced { from, to: self.step }
    }
}
