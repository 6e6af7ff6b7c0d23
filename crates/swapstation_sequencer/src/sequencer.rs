// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation sequencer driving named sequences over a scene registry.
//!
//! The sequencer is a tick-driven state machine. Time never advances on its
//! own: the host calls [`AnimationSequencer::tick`] once per frame with the
//! current timestamp, which keeps every run deterministic and testable with
//! synthetic clocks.
//!
//! ## Run lifecycle
//!
//! - [`start`](AnimationSequencer::start) creates a run at step 0, unless one
//!   is already active for that name
//! - [`tick`](AnimationSequencer::tick) applies the current step and moves to
//!   the next one when progress reaches 1
//! - [`cancel`](AnimationSequencer::cancel) flags the run; the next tick
//!   tears it down without writing anything
//! - [`reset`](AnimationSequencer::reset) drops the run immediately and
//!   restores declared initial transforms

use crate::scene::SceneObjectRegistry;
use crate::sequence::{
    Completion, DefinitionError, RunOutcome, SequenceDefinition, SequenceRun, SequenceStatus,
    TickResult,
};
use crate::settings::SequencerSettings;
use indexmap::IndexMap;

/// Error returned by sequencer operations
#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    /// No sequence with this name is defined
    #[error("Unknown sequence: {0}")]
    UnknownSequence(String),

    /// Sequence definition rejected
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Result type for sequencer operations
pub type Result<T> = std::result::Result<T, SequencerError>;

/// Runs named step sequences against an injected scene registry
pub struct AnimationSequencer<R: SceneObjectRegistry> {
    registry: R,
    settings: SequencerSettings,
    definitions: IndexMap<String, SequenceDefinition>,
    runs: IndexMap<String, SequenceRun>,
}

impl<R: SceneObjectRegistry> AnimationSequencer<R> {
    /// Create a sequencer with default settings
    pub fn new(registry: R) -> Self {
        Self::with_settings(registry, SequencerSettings::default())
    }

    /// Create a sequencer with explicit settings
    pub fn with_settings(registry: R, settings: SequencerSettings) -> Self {
        Self {
            registry,
            settings,
            definitions: IndexMap::new(),
            runs: IndexMap::new(),
        }
    }

    /// Register a sequence.
    ///
    /// Every handle referenced by the definition must exist in the registry.
    /// Handles without a declared initial transform get their current one.
    pub fn define(&mut self, mut definition: SequenceDefinition) -> Result<()> {
        if self.definitions.contains_key(&definition.name) {
            return Err(DefinitionError::DuplicateSequence(definition.name).into());
        }
        definition.validate(&self.registry)?;

        tracing::debug!(
            "Defined sequence '{}' ({} steps, {}ms)",
            definition.name,
            definition.step_count(),
            definition.total_duration_ms()
        );
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Get a sequence definition
    pub fn definition(&self, name: &str) -> Option<&SequenceDefinition> {
        self.definitions.get(name)
    }

    /// Names of all defined sequences in definition order
    pub fn sequence_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Start a sequence at step 0.
    ///
    /// If a run is already active for `name` nothing changes and the returned
    /// completion follows the existing run.
    pub fn start(&mut self, name: &str, now_ms: f64) -> Result<Completion> {
        if !self.definitions.contains_key(name) {
            return Err(SequencerError::UnknownSequence(name.to_string()));
        }

        if let Some(run) = self.runs.get_mut(name) {
            if !run.is_cancelled() {
                tracing::debug!("Sequence '{}' already running, ignoring start", name);
                return Ok(run.completion());
            }
        }

        let mut run = SequenceRun::new(now_ms);
        let completion = run.completion();
        tracing::info!("Starting sequence '{}' (run {:?})", name, run.id);

        if let Some(stale) = self.runs.insert(name.to_string(), run) {
            stale.finish(RunOutcome::Cancelled);
        }
        Ok(completion)
    }

    /// Reset then start, so the run begins from the declared initial transforms
    pub fn restart(&mut self, name: &str, now_ms: f64) -> Result<Completion> {
        self.reset(name)?;
        self.start(name, now_ms)
    }

    /// Advance every active run by one frame. Returns the number of runs left.
    pub fn tick(&mut self, now_ms: f64) -> usize {
        let default_gap = self.settings.default_step_gap_ms;
        let mut finished = Vec::new();

        for (name, run) in &mut self.runs {
            if run.is_cancelled() {
                finished.push((name.clone(), RunOutcome::Cancelled));
                continue;
            }

            let Some(definition) = self.definitions.get(name) else {
                finished.push((name.clone(), RunOutcome::Cancelled));
                continue;
            };
            let gap = definition.step_gap_ms.unwrap_or(default_gap);

            match run.advance(definition, &mut self.registry, now_ms, gap) {
                TickResult::Pending => {
                    if self.settings.log_progress {
                        tracing::trace!("Sequence '{}': {:?}", name, run.status());
                    }
                }
                TickResult::Advanced { from, to } => {
                    tracing::debug!(
                        "Sequence '{}' step {} -> {} ('{}')",
                        name,
                        from,
                        to,
                        definition.step(to).map_or("", |s| s.label.as_str())
                    );
                }
                TickResult::Finished => finished.push((name.clone(), RunOutcome::Completed)),
            }
        }

        for (name, outcome) in finished {
            if let Some(run) = self.runs.shift_remove(&name) {
                match outcome {
                    RunOutcome::Completed => tracing::info!("Sequence '{}' completed", name),
                    RunOutcome::Cancelled => tracing::info!(
                        "Sequence '{}' cancelled at step {}",
                        name,
                        run.step()
                    ),
                }
                run.finish(outcome);
            }
        }

        self.runs.len()
    }

    /// Cancel the active run. Takes effect on the next tick.
    ///
    /// Returns false if there was nothing to cancel.
    pub fn cancel(&mut self, name: &str) -> bool {
        match self.runs.get_mut(name) {
            Some(run) if !run.is_cancelled() => {
                run.cancel();
                tracing::debug!("Cancel requested for sequence '{}'", name);
                true
            }
            _ => false,
        }
    }

    /// Pause the active run.
    ///
    /// Runs are not resumable: this is a cancel, and a later
    /// [`start`](Self::start) begins again at step 0.
    pub fn pause(&mut self, name: &str) -> bool {
        self.cancel(name)
    }

    /// Cancel every active run
    pub fn cancel_all(&mut self) {
        for run in self.runs.values_mut() {
            run.cancel();
        }
    }

    /// Drop any run and restore every referenced handle to its initial transform.
    ///
    /// Idempotent and valid whether or not a run is active.
    pub fn reset(&mut self, name: &str) -> Result<()> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| SequencerError::UnknownSequence(name.to_string()))?;

        if let Some(run) = self.runs.shift_remove(name) {
            tracing::info!("Sequence '{}' reset at step {}", name, run.step());
            run.finish(RunOutcome::Cancelled);
        }

        for (handle, initial) in definition.initial_transforms() {
            match self.registry.transform_mut(handle) {
                Some(transform) => *transform = *initial,
                None => tracing::warn!("Cannot reset missing handle '{}'", handle),
            }
        }
        Ok(())
    }

    /// Status of a named sequence; unknown names report idle
    pub fn status(&self, name: &str) -> SequenceStatus {
        self.runs
            .get(name)
            .map_or(SequenceStatus::Idle, SequenceRun::status)
    }

    /// Whether a non-cancelled run exists for `name`
    pub fn is_active(&self, name: &str) -> bool {
        self.status(name).is_active()
    }

    /// Names of sequences with a live run
    pub fn active_sequences(&self) -> impl Iterator<Item = &str> {
        self.runs
            .iter()
            .filter(|(_, run)| !run.is_cancelled())
            .map(|(name, _)| name.as_str())
    }

    /// Whether any run is alive, cancelled or not
    pub fn is_idle(&self) -> bool {
        self.runs.is_empty()
    }

    /// Injected registry
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable injected registry
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Current settings
    pub fn settings(&self) -> &SequencerSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::scene::{Channel, SceneGraph, Transform};
    use crate::step::{Step, Tween};

    fn scene() -> SceneGraph {
        SceneGraph::new()
            .with_object("robot_arm", Transform::at([-2.0, 0.0, 0.0]))
            .with_object("battery", Transform::at([3.0, 0.2, 0.0]))
            .with_object("old_battery", Transform::at([4.0, 0.6, 2.0]))
    }

    fn battery_x(seq: &AnimationSequencer<SceneGraph>) -> f32 {
        seq.registry().transform("battery").unwrap().position[0]
    }

    /// Four steps of 2000/1500/2000/1500ms, each moving the battery by 1 on X
    fn four_step() -> SequenceDefinition {
        SequenceDefinition::new("station").with_steps(
            [2000.0, 1500.0, 2000.0, 1500.0]
                .into_iter()
                .enumerate()
                .map(|(i, duration)| {
                    let from = i as f32;
                    Step::new(format!("step {i}"), duration)
                        .with_tween(Tween::between("battery", Channel::PositionX, from, from + 1.0))
                }),
        )
    }

    fn sequencer() -> AnimationSequencer<SceneGraph> {
        let mut seq = AnimationSequencer::new(scene());
        seq.define(four_step()).unwrap();
        seq
    }

    #[test]
    fn test_eased_progress_at_step_boundaries() {
        let mut seq = AnimationSequencer::new(scene());
        seq.define(SequenceDefinition::new("swing").with_step(
            Step::new("swing", 2000.0).with_tween(Tween::between("robot_arm", Channel::RotationY, 0.0, 1.0)),
        ))
        .unwrap();

        let yaw = |seq: &AnimationSequencer<SceneGraph>| seq.registry().transform("robot_arm").unwrap().yaw();

        seq.start("swing", 0.0).unwrap();
        seq.tick(0.0);
        assert_eq!(yaw(&seq), 0.0);
        seq.tick(1000.0);
        assert_eq!(yaw(&seq), 0.5);
        seq.tick(2000.0);
        assert_eq!(yaw(&seq), 1.0);
        assert!(seq.is_idle());
    }

    #[test]
    fn test_step_transitions_at_exact_boundaries() {
        let mut seq = sequencer();
        let mut done = seq.start("station", 0.0).unwrap();

        seq.tick(0.0);
        assert_eq!(seq.status("station").step(), Some(0));
        seq.tick(1999.0);
        assert_eq!(seq.status("station").step(), Some(0));
        seq.tick(2000.0);
        assert_eq!(seq.status("station").step(), Some(1));
        seq.tick(3500.0);
        assert_eq!(seq.status("station").step(), Some(2));
        seq.tick(5500.0);
        assert_eq!(seq.status("station").step(), Some(3));
        assert_eq!(done.try_outcome(), None);

        assert_eq!(seq.tick(7000.0), 0);
        assert_eq!(seq.status("station"), SequenceStatus::Idle);
        assert_eq!(done.try_outcome(), Some(RunOutcome::Completed));
        assert_eq!(battery_x(&seq), 4.0);
    }

    #[test]
    fn test_transition_tick_does_not_apply_next_step() {
        let mut seq = sequencer();
        seq.start("station", 0.0).unwrap();
        seq.tick(0.0);

        // Step 0 completes at 2000 and writes its end value only
        seq.tick(2000.0);
        assert_eq!(battery_x(&seq), 1.0);

        // Step 1 starts at 2000, halfway at 2750
        seq.tick(2750.0);
        assert_eq!(battery_x(&seq), 1.5);
    }

    #[test]
    fn test_duplicate_start_is_ignored() {
        let mut seq = sequencer();
        let first = seq.start("station", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(2500.0);
        let before = seq.status("station");

        let second = seq.start("station", 2600.0).unwrap();
        assert_eq!(seq.status("station"), before);
        assert_eq!(first.run_id(), second.run_id());
        assert_eq!(seq.active_sequences().count(), 1);

        // Step 1 timing still measured from 2000, not from the second start
        seq.tick(3500.0);
        assert_eq!(seq.status("station").step(), Some(2));
    }

    #[test]
    fn test_large_gap_clamps_instead_of_extrapolating() {
        let mut seq = sequencer();
        seq.start("station", 0.0).unwrap();
        seq.tick(0.0);

        // Backgrounded tab: one tick far in the future completes only one step
        seq.tick(60_000.0);
        assert_eq!(battery_x(&seq), 1.0);
        assert_eq!(seq.status("station").step(), Some(1));
    }

    #[test]
    fn test_cancel_halts_mutation() {
        let mut seq = sequencer();
        let done = seq.start("station", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(1000.0);
        let last = battery_x(&seq);

        assert!(seq.cancel("station"));
        assert!(!seq.is_active("station"));
        assert_eq!(seq.status("station"), SequenceStatus::Cancelling { step: 0 });

        seq.tick(1500.0);
        seq.tick(2500.0);
        assert_eq!(battery_x(&seq), last);
        assert!(seq.is_idle());
        assert_eq!(futures::executor::block_on(done), RunOutcome::Cancelled);
    }

    #[test]
    fn test_pause_is_not_resumable() {
        let mut seq = sequencer();
        seq.start("station", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(2000.0);
        assert!(seq.pause("station"));
        assert!(!seq.pause("station"));
        seq.tick(2100.0);

        seq.start("station", 3000.0).unwrap();
        seq.tick(3000.0);
        assert_eq!(seq.status("station").step(), Some(0));
    }

    #[test]
    fn test_start_after_cancel_before_teardown_replaces_run() {
        let mut seq = sequencer();
        let old = seq.start("station", 0.0).unwrap();
        seq.tick(0.0);
        seq.cancel("station");

        let new = seq.start("station", 100.0).unwrap();
        assert_ne!(old.run_id(), new.run_id());
        assert!(seq.is_active("station"));
        assert_eq!(futures::executor::block_on(old), RunOutcome::Cancelled);
    }

    #[test]
    fn test_reset_restores_initial_transforms() {
        let mut seq = sequencer();
        let done = seq.start("station", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(2000.0);
        seq.tick(3500.0);
        seq.tick(4500.0);
        assert_eq!(seq.status("station").step(), Some(2));
        assert_ne!(battery_x(&seq), 3.0);

        seq.reset("station").unwrap();
        assert!(seq.is_idle());
        assert_eq!(seq.registry().transform("battery"), Some(&Transform::at([3.0, 0.2, 0.0])));
        assert_eq!(futures::executor::block_on(done), RunOutcome::Cancelled);

        // Idempotent
        seq.reset("station").unwrap();
        assert_eq!(seq.registry().transform("battery"), Some(&Transform::at([3.0, 0.2, 0.0])));

        seq.start("station", 10_000.0).unwrap();
        seq.tick(10_000.0);
        assert_eq!(seq.status("station").step(), Some(0));
        assert_eq!(battery_x(&seq), 0.0);
    }

    #[test]
    fn test_reset_uses_declared_initial_values() {
        let mut seq = AnimationSequencer::new(scene());
        seq.define(
            SequenceDefinition::new("stow")
                .with_step(
                    Step::new("stow", 100.0)
                        .with_tween(Tween::to("old_battery", Channel::PositionX, 0.0))
                        .hide_on_complete("old_battery"),
                )
                .with_initial("old_battery", Transform::at([4.0, 0.6, 2.0]).with_visible(true)),
        )
        .unwrap();

        seq.start("stow", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(100.0);
        assert!(!seq.registry().transform("old_battery").unwrap().visible);

        seq.reset("stow").unwrap();
        let restored = seq.registry().transform("old_battery").unwrap();
        assert!(restored.visible);
        assert_eq!(restored.position, [4.0, 0.6, 2.0]);
    }

    #[test]
    fn test_restart_begins_from_initial_state() {
        let mut seq = sequencer();
        seq.start("station", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(2500.0);

        seq.restart("station", 3000.0).unwrap();
        assert_eq!(battery_x(&seq), 3.0);
        seq.tick(3000.0);
        assert_eq!(seq.status("station").step(), Some(0));
        assert_eq!(battery_x(&seq), 0.0);
    }

    #[test]
    fn test_degenerate_step_completes_on_next_tick() {
        let mut seq = AnimationSequencer::new(scene());
        seq.define(SequenceDefinition::new("snap").with_steps([
            Step::new("jump", 0.0).with_tween(Tween::between("battery", Channel::PositionY, 0.0, 5.0)),
            Step::new("back", -20.0).with_tween(Tween::between("battery", Channel::PositionY, 5.0, 1.0)),
        ]))
        .unwrap();

        let mut done = seq.start("snap", 0.0).unwrap();
        seq.tick(0.0);
        assert_eq!(seq.registry().transform("battery").unwrap().position[1], 5.0);
        assert_eq!(seq.status("snap").step(), Some(1));

        seq.tick(0.0);
        assert_eq!(seq.registry().transform("battery").unwrap().position[1], 1.0);
        assert_eq!(done.try_outcome(), Some(RunOutcome::Completed));
    }

    #[test]
    fn test_relative_tween_captures_value_at_step_start() {
        let mut seq = AnimationSequencer::new(scene());
        seq.define(SequenceDefinition::new("swing").with_steps([
            Step::new("out", 100.0).with_tween(Tween::by("robot_arm", Channel::RotationY, 1.0)),
            Step::new("further", 100.0).with_tween(Tween::by("robot_arm", Channel::RotationY, 1.0)),
        ]))
        .unwrap();

        seq.start("swing", 0.0).unwrap();
        for now in [0.0, 100.0, 200.0] {
            seq.tick(now);
        }
        assert_eq!(seq.registry().transform("robot_arm").unwrap().yaw(), 2.0);
    }

    #[test]
    fn test_sequence_gap_from_settings() {
        let settings = SequencerSettings {
            default_step_gap_ms: 500.0,
            ..SequencerSettings::default()
        };
        let mut seq = AnimationSequencer::with_settings(scene(), settings);
        seq.define(four_step()).unwrap();

        seq.start("station", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(2000.0);
        assert!(matches!(seq.status("station"), SequenceStatus::Waiting { step: 1, .. }));
        seq.tick(2400.0);
        assert_eq!(battery_x(&seq), 1.0);
        seq.tick(2500.0);
        assert!(matches!(seq.status("station"), SequenceStatus::Running { step: 1, .. }));
    }

    #[test]
    fn test_non_finite_tick_is_skipped() {
        let mut seq = sequencer();
        let mut done = seq.start("station", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(1000.0);
        let before = battery_x(&seq);

        for now in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(seq.tick(now), 1);
            assert_eq!(battery_x(&seq), before);
            assert_eq!(seq.status("station").step(), Some(0));
        }
        assert_eq!(done.try_outcome(), None);

        seq.tick(2000.0);
        assert_eq!(battery_x(&seq), 1.0);
        assert_eq!(seq.status("station").step(), Some(1));
    }

    #[test]
    fn test_non_finite_start_never_advances() {
        let mut seq = sequencer();
        seq.start("station", f64::NAN).unwrap();
        seq.tick(0.0);
        seq.tick(60_000.0);
        assert_eq!(seq.status("station").step(), Some(0));
        assert_eq!(battery_x(&seq), 3.0);

        seq.restart("station", 100.0).unwrap();
        seq.tick(2100.0);
        assert_eq!(seq.status("station").step(), Some(1));
    }

    #[test]
    fn test_non_finite_tick_during_gap() {
        let settings = SequencerSettings {
            default_step_gap_ms: 500.0,
            ..SequencerSettings::default()
        };
        let mut seq = AnimationSequencer::with_settings(scene(), settings);
        seq.define(four_step()).unwrap();

        seq.start("station", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(2000.0);
        seq.tick(f64::NAN);
        assert!(matches!(
            seq.status("station"),
            SequenceStatus::Waiting { step: 1, resume_at_ms } if resume_at_ms == 2500.0
        ));
    }

    #[test]
    fn test_cancel_all_tears_down_every_run() {
        let mut seq = sequencer();
        seq.define(SequenceDefinition::new("swing").with_step(
            Step::new("swing", 1000.0).with_tween(Tween::between("robot_arm", Channel::RotationY, 0.0, 1.0)),
        ))
        .unwrap();

        let station = seq.start("station", 0.0).unwrap();
        let swing = seq.start("swing", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(500.0);
        let arm = *seq.registry().transform("robot_arm").unwrap();
        let x = battery_x(&seq);

        seq.cancel_all();
        assert_eq!(seq.active_sequences().count(), 0);
        assert!(!seq.is_active("station"));
        assert!(!seq.is_active("swing"));
        assert!(!seq.is_idle());

        assert_eq!(seq.tick(1000.0), 0);
        assert!(seq.is_idle());
        assert_eq!(battery_x(&seq), x);
        assert_eq!(seq.registry().transform("robot_arm"), Some(&arm));
        assert_eq!(futures::executor::block_on(station), RunOutcome::Cancelled);
        assert_eq!(futures::executor::block_on(swing), RunOutcome::Cancelled);
    }

    #[test]
    fn test_linear_easing_sequence() {
        let mut seq = AnimationSequencer::new(scene());
        seq.define(SequenceDefinition::new("slide").with_step(
            Step::new("slide", 1000.0)
                .with_easing(Easing::Linear)
                .with_tween(Tween::between("battery", Channel::PositionX, 0.0, 4.0)),
        ))
        .unwrap();

        seq.start("slide", 0.0).unwrap();
        seq.tick(0.0);
        seq.tick(250.0);
        // Ease-in-out would give 0.5 here
        assert_eq!(battery_x(&seq), 1.0);
        seq.tick(750.0);
        assert_eq!(battery_x(&seq), 3.0);
        seq.tick(1000.0);
        assert_eq!(battery_x(&seq), 4.0);
        assert!(seq.is_idle());
    }

    #[test]
    fn test_define_errors() {
        let mut seq = sequencer();
        assert!(matches!(
            seq.define(four_step()),
            Err(SequencerError::Definition(DefinitionError::DuplicateSequence(_)))
        ));
        assert!(matches!(
            seq.define(SequenceDefinition::new("walk").with_step(
                Step::new("walk", 2000.0).with_tween(Tween::between("rider", Channel::PositionX, 5.0, 2.0))
            )),
            Err(SequencerError::Definition(DefinitionError::MissingHandle { .. }))
        ));
        assert_eq!(seq.sequence_names().collect::<Vec<_>>(), ["station"]);
    }

    #[test]
    fn test_unknown_sequence() {
        let mut seq = sequencer();
        assert!(matches!(seq.start("nope", 0.0), Err(SequencerError::UnknownSequence(_))));
        assert!(matches!(seq.reset("nope"), Err(SequencerError::UnknownSequence(_))));
        assert!(!seq.cancel("nope"));
        assert_eq!(seq.status("nope"), SequenceStatus::Idle);
    }

    #[test]
    fn test_independent_sequences_run_together() {
        let mut seq = sequencer();
        seq.define(SequenceDefinition::new("swing").with_step(
            Step::new("swing", 1000.0).with_tween(Tween::between("robot_arm", Channel::RotationY, 0.0, 1.0)),
        ))
        .unwrap();

        seq.start("station", 0.0).unwrap();
        seq.start("swing", 0.0).unwrap();
        assert_eq!(seq.tick(0.0), 2);
        assert_eq!(seq.tick(1000.0), 1);
        assert_eq!(seq.active_sequences().collect::<Vec<_>>(), ["station"]);
    }
}
