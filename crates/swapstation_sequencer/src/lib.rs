// SPDX-License-Identifier: MIT OR Apache-2.0
//! Step sequencer for the battery-swap station demo.
//!
//! This crate drives timed transform animation over named scene handles:
//! - Declarative steps (tweens, custom effects, completion actions)
//! - Named sequences with declared initial transforms
//! - Start/cancel/reset with completion futures
//! - Chains of sequences run one after another
//!
//! ## Architecture
//!
//! The sequencer is built on:
//! - An injected [`SceneObjectRegistry`] instead of global scene state
//! - An explicit run state machine advanced by an external tick
//! - Ease-in-out shaping of linear step progress

pub mod chain;
pub mod easing;
pub mod scene;
pub mod sequence;
pub mod sequencer;
pub mod settings;
pub mod step;

pub use chain::{ChainState, SequenceChain};
pub use easing::{ease_in_out, lerp, Easing};
pub use scene::{Channel, SceneGraph, SceneObjectRegistry, Transform};
pub use sequence::{Completion, DefinitionError, RunId, RunOutcome, SequenceDefinition, SequenceStatus};
pub use sequencer::{AnimationSequencer, SequencerError};
pub use settings::{SequencerSettings, SettingsError, SETTINGS_FORMAT_VERSION};
pub use step::{CustomEffect, EffectFn, PropertyWrite, Span, Step, StepAction, Tween, TweenEnd, TweenStart};
