// SPDX-License-Identifier: MIT OR Apache-2.0
//! Step definitions for sequences.
//!
//! A step is data: a duration, the tweens it drives, an optional custom
//! effect and the actions to run once it reaches full progress.

use crate::easing::{lerp, Easing};
use crate::scene::{Channel, SceneObjectRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a tween starts from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TweenStart {
    /// Fixed value
    Value(f32),
    /// Value read from the registry when the step begins
    Current,
}

/// Where a tween ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TweenEnd {
    /// Fixed value
    Value(f32),
    /// Offset added to the resolved start value
    Offset(f32),
}

/// Interpolation of one channel of one handle over a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tween {
    /// Target handle name
    pub handle: String,
    /// Animated channel
    pub channel: Channel,
    /// Start value
    pub start: TweenStart,
    /// End value
    pub end: TweenEnd,
}

impl Tween {
    /// Tween between two fixed values
    pub fn between(handle: impl Into<String>, channel: Channel, from: f32, to: f32) -> Self {
        Self {
            handle: handle.into(),
            channel,
            start: TweenStart::Value(from),
            end: TweenEnd::Value(to),
        }
    }

    /// Tween from the value at step start to a fixed value
    pub fn to(handle: impl Into<String>, channel: Channel, to: f32) -> Self {
        Self {
            handle: handle.into(),
            channel,
            start: TweenStart::Current,
            end: TweenEnd::Value(to),
        }
    }

    /// Tween from the value at step start by a relative offset
    pub fn by(handle: impl Into<String>, channel: Channel, offset: f32) -> Self {
        Self {
            handle: handle.into(),
            channel,
            start: TweenStart::Current,
            end: TweenEnd::Offset(offset),
        }
    }

    /// Resolve start and end against the registry
    pub fn resolve<R: SceneObjectRegistry + ?Sized>(&self, registry: &R) -> Span {
        let from = match self.start {
            TweenStart::Value(v) => v,
            TweenStart::Current => match registry.transform(&self.handle) {
                Some(transform) => self.channel.get(transform),
                None => {
                    tracing::warn!(
                        "Tween on missing handle '{}' has no current value, starting from 0",
                        self.handle
                    );
                    0.0
                }
            },
        };
        let to = match self.end {
            TweenEnd::Value(v) => v,
            TweenEnd::Offset(offset) => from + offset,
        };
        Span { from, to }
    }
}

/// Resolved start and end of a tween
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    /// Value at progress 0
    pub from: f32,
    /// Value at progress 1
    pub to: f32,
}

impl Span {
    /// Value at eased progress
    pub fn sample(&self, eased: f32) -> f32 {
        lerp(self.from, self.to, eased)
    }
}

/// A single property write produced by a step effect
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyWrite {
    /// Target handle name
    pub handle: String,
    /// Written channel
    pub channel: Channel,
    /// New value
    pub value: f32,
}

impl PropertyWrite {
    /// Create a property write
    pub fn new(handle: impl Into<String>, channel: Channel, value: f32) -> Self {
        Self {
            handle: handle.into(),
            channel,
            value,
        }
    }
}

/// Side effect run when a step completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepAction {
    /// Toggle a handle's visibility
    SetVisible {
        /// Target handle name
        handle: String,
        /// New visibility
        visible: bool,
    },
}

impl StepAction {
    /// Handle touched by this action
    pub fn handle(&self) -> &str {
        match self {
            Self::SetVisible { handle, .. } => handle,
        }
    }

    /// Run the action against the registry. Returns false if the handle is gone.
    pub fn run<R: SceneObjectRegistry + ?Sized>(&self, registry: &mut R) -> bool {
        match self {
            Self::SetVisible { handle, visible } => match registry.transform_mut(handle) {
                Some(transform) => {
                    transform.visible = *visible;
                    true
                }
                None => false,
            },
        }
    }
}

/// Pure effect function mapping eased progress to property writes
pub type EffectFn = Arc<dyn Fn(f32) -> Vec<PropertyWrite> + Send + Sync>;

/// Custom effect with the handles it declares it writes
#[derive(Clone)]
pub struct CustomEffect {
    /// Handles the effect may write
    pub targets: Vec<String>,
    effect: EffectFn,
}

impl CustomEffect {
    /// Evaluate the effect
    pub fn evaluate(&self, eased: f32) -> Vec<PropertyWrite> {
        (self.effect)(eased)
    }
}

impl fmt::Debug for CustomEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEffect")
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

/// One timed phase of a sequence
#[derive(Debug, Clone)]
pub struct Step {
    /// Label used in logs
    pub label: String,
    /// Duration in milliseconds
    pub duration_ms: f64,
    /// Timing curve
    pub easing: Easing,
    /// Channel interpolations
    pub tweens: Vec<Tween>,
    /// Optional custom effect
    pub custom: Option<CustomEffect>,
    /// Actions run once progress reaches 1
    pub on_complete: Vec<StepAction>,
}

impl Step {
    /// Create a new step with ease-in-out timing and no effects
    pub fn new(label: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            label: label.into(),
            duration_ms,
            easing: Easing::EaseInOut,
            tweens: Vec::new(),
            custom: None,
            on_complete: Vec::new(),
        }
    }

    /// Add a tween
    pub fn with_tween(mut self, tween: Tween) -> Self {
        self.tweens.push(tween);
        self
    }

    /// Set the timing curve
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Set a custom effect writing only to `targets`
    pub fn with_effect<F>(mut self, targets: &[&str], effect: F) -> Self
    where
        F: Fn(f32) -> Vec<PropertyWrite> + Send + Sync + 'static,
    {
        self.custom = Some(CustomEffect {
            targets: targets.iter().map(|t| (*t).to_string()).collect(),
            effect: Arc::new(effect),
        });
        self
    }

    /// Add a completion action
    pub fn on_complete(mut self, action: StepAction) -> Self {
        self.on_complete.push(action);
        self
    }

    /// Hide a handle once the step completes
    pub fn hide_on_complete(self, handle: impl Into<String>) -> Self {
        self.on_complete(StepAction::SetVisible {
            handle: handle.into(),
            visible: false,
        })
    }

    /// Zero or negative duration, completes on its first tick
    pub fn is_degenerate(&self) -> bool {
        self.duration_ms.is_nan() || self.duration_ms <= 0.0
    }

    /// Every handle this step reads or writes, possibly repeated
    pub fn handles(&self) -> impl Iterator<Item = &str> {
        let tweens = self.tweens.iter().map(|t| t.handle.as_str());
        let custom = self
            .custom
            .iter()
            .flat_map(|c| c.targets.iter().map(String::as_str));
        let actions = self.on_complete.iter().map(StepAction::handle);
        tweens.chain(custom).chain(actions)
    }

    /// Normalized progress after `elapsed_ms`, clamped to `[0, 1]`
    pub fn progress(&self, elapsed_ms: f64) -> f32 {
        if self.is_degenerate() {
            return 1.0;
        }
        (elapsed_ms / self.duration_ms).clamp(0.0, 1.0) as f32
    }

    /// Resolve tween spans at step start
    pub fn resolve<R: SceneObjectRegistry + ?Sized>(&self, registry: &R) -> Vec<Span> {
        self.tweens.iter().map(|t| t.resolve(registry)).collect()
    }

    /// Property writes at eased progress, given spans from [`Step::resolve`]
    pub fn evaluate(&self, spans: &[Span], eased: f32) -> Vec<PropertyWrite> {
        let mut writes: Vec<PropertyWrite> = self
            .tweens
            .iter()
            .zip(spans)
            .map(|(tween, span)| PropertyWrite::new(tween.handle.clone(), tween.channel, span.sample(eased)))
            .collect();

        if let Some(custom) = &self.custom {
            for write in custom.evaluate(eased) {
                if custom.targets.iter().any(|t| *t == write.handle) {
                    writes.push(write);
                } else {
                    tracing::warn!(
                        "Step '{}' effect wrote undeclared handle '{}', ignoring",
                        self.label,
                        write.handle
                    );
                }
            }
        }

        writes
    }
}
