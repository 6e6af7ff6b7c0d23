// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene-object handles the sequencer animates.
//!
//! The sequencer never owns scene objects. It is handed a
//! [`SceneObjectRegistry`] at construction and only reads and writes the
//! transforms of handles that already exist in it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Mutable transform of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position (x, y, z)
    pub position: [f32; 3],
    /// Euler rotation in radians (x, y, z); yaw is `rotation[1]`
    pub rotation: [f32; 3],
    /// Whether the object is rendered
    pub visible: bool,
}

impl Transform {
    /// Visible transform at the given position with no rotation
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Set the yaw (rotation about Y)
    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.rotation[1] = yaw;
        self
    }

    /// Set visibility
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Yaw (rotation about Y)
    pub fn yaw(&self) -> f32 {
        self.rotation[1]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            visible: true,
        }
    }
}

/// A single animatable scalar of a [`Transform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// `position[0]`
    PositionX,
    /// `position[1]`
    PositionY,
    /// `position[2]`
    PositionZ,
    /// `rotation[0]`
    RotationX,
    /// `rotation[1]` (yaw)
    RotationY,
    /// `rotation[2]`
    RotationZ,
}

impl Channel {
    /// Read this channel from a transform
    pub fn get(self, transform: &Transform) -> f32 {
        match self {
            Self::PositionX => transform.position[0],
            Self::PositionY => transform.position[1],
            Self::PositionZ => transform.position[2],
            Self::RotationX => transform.rotation[0],
            Self::RotationY => transform.rotation[1],
            Self::RotationZ => transform.rotation[2],
        }
    }

    /// Write this channel on a transform
    pub fn set(self, transform: &mut Transform, value: f32) {
        match self {
            Self::PositionX => transform.position[0] = value,
            Self::PositionY => transform.position[1] = value,
            Self::PositionZ => transform.position[2] = value,
            Self::RotationX => transform.rotation[0] = value,
            Self::RotationY => transform.rotation[1] = value,
            Self::RotationZ => transform.rotation[2] = value,
        }
    }
}

/// Named transform handles owned by the rendering layer
pub trait SceneObjectRegistry {
    /// Whether a handle with this name exists
    fn contains(&self, name: &str) -> bool {
        self.transform(name).is_some()
    }

    /// Current transform of a handle
    fn transform(&self, name: &str) -> Option<&Transform>;

    /// Mutable transform of a handle
    fn transform_mut(&mut self, name: &str) -> Option<&mut Transform>;
}

/// In-memory registry keeping handles in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneGraph {
    objects: IndexMap<String, Transform>,
}

impl SceneGraph {
    /// Create an empty scene graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle, builder style
    pub fn with_object(mut self, name: impl Into<String>, transform: Transform) -> Self {
        self.insert(name, transform);
        self
    }

    /// Add or replace a handle, returning the previous transform
    pub fn insert(&mut self, name: impl Into<String>, transform: Transform) -> Option<Transform> {
        self.objects.insert(name.into(), transform)
    }

    /// Handle names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// All handles in insertion order
    pub fn objects(&self) -> impl Iterator<Item = (&str, &Transform)> {
        self.objects.iter().map(|(name, t)| (name.as_str(), t))
    }

    /// Number of handles
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the graph has no handles
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl SceneObjectRegistry for SceneGraph {
    fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    fn transform(&self, name: &str) -> Option<&Transform> {
        self.objects.get(name)
    }

    fn transform_mut(&mut self, name: &str) -> Option<&mut Transform> {
        self.objects.get_mut(name)
    }
}
