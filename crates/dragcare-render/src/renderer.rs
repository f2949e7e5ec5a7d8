//! Generic `Renderer` trait for scene backends.
//!
//! Backends implement this trait and are handed to the
//! `AnchorRegistry`, which is the only caller.  The engine only ever talks to
//! the trait, so a RealityKit bridge, a wgpu scene or the
//! [`SimRenderer`][crate::sim::SimRenderer] can be swapped freely.

use std::fmt;

use dragcare_types::{AnchorError, EntitySpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend-assigned identifier of a live entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// A visual placeholder created by a [`Renderer`].
///
/// Neither `Clone` nor `Copy`: an entity has exactly one owner,
/// and [`Renderer::remove_from_scene`] consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    shape: &'static str,
}

impl Entity {
    /// Wrap a backend handle.  Only renderers should call this.
    pub fn new(id: EntityId, shape: &'static str) -> Self {
        Self { id, shape }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Shape of the spec this entity was built from (`"plane"`, `"mesh"`, …).
    pub fn shape(&self) -> &'static str {
        self.shape
    }
}

/// Failures reported by a [`Renderer`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("asset '{name}' could not be loaded: {details}")]
    AssetUnavailable { name: String, details: String },

    #[error("invalid entity spec: {0}")]
    InvalidSpec(String),
}

impl From<RenderError> for AnchorError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::AssetUnavailable { name, details } => {
                AnchorError::AssetUnavailable { name, details }
            }
            RenderError::InvalidSpec(details) => AnchorError::Renderer(details),
        }
    }
}

/// A scene backend.
///
/// # Contract
///
/// * `create_entity` – build an entity from `spec`.  Failing to load an
///   asset is reported, never panicked on.
/// * `add_to_scene` / `remove_from_scene` – fire-and-forget scene mutations.
///   `remove_from_scene` takes ownership, so an entity cannot be removed
///   twice.
pub trait Renderer {
    /// Build a new entity from `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::AssetUnavailable`] when a named asset cannot be
    /// loaded and [`RenderError::InvalidSpec`] when the spec cannot be built.
    fn create_entity(&mut self, spec: &EntitySpec) -> Result<Entity, RenderError>;

    /// Insert `entity` into the visible scene.
    fn add_to_scene(&mut self, entity: &Entity);

    /// Remove `entity` from the scene and discard it.
    fn remove_from_scene(&mut self, entity: Entity);
}
