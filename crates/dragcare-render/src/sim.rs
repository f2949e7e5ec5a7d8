//! In-process renderer for tests, CI and scenario replay.
//!
//! [`SimRenderer`] implements [`Renderer`] without any graphics.  It hands
//! out sequential [`EntityId`]s, keeps track of which entities are in the
//! scene, and records every call as a [`SceneCommand`] so callers can assert
//! on the exact sequence of scene mutations.
//!
//! # Stub behaviour
//!
//! | Spec | Behaviour |
//! |---|---|
//! | `Plane` | Fails with `InvalidSpec` unless width and height are positive. |
//! | `Sphere` | Fails with `InvalidSpec` unless the radius is positive. |
//! | `Mesh` | Always succeeds; empty geometry is accepted. |
//! | `Asset` | Succeeds only for names registered in the [`AssetLibrary`]. |
//!
//! # Example
//!
//! ```rust
//! use dragcare_render::{Renderer, SimRenderer};
//! use dragcare_types::{Color, EntitySpec};
//!
//! let mut renderer = SimRenderer::new();
//! let entity = renderer
//!     .create_entity(&EntitySpec::Sphere { radius: 0.1, color: Color::ORANGE })
//!     .unwrap();
//! renderer.add_to_scene(&entity);
//! assert_eq!(renderer.live_entities().len(), 1);
//! renderer.remove_from_scene(entity);
//! assert!(renderer.live_entities().is_empty());
//! ```

use std::collections::BTreeMap;

use dragcare_types::EntitySpec;
use serde::Serialize;
use tracing::warn;

use crate::assets::AssetLibrary;
use crate::renderer::{Entity, EntityId, RenderError, Renderer};

/// One recorded call on a [`SimRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SceneCommand {
    Create { entity: EntityId, spec: EntitySpec },
    Add { entity: EntityId },
    Remove { entity: EntityId },
}

/// Recording renderer.  See the module docs.
#[derive(Debug, Default)]
pub struct SimRenderer {
    assets: AssetLibrary,
    next_id: u64,
    live: BTreeMap<EntityId, &'static str>,
    commands: Vec<SceneCommand>,
}

impl SimRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a renderer that can load the assets in `assets`.
    pub fn with_assets(assets: AssetLibrary) -> Self {
        Self {
            assets,
            ..Self::default()
        }
    }

    pub fn assets(&self) -> &AssetLibrary {
        &self.assets
    }

    /// Entities currently in the scene, keyed by id, with their shape.
    pub fn live_entities(&self) -> &BTreeMap<EntityId, &'static str> {
        &self.live
    }

    pub fn commands(&self) -> &[SceneCommand] {
        &self.commands
    }

    /// Drain the recorded commands.
    pub fn take_commands(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Specs of every `Create` command recorded so far, in order.
    pub fn created_specs(&self) -> Vec<&EntitySpec> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                SceneCommand::Create { spec, .. } => Some(spec),
                _ => None,
            })
            .collect()
    }

    /// Number of `Remove` commands recorded so far.
    pub fn removed_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, SceneCommand::Remove { .. }))
            .count()
    }

    fn validate(&self, spec: &EntitySpec) -> Result<(), RenderError> {
        match spec {
            EntitySpec::Plane { width, height, .. } if *width <= 0.0 || *height <= 0.0 => {
                Err(RenderError::InvalidSpec(format!(
                    "plane must have positive size, got {width}x{height}"
                )))
            }
            EntitySpec::Sphere { radius, .. } if *radius <= 0.0 => Err(RenderError::InvalidSpec(
                format!("sphere must have positive radius, got {radius}"),
            )),
            EntitySpec::Asset { name } => self.assets.load(name).map(|_| ()),
            _ => Ok(()),
        }
    }
}

impl Renderer for SimRenderer {
    fn create_entity(&mut self, spec: &EntitySpec) -> Result<Entity, RenderError> {
        self.validate(spec)?;
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.commands.push(SceneCommand::Create {
            entity: id,
            spec: spec.clone(),
        });
        Ok(Entity::new(id, spec.shape()))
    }

    fn add_to_scene(&mut self, entity: &Entity) {
        if self.live.insert(entity.id(), entity.shape()).is_some() {
            warn!(entity = %entity.id(), "entity added to scene twice");
        }
        self.commands.push(SceneCommand::Add { entity: entity.id() });
    }

    fn remove_from_scene(&mut self, entity: Entity) {
        if self.live.remove(&entity.id()).is_none() {
            warn!(entity = %entity.id(), "removed entity was not in the scene");
        }
        self.commands.push(SceneCommand::Remove { entity: entity.id() });
    }
}
