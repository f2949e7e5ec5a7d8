//! [`AnchorRegistry`] – detection → entity mapping and entity lifecycle.
//!
//! The registry is the only owner of [`Entity`] values.  Every entry maps a
//! tracked [`DetectionId`] to the one entity representing it in the scene,
//! and every scene mutation issued by the engine goes through here:
//!
//! - [`attach`][AnchorRegistry::attach] creates the entity, adds it to the
//!   scene and records the mapping.  Attaching a detection that already has
//!   an entity is refused; `detach` first.
//! - [`detach`][AnchorRegistry::detach] removes the mapping and discards the
//!   entity.  Idempotent.
//! - [`replace`][AnchorRegistry::replace] rebuilds a detection's entity from
//!   its latest geometry.
//!
//! Because [`Renderer::remove_from_scene`] consumes the entity and the map
//! owns it, no two entries can share an entity and no entity can be
//! discarded twice.

use std::collections::HashMap;

use dragcare_render::{Entity, EntityId, Renderer};
use dragcare_types::{AnchorError, Detection, DetectionId, EntitySpec};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::factory::EntityFactory;

/// Running totals of scene mutations issued by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegistryCounters {
    pub attached: u64,
    pub detached: u64,
}

/// Detection → entity map wrapping the rendering collaborator.
pub struct AnchorRegistry<R: Renderer> {
    renderer: R,
    entities: HashMap<DetectionId, Entity>,
    counters: RegistryCounters,
}

impl<R: Renderer> AnchorRegistry<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            entities: HashMap::new(),
            counters: RegistryCounters::default(),
        }
    }

    /// Create an entity for `detection` and add it to the scene.
    ///
    /// # Errors
    ///
    /// - [`AnchorError::AlreadyAttached`] if `detection` already has an
    ///   entity.  Nothing is mutated.
    /// - [`AnchorError::MissingMetadata`] if the factory cannot describe the
    ///   detection.
    /// - [`AnchorError::AssetUnavailable`] / [`AnchorError::Renderer`] if the
    ///   renderer cannot build the entity.  The mapping is left untouched.
    pub fn attach(
        &mut self,
        detection: &Detection,
        factory: &dyn EntityFactory,
    ) -> Result<EntityId, AnchorError> {
        let id = detection.id();
        if self.entities.contains_key(&id) {
            error!(detection = %id, "attach refused: detection already has an entity");
            return Err(AnchorError::AlreadyAttached(id));
        }
        let spec = factory.spec_for(detection)?;
        self.attach_spec(id, &spec)
    }

    /// Discard the entity of `id`, if any.
    ///
    /// Returns `true` when an entity was removed.  Detaching an unknown or
    /// already-detached detection is a no-op.
    pub fn detach(&mut self, id: DetectionId) -> bool {
        match self.entities.remove(&id) {
            Some(entity) => {
                debug!(detection = %id, entity = %entity.id(), "entity detached");
                self.renderer.remove_from_scene(entity);
                self.counters.detached += 1;
                true
            }
            None => false,
        }
    }

    /// Rebuild the entity of `detection` from its current attributes.
    ///
    /// The spec is built before the old entity is discarded, so a detection
    /// missing metadata keeps its previous visual.
    ///
    /// # Errors
    ///
    /// Same as [`AnchorRegistry::attach`], except `AlreadyAttached`.
    pub fn replace(
        &mut self,
        detection: &Detection,
        factory: &dyn EntityFactory,
    ) -> Result<EntityId, AnchorError> {
        let spec = factory.spec_for(detection)?;
        let id = detection.id();
        self.detach(id);
        self.attach_spec(id, &spec)
    }

    /// Detach every entity.  Returns how many were removed.
    pub fn detach_all(&mut self) -> usize {
        let ids: Vec<DetectionId> = self.entities.keys().copied().collect();
        ids.into_iter().filter(|id| self.detach(*id)).count()
    }

    pub fn entity_for(&self, id: DetectionId) -> Option<EntityId> {
        self.entities.get(&id).map(Entity::id)
    }

    pub fn is_attached(&self, id: DetectionId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn counters(&self) -> RegistryCounters {
        self.counters
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Detach everything and hand the renderer back.
    pub fn into_renderer(mut self) -> R {
        self.detach_all();
        self.renderer
    }

    fn attach_spec(&mut self, id: DetectionId, spec: &EntitySpec) -> Result<EntityId, AnchorError> {
        let entity = self.renderer.create_entity(spec).map_err(|e| {
            warn!(detection = %id, shape = spec.shape(), error = %e, "entity creation failed");
            AnchorError::from(e)
        })?;
        self.renderer.add_to_scene(&entity);
        let entity_id = entity.id();
        debug!(detection = %id, entity = %entity_id, shape = entity.shape(), "entity attached");
        self.entities.insert(id, entity);
        self.counters.attached += 1;
        Ok(entity_id)
    }
}

/// Fold an attach/replace result into "was the detection visualized?".
///
/// Asset and renderer failures leave the detection tracked but without an
/// entity; anything else is handed back to the caller.
pub(crate) fn visualized(result: Result<EntityId, AnchorError>) -> Result<bool, AnchorError> {
    match result {
        Ok(_) => Ok(true),
        Err(e @ (AnchorError::AssetUnavailable { .. } | AnchorError::Renderer(_))) => {
            warn!(error = %e, "detection tracked without a visual");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
