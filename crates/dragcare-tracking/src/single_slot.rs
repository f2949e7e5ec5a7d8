//! [`SingleSlotTracker`] – first-detected-wins tracking for image detections.
//!
//! Two states: **Empty** and **Tracking**.  The first detection added while
//! Empty becomes the winner and stays the winner until it is removed; a
//! second simultaneous detection of the same category is never promoted.
//!
//! | Event | Empty | Tracking(winner) |
//! |---|---|---|
//! | add(d) | attach d → Tracking(d) | ignored |
//! | update(d) | ignored | replace if d = winner, else ignored |
//! | remove(d) | ignored | detach → Empty if d = winner, else ignored |
//!
//! A detection whose visual cannot be described (missing metadata) is not
//! adopted.  A detection whose asset fails to load is adopted without an
//! entity.

use dragcare_render::Renderer;
use dragcare_types::{AnchorError, Detection, DetectionId};
use tracing::{debug, info};

use crate::factory::EntityFactory;
use crate::outcome::TrackerOutcome;
use crate::registry::{visualized, AnchorRegistry};

pub struct SingleSlotTracker {
    winner: Option<DetectionId>,
    factory: Box<dyn EntityFactory>,
}

impl SingleSlotTracker {
    pub fn new(factory: Box<dyn EntityFactory>) -> Self {
        Self {
            winner: None,
            factory,
        }
    }

    pub fn winner(&self) -> Option<DetectionId> {
        self.winner
    }

    pub fn is_tracking(&self) -> bool {
        self.winner.is_some()
    }

    /// # Errors
    ///
    /// Returns the registry error when the detection could not be adopted
    /// (missing metadata, or an invariant violation).  The slot is unchanged.
    pub fn on_added<R: Renderer>(
        &mut self,
        detection: &Detection,
        registry: &mut AnchorRegistry<R>,
    ) -> Result<TrackerOutcome, AnchorError> {
        let id = detection.id();
        if let Some(current) = self.winner {
            debug!(detection = %id, winner = %current, "slot occupied, add ignored");
            return Ok(TrackerOutcome::Ignored);
        }
        let visualized = visualized(registry.attach(detection, self.factory.as_ref()))?;
        self.winner = Some(id);
        info!(detection = %id, visualized, "image tracked");
        Ok(TrackerOutcome::Adopted { visualized })
    }

    /// # Errors
    ///
    /// Returns [`AnchorError::MissingMetadata`] when the refreshed visual
    /// cannot be described; the previous entity is kept.
    pub fn on_updated<R: Renderer>(
        &mut self,
        detection: &Detection,
        registry: &mut AnchorRegistry<R>,
    ) -> Result<TrackerOutcome, AnchorError> {
        if self.winner != Some(detection.id()) {
            return Ok(TrackerOutcome::Ignored);
        }
        let visualized = visualized(registry.replace(detection, self.factory.as_ref()))?;
        Ok(TrackerOutcome::Refreshed { visualized })
    }

    pub fn on_removed<R: Renderer>(
        &mut self,
        detection: &Detection,
        registry: &mut AnchorRegistry<R>,
    ) -> Result<TrackerOutcome, AnchorError> {
        let id = detection.id();
        if self.winner != Some(id) {
            debug!(detection = %id, "removal of untracked image ignored");
            return Ok(TrackerOutcome::Ignored);
        }
        registry.detach(id);
        self.winner = None;
        info!(detection = %id, "image released");
        Ok(TrackerOutcome::Released)
    }
}
