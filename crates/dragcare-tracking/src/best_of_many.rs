//! [`BestOfManyTracker`] – keeps the largest plane of a category visualized.
//!
//! Every live plane of the tracked classification sits in an
//! insertion-ordered candidate pool.  The winner is the candidate with the
//! largest `width × height`; on ties the earliest-pooled candidate wins.
//!
//! # When the winner is recomputed
//!
//! | Event | Recomputation |
//! |---|---|
//! | add, candidate strictly larger than the winner (or no winner) | immediate |
//! | add, otherwise | none, pool only |
//! | update of a pooled candidate | through the [`RateLimiter`] |
//! | remove of the winner | immediate |
//! | remove of another candidate | none, pool only |
//!
//! Immediate recomputations also restart the limiter window, so a burst of
//! refinements right after a winner change does not cause a second sweep.
//!
//! A sweep that keeps the same winner does not touch the scene.  The one
//! exception is a winner that is still unvisualized (its asset failed, or it
//! had no geometry yet): the sweep retries the attach.
//!
//! The tracker only detaches entities it attached itself.  A winner whose id
//! already has an entity in the registry is reported as
//! [`AnchorError::AlreadyAttached`] and stays selected without a visual.

use std::sync::Arc;

use dragcare_render::Renderer;
use dragcare_types::{AnchorError, Detection, DetectionId};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::factory::EntityFactory;
use crate::outcome::TrackerOutcome;
use crate::rate_limiter::{Clock, RateLimiter, SystemClock};
use crate::registry::{visualized, AnchorRegistry};

pub struct BestOfManyTracker {
    selection: Selection,
    limiter: RateLimiter,
    factory: Box<dyn EntityFactory>,
}

/// Candidate pool plus current winner.
#[derive(Debug, Default)]
struct Selection {
    pool: IndexMap<DetectionId, Detection>,
    winner: Option<DetectionId>,
    /// The winner's entity was attached by this tracker.  Only then may the
    /// tracker detach it.
    owns_visual: bool,
}

fn area(detection: &Detection) -> f32 {
    match detection {
        Detection::Planar(plane) => plane.area(),
        _ => 0.0,
    }
}

impl Selection {
    fn winner_area(&self) -> Option<f32> {
        self.winner.and_then(|id| self.pool.get(&id)).map(area)
    }

    /// Largest candidate; the first one encountered wins ties.
    fn best(&self) -> Option<DetectionId> {
        let mut best: Option<(DetectionId, f32)> = None;
        for (id, candidate) in &self.pool {
            let a = area(candidate);
            if best.is_none_or(|(_, best_area)| a > best_area) {
                best = Some((*id, a));
            }
        }
        best.map(|(id, _)| id)
    }

    /// # Errors
    ///
    /// [`AnchorError::AlreadyAttached`] when the new winner's id already owns
    /// an entity elsewhere.  The winner is still recorded, without a visual.
    fn sweep<R: Renderer>(
        &mut self,
        registry: &mut AnchorRegistry<R>,
        factory: &dyn EntityFactory,
    ) -> Result<TrackerOutcome, AnchorError> {
        let best = self.best();

        if best == self.winner {
            let visualized = match best {
                None => true,
                Some(_) if self.owns_visual => true,
                // Entity belongs to another tracker.
                Some(id) if registry.is_attached(id) => false,
                Some(id) => self.visualize(id, registry, factory)?,
            };
            return Ok(TrackerOutcome::Unchanged { visualized });
        }

        let previous = self.winner.take();
        let owned = std::mem::take(&mut self.owns_visual);
        if let Some(old) = previous
            && owned
        {
            registry.detach(old);
        }
        self.winner = best;
        info!(
            previous = ?previous.map(|id| id.to_string()),
            current = ?best.map(|id| id.to_string()),
            pool = self.pool.len(),
            "plane winner changed"
        );
        let visualized = match best {
            Some(id) => self.visualize(id, registry, factory)?,
            None => false,
        };
        Ok(TrackerOutcome::WinnerChanged {
            previous,
            current: best,
            visualized,
        })
    }

    fn visualize<R: Renderer>(
        &mut self,
        id: DetectionId,
        registry: &mut AnchorRegistry<R>,
        factory: &dyn EntityFactory,
    ) -> Result<bool, AnchorError> {
        let Some(candidate) = self.pool.get(&id) else {
            return Ok(false);
        };
        let shown = match visualized(registry.attach(candidate, factory)) {
            Ok(shown) => shown,
            Err(e @ AnchorError::MissingMetadata { .. }) => {
                debug!(detection = %id, error = %e, "winner has no visual yet");
                false
            }
            Err(e) => return Err(e),
        };
        self.owns_visual = shown;
        Ok(shown)
    }
}

impl BestOfManyTracker {
    /// Tracker whose rate-limited sweeps are spaced by `min_interval` on the
    /// system clock.
    pub fn new(factory: Box<dyn EntityFactory>, min_interval: std::time::Duration) -> Self {
        Self::with_clock(factory, min_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(
        factory: Box<dyn EntityFactory>,
        min_interval: std::time::Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            selection: Selection::default(),
            limiter: RateLimiter::with_clock(min_interval, clock),
            factory,
        }
    }

    pub fn winner(&self) -> Option<DetectionId> {
        self.selection.winner
    }

    pub fn contains(&self, id: DetectionId) -> bool {
        self.selection.pool.contains_key(&id)
    }

    pub fn pool_len(&self) -> usize {
        self.selection.pool.len()
    }

    /// Pool the candidate; recompute at once if it beats the current winner.
    ///
    /// A repeated add of a pooled candidate refreshes its data in place.
    pub fn on_added<R: Renderer>(
        &mut self,
        detection: &Detection,
        registry: &mut AnchorRegistry<R>,
    ) -> Result<TrackerOutcome, AnchorError> {
        let Detection::Planar(_) = detection else {
            return Ok(TrackerOutcome::Ignored);
        };
        let id = detection.id();
        let candidate_area = area(detection);
        self.selection.pool.insert(id, detection.clone());

        let beats_winner = match self.selection.winner_area() {
            None => true,
            Some(winner_area) => candidate_area > winner_area,
        };
        if !beats_winner {
            debug!(detection = %id, area = candidate_area, "plane pooled");
            return Ok(TrackerOutcome::PoolUpdated);
        }
        let factory = self.factory.as_ref();
        let selection = &mut self.selection;
        self.limiter.force(|| selection.sweep(registry, factory))
    }

    /// Refresh a pooled candidate and run a rate-limited sweep.
    pub fn on_updated<R: Renderer>(
        &mut self,
        detection: &Detection,
        registry: &mut AnchorRegistry<R>,
    ) -> Result<TrackerOutcome, AnchorError> {
        let id = detection.id();
        let Some(slot) = self.selection.pool.get_mut(&id) else {
            debug!(detection = %id, "update for unpooled plane ignored");
            return Ok(TrackerOutcome::Ignored);
        };
        *slot = detection.clone();

        let factory = self.factory.as_ref();
        let selection = &mut self.selection;
        self.limiter
            .attempt(|| selection.sweep(registry, factory))
            .unwrap_or(Ok(TrackerOutcome::Deferred))
    }

    /// Drop a candidate; recompute at once if it was the winner.
    pub fn on_removed<R: Renderer>(
        &mut self,
        detection: &Detection,
        registry: &mut AnchorRegistry<R>,
    ) -> Result<TrackerOutcome, AnchorError> {
        let id = detection.id();
        if self.selection.pool.shift_remove(&id).is_none() {
            return Ok(TrackerOutcome::Ignored);
        }
        if self.selection.winner != Some(id) {
            return Ok(TrackerOutcome::PoolUpdated);
        }
        let factory = self.factory.as_ref();
        let selection = &mut self.selection;
        self.limiter.force(|| selection.sweep(registry, factory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use dragcare_render::{SceneCommand, SimRenderer};
    use dragcare_types::{
        Color, EntitySpec, Extent, PlanarDetection, PlaneClassification, PlaneGeometry,
    };

    use crate::factory::{FloorVisual, FloorVisualFactory};
    use crate::rate_limiter::ManualClock;

    const WINDOW: Duration = Duration::from_millis(500);

    fn floor(width: f32, height: f32) -> Detection {
        Detection::Planar(PlanarDetection {
            id: DetectionId::new(),
            classification: PlaneClassification::Floor,
            extent: Extent::new(width, height),
            geometry: PlaneGeometry::default(),
        })
    }

    fn resized(detection: &Detection, width: f32, height: f32) -> Detection {
        let mut out = detection.clone();
        if let Detection::Planar(plane) = &mut out {
            plane.extent = Extent::new(width, height);
        }
        out
    }

    fn setup() -> (BestOfManyTracker, AnchorRegistry<SimRenderer>, ManualClock) {
        let clock = ManualClock::new();
        let tracker = BestOfManyTracker::with_clock(
            Box::new(FloorVisualFactory::default()),
            WINDOW,
            Arc::new(clock.clone()),
        );
        (tracker, AnchorRegistry::new(SimRenderer::new()), clock)
    }

    #[test]
    fn largest_candidate_wins() {
        let (mut tracker, mut registry, _clock) = setup();
        let (a, b, c) = (floor(1.0, 2.0), floor(1.0, 5.0), floor(1.0, 3.0));

        for d in [&a, &b, &c] {
            tracker.on_added(d, &mut registry).unwrap();
        }

        assert_eq!(tracker.winner(), Some(b.id()));
        assert_eq!(registry.len(), 1);
        assert!(registry.is_attached(b.id()));
        assert_eq!(tracker.pool_len(), 3);
    }

    #[test]
    fn removing_winner_promotes_next_largest() {
        let (mut tracker, mut registry, _clock) = setup();
        let (a, b, c) = (floor(1.0, 2.0), floor(1.0, 5.0), floor(1.0, 3.0));
        for d in [&a, &b, &c] {
            tracker.on_added(d, &mut registry).unwrap();
        }

        let outcome = tracker.on_removed(&b, &mut registry).unwrap();

        assert_eq!(
            outcome,
            TrackerOutcome::WinnerChanged {
                previous: Some(b.id()),
                current: Some(c.id()),
                visualized: true,
            }
        );
        assert!(registry.is_attached(c.id()));
        assert!(!registry.is_attached(b.id()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn removing_winner_bypasses_rate_limit() {
        let (mut tracker, mut registry, _clock) = setup();
        let (a, b) = (floor(1.0, 1.0), floor(2.0, 2.0));
        tracker.on_added(&a, &mut registry).unwrap();
        tracker.on_added(&b, &mut registry).unwrap();

        // Same instant as the last sweep: an update would be deferred, the
        // removal is not.
        tracker.on_removed(&b, &mut registry).unwrap();
        assert_eq!(tracker.winner(), Some(a.id()));
    }

    #[test]
    fn smaller_or_equal_add_only_pools() {
        let (mut tracker, mut registry, _clock) = setup();
        let a = floor(2.0, 2.0);
        tracker.on_added(&a, &mut registry).unwrap();

        assert_eq!(
            tracker.on_added(&floor(1.0, 1.0), &mut registry),
            Ok(TrackerOutcome::PoolUpdated)
        );
        assert_eq!(
            tracker.on_added(&floor(4.0, 1.0), &mut registry),
            Ok(TrackerOutcome::PoolUpdated)
        );
        assert_eq!(tracker.winner(), Some(a.id()));
        assert_eq!(registry.renderer().created_specs().len(), 1);
    }

    #[test]
    fn removing_non_winner_only_pools() {
        let (mut tracker, mut registry, _clock) = setup();
        let (a, b) = (floor(2.0, 2.0), floor(1.0, 1.0));
        tracker.on_added(&a, &mut registry).unwrap();
        tracker.on_added(&b, &mut registry).unwrap();

        assert_eq!(tracker.on_removed(&b, &mut registry), Ok(TrackerOutcome::PoolUpdated));
        assert_eq!(tracker.on_removed(&b, &mut registry), Ok(TrackerOutcome::Ignored));
        assert_eq!(tracker.pool_len(), 1);
    }

    #[test]
    fn last_removal_clears_winner_and_scene() {
        let (mut tracker, mut registry, _clock) = setup();
        let a = floor(2.0, 2.0);
        tracker.on_added(&a, &mut registry).unwrap();

        let outcome = tracker.on_removed(&a, &mut registry).unwrap();

        assert_eq!(
            outcome,
            TrackerOutcome::WinnerChanged { previous: Some(a.id()), current: None, visualized: false }
        );
        assert_eq!(tracker.winner(), None);
        assert!(registry.is_empty());
        assert!(registry.renderer().live_entities().is_empty());
    }

    #[test]
    fn growth_switches_winner_only_after_window() {
        let (mut tracker, mut registry, clock) = setup();
        let p1 = floor(2.0, 2.0);
        let p2 = floor(3.0, 3.0);
        tracker.on_added(&p1, &mut registry).unwrap();
        tracker.on_added(&p2, &mut registry).unwrap();
        assert_eq!(tracker.winner(), Some(p2.id()));

        clock.advance(Duration::from_millis(100));
        let grown = resized(&p1, 4.0, 5.0);
        assert_eq!(tracker.on_updated(&grown, &mut registry), Ok(TrackerOutcome::Deferred));
        assert_eq!(tracker.winner(), Some(p2.id()));

        clock.advance(WINDOW);
        let outcome = tracker.on_updated(&grown, &mut registry).unwrap();
        assert_eq!(
            outcome,
            TrackerOutcome::WinnerChanged {
                previous: Some(p2.id()),
                current: Some(p1.id()),
                visualized: true,
            }
        );
    }

    #[test]
    fn sweep_with_same_winner_does_not_touch_scene() {
        let (mut tracker, mut registry, clock) = setup();
        let a = floor(2.0, 2.0);
        tracker.on_added(&a, &mut registry).unwrap();
        let commands = registry.renderer().commands().len();

        clock.advance(WINDOW * 2);
        assert_eq!(
            tracker.on_updated(&resized(&a, 3.0, 3.0), &mut registry),
            Ok(TrackerOutcome::Unchanged { visualized: true })
        );
        assert_eq!(registry.renderer().commands().len(), commands);
    }

    #[test]
    fn ties_go_to_the_earliest_candidate() {
        let (mut tracker, mut registry, clock) = setup();
        let a = floor(1.0, 1.0);
        let b = floor(2.0, 2.0);
        let c = floor(2.0, 2.0);
        for d in [&a, &b, &c] {
            tracker.on_added(d, &mut registry).unwrap();
        }
        assert_eq!(tracker.winner(), Some(b.id()));

        // `a` grows to tie with `b`; `a` was pooled first.
        clock.advance(WINDOW * 2);
        tracker.on_updated(&resized(&a, 4.0, 1.0), &mut registry).unwrap();
        assert_eq!(tracker.winner(), Some(a.id()));
    }

    #[test]
    fn duplicate_add_does_not_duplicate_pool_entry() {
        let (mut tracker, mut registry, _clock) = setup();
        let a = floor(2.0, 2.0);
        tracker.on_added(&a, &mut registry).unwrap();
        tracker.on_added(&a, &mut registry).unwrap();
        assert_eq!(tracker.pool_len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn update_for_unknown_plane_is_ignored() {
        let (mut tracker, mut registry, _clock) = setup();
        assert_eq!(
            tracker.on_updated(&floor(1.0, 1.0), &mut registry),
            Ok(TrackerOutcome::Ignored)
        );
        assert_eq!(tracker.pool_len(), 0);
    }

    #[test]
    fn unvisualized_winner_is_retried_on_later_sweep() {
        let clock = ManualClock::new();
        let mut tracker = BestOfManyTracker::with_clock(
            Box::new(FloorVisualFactory::new(FloorVisual::Mesh { color: Color::WHITE })),
            WINDOW,
            Arc::new(clock.clone()),
        );
        let mut registry = AnchorRegistry::new(SimRenderer::new());
        let a = floor(2.0, 2.0);

        let outcome = tracker.on_added(&a, &mut registry).unwrap();
        assert!(!outcome.is_visualized());
        assert_eq!(tracker.winner(), Some(a.id()));
        assert!(registry.is_empty());

        let mut meshed = a.clone();
        if let Detection::Planar(plane) = &mut meshed {
            plane.geometry = PlaneGeometry {
                vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
                triangle_indices: vec![0, 1, 2],
                texture_coordinates: Vec::new(),
            };
        }
        clock.advance(WINDOW * 2);
        tracker.on_updated(&meshed, &mut registry).unwrap();

        assert!(registry.is_attached(a.id()));
        assert!(matches!(
            registry.renderer().commands()[0],
            SceneCommand::Create { spec: EntitySpec::Mesh { .. }, .. }
        ));
    }

    #[test]
    fn failed_retry_reports_unvisualized_winner() {
        let clock = ManualClock::new();
        let mut tracker = BestOfManyTracker::with_clock(
            Box::new(FloorVisualFactory::new(FloorVisual::Mesh { color: Color::WHITE })),
            WINDOW,
            Arc::new(clock.clone()),
        );
        let mut registry = AnchorRegistry::new(SimRenderer::new());
        let a = floor(2.0, 2.0);
        tracker.on_added(&a, &mut registry).unwrap();

        clock.advance(WINDOW * 2);
        let outcome = tracker.on_updated(&resized(&a, 3.0, 3.0), &mut registry);

        assert_eq!(outcome, Ok(TrackerOutcome::Unchanged { visualized: false }));
        assert!(registry.is_empty());
    }

    #[test]
    fn winner_with_foreign_entity_is_reported_and_never_detached() {
        let (mut tracker, mut registry, _clock) = setup();
        let a = floor(2.0, 2.0);
        let marker = |_: &Detection| -> Result<EntitySpec, AnchorError> {
            Ok(EntitySpec::Sphere { radius: 0.3, color: Color::WHITE })
        };
        let foreign = registry.attach(&a, &marker).unwrap();

        assert_eq!(
            tracker.on_added(&a, &mut registry),
            Err(AnchorError::AlreadyAttached(a.id()))
        );
        assert_eq!(tracker.winner(), Some(a.id()));

        let outcome = tracker.on_removed(&a, &mut registry).unwrap();
        assert_eq!(
            outcome,
            TrackerOutcome::WinnerChanged { previous: Some(a.id()), current: None, visualized: false }
        );
        assert_eq!(registry.entity_for(a.id()), Some(foreign));
        assert_eq!(registry.renderer().removed_count(), 0);
    }

    #[test]
    fn non_planar_add_is_ignored() {
        let (mut tracker, mut registry, _clock) = setup();
        let other = Detection::Other { id: DetectionId::new() };
        assert_eq!(tracker.on_added(&other, &mut registry), Ok(TrackerOutcome::Ignored));
        assert_eq!(tracker.pool_len(), 0);
    }
}
