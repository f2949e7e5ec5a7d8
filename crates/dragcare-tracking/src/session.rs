//! [`Session`] – session-scoped context and perception event dispatcher.
//!
//! A session is created when the perception system starts running and ended
//! when it stops.  It owns the [`AnchorRegistry`] (and through it the
//! renderer) plus one tracker per category, and is the single entry point for
//! perception callbacks:
//!
//! - [`Session::on_detections_added`]
//! - [`Session::on_detections_updated`]
//! - [`Session::on_detections_removed`]
//!
//! # Routing
//!
//! | Detection | Tracker |
//! |---|---|
//! | `Image` | [`SingleSlotTracker`] |
//! | `Planar` with the tracked classification | [`BestOfManyTracker`] |
//! | anything else | ignored |
//!
//! A plane can be reclassified by the perception system.  An add or update
//! that moves a pooled plane out of the tracked classification evicts it; an
//! update that moves an unknown plane into it pools it.  Plane removals are
//! always forwarded, whatever their last classification.
//!
//! Batches are processed in order.  A failing event is logged and counted and
//! the rest of the batch continues.
//!
//! # Example
//!
//! ```rust
//! use dragcare_render::SimRenderer;
//! use dragcare_tracking::{Session, TrackingConfig};
//! use dragcare_types::{Detection, DetectionId, Extent, PlanarDetection, PlaneClassification};
//!
//! let mut session = Session::start(TrackingConfig::default(), SimRenderer::new());
//! let floor = Detection::Planar(PlanarDetection {
//!     id: DetectionId::new(),
//!     classification: PlaneClassification::Floor,
//!     extent: Extent::new(2.0, 3.0),
//!     geometry: Default::default(),
//! });
//!
//! session.on_detections_added(&[floor.clone()]);
//! assert_eq!(session.floor_winner(), Some(floor.id()));
//!
//! let (report, renderer) = session.end();
//! assert_eq!(report.stats.attached, 1);
//! assert!(renderer.live_entities().is_empty());
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dragcare_render::Renderer;
use dragcare_types::{AnchorError, Detection, DetectionId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::best_of_many::BestOfManyTracker;
use crate::config::TrackingConfig;
use crate::factory::{FloorVisualFactory, ImageOverlayFactory};
use crate::outcome::TrackerOutcome;
use crate::rate_limiter::{Clock, SystemClock};
use crate::registry::AnchorRegistry;
use crate::single_slot::SingleSlotTracker;

/// Which perception callback delivered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Added,
    Updated,
    Removed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Added => "added",
            EventKind::Updated => "updated",
            EventKind::Removed => "removed",
        })
    }
}

/// Counters accumulated over a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionStats {
    /// Every detection delivered, across all batches.
    pub events: u64,
    /// Detections no tracker cared about.
    pub ignored: u64,
    /// Events dropped because of missing metadata.
    pub skipped: u64,
    /// Registry contract violations observed.
    pub invariant_violations: u64,
    /// Winners tracked without a visual (asset or renderer failure).
    pub unvisualized: u64,
    pub winner_changes: u64,
    pub refreshes: u64,
    pub deferred_recomputations: u64,
    /// Entities created and added to the scene.
    pub attached: u64,
    /// Entities removed from the scene.
    pub detached: u64,
}

/// Summary returned by [`Session::end`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub stats: SessionStats,
}

/// Session-scoped tracking context.  See the module docs.
pub struct Session<R: Renderer> {
    config: TrackingConfig,
    registry: AnchorRegistry<R>,
    images: SingleSlotTracker,
    planes: BestOfManyTracker,
    stats: SessionStats,
    started_at: DateTime<Utc>,
}

impl<R: Renderer> Session<R> {
    /// Start a session with an empty tracked set, timed by the system clock.
    pub fn start(config: TrackingConfig, renderer: R) -> Self {
        Self::with_clock(config, renderer, Arc::new(SystemClock))
    }

    /// Start a session whose plane recomputations are timed by `clock`.
    pub fn with_clock(config: TrackingConfig, renderer: R, clock: Arc<dyn Clock>) -> Self {
        let images = SingleSlotTracker::new(Box::new(ImageOverlayFactory {
            color: config.image_overlay_color,
        }));
        let planes = BestOfManyTracker::with_clock(
            Box::new(FloorVisualFactory::new(config.floor_visual.clone())),
            config.plane_recompute_interval(),
            clock,
        );
        info!(
            plane = %config.tracked_plane_classification,
            interval_ms = config.plane_recompute_interval_ms,
            "tracking session started"
        );
        Self {
            config,
            registry: AnchorRegistry::new(renderer),
            images,
            planes,
            stats: SessionStats::default(),
            started_at: Utc::now(),
        }
    }

    pub fn on_detections_added(&mut self, batch: &[Detection]) {
        self.dispatch(EventKind::Added, batch);
    }

    pub fn on_detections_updated(&mut self, batch: &[Detection]) {
        self.dispatch(EventKind::Updated, batch);
    }

    pub fn on_detections_removed(&mut self, batch: &[Detection]) {
        self.dispatch(EventKind::Removed, batch);
    }

    /// Route every detection in `batch`, in order.
    pub fn dispatch(&mut self, kind: EventKind, batch: &[Detection]) {
        debug!(%kind, size = batch.len(), "batch received");
        for detection in batch {
            self.stats.events += 1;
            let result = self.route(kind, detection);
            self.record(kind, detection, result);
        }
        self.sync_counters();
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Currently tracked image, if any.
    pub fn image_winner(&self) -> Option<DetectionId> {
        self.images.winner()
    }

    /// Currently selected plane, if any.
    pub fn floor_winner(&self) -> Option<DetectionId> {
        self.planes.winner()
    }

    /// Number of live planes of the tracked classification.
    pub fn plane_candidates(&self) -> usize {
        self.planes.pool_len()
    }

    pub fn registry(&self) -> &AnchorRegistry<R> {
        &self.registry
    }

    pub fn renderer(&self) -> &R {
        self.registry.renderer()
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        self.registry.renderer_mut()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Tear the session down: every entity leaves the scene and the renderer
    /// is handed back.
    pub fn end(mut self) -> (SessionReport, R) {
        let removed = self.registry.detach_all();
        self.sync_counters();
        let report = SessionReport {
            started_at: self.started_at,
            ended_at: Utc::now(),
            stats: self.stats,
        };
        info!(removed, events = report.stats.events, "tracking session ended");
        (report, self.registry.into_renderer())
    }

    fn route(&mut self, kind: EventKind, detection: &Detection) -> Result<TrackerOutcome, AnchorError> {
        let registry = &mut self.registry;
        match detection {
            Detection::Image(_) => match kind {
                EventKind::Added => self.images.on_added(detection, registry),
                EventKind::Updated => self.images.on_updated(detection, registry),
                EventKind::Removed => self.images.on_removed(detection, registry),
            },
            Detection::Planar(plane) => {
                let tracked = plane.classification == self.config.tracked_plane_classification;
                let pooled = self.planes.contains(plane.id);
                match (kind, tracked, pooled) {
                    (EventKind::Removed, _, _) => self.planes.on_removed(detection, registry),
                    (EventKind::Added, true, _) => self.planes.on_added(detection, registry),
                    (EventKind::Updated, true, true) => self.planes.on_updated(detection, registry),
                    (EventKind::Updated, true, false) => {
                        debug!(detection = %plane.id, "plane reclassified into tracked category");
                        self.planes.on_added(detection, registry)
                    }
                    (EventKind::Added | EventKind::Updated, false, true) => {
                        debug!(
                            detection = %plane.id,
                            classification = %plane.classification,
                            "plane reclassified out of tracked category"
                        );
                        self.planes.on_removed(detection, registry)
                    }
                    (EventKind::Added | EventKind::Updated, false, false) => {
                        Ok(TrackerOutcome::Ignored)
                    }
                }
            }
            Detection::Other { .. } => Ok(TrackerOutcome::Ignored),
        }
    }

    fn record(
        &mut self,
        kind: EventKind,
        detection: &Detection,
        result: Result<TrackerOutcome, AnchorError>,
    ) {
        let id = detection.id();
        match result {
            Ok(outcome) => {
                trace!(%kind, detection = %id, ?outcome, "event handled");
                if !outcome.is_visualized() {
                    self.stats.unvisualized += 1;
                }
                match outcome {
                    TrackerOutcome::Ignored => self.stats.ignored += 1,
                    TrackerOutcome::Adopted { .. }
                    | TrackerOutcome::Released
                    | TrackerOutcome::WinnerChanged { .. } => self.stats.winner_changes += 1,
                    TrackerOutcome::Refreshed { .. } => self.stats.refreshes += 1,
                    TrackerOutcome::Deferred => self.stats.deferred_recomputations += 1,
                    TrackerOutcome::PoolUpdated | TrackerOutcome::Unchanged { .. } => {}
                }
            }
            Err(e) if e.is_invariant_violation() => {
                self.stats.invariant_violations += 1;
                error!(
                    %kind,
                    detection = %id,
                    detection_kind = detection.kind(),
                    error = %e,
                    "registry contract violation"
                );
            }
            Err(e) => {
                self.stats.skipped += 1;
                warn!(%kind, detection = %id, error = %e, "event skipped");
            }
        }
    }

    fn sync_counters(&mut self) {
        let counters = self.registry.counters();
        self.stats.attached = counters.attached;
        self.stats.detached = counters.detached;
    }
}
