//! `dragcare-tracking` – the spatial-anchor tracking engine.
//!
//! Consumes detection events from a perception system, selects at most one
//! winner per tracked category, and keeps exactly one scene entity attached
//! to each visualized winner.
//!
//! # Modules
//!
//! - [`rate_limiter`] – [`RateLimiter`][rate_limiter::RateLimiter]: pull-based
//!   minimum-interval guard, plus the [`Clock`][rate_limiter::Clock] it reads.
//! - [`registry`] – [`AnchorRegistry`][registry::AnchorRegistry]: detection →
//!   entity map; owns every entity and issues all scene mutations.
//! - [`factory`] – [`EntityFactory`][factory::EntityFactory]: how a tracked
//!   detection is drawn (image overlay, floor marker, mesh, or named asset).
//! - [`single_slot`] – [`SingleSlotTracker`][single_slot::SingleSlotTracker]:
//!   first-detected-wins policy for reference images.
//! - [`best_of_many`] – [`BestOfManyTracker`][best_of_many::BestOfManyTracker]:
//!   largest-plane-wins policy with rate-limited refinement.
//! - [`session`] – [`Session`][session::Session]: session-scoped context that
//!   routes add / update / remove batches to the trackers.
//! - [`config`] – [`TrackingConfig`][config::TrackingConfig].
//!
//! # Threading
//!
//! Everything here runs on the thread that receives the perception batch.
//! There is no internal locking; if scene mutations must happen on another
//! thread, the [`Renderer`][dragcare_render::Renderer] implementation is
//! responsible for marshaling them.

pub mod best_of_many;
pub mod config;
pub mod factory;
mod outcome;
pub mod rate_limiter;
pub mod registry;
pub mod session;
pub mod single_slot;

pub use best_of_many::BestOfManyTracker;
pub use config::TrackingConfig;
pub use factory::{EntityFactory, FloorVisual, FloorVisualFactory, ImageOverlayFactory};
pub use outcome::TrackerOutcome;
pub use rate_limiter::{Clock, ManualClock, RateLimiter, SystemClock};
pub use registry::{AnchorRegistry, RegistryCounters};
pub use session::{EventKind, Session, SessionReport, SessionStats};
pub use single_slot::SingleSlotTracker;
