//! Scenario replay – drive a [`Session`] from a recorded perception stream.
//!
//! A scenario is a JSON document listing perception batches with the time
//! (milliseconds from session start) at which each was delivered:
//!
//! ```json
//! {
//!   "name": "two floors",
//!   "steps": [
//!     { "at_ms": 0, "event": "added", "detections": [
//!       { "kind": "planar", "id": "…", "classification": "floor",
//!         "extent": { "width": 2.0, "height": 2.0 } }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Replay runs on a [`ManualClock`], so rate limiting is reproducible
//! regardless of how fast the host machine is.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dragcare_render::{SceneCommand, SimRenderer};
use dragcare_tracking::{EventKind, ManualClock, Session, SessionReport, TrackingConfig};
use dragcare_types::Detection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a scenario.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("cannot read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("step {step} at {at_ms} ms is earlier than the previous step at {previous_ms} ms")]
    OutOfOrder {
        step: usize,
        at_ms: u64,
        previous_ms: u64,
    },
}

/// A recorded perception stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

/// One perception batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Delivery time, in milliseconds since session start.
    #[serde(default)]
    pub at_ms: u64,
    pub event: EventKind,
    pub detections: Vec<Detection>,
}

/// Scene commands produced by one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepTrace {
    pub index: usize,
    pub at_ms: u64,
    pub event: EventKind,
    pub detections: usize,
    pub commands: Vec<SceneCommand>,
}

/// Full result of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct Replay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub steps: Vec<StepTrace>,
    /// Commands issued when the session was torn down.
    pub teardown: Vec<SceneCommand>,
    pub report: SessionReport,
}

impl Scenario {
    /// Read and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Parse and validate a scenario document.
    pub fn parse(raw: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(raw)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Steps must be in non-decreasing time order.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut previous_ms = 0;
        for (step, s) in self.steps.iter().enumerate() {
            if s.at_ms < previous_ms {
                return Err(ScenarioError::OutOfOrder {
                    step,
                    at_ms: s.at_ms,
                    previous_ms,
                });
            }
            previous_ms = s.at_ms;
        }
        Ok(())
    }

    /// Replay every step through a fresh session rendering into `renderer`.
    pub fn replay(&self, config: TrackingConfig, renderer: SimRenderer) -> Replay {
        let clock = ManualClock::new();
        let mut session = Session::with_clock(config, renderer, Arc::new(clock.clone()));

        let mut now_ms = 0;
        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            clock.advance(Duration::from_millis(step.at_ms.saturating_sub(now_ms)));
            now_ms = now_ms.max(step.at_ms);

            session.dispatch(step.event, &step.detections);
            let commands = session.renderer_mut().take_commands();
            debug!(index, at_ms = step.at_ms, commands = commands.len(), "step replayed");
            steps.push(StepTrace {
                index,
                at_ms: step.at_ms,
                event: step.event,
                detections: step.detections.len(),
                commands,
            });
        }

        let (report, mut renderer) = session.end();
        Replay {
            name: self.name.clone(),
            steps,
            teardown: renderer.take_commands(),
            report,
        }
    }
}
