//! `dragcare-types` – shared data model for the anchor tracking engine.
//!
//! Everything the perception system hands to the engine ([`Detection`]) and
//! everything the engine hands to the rendering collaborator ([`EntitySpec`])
//! lives here, together with the workspace-wide [`AnchorError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Identity
// ────────────────────────────────────────────────────────────────────────────

/// Stable identity token of a single detection, supplied by the perception
/// system.  Two detections are the same detection iff their ids are equal;
/// payloads are never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionId(pub Uuid);

impl DetectionId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DetectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for DetectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// Physical width × height of a detected feature, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Surface area used to rank planar candidates.
    ///
    /// Degenerate extents (negative or non-finite sides) rank as `0.0` so a
    /// garbage estimate can never win over a real one.
    pub fn area(&self) -> f32 {
        let valid = |v: f32| v.is_finite() && v >= 0.0;
        if valid(self.width) && valid(self.height) {
            self.width * self.height
        } else {
            0.0
        }
    }
}

/// Triangle mesh reported for a planar detection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaneGeometry {
    #[serde(default)]
    pub vertices: Vec<[f32; 3]>,
    #[serde(default)]
    pub triangle_indices: Vec<u32>,
    #[serde(default)]
    pub texture_coordinates: Vec<[f32; 2]>,
}

impl PlaneGeometry {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangle_indices.is_empty()
    }
}

/// Semantic classification the perception system attaches to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneClassification {
    Floor,
    Wall,
    Ceiling,
    Table,
    Seat,
    Window,
    Door,
    #[default]
    None,
}

impl fmt::Display for PlaneClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaneClassification::Floor => "floor",
            PlaneClassification::Wall => "wall",
            PlaneClassification::Ceiling => "ceiling",
            PlaneClassification::Table => "table",
            PlaneClassification::Seat => "seat",
            PlaneClassification::Window => "window",
            PlaneClassification::Door => "door",
            PlaneClassification::None => "none",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for PlaneClassification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "floor" => Ok(PlaneClassification::Floor),
            "wall" => Ok(PlaneClassification::Wall),
            "ceiling" => Ok(PlaneClassification::Ceiling),
            "table" => Ok(PlaneClassification::Table),
            "seat" => Ok(PlaneClassification::Seat),
            "window" => Ok(PlaneClassification::Window),
            "door" => Ok(PlaneClassification::Door),
            "none" => Ok(PlaneClassification::None),
            other => Err(format!("unknown plane classification '{other}'")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Detections
// ────────────────────────────────────────────────────────────────────────────

/// A recognized reference image (e.g. a poster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetection {
    pub id: DetectionId,
    /// Name of the reference image that matched.  `None` when the reference
    /// image was registered without a name.
    #[serde(default)]
    pub reference_name: Option<String>,
    /// Physical size of the printed reference image.
    pub physical_size: Extent,
}

/// A detected plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanarDetection {
    pub id: DetectionId,
    #[serde(default)]
    pub classification: PlaneClassification,
    /// Current estimate of the plane's bounding extent.
    pub extent: Extent,
    #[serde(default)]
    pub geometry: PlaneGeometry,
}

impl PlanarDetection {
    pub fn area(&self) -> f32 {
        self.extent.area()
    }
}

/// Any detection delivered by the perception system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    Image(ImageDetection),
    Planar(PlanarDetection),
    /// A detection of a kind the engine does not track (faces, bodies, …).
    Other { id: DetectionId },
}

impl Detection {
    pub fn id(&self) -> DetectionId {
        match self {
            Detection::Image(d) => d.id,
            Detection::Planar(d) => d.id,
            Detection::Other { id } => *id,
        }
    }

    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Detection::Image(_) => "image",
            Detection::Planar(_) => "planar",
            Detection::Other { .. } => "other",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Visual specs
// ────────────────────────────────────────────────────────────────────────────

/// Linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Color {
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const ORANGE: Color = Color::rgb(1.0, 0.5, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

/// Euler rotation (radians) applied to a generated entity relative to its
/// anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

/// Description of a visual entity for the rendering collaborator to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EntitySpec {
    /// Flat colored rectangle.
    Plane {
        width: f32,
        height: f32,
        color: Color,
        #[serde(default)]
        orientation: Orientation,
    },
    /// Colored sphere marker.
    Sphere { radius: f32, color: Color },
    /// Mesh built from detection geometry buffers.
    Mesh { geometry: PlaneGeometry, color: Color },
    /// Pre-built model loaded by name from the asset bundle.
    Asset { name: String },
}

impl EntitySpec {
    pub fn shape(&self) -> &'static str {
        match self {
            EntitySpec::Plane { .. } => "plane",
            EntitySpec::Sphere { .. } => "sphere",
            EntitySpec::Mesh { .. } => "mesh",
            EntitySpec::Asset { .. } => "asset",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Errors raised while reflecting detections into the scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnchorError {
    /// Programming-contract violation: `attach` on a detection that already
    /// owns an entity.
    #[error("Invariant Violation: detection {0} is already attached")]
    AlreadyAttached(DetectionId),

    #[error("Missing Metadata on {id}: no {field}")]
    MissingMetadata { id: DetectionId, field: &'static str },

    #[error("Asset Unavailable '{name}': {details}")]
    AssetUnavailable { name: String, details: String },

    #[error("Renderer Error: {0}")]
    Renderer(String),
}

impl AnchorError {
    /// `true` for contract violations, `false` for recoverable conditions.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, AnchorError::AlreadyAttached(_))
    }
}
