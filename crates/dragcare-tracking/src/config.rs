//! [`TrackingConfig`] – tunables of a tracking session.

use std::time::Duration;

use dragcare_types::{Color, PlaneClassification};
use serde::{Deserialize, Serialize};

use crate::factory::FloorVisual;

/// Session tunables.  Every field has a default, so a partial TOML table is
/// enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Minimum spacing between rate-limited recomputation sweeps of the
    /// plane candidate pool, in milliseconds.
    pub plane_recompute_interval_ms: u64,

    /// Which plane classification the best-of-many tracker follows.
    pub tracked_plane_classification: PlaneClassification,

    /// Tint of the overlay placed on recognized images.
    pub image_overlay_color: Color,

    /// Visual attached to the winning plane.
    pub floor_visual: FloorVisual,
}

impl TrackingConfig {
    pub fn plane_recompute_interval(&self) -> Duration {
        Duration::from_millis(self.plane_recompute_interval_ms)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            plane_recompute_interval_ms: 500,
            tracked_plane_classification: PlaneClassification::Floor,
            image_overlay_color: Color::RED,
            floor_visual: FloorVisual::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = TrackingConfig::default();
        assert_eq!(cfg.plane_recompute_interval(), Duration::from_millis(500));
        assert_eq!(cfg.tracked_plane_classification, PlaneClassification::Floor);
        assert_eq!(cfg.image_overlay_color, Color::RED);
        assert!(matches!(cfg.floor_visual, FloorVisual::Marker { .. }));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: TrackingConfig = toml::from_str(
            r#"
            plane_recompute_interval_ms = 250

            [floor_visual]
            style = "asset"
            name = "rug"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.plane_recompute_interval_ms, 250);
        assert_eq!(cfg.tracked_plane_classification, PlaneClassification::Floor);
        assert_eq!(cfg.floor_visual, FloorVisual::Asset { name: "rug".to_string() });
    }

    #[test]
    fn classification_is_snake_case() {
        let cfg: TrackingConfig =
            serde_json::from_str(r#"{ "tracked_plane_classification": "table" }"#).unwrap();
        assert_eq!(cfg.tracked_plane_classification, PlaneClassification::Table);
    }
}
