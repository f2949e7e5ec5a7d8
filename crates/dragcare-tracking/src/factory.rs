//! Entity factories: turn a [`Detection`] into an [`EntitySpec`].
//!
//! A factory decides *what* a tracked detection looks like; the
//! [`AnchorRegistry`][crate::registry::AnchorRegistry] decides *when* it
//! exists.  Any `Fn(&Detection) -> Result<EntitySpec, AnchorError>` closure
//! is a factory, which keeps tests short.

use std::f32::consts::{FRAC_PI_2, PI};

use dragcare_types::{AnchorError, Color, Detection, EntitySpec, Orientation};
use serde::{Deserialize, Serialize};

/// Builds the visual description for a detection.
pub trait EntityFactory {
    /// # Errors
    ///
    /// Returns [`AnchorError::MissingMetadata`] when `detection` lacks a field
    /// the visual needs.
    fn spec_for(&self, detection: &Detection) -> Result<EntitySpec, AnchorError>;
}

impl<F> EntityFactory for F
where
    F: Fn(&Detection) -> Result<EntitySpec, AnchorError>,
{
    fn spec_for(&self, detection: &Detection) -> Result<EntitySpec, AnchorError> {
        self(detection)
    }
}

/// Colored rectangle laid flat over a recognized reference image, sized to
/// the image's physical dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageOverlayFactory {
    pub color: Color,
}

impl ImageOverlayFactory {
    /// Image anchors face the camera; rotate the plane onto the image.
    pub const ORIENTATION: Orientation = Orientation {
        pitch: FRAC_PI_2,
        yaw: PI,
        roll: 0.0,
    };
}

impl Default for ImageOverlayFactory {
    fn default() -> Self {
        Self { color: Color::RED }
    }
}

impl EntityFactory for ImageOverlayFactory {
    fn spec_for(&self, detection: &Detection) -> Result<EntitySpec, AnchorError> {
        let Detection::Image(image) = detection else {
            return Err(AnchorError::MissingMetadata {
                id: detection.id(),
                field: "reference image",
            });
        };
        if image.reference_name.as_deref().is_none_or(str::is_empty) {
            return Err(AnchorError::MissingMetadata {
                id: image.id,
                field: "reference image name",
            });
        }
        Ok(EntitySpec::Plane {
            width: image.physical_size.width,
            height: image.physical_size.height,
            color: self.color,
            orientation: Self::ORIENTATION,
        })
    }
}

/// How the winning floor is visualized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum FloorVisual {
    /// Small sphere at the plane's anchor.
    Marker { radius: f32, color: Color },
    /// The plane's own mesh, tinted.
    Mesh { color: Color },
    /// A named model from the asset library.
    Asset { name: String },
}

impl Default for FloorVisual {
    fn default() -> Self {
        FloorVisual::Marker {
            radius: 0.1,
            color: Color::ORANGE,
        }
    }
}

/// Factory for planar winners, driven by a [`FloorVisual`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FloorVisualFactory {
    pub visual: FloorVisual,
}

impl FloorVisualFactory {
    pub fn new(visual: FloorVisual) -> Self {
        Self { visual }
    }
}

impl EntityFactory for FloorVisualFactory {
    fn spec_for(&self, detection: &Detection) -> Result<EntitySpec, AnchorError> {
        let Detection::Planar(plane) = detection else {
            return Err(AnchorError::MissingMetadata {
                id: detection.id(),
                field: "plane extent",
            });
        };
        match &self.visual {
            FloorVisual::Marker { radius, color } => Ok(EntitySpec::Sphere {
                radius: *radius,
                color: *color,
            }),
            FloorVisual::Mesh { .. } if plane.geometry.is_empty() => {
                Err(AnchorError::MissingMetadata {
                    id: plane.id,
                    field: "plane geometry",
                })
            }
            FloorVisual::Mesh { color } => Ok(EntitySpec::Mesh {
                geometry: plane.geometry.clone(),
                color: *color,
            }),
            FloorVisual::Asset { name } => Ok(EntitySpec::Asset { name: name.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragcare_types::{
        DetectionId, Extent, ImageDetection, PlanarDetection, PlaneClassification, PlaneGeometry,
    };

    fn poster(name: Option<&str>) -> Detection {
        Detection::Image(ImageDetection {
            id: DetectionId::new(),
            reference_name: name.map(str::to_string),
            physical_size: Extent::new(0.6, 0.9),
        })
    }

    fn floor(geometry: PlaneGeometry) -> Detection {
        Detection::Planar(PlanarDetection {
            id: DetectionId::new(),
            classification: PlaneClassification::Floor,
            extent: Extent::new(2.0, 2.0),
            geometry,
        })
    }

    fn triangle() -> PlaneGeometry {
        PlaneGeometry {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            triangle_indices: vec![0, 1, 2],
            texture_coordinates: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        }
    }

    #[test]
    fn image_overlay_matches_physical_size() {
        let spec = ImageOverlayFactory::default().spec_for(&poster(Some("mona_lisa"))).unwrap();
        assert_eq!(
            spec,
            EntitySpec::Plane {
                width: 0.6,
                height: 0.9,
                color: Color::RED,
                orientation: ImageOverlayFactory::ORIENTATION,
            }
        );
    }

    #[test]
    fn image_without_name_is_missing_metadata() {
        for name in [None, Some("")] {
            let err = ImageOverlayFactory::default().spec_for(&poster(name)).unwrap_err();
            assert!(matches!(err, AnchorError::MissingMetadata { field: "reference image name", .. }));
        }
    }

    #[test]
    fn image_factory_rejects_planes() {
        assert!(ImageOverlayFactory::default().spec_for(&floor(triangle())).is_err());
    }

    #[test]
    fn default_floor_visual_is_orange_marker() {
        let spec = FloorVisualFactory::default().spec_for(&floor(PlaneGeometry::default())).unwrap();
        assert_eq!(spec, EntitySpec::Sphere { radius: 0.1, color: Color::ORANGE });
    }

    #[test]
    fn mesh_visual_copies_geometry() {
        let factory = FloorVisualFactory::new(FloorVisual::Mesh { color: Color::WHITE });
        match factory.spec_for(&floor(triangle())).unwrap() {
            EntitySpec::Mesh { geometry, .. } => assert_eq!(geometry, triangle()),
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn mesh_visual_needs_geometry() {
        let factory = FloorVisualFactory::new(FloorVisual::Mesh { color: Color::WHITE });
        let err = factory.spec_for(&floor(PlaneGeometry::default())).unwrap_err();
        assert!(matches!(err, AnchorError::MissingMetadata { field: "plane geometry", .. }));
    }

    #[test]
    fn asset_visual_names_model() {
        let factory = FloorVisualFactory::new(FloorVisual::Asset { name: "rug".to_string() });
        assert_eq!(
            factory.spec_for(&floor(triangle())).unwrap(),
            EntitySpec::Asset { name: "rug".to_string() }
        );
    }

    #[test]
    fn closures_are_factories() {
        let factory = |_: &Detection| -> Result<EntitySpec, AnchorError> {
            Ok(EntitySpec::Asset { name: "stub".to_string() })
        };
        assert!(factory.spec_for(&poster(None)).is_ok());
    }
}
