//! Bodies: primitive solids that zones are built from

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::Point;
use crate::error::{EntityKind, EntityRef, Error, Result};

/// Global body identifier used by the setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    #[serde(default)]
    pub name: String,
    pub geometry: Geometry,
}

/// Primitive shapes. Cylinders are aligned with the z axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    Sphere {
        center: Point,
        radius: f64,
    },
    Cuboid {
        center: Point,
        size: Point,
    },
    Cylinder {
        #[serde(rename = "baseCenter")]
        base_center: Point,
        height: f64,
        radius: f64,
    },
}

impl Body {
    pub fn validate(&self) -> Result<()> {
        let entity = EntityRef::new(EntityKind::Body, self.id.0);
        let positive = |field: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::invalid(entity, field, format!("must be positive, got {}", value)))
            }
        };

        match self.geometry {
            Geometry::Sphere { radius, .. } => positive("radius", radius),
            Geometry::Cuboid { size, .. } => {
                positive("size.x", size.x)?;
                positive("size.y", size.y)?;
                positive("size.z", size.z)
            }
            Geometry::Cylinder { height, radius, .. } => {
                positive("height", height)?;
                positive("radius", radius)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_json_shape() {
        let body: Body = serde_json::from_str(
            r#"{
                "id": 3,
                "name": "phantom",
                "geometry": {
                    "type": "cylinder",
                    "baseCenter": {"x": 0, "y": 0, "z": -5},
                    "height": 35,
                    "radius": 15
                }
            }"#,
        )
        .unwrap();
        assert_eq!(body.id, BodyId(3));
        assert_eq!(
            body.geometry,
            Geometry::Cylinder {
                base_center: Point::new(0.0, 0.0, -5.0),
                height: 35.0,
                radius: 15.0
            }
        );
        body.validate().unwrap();
    }

    #[test]
    fn test_flat_cuboid_is_invalid() {
        let body = Body {
            id: BodyId(9),
            name: String::new(),
            geometry: Geometry::Cuboid {
                center: Point::default(),
                size: Point::new(1.0, 0.0, 1.0),
            },
        };
        assert!(matches!(
            body.validate(),
            Err(Error::Validation { field: "size.y", .. })
        ));
    }
}
