//! Detectors: scoring volumes and the quantity they record

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{ParticleType, Point};
use super::zone::ZoneId;
use crate::error::{EntityKind, EntityRef, Error, Result};

/// Global detector identifier used by the setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectorId(pub u64);

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detector {
    pub id: DetectorId,
    pub name: String,
    pub detector_geometry: DetectorGeometry,
    /// `None` scores every particle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scored_particle: Option<ParticleType>,
    pub scoring: ScoringType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DetectorGeometry {
    #[serde(rename_all = "camelCase")]
    Cylinder {
        radius: Range,
        angle: Range,
        z_value: Range,
        slices: CylinderSlices,
    },
    Mesh {
        center: Point,
        size: Point,
        slices: MeshSlices,
    },
    #[serde(rename_all = "camelCase")]
    Zone { zone_id: ZoneId },
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CylinderSlices {
    pub radius: u32,
    pub angle: u32,
    pub z: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshSlices {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoringType {
    Energy,
    Fluence,
    CrossFluence,
    LetFluence,
    Dose,
    AverageEnergy,
    AverageLet,
    Counter,
}

impl Detector {
    pub fn validate(&self) -> Result<()> {
        let entity = EntityRef::new(EntityKind::Detector, self.id.0);
        let ordered = |field: &'static str, range: Range| {
            if range.min.is_finite() && range.max.is_finite() && range.min < range.max {
                Ok(())
            } else {
                Err(Error::invalid(
                    entity,
                    field,
                    format!("needs min < max, got [{}, {}]", range.min, range.max),
                ))
            }
        };
        let nonzero = |field: &'static str, count: u32| {
            if count > 0 {
                Ok(())
            } else {
                Err(Error::invalid(entity, field, "must have at least one slice"))
            }
        };

        match self.detector_geometry {
            DetectorGeometry::Cylinder {
                radius,
                angle,
                z_value,
                slices,
            } => {
                ordered("radius", radius)?;
                ordered("angle", angle)?;
                ordered("zValue", z_value)?;
                if radius.min < 0.0 {
                    return Err(Error::invalid(entity, "radius", "cannot start below zero"));
                }
                nonzero("slices.radius", slices.radius)?;
                nonzero("slices.angle", slices.angle)?;
                nonzero("slices.z", slices.z)?;
            }
            DetectorGeometry::Mesh { size, slices, .. } => {
                for (field, extent) in [("size.x", size.x), ("size.y", size.y), ("size.z", size.z)] {
                    if !(extent.is_finite() && extent > 0.0) {
                        return Err(Error::invalid(entity, field, "must be positive"));
                    }
                }
                nonzero("slices.x", slices.x)?;
                nonzero("slices.y", slices.y)?;
                nonzero("slices.z", slices.z)?;
            }
            DetectorGeometry::Zone { .. } => {}
        }
        Ok(())
    }
}
