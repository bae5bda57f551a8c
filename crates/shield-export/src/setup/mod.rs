//! Engine-agnostic simulation setup
//!
//! Plain data mirroring the interchange JSON: materials, bodies, zones,
//! detectors, the beam and run options. Everything here is independent of
//! the SHIELD-HIT12A text format; see [`crate::shield`] for that.

pub mod beam;
pub mod body;
pub mod common;
pub mod detector;
pub mod material;
pub mod options;
pub mod zone;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use beam::{Beam, Direction, Divergence};
pub use body::{Body, BodyId, Geometry};
pub use common::{Color, Distribution, ParticleType, Point};
pub use detector::{Detector, DetectorGeometry, DetectorId, ScoringType};
pub use material::{Compound, Element, Material, MaterialId, MaterialInfo, Predefined, StateOfMatter};
pub use options::{EnergyStraggling, ScatteringType, SimulationOptions};
pub use zone::{Operation, OperationType, Zone, ZoneId};

use crate::error::{EntityKind, EntityRef, Error, Result};

/// A complete setup as exchanged with editors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub bodies: Vec<Body>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub detectors: Vec<Detector>,
    #[serde(default)]
    pub beam: Beam,
    #[serde(default)]
    pub options: SimulationOptions,
}

impl Setup {
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Check every structural invariant: per-entity rules, unique IDs per
    /// kind and references that resolve.
    pub fn validate(&self) -> Result<()> {
        unique(EntityKind::Material, self.materials.iter().map(|m| m.id.0))?;
        unique(EntityKind::Body, self.bodies.iter().map(|b| b.id.0))?;
        unique(EntityKind::Zone, self.zones.iter().map(|z| z.id.0))?;
        unique(EntityKind::Detector, self.detectors.iter().map(|d| d.id.0))?;

        for material in &self.materials {
            material.validate()?;
        }
        for body in &self.bodies {
            body.validate()?;
        }
        for zone in &self.zones {
            self.validate_zone(zone)?;
        }
        for detector in &self.detectors {
            detector.validate()?;
            if let DetectorGeometry::Zone { zone_id } = detector.detector_geometry {
                if self.zone(zone_id).is_none() {
                    return Err(Error::invalid(
                        EntityRef::new(EntityKind::Detector, detector.id.0),
                        "zoneId",
                        format!("references missing zone {}", zone_id),
                    ));
                }
            }
        }
        self.validate_beam()?;
        self.options.validate()
    }

    fn validate_zone(&self, zone: &Zone) -> Result<()> {
        let entity = EntityRef::new(EntityKind::Zone, zone.id.0);
        if zone.id == ZoneId::NONE {
            return Err(Error::invalid(entity, "id", "0 is reserved for \"no parent\""));
        }
        if zone.parent_id != ZoneId::NONE && self.zone(zone.parent_id).is_none() {
            return Err(Error::invalid(
                entity,
                "parentId",
                format!("references missing zone {}", zone.parent_id),
            ));
        }
        if self.body(zone.base_id).is_none() {
            return Err(Error::invalid(
                entity,
                "baseId",
                format!("references missing body {}", zone.base_id),
            ));
        }
        if let Some(op) = zone.construction.iter().find(|op| self.body(op.body_id).is_none()) {
            return Err(Error::invalid(
                entity,
                "construction",
                format!("references missing body {}", op.body_id),
            ));
        }
        if self.material(zone.material_id).is_none() {
            return Err(Error::invalid(
                entity,
                "materialId",
                format!("references missing material {}", zone.material_id),
            ));
        }
        Ok(())
    }

    fn validate_beam(&self) -> Result<()> {
        let entity = EntityRef::singleton(EntityKind::Beam);
        if let ParticleType::HeavyIon {
            nucleons_count,
            charge,
        } = self.beam.particle_type
        {
            if charge == 0 || nucleons_count < charge {
                return Err(Error::invalid(
                    entity,
                    "particleType",
                    format!(
                        "heavy ion needs 0 < charge <= nucleons, got A={} Z={}",
                        nucleons_count, charge
                    ),
                ));
            }
        }
        if self.beam.divergence.sigma_x < 0.0 || self.beam.divergence.sigma_y < 0.0 {
            return Err(Error::invalid(entity, "divergence", "sigmas cannot be negative"));
        }
        Ok(())
    }
}

fn unique(kind: EntityKind, ids: impl Iterator<Item = u64>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::invalid(EntityRef::new(kind, id), "id", "is used twice"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water_box() -> Setup {
        Setup {
            materials: vec![Material {
                id: MaterialId(10),
                color: Color::default(),
                material_info: MaterialInfo::Predefined(Predefined {
                    predefined_id: "water".to_string(),
                    ..Default::default()
                }),
            }],
            bodies: vec![Body {
                id: BodyId(20),
                name: "box".to_string(),
                geometry: Geometry::Cuboid {
                    center: Point::default(),
                    size: Point::new(1.0, 1.0, 1.0),
                },
            }],
            zones: vec![Zone {
                id: ZoneId(30),
                parent_id: ZoneId::NONE,
                name: "water".to_string(),
                base_id: BodyId(20),
                material_id: MaterialId(10),
                construction: vec![],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_consistent_setup_validates() {
        water_box().validate().unwrap();
    }

    #[test]
    fn test_dangling_body_reference_is_reported() {
        let mut setup = water_box();
        setup.zones[0]
            .construction
            .push(Operation::new(OperationType::Subtract, BodyId(99)));
        let err = setup.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid zone 30: `construction` references missing body 99"
        );
    }

    #[test]
    fn test_duplicate_ids_are_reported() {
        let mut setup = water_box();
        setup.bodies.push(setup.bodies[0].clone());
        assert!(matches!(
            setup.validate(),
            Err(Error::Validation { field: "id", .. })
        ));
    }

    #[test]
    fn test_setup_json_defaults_beam_and_options() {
        let setup: Setup = serde_json::from_str(r#"{"materials": [], "zones": []}"#).unwrap();
        assert_eq!(setup.beam, Beam::default());
        assert_eq!(setup.options, SimulationOptions::default());
    }
}
