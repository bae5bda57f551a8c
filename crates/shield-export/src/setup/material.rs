//! Materials: catalog (predefined) media and user compounds

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::Color;
use crate::error::{EntityKind, EntityRef, Error, Result};

/// Global material identifier used by the setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub u64);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: MaterialId,
    pub color: Color,
    pub material_info: MaterialInfo,
}

/// Exactly one material variant; the tag selects which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MaterialInfo {
    Predefined(Predefined),
    Compound(Compound),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateOfMatter {
    Solid,
    Liquid,
    Gas,
}

/// Medium taken from the engine catalog by key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predefined {
    pub predefined_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_of_matter: Option<StateOfMatter>,
    /// g/cm³, overrides the catalog density
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub load_external_stopping_power: bool,
}

/// User-defined medium built from elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compound {
    pub name: String,
    pub density: f64,
    pub state_of_matter: StateOfMatter,
    /// Output order follows this order
    pub elements: Vec<Element>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_stopping_power_from_predefined: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// `Symbol-A`, `Symbol-*` for natural abundance; anything after the first
    /// whitespace is a display label
    pub isotope: String,
    pub relative_stoichiometric_fraction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atomic_mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i_value: Option<f64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Material {
    pub fn validate(&self) -> Result<()> {
        let entity = EntityRef::new(EntityKind::Material, self.id.0);
        match &self.material_info {
            MaterialInfo::Predefined(p) => {
                if p.predefined_id.trim().is_empty() {
                    return Err(Error::invalid(entity, "predefinedId", "is empty"));
                }
                if let Some(density) = p.density {
                    check_positive(entity, "density", density)?;
                }
            }
            MaterialInfo::Compound(c) => {
                if c.name.trim().is_empty() {
                    return Err(Error::invalid(entity, "name", "is empty"));
                }
                check_positive(entity, "density", c.density)?;
                if c.elements.is_empty() {
                    return Err(Error::invalid(entity, "elements", "is empty"));
                }
                for element in &c.elements {
                    if element.isotope.trim().is_empty() {
                        return Err(Error::invalid(entity, "isotope", "is empty"));
                    }
                    check_positive(
                        entity,
                        "relativeStoichiometricFraction",
                        element.relative_stoichiometric_fraction,
                    )?;
                    if let Some(mass) = element.atomic_mass {
                        check_positive(entity, "atomicMass", mass)?;
                    }
                    if let Some(i_value) = element.i_value {
                        check_positive(entity, "iValue", i_value)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_positive(entity: EntityRef, field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(entity, field, format!("must be positive, got {}", value)))
    }
}
