//! Run-wide physics switches and thresholds

use serde::{Deserialize, Serialize};

use crate::error::{EntityKind, EntityRef, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationOptions {
    pub antyparticle_correction_on: bool,
    pub nuclear_reactions_on: bool,
    /// Mean energy loss per transport step, percent of the particle energy
    pub mean_energy_loss: f64,
    /// MeV
    pub min_energy_loss: f64,
    pub scattering_type: ScatteringType,
    pub energy_straggling: EnergyStraggling,
    pub fast_neutron_transport_on: bool,
    /// MeV
    pub low_energy_neutron_cut_off: f64,
    pub number_of_generated_particles: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScatteringType {
    NoScattering,
    Gaussian,
    Moliere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnergyStraggling {
    NoStraggling,
    Gaussian,
    Vavilov,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            antyparticle_correction_on: false,
            nuclear_reactions_on: true,
            mean_energy_loss: 1.0,
            min_energy_loss: 0.025,
            scattering_type: ScatteringType::Moliere,
            energy_straggling: EnergyStraggling::Vavilov,
            fast_neutron_transport_on: true,
            low_energy_neutron_cut_off: 0.0,
            number_of_generated_particles: 1000,
        }
    }
}

impl SimulationOptions {
    pub fn validate(&self) -> Result<()> {
        let entity = EntityRef::singleton(EntityKind::Options);
        if !(self.mean_energy_loss.is_finite() && self.mean_energy_loss > 0.0) {
            return Err(Error::invalid(
                entity,
                "meanEnergyLoss",
                format!("must be a positive percentage, got {}", self.mean_energy_loss),
            ));
        }
        let cut = |field: &'static str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(Error::invalid(entity, field, format!("cannot be negative, got {}", value)))
            }
        };
        cut("minEnergyLoss", self.min_energy_loss)?;
        cut("lowEnergyNeutronCutOff", self.low_energy_neutron_cut_off)
    }
}
