//! Beam definition

use serde::{Deserialize, Serialize};

use super::common::{Distribution, ParticleType, Point};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beam {
    pub direction: Direction,
    pub divergence: Divergence,
    pub particle_type: ParticleType,
    /// MeV/nucleon
    pub initial_base_energy: f64,
    pub initial_energy_sigma: f64,
}

/// Beam axis angles (degrees) and source position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Direction {
    pub phi: f64,
    pub theta: f64,
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Divergence {
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub distribution: Distribution,
}

impl Default for Beam {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            divergence: Divergence::default(),
            particle_type: ParticleType::Proton,
            initial_base_energy: 100.0,
            initial_energy_sigma: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beam_json_roundtrip() {
        let beam = Beam {
            direction: Direction {
                phi: 1.0,
                theta: 1.0,
                position: Point::new(110.0, 1.222, 0.001),
            },
            divergence: Divergence {
                sigma_x: 0.5,
                sigma_y: 0.25,
                distribution: Distribution::Flat,
            },
            particle_type: ParticleType::HeavyIon {
                nucleons_count: 111,
                charge: 10,
            },
            initial_base_energy: 100.0,
            initial_energy_sigma: 1.0,
        };

        let json = serde_json::to_value(beam).unwrap();
        assert_eq!(json["divergence"]["sigmaX"], 0.5);
        assert_eq!(json["particleType"]["nucleonsCount"], 111);
        assert_eq!(json["direction"]["position"]["y"], 1.222);

        let decoded: Beam = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, beam);
    }
}
