//! SHIELD-HIT12A particle codes (`JPART`)

use crate::error::{Error, Result};
use crate::setup::ParticleType;

/// Code shared by every heavy ion; nucleon count and charge travel separately.
pub const HEAVY_ION: i64 = 25;

pub fn code(particle: ParticleType) -> i64 {
    match particle {
        ParticleType::Neutron => 1,
        ParticleType::Proton => 2,
        ParticleType::PionMinus => 3,
        ParticleType::PionPlus => 4,
        ParticleType::PionZero => 5,
        ParticleType::AntiNeutron => 6,
        ParticleType::AntiProton => 7,
        ParticleType::KaonMinus => 8,
        ParticleType::KaonPlus => 9,
        ParticleType::KaonZero => 10,
        ParticleType::KaonAnti => 11,
        ParticleType::Gamma => 12,
        ParticleType::Electron => 13,
        ParticleType::Positron => 14,
        ParticleType::MuonMinus => 15,
        ParticleType::MuonPlus => 16,
        ParticleType::ENeutrino => 17,
        ParticleType::EAntiNeutrino => 18,
        ParticleType::MuNeutrino => 19,
        ParticleType::MuAntiNeutrino => 20,
        ParticleType::Deuteron => 21,
        ParticleType::Triton => 22,
        ParticleType::He3 => 23,
        ParticleType::He4 => 24,
        ParticleType::HeavyIon { .. } => HEAVY_ION,
    }
}

/// Inverse of [`code`]. A heavy ion comes back with zero nucleons and
/// charge; the caller fills them from the companion record.
pub fn from_code(field: &'static str, code: i64) -> Result<ParticleType> {
    let particle = match code {
        1 => ParticleType::Neutron,
        2 => ParticleType::Proton,
        3 => ParticleType::PionMinus,
        4 => ParticleType::PionPlus,
        5 => ParticleType::PionZero,
        6 => ParticleType::AntiNeutron,
        7 => ParticleType::AntiProton,
        8 => ParticleType::KaonMinus,
        9 => ParticleType::KaonPlus,
        10 => ParticleType::KaonZero,
        11 => ParticleType::KaonAnti,
        12 => ParticleType::Gamma,
        13 => ParticleType::Electron,
        14 => ParticleType::Positron,
        15 => ParticleType::MuonMinus,
        16 => ParticleType::MuonPlus,
        17 => ParticleType::ENeutrino,
        18 => ParticleType::EAntiNeutrino,
        19 => ParticleType::MuNeutrino,
        20 => ParticleType::MuAntiNeutrino,
        21 => ParticleType::Deuteron,
        22 => ParticleType::Triton,
        23 => ParticleType::He3,
        24 => ParticleType::He4,
        HEAVY_ION => ParticleType::HeavyIon {
            nucleons_count: 0,
            charge: 0,
        },
        other => {
            return Err(Error::UnknownCode {
                field,
                code: other.to_string(),
            })
        }
    };
    Ok(particle)
}
