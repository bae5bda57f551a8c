//! `beam.dat`: beam and run options as keyword cards
//!
//! Every card is declared once in [`Card`]; writing and parsing both walk
//! the same declaration, so the two cannot drift apart. Cards are emitted in
//! the fixed order of [`CARDS`].

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::format::{
    content_lines, engine_codes, render_record, scale_decimal, split_record, EngineCode, Layout,
    Polarity, Record, Value,
};
use crate::setup::{Beam, Distribution, EnergyStraggling, ParticleType, ScatteringType, SimulationOptions};

use super::particle;

engine_codes!(ScatteringType, "MSCAT", {
    NoScattering => 0,
    Gaussian => 1,
    Moliere => 2,
});

engine_codes!(EnergyStraggling, "STRAGG", {
    NoStraggling => 0,
    Gaussian => 1,
    Vavilov => 2,
});

/// APCORR: 1 enables the antiparticle correction.
const APCORR: Polarity = Polarity::Direct;
/// NEUTRFAST: 1 enables fast neutron transport.
const NEUTRFAST: Polarity = Polarity::Direct;
/// NUCRE: 1 enables nuclear reactions, 0 disables them.
const NUCRE: Polarity = Polarity::Direct;

/// Second NSTAT column: save results only at the end of the run.
const NSTAT_SAVE_AT_END: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Card {
    Apcorr,
    Beamdir,
    Beampos,
    Beamsigma,
    Deltae,
    Demin,
    Hiproj,
    Jpart0,
    Mscat,
    Neutrfast,
    Neutrlcut,
    Nstat,
    Nucre,
    Stragg,
    Tmax0,
}

const CARDS: [Card; 15] = [
    Card::Apcorr,
    Card::Beamdir,
    Card::Beampos,
    Card::Beamsigma,
    Card::Deltae,
    Card::Demin,
    Card::Hiproj,
    Card::Jpart0,
    Card::Mscat,
    Card::Neutrfast,
    Card::Neutrlcut,
    Card::Nstat,
    Card::Nucre,
    Card::Stragg,
    Card::Tmax0,
];

/// Beam and options being rebuilt from parsed cards.
struct Draft {
    beam: Beam,
    options: SimulationOptions,
    jpart0: Option<(usize, i64)>,
    hiproj: Option<(usize, u32, u32)>,
}

impl Card {
    fn keyword(self) -> &'static str {
        match self {
            Card::Apcorr => "APCORR",
            Card::Beamdir => "BEAMDIR",
            Card::Beampos => "BEAMPOS",
            Card::Beamsigma => "BEAMSIGMA",
            Card::Deltae => "DELTAE",
            Card::Demin => "DEMIN",
            Card::Hiproj => "HIPROJ",
            Card::Jpart0 => "JPART0",
            Card::Mscat => "MSCAT",
            Card::Neutrfast => "NEUTRFAST",
            Card::Neutrlcut => "NEUTRLCUT",
            Card::Nstat => "NSTAT",
            Card::Nucre => "NUCRE",
            Card::Stragg => "STRAGG",
            Card::Tmax0 => "TMAX0",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Card> {
        CARDS.iter().copied().find(|card| card.keyword() == keyword)
    }

    fn arity(self) -> usize {
        match self {
            Card::Apcorr
            | Card::Deltae
            | Card::Demin
            | Card::Jpart0
            | Card::Mscat
            | Card::Neutrfast
            | Card::Neutrlcut
            | Card::Nucre
            | Card::Stragg => 1,
            Card::Beamdir | Card::Beamsigma | Card::Hiproj | Card::Nstat | Card::Tmax0 => 2,
            Card::Beampos => 3,
        }
    }

    /// Column values of this card, `None` when the card is not emitted.
    fn write(self, beam: &Beam, options: &SimulationOptions) -> Result<Option<Vec<Value>>> {
        let values = match self {
            Card::Apcorr => vec![Value::Int(APCORR.encode(options.antyparticle_correction_on))],
            Card::Beamdir => vec![
                Value::Float(beam.direction.phi),
                Value::Float(beam.direction.theta),
            ],
            Card::Beampos => {
                let p = beam.direction.position;
                vec![Value::Float(p.x), Value::Float(p.y), Value::Float(p.z)]
            }
            Card::Beamsigma => {
                // negative sigmas select a flat profile
                let sign = match beam.divergence.distribution {
                    Distribution::Gaussian => 1.0,
                    Distribution::Flat => -1.0,
                };
                vec![
                    Value::Float(sign * beam.divergence.sigma_x),
                    Value::Float(sign * beam.divergence.sigma_y),
                ]
            }
            Card::Deltae => vec![Value::Float(scale_decimal(options.mean_energy_loss, -2))],
            Card::Demin => vec![Value::Float(options.min_energy_loss)],
            Card::Hiproj => match beam.particle_type {
                ParticleType::HeavyIon {
                    nucleons_count,
                    charge,
                } => vec![
                    Value::Int(i64::from(nucleons_count)),
                    Value::Int(i64::from(charge)),
                ],
                _ => return Ok(None),
            },
            Card::Jpart0 => vec![Value::Int(particle::code(beam.particle_type))],
            Card::Mscat => vec![Value::Int(options.scattering_type.code())],
            Card::Neutrfast => vec![Value::Int(NEUTRFAST.encode(options.fast_neutron_transport_on))],
            Card::Neutrlcut => vec![Value::Float(options.low_energy_neutron_cut_off)],
            Card::Nstat => {
                let count = i64::try_from(options.number_of_generated_particles).map_err(|_| {
                    Error::ColumnOverflow {
                        field: "NSTAT",
                        value: options.number_of_generated_particles.to_string(),
                        width: Layout::CARD.column_width,
                    }
                })?;
                vec![Value::Int(count), Value::Int(NSTAT_SAVE_AT_END)]
            }
            Card::Nucre => vec![Value::Int(NUCRE.encode(options.nuclear_reactions_on))],
            Card::Stragg => vec![Value::Int(options.energy_straggling.code())],
            Card::Tmax0 => vec![
                Value::Float(beam.initial_base_energy),
                Value::Float(beam.initial_energy_sigma),
            ],
        };
        Ok(Some(values))
    }

    fn read(self, record: &Record<'_>, draft: &mut Draft) -> Result<()> {
        record.expect_columns(self.arity())?;
        let options = &mut draft.options;
        let beam = &mut draft.beam;
        match self {
            Card::Apcorr => {
                options.antyparticle_correction_on = APCORR.decode("APCORR", record.int(0)?)?
            }
            Card::Beamdir => {
                beam.direction.phi = record.float(0)?;
                beam.direction.theta = record.float(1)?;
            }
            Card::Beampos => {
                let p = &mut beam.direction.position;
                p.x = record.float(0)?;
                p.y = record.float(1)?;
                p.z = record.float(2)?;
            }
            Card::Beamsigma => {
                let (x, y) = (record.float(0)?, record.float(1)?);
                beam.divergence.distribution = if x < 0.0 || y < 0.0 {
                    Distribution::Flat
                } else {
                    Distribution::Gaussian
                };
                beam.divergence.sigma_x = x.abs();
                beam.divergence.sigma_y = y.abs();
            }
            Card::Deltae => options.mean_energy_loss = scale_decimal(record.float(0)?, 2),
            Card::Demin => options.min_energy_loss = record.float(0)?,
            Card::Hiproj => {
                let nucleons = count_column(record, 0)?;
                let charge = count_column(record, 1)?;
                draft.hiproj = Some((record.line, nucleons, charge));
            }
            Card::Jpart0 => draft.jpart0 = Some((record.line, record.int(0)?)),
            Card::Mscat => options.scattering_type = ScatteringType::from_code(record.int(0)?)?,
            Card::Neutrfast => {
                options.fast_neutron_transport_on = NEUTRFAST.decode("NEUTRFAST", record.int(0)?)?
            }
            Card::Neutrlcut => options.low_energy_neutron_cut_off = record.float(0)?,
            Card::Nstat => {
                let count = record.int(0)?;
                options.number_of_generated_particles = u64::try_from(count).map_err(|_| {
                    Error::malformed(record.line, format!("NSTAT count {} is negative", count))
                })?;
                if record.int(1)? != NSTAT_SAVE_AT_END {
                    return Err(Error::malformed(
                        record.line,
                        format!("NSTAT save step must be {}", NSTAT_SAVE_AT_END),
                    ));
                }
            }
            Card::Nucre => options.nuclear_reactions_on = NUCRE.decode("NUCRE", record.int(0)?)?,
            Card::Stragg => {
                options.energy_straggling = EnergyStraggling::from_code(record.int(0)?)?
            }
            Card::Tmax0 => {
                beam.initial_base_energy = record.float(0)?;
                beam.initial_energy_sigma = record.float(1)?;
            }
        }
        Ok(())
    }
}

fn count_column(record: &Record<'_>, index: usize) -> Result<u32> {
    let value = record.int(index)?;
    u32::try_from(value).map_err(|_| {
        Error::malformed(
            record.line,
            format!("{}: {} is not a valid count", record.keyword, value),
        )
    })
}

/// Render `beam.dat`.
pub fn serialize_beam(beam: &Beam, options: &SimulationOptions) -> Result<String> {
    let mut out = String::new();
    for card in CARDS {
        if let Some(values) = card.write(beam, options)? {
            out.push_str(&render_record(Layout::CARD, card.keyword(), &values)?);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Parse `beam.dat` back into a beam and options. Cards that are absent keep
/// their default values.
pub fn parse_beam(text: &str) -> Result<(Beam, SimulationOptions)> {
    let mut draft = Draft {
        beam: Beam::default(),
        options: SimulationOptions::default(),
        jpart0: None,
        hiproj: None,
    };
    let mut seen = HashSet::new();

    for (line, content) in content_lines(text) {
        let record = split_record(line, content, Layout::CARD)?;
        let card = Card::from_keyword(record.keyword).ok_or_else(|| Error::UnknownCode {
            field: "beam card",
            code: record.keyword.to_string(),
        })?;
        if !seen.insert(card) {
            return Err(Error::malformed(line, format!("{} given twice", card.keyword())));
        }
        card.read(&record, &mut draft)?;
    }

    draft.beam.particle_type = match (draft.jpart0, draft.hiproj) {
        (Some((_, particle::HEAVY_ION)), Some((_, nucleons_count, charge))) => ParticleType::HeavyIon {
            nucleons_count,
            charge,
        },
        (Some((line, particle::HEAVY_ION)), None) => {
            return Err(Error::malformed(line, "heavy ion JPART0 without HIPROJ"))
        }
        (_, Some((line, _, _))) => {
            return Err(Error::malformed(line, "HIPROJ given for a non-ion projectile"))
        }
        (Some((_, code)), None) => particle::from_code("JPART0", code)?,
        (None, None) => draft.beam.particle_type,
    };

    Ok((draft.beam, draft.options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::{Direction, Divergence, Point};
    use pretty_assertions::assert_eq;

    const DEFAULT_BEAM: &str = "\
APCORR                 0
BEAMDIR               0.      0.
BEAMPOS               0.      0.      0.
BEAMSIGMA             0.      0.
DELTAE              0.01
DEMIN              0.025
JPART0                 2
MSCAT                  2
NEUTRFAST              1
NEUTRLCUT             0.
NSTAT               1000      -1
NUCRE                  1
STRAGG                 2
TMAX0               100.      0.
";

    const HEAVY_ION_BEAM: &str = "\
APCORR                 1
BEAMDIR               1.      1.
BEAMPOS             110.   1.222   0.001
BEAMSIGMA             0.      0.
DELTAE               0.9
DEMIN              0.112
HIPROJ               111      10
JPART0                25
MSCAT                  2
NEUTRFAST              0
NEUTRLCUT          11.11
NSTAT                  0      -1
NUCRE                  0
STRAGG                 2
TMAX0               100.      1.
";

    fn heavy_ion_setup() -> (Beam, SimulationOptions) {
        let beam = Beam {
            direction: Direction {
                phi: 1.0,
                theta: 1.0,
                position: Point::new(110.0, 1.2220, 0.001),
            },
            divergence: Divergence {
                sigma_x: 0.0,
                sigma_y: 0.0,
                distribution: Distribution::Gaussian,
            },
            particle_type: ParticleType::HeavyIon {
                nucleons_count: 111,
                charge: 10,
            },
            initial_base_energy: 100.0,
            initial_energy_sigma: 1.0,
        };
        let options = SimulationOptions {
            antyparticle_correction_on: true,
            nuclear_reactions_on: false,
            mean_energy_loss: 90.0,
            min_energy_loss: 0.112,
            scattering_type: ScatteringType::Moliere,
            energy_straggling: EnergyStraggling::Vavilov,
            fast_neutron_transport_on: false,
            low_energy_neutron_cut_off: 11.11,
            number_of_generated_particles: 0,
        };
        (beam, options)
    }

    #[test]
    fn test_default_beam_block_is_exact() {
        let text = serialize_beam(&Beam::default(), &SimulationOptions::default()).unwrap();
        assert_eq!(text, DEFAULT_BEAM);
    }

    #[test]
    fn test_heavy_ion_beam_block_is_exact() {
        let (beam, options) = heavy_ion_setup();
        let text = serialize_beam(&beam, &options).unwrap();
        assert_eq!(text, HEAVY_ION_BEAM);
        assert!(text.contains("\nHIPROJ               111      10\n"));
        assert!(text.contains("\nJPART0                25\n"));
        assert!(text.contains("\nNUCRE                  0\n"));
    }

    #[test]
    fn test_non_ion_beam_has_no_hiproj() {
        let beam = Beam {
            particle_type: ParticleType::He4,
            ..Beam::default()
        };
        let text = serialize_beam(&beam, &SimulationOptions::default()).unwrap();
        assert!(!text.contains("HIPROJ"));
        assert!(text.contains("JPART0                24\n"));
    }

    #[test]
    fn test_mean_energy_loss_survives_the_percent_shift() {
        for loss in [7.0, 0.7, 29.0, 57.0, 1.0, 12.5, 0.35, 99.9] {
            let options = SimulationOptions {
                mean_energy_loss: loss,
                ..SimulationOptions::default()
            };
            let text = serialize_beam(&Beam::default(), &options).unwrap();
            let (_, parsed) = parse_beam(&text).unwrap();
            assert_eq!(parsed.mean_energy_loss, loss, "{}", text);
        }
    }

    #[test]
    fn test_every_line_keeps_fixed_columns() {
        let (beam, options) = heavy_ion_setup();
        for line in serialize_beam(&beam, &options).unwrap().lines() {
            assert_eq!((line.len() - 16) % 8, 0, "{:?}", line);
        }
    }

    #[test]
    fn test_parse_inverts_serialize() {
        let (beam, options) = heavy_ion_setup();
        let (parsed_beam, parsed_options) = parse_beam(HEAVY_ION_BEAM).unwrap();
        assert_eq!(parsed_beam, beam);
        assert_eq!(parsed_options, options);

        let (beam, options) = parse_beam(DEFAULT_BEAM).unwrap();
        assert_eq!(beam, Beam::default());
        assert_eq!(options, SimulationOptions::default());
        assert_eq!(serialize_beam(&beam, &options).unwrap(), DEFAULT_BEAM);
    }

    #[test]
    fn test_flat_profile_uses_negative_sigmas() {
        let beam = Beam {
            divergence: Divergence {
                sigma_x: 0.5,
                sigma_y: 0.25,
                distribution: Distribution::Flat,
            },
            ..Beam::default()
        };
        let text = serialize_beam(&beam, &SimulationOptions::default()).unwrap();
        assert!(text.contains("BEAMSIGMA           -0.5   -0.25\n"));
        let (parsed, _) = parse_beam(&text).unwrap();
        assert_eq!(parsed, beam);
    }

    #[test]
    fn test_unknown_scattering_code_is_rejected() {
        let text = DEFAULT_BEAM.replace("MSCAT                  2", "MSCAT                  7");
        assert!(matches!(
            parse_beam(&text),
            Err(Error::UnknownCode { field: "MSCAT", .. })
        ));
    }

    #[test]
    fn test_unknown_card_is_rejected() {
        let text = format!("{}RNDSEED         89736501\n", DEFAULT_BEAM);
        assert!(matches!(
            parse_beam(&text),
            Err(Error::UnknownCode { field: "beam card", .. })
        ));
    }

    #[test]
    fn test_ion_code_without_hiproj_is_malformed() {
        let text = DEFAULT_BEAM.replace("JPART0                 2", "JPART0                25");
        assert!(matches!(parse_beam(&text), Err(Error::Malformed { line: 7, .. })));
    }
}
