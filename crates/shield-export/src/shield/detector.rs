//! `detect.dat`: scoring volumes, two lines per detector
//!
//! The first line names the volume (`CYL`, `MSH` or `ZONE`) and its extents,
//! the continuation line carries bin counts, the scored particle, the
//! quantity and the output filename.

use nalgebra::Vector3;

use crate::context::{ShieldZoneId, SimulationContext};
use crate::error::{EntityKind, EntityRef, Error, Result};
use crate::format::{
    chunks, content_lines, engine_tokens, render_record, split_record, EngineToken, Layout, Value,
};
use crate::setup::detector::{CylinderSlices, MeshSlices, Range};
use crate::setup::{Detector, DetectorGeometry, ParticleType, ScoringType};

use super::geometry::{center_and_size, extents};
use super::particle;

engine_tokens!(ScoringType, "scoring quantity", {
    Energy => "ENERGY",
    Fluence => "FLUENCE",
    CrossFluence => "CROSSFLU",
    LetFluence => "LETFLU",
    Dose => "DOSE",
    AverageEnergy => "AVG-ENERGY",
    AverageLet => "AVG-LET",
    Counter => "COUNTER",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Volume {
    Cylinder,
    Mesh,
    Zone,
}

engine_tokens!(Volume, "detector geometry", {
    Cylinder => "CYL",
    Mesh => "MSH",
    Zone => "ZONE",
});

/// Particle column value that scores every particle.
const ALL_PARTICLES: i64 = -1;

fn particle_code(detector: &Detector) -> Result<i64> {
    match detector.scored_particle {
        None => Ok(ALL_PARTICLES),
        Some(ParticleType::HeavyIon { .. }) => Err(Error::invalid(
            EntityRef::new(EntityKind::Detector, detector.id.0),
            "scoredParticle",
            "heavy ions cannot be selected for scoring",
        )),
        Some(p) => Ok(particle::code(p)),
    }
}

fn push(out: &mut String, keyword: &'static str, values: &[Value]) -> Result<()> {
    out.push_str(&render_record(Layout::DETECT, keyword, values)?);
    out.push('\n');
    Ok(())
}

/// Render `detect.dat` in ascending detector ID order. Zone detectors need
/// their zone numbered already, which the geometry export does.
pub fn serialize_detectors(detectors: &[Detector], context: &mut SimulationContext) -> Result<String> {
    let mut sorted: Vec<&Detector> = detectors.iter().collect();
    sorted.sort_by_key(|d| d.id);

    let mut out = String::new();
    for detector in sorted {
        let filename = context.resolve_detector(detector.id, &detector.name);
        let tail = [
            Value::Int(particle_code(detector)?),
            Value::Text(detector.scoring.token().to_string()),
            Value::Text(filename),
        ];

        let (volume, extents_row, bins): (Volume, Vec<Value>, Vec<Value>) =
            match detector.detector_geometry {
                DetectorGeometry::Cylinder {
                    radius,
                    angle,
                    z_value,
                    slices,
                } => (
                    Volume::Cylinder,
                    [radius.min, angle.min, z_value.min, radius.max, angle.max, z_value.max]
                        .into_iter()
                        .map(Value::Float)
                        .collect(),
                    [slices.radius, slices.angle, slices.z]
                        .into_iter()
                        .map(|n| Value::Int(i64::from(n)))
                        .collect(),
                ),
                DetectorGeometry::Mesh { center, size, slices } => {
                    let (min, max) = extents(center, size);
                    (
                        Volume::Mesh,
                        min.iter().chain(max.iter()).map(|v| Value::Float(*v)).collect(),
                        [slices.x, slices.y, slices.z]
                            .into_iter()
                            .map(|n| Value::Int(i64::from(n)))
                            .collect(),
                    )
                }
                DetectorGeometry::Zone { zone_id } => {
                    let number = context.zone_local(zone_id).ok_or_else(|| {
                        Error::invalid(
                            EntityRef::new(EntityKind::Detector, detector.id.0),
                            "zoneId",
                            format!("zone {} has no engine number yet", zone_id),
                        )
                    })?;
                    (Volume::Zone, vec![Value::Int(i64::from(number.0))], Vec::new())
                }
            };

        push(&mut out, volume.token(), &extents_row)?;
        let mut continuation = bins;
        continuation.extend(tail);
        push(&mut out, "", &continuation)?;
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoringVolume {
    Geometry(DetectorGeometry),
    Zone(ShieldZoneId),
}

/// A detector read back from `detect.dat`, keyed by its output filename.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDetector {
    pub filename: String,
    pub volume: ScoringVolume,
    pub scored_particle: Option<ParticleType>,
    pub scoring: ScoringType,
}

impl ParsedDetector {
    /// The display name is not stored; the filename stands in for it.
    pub fn resolve(self, context: &SimulationContext) -> Result<Detector> {
        let detector_geometry = match self.volume {
            ScoringVolume::Geometry(geometry) => geometry,
            ScoringVolume::Zone(number) => DetectorGeometry::Zone {
                zone_id: context.zone_global(number)?,
            },
        };
        Ok(Detector {
            id: context.detector_for_file(&self.filename)?,
            name: self.filename,
            detector_geometry,
            scored_particle: self.scored_particle,
            scoring: self.scoring,
        })
    }
}

fn count(line: usize, text: &str) -> Result<u32> {
    text.parse()
        .map_err(|_| Error::malformed(line, format!("`{}` is not a bin count", text)))
}

fn number(line: usize, text: &str) -> Result<f64> {
    text.parse()
        .map_err(|_| Error::malformed(line, format!("`{}` is not a number", text)))
}

fn detector_from_columns(
    head_line: usize,
    volume: Volume,
    head: &[f64],
    line: usize,
    tail: &[&str],
) -> Result<ParsedDetector> {
    let (head_arity, bin_count) = match volume {
        Volume::Cylinder | Volume::Mesh => (6, 3),
        Volume::Zone => (1, 0),
    };
    if head.len() != head_arity {
        return Err(Error::malformed(
            head_line,
            format!("{} expects {} column(s), found {}", volume.token(), head_arity, head.len()),
        ));
    }
    if tail.len() != bin_count + 3 {
        return Err(Error::malformed(
            line,
            format!("continuation expects {} column(s), found {}", bin_count + 3, tail.len()),
        ));
    }

    let bins = tail[..bin_count]
        .iter()
        .map(|t| count(line, t))
        .collect::<Result<Vec<_>>>()?;
    let code: i64 = tail[bin_count]
        .parse()
        .map_err(|_| Error::malformed(line, format!("`{}` is not a particle code", tail[bin_count])))?;
    let scored_particle = match code {
        ALL_PARTICLES => None,
        particle::HEAVY_ION => return Err(Error::malformed(line, "heavy ions cannot be scored")),
        code => Some(particle::from_code("detector particle", code)?),
    };
    let scoring = ScoringType::from_token(tail[bin_count + 1])?;
    let filename = tail[bin_count + 2].to_string();

    let volume = match volume {
        Volume::Cylinder => ScoringVolume::Geometry(DetectorGeometry::Cylinder {
            radius: Range::new(head[0], head[3]),
            angle: Range::new(head[1], head[4]),
            z_value: Range::new(head[2], head[5]),
            slices: CylinderSlices {
                radius: bins[0],
                angle: bins[1],
                z: bins[2],
            },
        }),
        Volume::Mesh => {
            let (center, size) = center_and_size(
                Vector3::new(head[0], head[1], head[2]),
                Vector3::new(head[3], head[4], head[5]),
            );
            ScoringVolume::Geometry(DetectorGeometry::Mesh {
                center,
                size,
                slices: MeshSlices {
                    x: bins[0],
                    y: bins[1],
                    z: bins[2],
                },
            })
        }
        Volume::Zone => {
            if head[0].fract() != 0.0 || head[0] < 1.0 || head[0] > f64::from(u32::MAX) {
                return Err(Error::malformed(head_line, "ZONE needs a zone number"));
            }
            ScoringVolume::Zone(ShieldZoneId(head[0] as u32))
        }
    };

    Ok(ParsedDetector {
        filename,
        volume,
        scored_particle,
        scoring,
    })
}

fn is_continuation(content: &str) -> bool {
    content.len() > Layout::DETECT.keyword_width
        && content.is_char_boundary(Layout::DETECT.keyword_width)
        && content[..Layout::DETECT.keyword_width].trim().is_empty()
}

/// Parse `detect.dat` into detectors keyed by output filename.
pub fn parse_detectors(text: &str) -> Result<Vec<ParsedDetector>> {
    let mut detectors = Vec::new();
    let mut pending: Option<(usize, Volume, Vec<f64>)> = None;

    for (line, content) in content_lines(text) {
        if is_continuation(content) {
            let (head_line, volume, head) = pending
                .take()
                .ok_or_else(|| Error::malformed(line, "continuation line without a detector"))?;
            let tail = chunks(line, &content[Layout::DETECT.keyword_width..], Layout::DETECT.column_width)?;
            detectors.push(detector_from_columns(head_line, volume, &head, line, &tail)?);
            continue;
        }

        if let Some((head_line, volume, _)) = pending {
            return Err(Error::malformed(
                head_line,
                format!("{} has no continuation line", volume.token()),
            ));
        }
        let record = split_record(line, content, Layout::DETECT)?;
        let volume = Volume::from_token(record.keyword)?;
        let head = (0..record.column_count())
            .map(|i| record.text(i).and_then(|t| number(line, t)))
            .collect::<Result<Vec<_>>>()?;
        pending = Some((line, volume, head));
    }

    if let Some((head_line, volume, _)) = pending {
        return Err(Error::malformed(
            head_line,
            format!("{} has no continuation line", volume.token()),
        ));
    }
    Ok(detectors)
}
