//! SHIELD-HIT12A input files
//!
//! One module per file: [`beam`], [`material`], [`geometry`] and
//! [`detector`]. Each has a writer that numbers entities through the
//! [`SimulationContext`] and a parser that reads the text back into
//! fragments carrying engine numbers, which the same context resolves to
//! setup IDs.

pub mod beam;
pub mod detector;
pub mod geometry;
pub mod material;
pub mod particle;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use beam::{parse_beam, serialize_beam};
pub use detector::{parse_detectors, serialize_detectors, ParsedDetector, ScoringVolume};
pub use geometry::{parse_geometry, serialize_geometry, ParsedBody, ParsedGeometry, ParsedZone, ZoneFragment};
pub use material::{parse_materials, serialize_materials, Medium, ParsedMedium};

use crate::context::SimulationContext;
use crate::error::Result;
use crate::setup::{Beam, Body, Detector, Material, Setup, SimulationOptions};
use crate::ExportConfig;

pub const BEAM_FILE: &str = "beam.dat";
pub const MAT_FILE: &str = "mat.dat";
pub const GEO_FILE: &str = "geo.dat";
pub const DETECT_FILE: &str = "detect.dat";

/// The four input files of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShieldInput {
    pub beam: String,
    pub mat: String,
    pub geo: String,
    pub detect: String,
}

impl ShieldInput {
    /// File names paired with their contents, in engine reading order.
    pub fn files(&self) -> [(&'static str, &str); 4] {
        [
            (BEAM_FILE, self.beam.as_str()),
            (MAT_FILE, self.mat.as_str()),
            (GEO_FILE, self.geo.as_str()),
            (DETECT_FILE, self.detect.as_str()),
        ]
    }

    /// Write all four files into `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        for (name, text) in self.files() {
            fs::write(dir.join(name), text)?;
        }
        tracing::info!(dir = %dir.display(), "wrote SHIELD-HIT12A input files");
        Ok(())
    }

    /// Read the four files back from `dir`.
    pub fn read_from_dir(dir: &Path) -> Result<Self> {
        Ok(Self {
            beam: fs::read_to_string(dir.join(BEAM_FILE))?,
            mat: fs::read_to_string(dir.join(MAT_FILE))?,
            geo: fs::read_to_string(dir.join(GEO_FILE))?,
            detect: fs::read_to_string(dir.join(DETECT_FILE))?,
        })
    }
}

/// Validate `setup` and render every input file. Geometry goes first so zone
/// numbers exist by the time detectors refer to them.
pub fn export(
    setup: &Setup,
    config: &ExportConfig,
    context: &mut SimulationContext,
) -> Result<ShieldInput> {
    setup.validate()?;

    let geo = serialize_geometry(setup, config, context)?;
    let mat = serialize_materials(&setup.materials, context)?;
    let beam = serialize_beam(&setup.beam, &setup.options)?;
    let detect = serialize_detectors(&setup.detectors, context)?;

    tracing::debug!(
        media = context.materials().len(),
        bodies = context.bodies().len(),
        zones = context.zones().len(),
        detectors = context.detectors().len(),
        "export numbered entities"
    );
    Ok(ShieldInput {
        beam,
        mat,
        geo,
        detect,
    })
}

/// Input files read back and resolved to setup IDs. Only what the engine
/// format stores survives: names, colors and zone parents do not.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedInput {
    pub title: String,
    pub beam: Beam,
    pub options: SimulationOptions,
    pub materials: Vec<Material>,
    pub bodies: Vec<Body>,
    pub zones: Vec<ZoneFragment>,
    pub detectors: Vec<Detector>,
}

/// Parse all four files and resolve engine numbers through `context`.
pub fn import(input: &ShieldInput, context: &SimulationContext) -> Result<ImportedInput> {
    let (beam, options) = parse_beam(&input.beam)?;
    let materials = parse_materials(&input.mat)?
        .into_iter()
        .map(|m| m.resolve(context))
        .collect::<Result<Vec<_>>>()?;
    let geometry = parse_geometry(&input.geo)?;
    let bodies = geometry
        .bodies
        .into_iter()
        .map(|b| b.resolve(context))
        .collect::<Result<Vec<_>>>()?;
    let zones = geometry
        .zones
        .into_iter()
        .map(|z| z.resolve(context))
        .collect::<Result<Vec<_>>>()?;
    let detectors = parse_detectors(&input.detect)?
        .into_iter()
        .map(|d| d.resolve(context))
        .collect::<Result<Vec<_>>>()?;

    Ok(ImportedInput {
        title: geometry.title,
        beam,
        options,
        materials,
        bodies,
        zones,
        detectors,
    })
}
