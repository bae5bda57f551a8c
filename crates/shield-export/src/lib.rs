//! shield-export: Translate simulation setups to SHIELD-HIT12A input files
//!
//! This crate provides:
//! - The engine-agnostic setup model (JSON interchange)
//! - Global ↔ engine-local identifier bookkeeping per export session
//! - Fixed-column writers and parsers for `beam.dat`, `mat.dat`, `geo.dat`
//!   and `detect.dat`
//!
//! SHIELD-HIT12A numbers media, bodies and zones with small contiguous
//! integers. A [`SimulationContext`] hands those out while exporting and
//! translates them back when reading engine files or results.

pub mod context;
pub mod error;
pub mod format;
pub mod setup;
pub mod shield;

pub use context::{ContextSnapshot, ShieldBodyId, ShieldMaterialId, ShieldZoneId, SimulationContext};
pub use error::{EntityKind, EntityRef, Error, Result};
pub use setup::Setup;
pub use shield::{export, import, ImportedInput, ShieldInput};

/// Main entry point: parse setup JSON and render the four input files.
///
/// Returns the context alongside the files so engine output can be traced
/// back to setup IDs.
pub fn convert(json: &str, config: &ExportConfig) -> Result<(ShieldInput, SimulationContext)> {
    let setup: Setup = serde_json::from_str(json)?;
    let mut context = SimulationContext::new();
    let input = export(&setup, config, &mut context)?;
    Ok((input, context))
}

/// Configuration for the export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Geometry title written to the `geo.dat` header
    pub title: String,
    /// `jdbg1` and `jdbg2` geometry debug switches
    pub debug_flags: [i32; 2],
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "Unnamed geometry".to_string(),
            debug_flags: [0, 0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_json_is_a_json_error() {
        let err = convert("{\"zones\": 3}", &ExportConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_empty_setup_converts() {
        let (input, context) = convert("{}", &ExportConfig::default()).unwrap();
        assert!(input.mat.is_empty());
        assert!(input.detect.is_empty());
        assert!(input.beam.starts_with("APCORR                 0\n"));
        assert!(input.geo.contains("    0    0          Unnamed geometry\n"));
        assert!(context.zones().is_empty());
    }
}
