//! Simulation context: global ↔ engine-local identifier bookkeeping
//!
//! The setup names entities by global IDs; SHIELD-HIT12A wants small
//! contiguous numbers per kind (media, bodies, zones) and names detector
//! output by file. A [`SimulationContext`] hands out local IDs in
//! first-encounter order and remembers the pairing both ways so engine
//! output can be traced back to the setup.
//!
//! One context belongs to one export session. Serializers take it by
//! `&mut`; nothing in it is global.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EntityKind, EntityRef, Error, Result};
use crate::format::Layout;
use crate::setup::{BodyId, DetectorId, MaterialId, ZoneId};

/// Medium number used in `mat.dat` and the zone assignment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShieldMaterialId(pub u32);

/// Body number used in `geo.dat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShieldBodyId(pub u32);

/// Zone number used in `geo.dat` and zone detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShieldZoneId(pub u32);

macro_rules! display_inner {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        })+
    };
}

display_inner!(ShieldMaterialId, ShieldBodyId, ShieldZoneId);

/// Medium codes with fixed engine meaning (black hole, vacuum). They are
/// never handed out as local IDs.
pub const RESERVED_MEDIA: [u32; 2] = [0, 1000];

/// Detector output files are named in a single `detect.dat` column.
pub const MAX_FILENAME_LEN: usize = Layout::DETECT.column_width;

/// Bidirectional map between local and global IDs of one kind.
#[derive(Debug, Clone)]
pub struct IdMap<L, G> {
    to_local: HashMap<G, L>,
    to_global: BTreeMap<L, G>,
}

impl<L, G> Default for IdMap<L, G> {
    fn default() -> Self {
        Self {
            to_local: HashMap::new(),
            to_global: BTreeMap::new(),
        }
    }
}

impl<L, G> IdMap<L, G>
where
    L: Ord + Clone,
    G: Eq + Hash + Copy,
{
    pub fn local(&self, global: &G) -> Option<&L> {
        self.to_local.get(global)
    }

    pub fn global(&self, local: &L) -> Option<G> {
        self.to_global.get(local).copied()
    }

    pub fn len(&self) -> usize {
        self.to_global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_global.is_empty()
    }

    /// Pairs in ascending local order.
    pub fn iter(&self) -> impl Iterator<Item = (&L, &G)> {
        self.to_global.iter()
    }

    /// Record a pair; refuses when either side is already taken.
    fn insert(&mut self, local: L, global: G) -> bool {
        if self.to_local.contains_key(&global) || self.to_global.contains_key(&local) {
            return false;
        }
        self.to_local.insert(global, local.clone());
        self.to_global.insert(local, global);
        true
    }

    fn last_local(&self) -> Option<&L> {
        self.to_global.keys().next_back()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationContext {
    materials: IdMap<ShieldMaterialId, MaterialId>,
    bodies: IdMap<ShieldBodyId, BodyId>,
    zones: IdMap<ShieldZoneId, ZoneId>,
    detectors: IdMap<String, DetectorId>,
}

impl SimulationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local medium number of `id`, allocating the next one on first sight.
    pub fn resolve_material(&mut self, id: MaterialId) -> ShieldMaterialId {
        if let Some(local) = self.materials.local(&id) {
            return *local;
        }
        let mut next = self.materials.last_local().map_or(1, |l| l.0 + 1);
        while RESERVED_MEDIA.contains(&next) {
            next += 1;
        }
        let local = ShieldMaterialId(next);
        self.materials.insert(local, id);
        tracing::debug!(material = %id, medium = %local, "allocated medium number");
        local
    }

    pub fn resolve_body(&mut self, id: BodyId) -> ShieldBodyId {
        if let Some(local) = self.bodies.local(&id) {
            return *local;
        }
        let local = ShieldBodyId(self.bodies.last_local().map_or(1, |l| l.0 + 1));
        self.bodies.insert(local, id);
        tracing::debug!(body = %id, number = %local, "allocated body number");
        local
    }

    pub fn resolve_zone(&mut self, id: ZoneId) -> ShieldZoneId {
        if let Some(local) = self.zones.local(&id) {
            return *local;
        }
        let local = ShieldZoneId(self.zones.last_local().map_or(1, |l| l.0 + 1));
        self.zones.insert(local, id);
        tracing::debug!(zone = %id, number = %local, "allocated zone number");
        local
    }

    /// Output filename of detector `id`, derived from its `name` on first
    /// sight and de-duplicated against files already handed out.
    pub fn resolve_detector(&mut self, id: DetectorId, name: &str) -> String {
        if let Some(filename) = self.detectors.local(&id) {
            return filename.clone();
        }
        let base = sanitize_filename(name);
        let mut filename = base.clone();
        let mut n = 1;
        while self.detectors.global(&filename).is_some() {
            let suffix = format!("_{}", n);
            let keep = MAX_FILENAME_LEN.saturating_sub(suffix.len()).min(base.len());
            filename = format!("{}{}", &base[..keep], suffix);
            n += 1;
        }
        self.detectors.insert(filename.clone(), id);
        tracing::debug!(detector = %id, file = %filename, "allocated detector file");
        filename
    }

    pub fn material_local(&self, id: MaterialId) -> Option<ShieldMaterialId> {
        self.materials.local(&id).copied()
    }

    pub fn body_local(&self, id: BodyId) -> Option<ShieldBodyId> {
        self.bodies.local(&id).copied()
    }

    pub fn zone_local(&self, id: ZoneId) -> Option<ShieldZoneId> {
        self.zones.local(&id).copied()
    }

    pub fn material_global(&self, local: ShieldMaterialId) -> Result<MaterialId> {
        self.materials.global(&local).ok_or_else(|| Error::NotFound {
            kind: EntityKind::Material,
            local: local.to_string(),
        })
    }

    pub fn body_global(&self, local: ShieldBodyId) -> Result<BodyId> {
        self.bodies.global(&local).ok_or_else(|| Error::NotFound {
            kind: EntityKind::Body,
            local: local.to_string(),
        })
    }

    pub fn zone_global(&self, local: ShieldZoneId) -> Result<ZoneId> {
        self.zones.global(&local).ok_or_else(|| Error::NotFound {
            kind: EntityKind::Zone,
            local: local.to_string(),
        })
    }

    /// Detector that writes `filename`, for correlating engine reports.
    pub fn detector_for_file(&self, filename: &str) -> Result<DetectorId> {
        self.detectors
            .global(&filename.to_string())
            .ok_or_else(|| Error::NotFound {
                kind: EntityKind::Detector,
                local: filename.to_string(),
            })
    }

    pub fn materials(&self) -> &IdMap<ShieldMaterialId, MaterialId> {
        &self.materials
    }

    pub fn bodies(&self) -> &IdMap<ShieldBodyId, BodyId> {
        &self.bodies
    }

    pub fn zones(&self) -> &IdMap<ShieldZoneId, ZoneId> {
        &self.zones
    }

    pub fn detectors(&self) -> &IdMap<String, DetectorId> {
        &self.detectors
    }

    /// Freeze the mappings for later report correlation.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            exported_at: Utc::now(),
            materials: pairs(&self.materials),
            bodies: pairs(&self.bodies),
            zones: pairs(&self.zones),
            detectors: pairs(&self.detectors),
        }
    }

    /// Rebuild a context from a snapshot. Counters continue after the
    /// highest restored local ID.
    pub fn from_snapshot(snapshot: &ContextSnapshot) -> Result<Self> {
        let mut context = Self::new();
        restore(&mut context.materials, &snapshot.materials, EntityKind::Material, |g| g.0)?;
        restore(&mut context.bodies, &snapshot.bodies, EntityKind::Body, |g| g.0)?;
        restore(&mut context.zones, &snapshot.zones, EntityKind::Zone, |g| g.0)?;
        restore(&mut context.detectors, &snapshot.detectors, EntityKind::Detector, |g| g.0)?;
        Ok(context)
    }
}

/// Lowercase ASCII alphanumerics and `_`, at most one column wide.
fn sanitize_filename(name: &str) -> String {
    let mut filename: String = name
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            ' ' | '-' | '_' => Some('_'),
            _ => None,
        })
        .take(MAX_FILENAME_LEN)
        .collect();
    if filename.trim_matches('_').is_empty() {
        filename = "detector".to_string();
    }
    filename
}

/// One local ↔ global pair in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping<L, G> {
    pub local: L,
    pub global: G,
}

/// Serializable copy of a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub exported_at: DateTime<Utc>,
    pub materials: Vec<Mapping<ShieldMaterialId, MaterialId>>,
    pub bodies: Vec<Mapping<ShieldBodyId, BodyId>>,
    pub zones: Vec<Mapping<ShieldZoneId, ZoneId>>,
    pub detectors: Vec<Mapping<String, DetectorId>>,
}

fn pairs<L, G>(map: &IdMap<L, G>) -> Vec<Mapping<L, G>>
where
    L: Ord + Clone,
    G: Eq + Hash + Copy,
{
    map.iter()
        .map(|(local, global)| Mapping {
            local: local.clone(),
            global: *global,
        })
        .collect()
}

fn restore<L, G>(
    map: &mut IdMap<L, G>,
    pairs: &[Mapping<L, G>],
    kind: EntityKind,
    raw: impl Fn(G) -> u64,
) -> Result<()>
where
    L: Ord + Clone,
    G: Eq + Hash + Copy,
{
    for pair in pairs {
        if !map.insert(pair.local.clone(), pair.global) {
            return Err(Error::invalid(
                EntityRef::new(kind, raw(pair.global)),
                "local",
                "is mapped twice in the snapshot",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_encounter_order_not_numeric_order() {
        let mut ctx = SimulationContext::new();
        assert_eq!(ctx.resolve_body(BodyId(300)), ShieldBodyId(1));
        assert_eq!(ctx.resolve_body(BodyId(100)), ShieldBodyId(2));
        assert_eq!(ctx.resolve_body(BodyId(300)), ShieldBodyId(1));
        assert_eq!(ctx.resolve_body(BodyId(200)), ShieldBodyId(3));
        assert_eq!(ctx.bodies().len(), 3);
        assert_eq!(ctx.body_global(ShieldBodyId(2)).unwrap(), BodyId(100));
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut ctx = SimulationContext::new();
        assert_eq!(ctx.resolve_material(MaterialId(7)), ShieldMaterialId(1));
        assert_eq!(ctx.resolve_body(BodyId(7)), ShieldBodyId(1));
        assert_eq!(ctx.resolve_zone(ZoneId(7)), ShieldZoneId(1));
        assert_eq!(ctx.resolve_material(MaterialId(8)), ShieldMaterialId(2));
        assert_eq!(ctx.resolve_zone(ZoneId(9)), ShieldZoneId(2));
    }

    #[test]
    fn test_unseen_local_is_not_found() {
        let ctx = SimulationContext::new();
        let err = ctx.material_global(ShieldMaterialId(4)).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                kind: EntityKind::Material,
                ..
            }
        ));
        assert!(ctx.detector_for_file("dose").is_err());
    }

    #[test]
    fn test_reserved_medium_codes_are_skipped() {
        let mut ctx = SimulationContext::new();
        for id in 1..=1001 {
            ctx.resolve_material(MaterialId(id));
        }
        assert_eq!(ctx.material_local(MaterialId(999)), Some(ShieldMaterialId(999)));
        assert_eq!(ctx.material_local(MaterialId(1000)), Some(ShieldMaterialId(1001)));
        assert!(ctx.material_global(ShieldMaterialId(1000)).is_err());
    }

    #[test]
    fn test_detector_files_are_sanitized_and_unique() {
        let mut ctx = SimulationContext::new();
        assert_eq!(ctx.resolve_detector(DetectorId(1), "Depth Dose Z"), "depth_dose");
        assert_eq!(ctx.resolve_detector(DetectorId(2), "depth-dose"), "depth_do_1");
        assert_eq!(ctx.resolve_detector(DetectorId(3), "Depth dose"), "depth_do_2");
        assert_eq!(ctx.resolve_detector(DetectorId(4), "µ!"), "detector");
        assert_eq!(ctx.resolve_detector(DetectorId(1), "renamed"), "depth_dose");
        assert_eq!(ctx.detector_for_file("depth_do_1").unwrap(), DetectorId(2));
    }

    #[test]
    fn test_snapshot_restores_and_continues_counting() {
        let mut ctx = SimulationContext::new();
        ctx.resolve_material(MaterialId(42));
        ctx.resolve_body(BodyId(5));
        ctx.resolve_detector(DetectorId(9), "fluence");

        let json = serde_json::to_string(&ctx.snapshot()).unwrap();
        let snapshot: ContextSnapshot = serde_json::from_str(&json).unwrap();
        let mut restored = SimulationContext::from_snapshot(&snapshot).unwrap();

        assert_eq!(restored.material_global(ShieldMaterialId(1)).unwrap(), MaterialId(42));
        assert_eq!(restored.detector_for_file("fluence").unwrap(), DetectorId(9));
        assert_eq!(restored.resolve_body(BodyId(6)), ShieldBodyId(2));
    }

    #[test]
    fn test_snapshot_with_duplicate_pairs_is_rejected() {
        let mut snapshot = SimulationContext::new().snapshot();
        snapshot.bodies = vec![
            Mapping {
                local: ShieldBodyId(1),
                global: BodyId(1),
            },
            Mapping {
                local: ShieldBodyId(1),
                global: BodyId(2),
            },
        ];
        assert!(matches!(
            SimulationContext::from_snapshot(&snapshot),
            Err(Error::Validation { field: "local", .. })
        ));
    }
}
