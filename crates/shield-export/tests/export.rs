use pretty_assertions::assert_eq;
use shield_export::setup::{BodyId, DetectorId, MaterialId, MaterialInfo, ZoneId};
use shield_export::shield::Medium;
use shield_export::{
    convert, export, import, ContextSnapshot, Error, ExportConfig, Setup, ShieldBodyId, ShieldInput,
    SimulationContext,
};

const PHANTOM: &str = r#"{
    "materials": [
        {
            "id": 7,
            "color": {"r": 0, "g": 0, "b": 255, "a": 255},
            "materialInfo": {"type": "predefined", "predefinedId": "water"}
        },
        {
            "id": 3,
            "color": {"r": 0, "g": 0, "b": 0, "a": 255},
            "materialInfo": {"type": "predefined", "predefinedId": "black_hole"}
        },
        {
            "id": 9,
            "color": {"r": 200, "g": 200, "b": 200, "a": 255},
            "materialInfo": {
                "type": "compound",
                "name": "Bolus",
                "density": 1.03,
                "stateOfMatter": "solid",
                "elements": [
                    {"isotope": "H-1 - Hydrogen", "relativeStoichiometricFraction": 10, "atomicMass": 1.008},
                    {"isotope": "C-*", "relativeStoichiometricFraction": 4, "iValue": 78}
                ]
            }
        }
    ],
    "bodies": [
        {"id": 300, "name": "world", "geometry": {"type": "sphere", "center": {"x": 0, "y": 0, "z": 0}, "radius": 100}},
        {"id": 200, "name": "phantom", "geometry": {"type": "cylinder", "baseCenter": {"x": 0, "y": 0, "z": 0}, "height": 30, "radius": 10}},
        {"id": 100, "name": "bolus", "geometry": {"type": "cuboid", "center": {"x": 0, "y": 0, "z": -1}, "size": {"x": 20, "y": 20, "z": 2}}}
    ],
    "zones": [
        {"id": 12, "parentId": 0, "name": "bolus", "baseId": 100, "materialId": 9, "construction": []},
        {"id": 11, "parentId": 10, "name": "phantom", "baseId": 200, "materialId": 7, "construction": []},
        {
            "id": 10, "parentId": 0, "name": "world", "baseId": 300, "materialId": 3,
            "construction": [
                {"bodyId": 200, "type": "subtract"},
                {"bodyId": 100, "type": "subtract"}
            ]
        }
    ],
    "detectors": [
        {
            "id": 1,
            "name": "Depth dose",
            "detectorGeometry": {
                "type": "cylinder",
                "radius": {"min": 0, "max": 10},
                "angle": {"min": 0, "max": 360},
                "zValue": {"min": 0, "max": 30},
                "slices": {"radius": 1, "angle": 1, "z": 300}
            },
            "scoring": "dose"
        },
        {
            "id": 2,
            "name": "Phantom energy",
            "detectorGeometry": {"type": "zone", "zoneId": 11},
            "scoredParticle": {"type": "proton"},
            "scoring": "energy"
        }
    ],
    "beam": {
        "direction": {"phi": 0, "theta": 0, "position": {"x": 0, "y": 0, "z": -10}},
        "divergence": {"sigmaX": 0.3, "sigmaY": 0.3, "distribution": "gaussian"},
        "particleType": {"type": "heavy_ion", "nucleonsCount": 12, "charge": 6},
        "initialBaseEnergy": 290,
        "initialEnergySigma": 1.5
    }
}"#;

const PHANTOM_GEO: &str = "\
*---><---><--------><------------------------------------------------>
    0    0          Water phantom
*---><---><--------><--------><--------><--------><--------><-------->
  SPH    1        0.        0.        0.      100.
  RCC    2        0.        0.        0.        0.        0.       30.
                 10.
  RPP    3      -10.       10.      -10.       10.       -2.        0.
  END
  001          +1
               -2
               -3
  002          +2
  003          +3
  END
    1    2    3
    0    1    2
";

fn phantom() -> Setup {
    serde_json::from_str(PHANTOM).unwrap()
}

fn config() -> ExportConfig {
    ExportConfig {
        title: "Water phantom".to_string(),
        ..ExportConfig::default()
    }
}

#[test]
fn test_geometry_numbers_follow_zone_order() {
    let (input, context) = convert(PHANTOM, &config()).unwrap();
    assert_eq!(input.geo, PHANTOM_GEO);

    // black_hole takes the fixed code, so water and the compound start at 1
    assert_eq!(context.material_local(MaterialId(3)), None);
    assert_eq!(context.material_local(MaterialId(7)).map(|m| m.0), Some(1));
    assert_eq!(context.material_local(MaterialId(9)).map(|m| m.0), Some(2));
    assert_eq!(context.body_local(BodyId(100)), Some(ShieldBodyId(3)));
}

#[test]
fn test_every_file_is_rendered() {
    let (input, _) = convert(PHANTOM, &config()).unwrap();

    assert!(input.beam.contains("HIPROJ                12       6\n"));
    assert!(input.beam.contains("JPART0                25\n"));
    assert!(input.beam.contains("BEAMSIGMA            0.3     0.3\n"));

    assert_eq!(
        input.mat,
        "\
MEDIUM                 1
ICRU                 276
END
MEDIUM                 2
STATE                  0
RHO                 1.03
NUCLID               H-1     10.
AMASS              1.008
NUCLID               C-*      4.
IVALUE               78.
END
"
    );

    assert_eq!(
        input.detect,
        "\
CYL               0.        0.        0.       10.      360.       30.
                   1         1       300        -1      DOSEdepth_dose
ZONE               2
                   2    ENERGYphantom_en
"
    );
}

#[test]
fn test_fresh_contexts_give_identical_output() {
    let setup = phantom();
    let mut first = SimulationContext::new();
    let mut second = SimulationContext::new();
    let a = export(&setup, &config(), &mut first).unwrap();
    let b = export(&setup, &config(), &mut second).unwrap();
    assert_eq!(a, b);

    let mut shuffled = setup.clone();
    shuffled.zones.reverse();
    shuffled.bodies.reverse();
    shuffled.materials.reverse();
    let c = export(&shuffled, &config(), &mut SimulationContext::new()).unwrap();
    assert_eq!(a, c);
}

#[test]
fn test_import_resolves_engine_numbers_to_setup_ids() {
    let setup = phantom();
    let mut context = SimulationContext::new();
    let input = export(&setup, &config(), &mut context).unwrap();

    let imported = import(&input, &context).unwrap();
    assert_eq!(imported.title, "Water phantom");
    assert_eq!(imported.beam, setup.beam);
    assert_eq!(imported.options, setup.options);

    for material in &imported.materials {
        let original = setup.material(material.id).unwrap();
        match (&material.material_info, &original.material_info) {
            (MaterialInfo::Predefined(a), MaterialInfo::Predefined(b)) => assert_eq!(a, b),
            (MaterialInfo::Compound(a), MaterialInfo::Compound(b)) => {
                assert_eq!(a.density, b.density);
                assert_eq!(a.elements.len(), b.elements.len());
            }
            _ => panic!("material {} changed kind", material.id),
        }
    }
    for body in &imported.bodies {
        assert_eq!(body.geometry, setup.body(body.id).unwrap().geometry);
    }

    let world = imported.zones.iter().find(|z| z.id == ZoneId(10)).unwrap();
    assert_eq!(world.medium, Medium::BlackHole);
    assert_eq!(world.construction, setup.zone(ZoneId(10)).unwrap().construction);

    let ids: Vec<_> = imported.detectors.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![DetectorId(1), DetectorId(2)]);
    assert_eq!(
        imported.detectors[1].detector_geometry,
        setup.detectors[1].detector_geometry
    );
}

#[test]
fn test_files_survive_a_directory_round_trip() {
    let (input, _) = convert(PHANTOM, &config()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("run");

    input.write_to_dir(&target).unwrap();
    for (name, text) in input.files() {
        assert_eq!(std::fs::read_to_string(target.join(name)).unwrap(), text);
    }
    assert_eq!(ShieldInput::read_from_dir(&target).unwrap(), input);
}

#[test]
fn test_restored_snapshot_resolves_engine_output() {
    let (input, context) = convert(PHANTOM, &config()).unwrap();
    let json = serde_json::to_string(&context.snapshot()).unwrap();

    let snapshot: ContextSnapshot = serde_json::from_str(&json).unwrap();
    let restored = SimulationContext::from_snapshot(&snapshot).unwrap();
    assert_eq!(
        restored.detector_for_file("phantom_en").unwrap(),
        DetectorId(2)
    );
    assert_eq!(import(&input, &restored).unwrap(), import(&input, &context).unwrap());
}

#[test]
fn test_invalid_setup_is_rejected_before_rendering() {
    let mut setup = phantom();
    setup.zones[0].base_id = BodyId(999);
    let mut context = SimulationContext::new();
    let err = export(&setup, &config(), &mut context).unwrap_err();
    assert!(matches!(err, Error::Validation { field: "baseId", .. }));
    assert!(context.bodies().is_empty());
}
