//! `mat.dat`: one `MEDIUM` block per locally numbered material

use crate::context::{ShieldMaterialId, SimulationContext};
use crate::error::{EntityKind, EntityRef, Error, Result};
use crate::format::{
    content_lines, engine_codes, render_record, split_record, EngineCode, Layout, Record, Value,
};
use crate::setup::{Color, Compound, Element, Material, MaterialId, MaterialInfo, Predefined, StateOfMatter};

engine_codes!(StateOfMatter, "STATE", {
    Solid => 0,
    Liquid => 1,
    Gas => 2,
});

pub const BLACK_HOLE: &str = "black_hole";
pub const VACUUM: &str = "vacuum";

/// Engine medium codes of the two media that need no `MEDIUM` block.
const BLACK_HOLE_CODE: u32 = 0;
const VACUUM_CODE: u32 = 1000;

/// Predefined media and their ICRU numbers. Elements use Z as their number.
const CATALOG: &[(&str, i64)] = &[
    ("hydrogen", 1),
    ("helium", 2),
    ("lithium", 3),
    ("beryllium", 4),
    ("boron", 5),
    ("carbon", 6),
    ("nitrogen", 7),
    ("oxygen", 8),
    ("fluorine", 9),
    ("neon", 10),
    ("sodium", 11),
    ("magnesium", 12),
    ("aluminium", 13),
    ("silicon", 14),
    ("phosphorus", 15),
    ("sulfur", 16),
    ("chlorine", 17),
    ("argon", 18),
    ("potassium", 19),
    ("calcium", 20),
    ("scandium", 21),
    ("titanium", 22),
    ("vanadium", 23),
    ("chromium", 24),
    ("manganese", 25),
    ("iron", 26),
    ("cobalt", 27),
    ("nickel", 28),
    ("copper", 29),
    ("zinc", 30),
    ("gallium", 31),
    ("germanium", 32),
    ("arsenic", 33),
    ("bromine", 35),
    ("krypton", 36),
    ("strontium", 38),
    ("yttrium", 39),
    ("zirconium", 40),
    ("niobium", 41),
    ("molybdenum", 42),
    ("technetium", 43),
    ("palladium", 46),
    ("silver", 47),
    ("cadmium", 48),
    ("indium", 49),
    ("tin", 50),
    ("antimony", 51),
    ("iodine", 53),
    ("xenon", 54),
    ("cesium", 55),
    ("barium", 56),
    ("lanthanum", 57),
    ("cerium", 58),
    ("neodymium", 60),
    ("samarium", 62),
    ("europium", 63),
    ("gadolinium", 64),
    ("terbium", 65),
    ("lutetium", 71),
    ("hafnium", 72),
    ("tantalum", 73),
    ("tungsten", 74),
    ("rhenium", 75),
    ("iridium", 77),
    ("platinum", 78),
    ("gold", 79),
    ("mercury", 80),
    ("lead", 82),
    ("bismuth", 83),
    ("actinium", 89),
    ("uranium", 92),
    ("plutonium", 94),
    ("americium", 95),
    // compounds
    ("adipose_tissue", 103),
    ("air", 104),
    ("bone_compact", 119),
    ("bone_cortical", 120),
    ("kapton", 179),
    ("methanol", 185),
    ("muscle_skeletal", 201),
    ("muscle_striated", 202),
    ("plastic_scintillator", 216),
    ("polyethylene", 221),
    ("pmma", 223),
    ("polystyrene", 226),
    ("water", 276),
];

/// Element symbols indexed by Z - 1.
const ELEMENTS: [&str; 98] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf",
];

/// ICRU number of a catalog medium; keys match case-insensitively.
pub fn icru_code(predefined_id: &str) -> Option<i64> {
    CATALOG
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(predefined_id.trim()))
        .map(|&(_, code)| code)
}

fn catalog_name(field: &'static str, code: i64) -> Result<&'static str> {
    CATALOG
        .iter()
        .find(|&&(_, c)| c == code)
        .map(|&(name, _)| name)
        .ok_or_else(|| Error::UnknownCode {
            field,
            code: code.to_string(),
        })
}

/// What a zone is filled with, as the assignment table sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Medium<M> {
    BlackHole,
    Vacuum,
    Material(M),
}

impl Medium<ShieldMaterialId> {
    pub fn code(self) -> u32 {
        match self {
            Medium::BlackHole => BLACK_HOLE_CODE,
            Medium::Vacuum => VACUUM_CODE,
            Medium::Material(local) => local.0,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            BLACK_HOLE_CODE => Medium::BlackHole,
            VACUUM_CODE => Medium::Vacuum,
            n => Medium::Material(ShieldMaterialId(n)),
        }
    }

    pub fn resolve(self, context: &SimulationContext) -> Result<Medium<MaterialId>> {
        Ok(match self {
            Medium::BlackHole => Medium::BlackHole,
            Medium::Vacuum => Medium::Vacuum,
            Medium::Material(local) => Medium::Material(context.material_global(local)?),
        })
    }
}

/// Medium code of `material`, numbering it in `context` unless it is one of
/// the fixed engine media.
pub fn medium_of(material: &Material, context: &mut SimulationContext) -> Medium<ShieldMaterialId> {
    if let MaterialInfo::Predefined(p) = &material.material_info {
        if p.predefined_id.eq_ignore_ascii_case(BLACK_HOLE) {
            return Medium::BlackHole;
        }
        if p.predefined_id.eq_ignore_ascii_case(VACUUM) {
            return Medium::Vacuum;
        }
    }
    Medium::Material(context.resolve_material(material.id))
}

/// Render `mat.dat`. Materials the context has not numbered yet are numbered
/// first, in ascending ID order; blocks follow medium number order.
pub fn serialize_materials(materials: &[Material], context: &mut SimulationContext) -> Result<String> {
    let mut unnumbered: Vec<&Material> = materials
        .iter()
        .filter(|m| context.material_local(m.id).is_none())
        .collect();
    unnumbered.sort_by_key(|m| m.id);
    for material in unnumbered {
        medium_of(material, context);
    }

    let mut out = String::new();
    for (local, global) in context.materials().iter() {
        let material = materials.iter().find(|m| m.id == *global).ok_or_else(|| {
            Error::invalid(
                EntityRef::new(EntityKind::Material, global.0),
                "id",
                "is numbered in the context but missing from the setup",
            )
        })?;
        write_medium(&mut out, *local, material)?;
    }
    Ok(out)
}

fn card(out: &mut String, keyword: &'static str, values: &[Value]) -> Result<()> {
    out.push_str(&render_record(Layout::CARD, keyword, values)?);
    out.push('\n');
    Ok(())
}

fn write_medium(out: &mut String, local: ShieldMaterialId, material: &Material) -> Result<()> {
    let entity = EntityRef::new(EntityKind::Material, material.id.0);
    card(out, "MEDIUM", &[Value::Int(i64::from(local.0))])?;
    match &material.material_info {
        MaterialInfo::Predefined(p) => {
            let icru = icru_code(&p.predefined_id).ok_or_else(|| {
                Error::invalid(
                    entity,
                    "predefinedId",
                    format!("`{}` is not in the engine catalog", p.predefined_id),
                )
            })?;
            card(out, "ICRU", &[Value::Int(icru)])?;
            if let Some(state) = p.state_of_matter {
                card(out, "STATE", &[Value::Int(state.code())])?;
            }
            if let Some(density) = p.density {
                card(out, "RHO", &[Value::Float(density)])?;
            }
            if p.load_external_stopping_power {
                card(out, "LOADDEDX", &[])?;
            }
        }
        MaterialInfo::Compound(c) => {
            card(out, "STATE", &[Value::Int(c.state_of_matter.code())])?;
            card(out, "RHO", &[Value::Float(c.density)])?;
            for element in &c.elements {
                let token = nuclide_token(entity, &element.isotope)?;
                card(
                    out,
                    "NUCLID",
                    &[
                        Value::Text(token.to_string()),
                        Value::Float(element.relative_stoichiometric_fraction),
                    ],
                )?;
                if let Some(mass) = element.atomic_mass {
                    card(out, "AMASS", &[Value::Float(mass)])?;
                }
                if let Some(i_value) = element.i_value {
                    card(out, "IVALUE", &[Value::Float(i_value)])?;
                }
            }
            if let Some(source) = &c.external_stopping_power_from_predefined {
                let icru = icru_code(source).ok_or_else(|| {
                    Error::invalid(
                        entity,
                        "externalStoppingPowerFromPredefined",
                        format!("`{}` is not in the engine catalog", source),
                    )
                })?;
                card(out, "LOADDEDX", &[Value::Int(icru)])?;
            }
        }
    }
    card(out, "END", &[])
}

/// `H-1 - Hydrogen` → `H-1`. The symbol must be a known element and the mass
/// number an integer or `*`.
fn nuclide_token<'a>(entity: EntityRef, isotope: &'a str) -> Result<&'a str> {
    let token = isotope.split_whitespace().next().unwrap_or_default();
    let valid = match token.split_once('-') {
        Some((symbol, mass)) => {
            ELEMENTS.contains(&symbol) && (mass == "*" || mass.parse::<u32>().is_ok())
        }
        None => false,
    };
    if !valid {
        return Err(Error::invalid(
            entity,
            "isotope",
            format!("`{}` is not an isotope token like `H-1` or `C-*`", isotope),
        ));
    }
    Ok(token)
}

/// A `MEDIUM` block read back from `mat.dat`. Compound names are not part of
/// the engine format and come back empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMedium {
    pub medium: ShieldMaterialId,
    pub material_info: MaterialInfo,
}

impl ParsedMedium {
    /// Attach the global ID the context handed out for this medium number.
    pub fn resolve(self, context: &SimulationContext) -> Result<Material> {
        Ok(Material {
            id: context.material_global(self.medium)?,
            color: Color::default(),
            material_info: self.material_info,
        })
    }
}

#[derive(Default)]
struct MediumDraft {
    line: usize,
    medium: u32,
    icru: Option<i64>,
    state: Option<StateOfMatter>,
    density: Option<f64>,
    loaddedx: Option<Option<i64>>,
    elements: Vec<Element>,
}

impl MediumDraft {
    fn read(&mut self, record: &Record<'_>) -> Result<()> {
        match record.keyword {
            "ICRU" => {
                record.expect_columns(1)?;
                self.icru = Some(record.int(0)?);
            }
            "STATE" => {
                record.expect_columns(1)?;
                self.state = Some(StateOfMatter::from_code(record.int(0)?)?);
            }
            "RHO" => {
                record.expect_columns(1)?;
                self.density = Some(record.float(0)?);
            }
            "LOADDEDX" => {
                self.loaddedx = Some(match record.column_count() {
                    0 => None,
                    1 => Some(record.int(0)?),
                    _ => {
                        return Err(Error::malformed(
                            record.line,
                            "LOADDEDX takes at most one column",
                        ))
                    }
                });
            }
            "NUCLID" => {
                record.expect_columns(2)?;
                self.elements.push(Element {
                    isotope: record.text(0)?.to_string(),
                    relative_stoichiometric_fraction: record.float(1)?,
                    atomic_mass: None,
                    i_value: None,
                });
            }
            "AMASS" | "IVALUE" => {
                record.expect_columns(1)?;
                let value = record.float(0)?;
                let element = self.elements.last_mut().ok_or_else(|| {
                    Error::malformed(record.line, format!("{} before any NUCLID", record.keyword))
                })?;
                if record.keyword == "AMASS" {
                    element.atomic_mass = Some(value);
                } else {
                    element.i_value = Some(value);
                }
            }
            other => {
                return Err(Error::UnknownCode {
                    field: "material card",
                    code: other.to_string(),
                })
            }
        }
        Ok(())
    }

    fn finish(self, end_line: usize) -> Result<ParsedMedium> {
        let missing = |what: &str| Error::malformed(end_line, format!("MEDIUM {} has no {}", self.medium, what));
        let material_info = match (self.icru, self.elements.is_empty()) {
            (Some(icru), true) => {
                let load_external_stopping_power = match self.loaddedx {
                    None => false,
                    Some(None) => true,
                    Some(Some(_)) => {
                        return Err(Error::malformed(
                            end_line,
                            "LOADDEDX of a predefined medium takes no value",
                        ))
                    }
                };
                MaterialInfo::Predefined(Predefined {
                    predefined_id: catalog_name("ICRU", icru)?.to_string(),
                    state_of_matter: self.state,
                    density: self.density,
                    load_external_stopping_power,
                })
            }
            (None, false) => {
                let external_stopping_power_from_predefined = match self.loaddedx {
                    None => None,
                    Some(Some(icru)) => Some(catalog_name("LOADDEDX", icru)?.to_string()),
                    Some(None) => {
                        return Err(Error::malformed(
                            end_line,
                            "LOADDEDX of a compound needs a source medium",
                        ))
                    }
                };
                MaterialInfo::Compound(Compound {
                    name: String::new(),
                    density: self.density.ok_or_else(|| missing("RHO"))?,
                    state_of_matter: self.state.ok_or_else(|| missing("STATE"))?,
                    elements: self.elements,
                    external_stopping_power_from_predefined,
                })
            }
            (Some(_), false) => {
                return Err(Error::malformed(self.line, "MEDIUM mixes ICRU and NUCLID"))
            }
            (None, true) => return Err(missing("ICRU or NUCLID")),
        };
        Ok(ParsedMedium {
            medium: ShieldMaterialId(self.medium),
            material_info,
        })
    }
}

/// Parse `mat.dat` into medium blocks carrying local medium numbers.
pub fn parse_materials(text: &str) -> Result<Vec<ParsedMedium>> {
    let mut media = Vec::new();
    let mut current: Option<MediumDraft> = None;

    for (line, content) in content_lines(text) {
        let record = split_record(line, content, Layout::CARD)?;
        match record.keyword {
            "MEDIUM" => {
                if current.is_some() {
                    return Err(Error::malformed(line, "MEDIUM inside an open block"));
                }
                record.expect_columns(1)?;
                let number = record.int(0)?;
                let medium = u32::try_from(number)
                    .ok()
                    .filter(|n| *n != BLACK_HOLE_CODE && *n != VACUUM_CODE)
                    .ok_or_else(|| Error::malformed(line, format!("{} is not a medium number", number)))?;
                current = Some(MediumDraft {
                    line,
                    medium,
                    ..Default::default()
                });
            }
            "END" => {
                record.expect_columns(0)?;
                let draft = current
                    .take()
                    .ok_or_else(|| Error::malformed(line, "END outside a MEDIUM block"))?;
                media.push(draft.finish(line)?);
            }
            keyword => match current.as_mut() {
                Some(draft) => draft.read(&record)?,
                None => {
                    return Err(Error::malformed(line, format!("{} outside a MEDIUM block", keyword)))
                }
            },
        }
    }

    if let Some(draft) = current {
        return Err(Error::malformed(draft.line, format!("MEDIUM {} has no END", draft.medium)));
    }
    Ok(media)
}
