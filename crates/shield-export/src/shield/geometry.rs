//! `geo.dat`: bodies, CSG zones and the zone → medium table
//!
//! Numbering follows a fixed traversal so two exports of the same setup are
//! byte-identical: zones in ascending ID order, and for each zone its base
//! body, its operation bodies in order, then its material. Bodies and
//! materials no zone references are numbered afterwards in ascending ID
//! order.
//!
//! Zone expressions are written one term per line. The engine gives `OR`
//! the lowest precedence, so a zone is a union of intersections. The setup
//! folds operations left to right instead, so a union opens a new `OR` group
//! and every later intersect or subtract is repeated in each open group:
//! `(A ∪ B) − C` is written as `(A − C) ∪ (B − C)`.

use minijinja::{context, Environment};
use nalgebra::Vector3;

use crate::context::{ShieldBodyId, ShieldMaterialId, ShieldZoneId, SimulationContext};
use crate::error::{EntityKind, EntityRef, Error, Result};
use crate::format::{chunks, content_lines, Value};
use crate::setup::{Body, BodyId, Geometry, MaterialId, Operation, OperationType, Point, Setup, ZoneId};
use crate::ExportConfig;

use super::material::{medium_of, Medium};

const GEO_TEMPLATE: &str = "\
*---><---><--------><------------------------------------------------>
{{ header }}
*---><---><--------><--------><--------><--------><--------><-------->
{% for line in bodies %}{{ line }}
{% endfor %}  END
{% for line in zones %}{{ line }}
{% endfor %}  END
{% for line in assignments %}{{ line }}
{% endfor %}";

/// Leading columns of body and zone lines; continuation lines leave them blank.
const HEAD_WIDTH: usize = 10;
const BODY_COLUMN: usize = 10;
const BODY_VALUES_PER_LINE: usize = 6;
const ZONE_TERM: usize = 7;
const ASSIGNMENT_COLUMN: usize = 5;
const ASSIGNMENTS_PER_LINE: usize = 14;

/// Axis-aligned box given by its center and full size, as min/max corners.
pub(crate) fn extents(center: Point, size: Point) -> (Vector3<f64>, Vector3<f64>) {
    let center = Vector3::from(center);
    let half = Vector3::from(size) / 2.0;
    (center - half, center + half)
}

/// Inverse of [`extents`].
pub(crate) fn center_and_size(min: Vector3<f64>, max: Vector3<f64>) -> (Point, Point) {
    (Point::from((min + max) / 2.0), Point::from(max - min))
}

fn shape_keyword(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Sphere { .. } => "SPH",
        Geometry::Cuboid { .. } => "RPP",
        Geometry::Cylinder { .. } => "RCC",
    }
}

fn shape_arity(keyword: &str) -> Option<usize> {
    match keyword {
        "SPH" => Some(4),
        "RPP" => Some(6),
        "RCC" => Some(7),
        _ => None,
    }
}

fn shape_values(geometry: &Geometry) -> Vec<f64> {
    match *geometry {
        Geometry::Sphere { center, radius } => vec![center.x, center.y, center.z, radius],
        Geometry::Cuboid { center, size } => {
            let (min, max) = extents(center, size);
            vec![min.x, max.x, min.y, max.y, min.z, max.z]
        }
        Geometry::Cylinder {
            base_center,
            height,
            radius,
        } => vec![base_center.x, base_center.y, base_center.z, 0.0, 0.0, height, radius],
    }
}

fn shape_from_values(line: usize, keyword: &str, v: &[f64]) -> Result<Geometry> {
    let geometry = match keyword {
        "SPH" => Geometry::Sphere {
            center: Point::new(v[0], v[1], v[2]),
            radius: v[3],
        },
        "RPP" => {
            let (center, size) =
                center_and_size(Vector3::new(v[0], v[2], v[4]), Vector3::new(v[1], v[3], v[5]));
            Geometry::Cuboid { center, size }
        }
        "RCC" => {
            if v[3] != 0.0 || v[4] != 0.0 {
                return Err(Error::malformed(line, "RCC axis must be along z"));
            }
            Geometry::Cylinder {
                base_center: Point::new(v[0], v[1], v[2]),
                height: v[5],
                radius: v[6],
            }
        }
        other => {
            return Err(Error::UnknownCode {
                field: "body shape",
                code: other.to_string(),
            })
        }
    };
    Ok(geometry)
}

/// A zone with every identifier already translated to engine numbers.
struct ZoneRecord {
    id: ZoneId,
    number: ShieldZoneId,
    base: ShieldBodyId,
    construction: Vec<(OperationType, ShieldBodyId)>,
    medium: Medium<ShieldMaterialId>,
}

/// Number every zone, body and material of `setup` in traversal order.
fn number_entities(setup: &Setup, context: &mut SimulationContext) -> Result<Vec<ZoneRecord>> {
    let mut zones: Vec<_> = setup.zones.iter().collect();
    zones.sort_by_key(|z| z.id);

    let mut records = Vec::with_capacity(zones.len());
    for zone in zones {
        let number = context.resolve_zone(zone.id);
        let base = context.resolve_body(zone.base_id);
        let construction = zone
            .construction
            .iter()
            .map(|op| (op.op_type, context.resolve_body(op.body_id)))
            .collect();
        let material = setup.material(zone.material_id).ok_or_else(|| {
            Error::invalid(
                EntityRef::new(EntityKind::Zone, zone.id.0),
                "materialId",
                format!("references missing material {}", zone.material_id),
            )
        })?;
        let medium = medium_of(material, context);
        records.push(ZoneRecord {
            id: zone.id,
            number,
            base,
            construction,
            medium,
        });
    }

    let mut bodies: Vec<_> = setup.bodies.iter().map(|b| b.id).collect();
    bodies.sort();
    for id in bodies {
        if context.body_local(id).is_none() {
            tracing::warn!(body = %id, "body is not used by any zone");
            context.resolve_body(id);
        }
    }

    let mut materials: Vec<_> = setup.materials.iter().collect();
    materials.sort_by_key(|m| m.id);
    for material in materials {
        if context.material_local(material.id).is_none() {
            tracing::debug!(material = %material.id, "material is not used by any zone");
            medium_of(material, context);
        }
    }

    records.sort_by_key(|r| r.number);
    Ok(records)
}

fn body_lines(number: ShieldBodyId, body: &Body) -> Result<Vec<String>> {
    let keyword = shape_keyword(&body.geometry);
    let values = shape_values(&body.geometry);
    let mut lines = Vec::new();
    for (i, group) in values.chunks(BODY_VALUES_PER_LINE).enumerate() {
        let mut line = if i == 0 {
            format!(
                "  {:<3}{}",
                keyword,
                Value::Int(i64::from(number.0)).render("body number", 5)?
            )
        } else {
            " ".repeat(HEAD_WIDTH)
        };
        for v in group {
            line.push_str(&Value::Float(*v).render(keyword, BODY_COLUMN)?);
        }
        lines.push(line);
    }
    Ok(lines)
}

fn zone_term(prefix: &str, sign: char, body: ShieldBodyId) -> Result<String> {
    let signed = Value::Text(format!("{}{}", sign, body)).render("zone term", ZONE_TERM - 2)?;
    Ok(format!("{:>2}{}", prefix, signed))
}

/// One `OR` group: a leading body and the intersect/subtract terms applied to it.
#[derive(Debug, Clone, PartialEq)]
struct TermGroup {
    head: ShieldBodyId,
    terms: Vec<(OperationType, ShieldBodyId)>,
}

/// Rewrite a left fold of operations into `OR` groups.
fn term_groups(
    base: ShieldBodyId,
    construction: &[(OperationType, ShieldBodyId)],
) -> Vec<TermGroup> {
    let mut groups = vec![TermGroup {
        head: base,
        terms: Vec::new(),
    }];
    for &(op, body) in construction {
        match op {
            OperationType::Union => groups.push(TermGroup {
                head: body,
                terms: Vec::new(),
            }),
            OperationType::Intersect | OperationType::Subtract => {
                for group in &mut groups {
                    group.terms.push((op, body));
                }
            }
        }
    }
    groups
}

/// Inverse of [`term_groups`]. Each group's terms must end with every term of
/// the group after it.
fn fold_groups(
    line: usize,
    groups: Vec<TermGroup>,
) -> Result<(ShieldBodyId, Vec<(OperationType, ShieldBodyId)>)> {
    let mut construction = Vec::new();
    let mut base = None;
    for (i, group) in groups.iter().enumerate() {
        let carried = groups.get(i + 1).map_or(&[][..], |next| next.terms.as_slice());
        let own = group
            .terms
            .strip_suffix(carried)
            .ok_or_else(|| Error::malformed(line, "zone groups do not come from ordered operations"))?;
        match base {
            None => base = Some(group.head),
            Some(_) => construction.push((OperationType::Union, group.head)),
        }
        construction.extend_from_slice(own);
    }
    let base = base.ok_or_else(|| Error::malformed(line, "zone has no base body"))?;
    Ok((base, construction))
}

fn zone_lines(record: &ZoneRecord) -> Result<Vec<String>> {
    let number = format!("{:03}", record.number.0);
    if number.len() > 3 {
        return Err(Error::ColumnOverflow {
            field: "zone number",
            value: number,
            width: 3,
        });
    }

    let groups = term_groups(record.base, &record.construction);
    let term_count: usize = groups.iter().map(|g| 1 + g.terms.len()).sum();
    if term_count > record.construction.len() + 1 {
        tracing::debug!(zone = %record.id, groups = groups.len(), "expanded operations after a union");
    }

    let mut terms = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        terms.push(zone_term(if i == 0 { "" } else { "OR" }, '+', group.head)?);
        for &(op, body) in &group.terms {
            let sign = if op == OperationType::Subtract { '-' } else { '+' };
            terms.push(zone_term("", sign, body)?);
        }
    }

    let mut lines = Vec::with_capacity(terms.len());
    for (i, term) in terms.into_iter().enumerate() {
        let head = if i == 0 {
            format!("  {}     ", number)
        } else {
            " ".repeat(HEAD_WIDTH)
        };
        lines.push(format!("{}{}", head, term));
    }
    Ok(lines)
}

fn assignment_lines(values: &[u32]) -> Result<Vec<String>> {
    values
        .chunks(ASSIGNMENTS_PER_LINE)
        .map(|group| {
            group
                .iter()
                .map(|v| Value::Int(i64::from(*v)).render("zone assignment", ASSIGNMENT_COLUMN))
                .collect::<Result<String>>()
        })
        .collect()
}

/// Render `geo.dat`, numbering zones, bodies and materials in `context`.
pub fn serialize_geometry(
    setup: &Setup,
    config: &ExportConfig,
    context: &mut SimulationContext,
) -> Result<String> {
    let records = number_entities(setup, context)?;

    let mut bodies: Vec<(ShieldBodyId, &Body)> = setup
        .bodies
        .iter()
        .filter_map(|b| context.body_local(b.id).map(|n| (n, b)))
        .collect();
    bodies.sort_by_key(|(n, _)| *n);

    let mut body_text = Vec::new();
    for (number, body) in bodies {
        body_text.extend(body_lines(number, body)?);
    }
    let mut zone_text = Vec::new();
    for record in &records {
        zone_text.extend(zone_lines(record)?);
    }
    let mut assignments = assignment_lines(&records.iter().map(|r| r.number.0).collect::<Vec<_>>())?;
    assignments.extend(assignment_lines(
        &records.iter().map(|r| r.medium.code()).collect::<Vec<_>>(),
    )?);

    let title = config.title.lines().next().unwrap_or_default();
    let header = format!(
        "{}{}          {}",
        Value::Int(i64::from(config.debug_flags[0])).render("JDBG1", 5)?,
        Value::Int(i64::from(config.debug_flags[1])).render("JDBG2", 5)?,
        title
    );

    let mut env = Environment::new();
    env.add_template("geo.dat", GEO_TEMPLATE)?;
    let template = env.get_template("geo.dat")?;
    let output = template.render(context! {
        header => header.trim_end(),
        bodies => body_text,
        zones => zone_text,
        assignments => assignments,
    })?;
    Ok(output)
}

/// A body read back from `geo.dat`. Names are not stored in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody {
    pub number: ShieldBodyId,
    pub geometry: Geometry,
}

impl ParsedBody {
    pub fn resolve(self, context: &SimulationContext) -> Result<Body> {
        Ok(Body {
            id: context.body_global(self.number)?,
            name: String::new(),
            geometry: self.geometry,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedZone {
    pub number: ShieldZoneId,
    pub base: ShieldBodyId,
    pub construction: Vec<(OperationType, ShieldBodyId)>,
    pub medium: Medium<ShieldMaterialId>,
}

/// Zone structure in global IDs. Names and parents are not stored in the
/// file; fixed media stay as [`Medium::BlackHole`] / [`Medium::Vacuum`].
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneFragment {
    pub id: ZoneId,
    pub base_id: BodyId,
    pub construction: Vec<Operation>,
    pub medium: Medium<MaterialId>,
}

impl ParsedZone {
    pub fn resolve(self, context: &SimulationContext) -> Result<ZoneFragment> {
        let construction = self
            .construction
            .into_iter()
            .map(|(op, body)| -> Result<Operation> {
                Ok(Operation::new(op, context.body_global(body)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ZoneFragment {
            id: context.zone_global(self.number)?,
            base_id: context.body_global(self.base)?,
            construction,
            medium: self.medium.resolve(context)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGeometry {
    pub title: String,
    pub debug_flags: [i32; 2],
    pub bodies: Vec<ParsedBody>,
    pub zones: Vec<ParsedZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Bodies,
    Zones,
    Assignments,
}

struct OpenBody {
    line: usize,
    number: ShieldBodyId,
    keyword: String,
    values: Vec<f64>,
}

impl OpenBody {
    fn finish(self) -> Result<ParsedBody> {
        let arity = shape_arity(&self.keyword).ok_or_else(|| Error::UnknownCode {
            field: "body shape",
            code: self.keyword.clone(),
        })?;
        if self.values.len() != arity {
            return Err(Error::malformed(
                self.line,
                format!(
                    "{} {} expects {} values, found {}",
                    self.keyword,
                    self.number,
                    arity,
                    self.values.len()
                ),
            ));
        }
        Ok(ParsedBody {
            number: self.number,
            geometry: shape_from_values(self.line, &self.keyword, &self.values)?,
        })
    }
}

struct OpenZone {
    line: usize,
    number: ShieldZoneId,
    groups: Vec<TermGroup>,
}

fn floats(line: usize, text: &str) -> Result<Vec<f64>> {
    chunks(line, text, BODY_COLUMN)?
        .into_iter()
        .map(|c| {
            c.parse()
                .map_err(|_| Error::malformed(line, format!("`{}` is not a number", c)))
        })
        .collect()
}

fn local_number(line: usize, what: &str, text: &str) -> Result<u32> {
    text.trim()
        .parse()
        .map_err(|_| Error::malformed(line, format!("`{}` is not a {} number", text.trim(), what)))
}

/// Split a line into its head columns and the rest.
fn split_head(line: usize, content: &str) -> Result<(&str, &str)> {
    if !content.is_ascii() {
        return Err(Error::malformed(line, "non-ASCII text in fixed-column record"));
    }
    if content.len() < HEAD_WIDTH {
        return Err(Error::malformed(line, "line is shorter than its leading columns"));
    }
    Ok(content.split_at(HEAD_WIDTH))
}

fn read_term(line: usize, zone: &mut OpenZone, term: &str) -> Result<()> {
    let (union, signed) = match term.strip_prefix("OR") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, term),
    };
    let (sign, digits) = signed.split_at(signed.len().min(1));
    let body = ShieldBodyId(local_number(line, "body", digits)?);
    match (union, sign, zone.groups.last_mut()) {
        (false, "+", None) | (true, "+", Some(_)) => zone.groups.push(TermGroup {
            head: body,
            terms: Vec::new(),
        }),
        (false, "+", Some(group)) => group.terms.push((OperationType::Intersect, body)),
        (false, "-", Some(group)) => group.terms.push((OperationType::Subtract, body)),
        _ => return Err(Error::malformed(line, format!("unexpected zone term `{}`", term))),
    }
    Ok(())
}

/// `jdbg1`, `jdbg2` and the title.
fn parse_header(line: usize, content: &str) -> Result<([i32; 2], String)> {
    if !content.is_ascii() {
        return Err(Error::malformed(line, "non-ASCII text in fixed-column record"));
    }
    let padded = format!("{:<width$}", content, width = 2 * HEAD_WIDTH);
    let flag = |text: &str| {
        text.trim()
            .parse::<i32>()
            .map_err(|_| Error::malformed(line, format!("`{}` is not a debug flag", text.trim())))
    };
    let flags = [flag(&padded[..5])?, flag(&padded[5..10])?];
    Ok((flags, padded[2 * HEAD_WIDTH..].trim().to_string()))
}

/// Parse `geo.dat` into fragments carrying engine numbers.
pub fn parse_geometry(text: &str) -> Result<ParsedGeometry> {
    let mut section = Section::Header;
    let mut title = String::new();
    let mut debug_flags = [0; 2];
    let mut bodies = Vec::new();
    let mut open_body: Option<OpenBody> = None;
    let mut zones: Vec<OpenZone> = Vec::new();
    let mut assignments: Vec<u32> = Vec::new();
    let mut last_line = 0;

    for (line, content) in content_lines(text) {
        last_line = line;
        let is_end = content.trim() == "END";
        match section {
            Section::Header => {
                (debug_flags, title) = parse_header(line, content)?;
                section = Section::Bodies;
            }
            Section::Bodies if is_end => {
                if let Some(body) = open_body.take() {
                    bodies.push(body.finish()?);
                }
                section = Section::Zones;
            }
            Section::Bodies => {
                let (head, rest) = split_head(line, content)?;
                let values = floats(line, rest)?;
                if head.trim().is_empty() {
                    let body = open_body
                        .as_mut()
                        .ok_or_else(|| Error::malformed(line, "continuation line without a body"))?;
                    body.values.extend(values);
                } else {
                    if let Some(body) = open_body.take() {
                        bodies.push(body.finish()?);
                    }
                    open_body = Some(OpenBody {
                        line,
                        number: ShieldBodyId(local_number(line, "body", &head[5..])?),
                        keyword: head[..5].trim().to_string(),
                        values,
                    });
                }
            }
            Section::Zones if is_end => section = Section::Assignments,
            Section::Zones => {
                let (head, rest) = split_head(line, content)?;
                if !head.trim().is_empty() {
                    zones.push(OpenZone {
                        line,
                        number: ShieldZoneId(local_number(line, "zone", head)?),
                        groups: Vec::new(),
                    });
                }
                let zone = zones
                    .last_mut()
                    .ok_or_else(|| Error::malformed(line, "continuation line without a zone"))?;
                for term in chunks(line, rest, ZONE_TERM)? {
                    read_term(line, zone, term)?;
                }
            }
            Section::Assignments => {
                for value in chunks(line, content, ASSIGNMENT_COLUMN)? {
                    assignments.push(local_number(line, "assignment", value)?);
                }
            }
        }
    }

    if section != Section::Assignments {
        return Err(Error::malformed(last_line, "geometry ends before its zone section"));
    }
    if assignments.len() != zones.len() * 2 {
        return Err(Error::malformed(
            last_line,
            format!(
                "{} zones need {} assignment values, found {}",
                zones.len(),
                zones.len() * 2,
                assignments.len()
            ),
        ));
    }

    let (numbers, codes) = assignments.split_at(zones.len());
    let zones = zones
        .into_iter()
        .map(|zone| -> Result<ParsedZone> {
            let position = numbers
                .iter()
                .position(|n| *n == zone.number.0)
                .ok_or_else(|| {
                    Error::malformed(last_line, format!("zone {} has no medium assigned", zone.number))
                })?;
            let (base, construction) = fold_groups(zone.line, zone.groups)?;
            Ok(ParsedZone {
                number: zone.number,
                base,
                construction,
                medium: Medium::from_code(codes[position]),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedGeometry {
        title,
        debug_flags,
        bodies,
        zones,
    })
}
