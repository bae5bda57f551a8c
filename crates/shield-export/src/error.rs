//! Error taxonomy shared by the model, the context and the serializers

use std::fmt;
use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of setup entity an error or a context mapping refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Material,
    Body,
    Zone,
    Detector,
    Beam,
    Options,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Material => "material",
            EntityKind::Body => "body",
            EntityKind::Zone => "zone",
            EntityKind::Detector => "detector",
            EntityKind::Beam => "beam",
            EntityKind::Options => "options",
        };
        f.write_str(name)
    }
}

/// An entity as named in error messages: its kind and, for entities that
/// carry one, its global ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Option<u64>,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: u64) -> Self {
        Self { kind, id: Some(id) }
    }

    /// Singleton entities (beam, options) have no ID.
    pub fn singleton(kind: EntityKind) -> Self {
        Self { kind, id: None }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} {}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// An entity invariant does not hold (missing field, empty sequence,
    /// dangling reference, value outside the engine catalog).
    #[error("invalid {entity}: `{field}` {reason}")]
    Validation {
        entity: EntityRef,
        field: &'static str,
        reason: String,
    },

    /// A code read from engine text has no mapping to a domain value.
    #[error("unknown {field} code `{code}`")]
    UnknownCode { field: &'static str, code: String },

    /// Reverse lookup of a local ID this context never handed out.
    #[error("no {kind} is mapped to local id `{local}` in this simulation context")]
    NotFound { kind: EntityKind, local: String },

    /// A rendered value is wider than its fixed column.
    #[error("`{field}` value {value} does not fit in a {width}-character column")]
    ColumnOverflow {
        field: &'static str,
        value: String,
        width: usize,
    },

    /// Engine text that cannot be sliced into the expected records.
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(entity: EntityRef, field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            entity,
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_entity_and_field() {
        let e = Error::invalid(
            EntityRef::new(EntityKind::Zone, 7),
            "baseId",
            "references missing body 3",
        );
        assert_eq!(
            e.to_string(),
            "invalid zone 7: `baseId` references missing body 3"
        );
    }

    #[test]
    fn test_singleton_entities_have_no_id_in_messages() {
        let e = Error::invalid(EntityRef::singleton(EntityKind::Beam), "particleType", "is bad");
        assert!(e.to_string().starts_with("invalid beam: "));
    }
}
