//! Zones: CSG regions built from an ordered list of boolean operations

use std::fmt;

use serde::{Deserialize, Serialize};

use super::body::BodyId;
use super::material::MaterialId;

/// Global zone identifier used by the setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u64);

impl ZoneId {
    /// `parentId` value of top-level zones
    pub const NONE: ZoneId = ZoneId(0);
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A region: the base body combined, in list order, with each operation's
/// body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: ZoneId,
    #[serde(default)]
    pub parent_id: ZoneId,
    pub name: String,
    pub base_id: BodyId,
    pub material_id: MaterialId,
    #[serde(default)]
    pub construction: Vec<Operation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub body_id: BodyId,
}

impl Operation {
    pub fn new(op_type: OperationType, body_id: BodyId) -> Self {
        Self { op_type, body_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Intersect,
    Subtract,
    Union,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_two() -> Zone {
        Zone {
            id: ZoneId(2),
            parent_id: ZoneId(1),
            name: "name".to_string(),
            base_id: BodyId(1),
            material_id: MaterialId(2),
            construction: vec![
                Operation::new(OperationType::Intersect, BodyId(100)),
                Operation::new(OperationType::Subtract, BodyId(200)),
                Operation::new(OperationType::Union, BodyId(300)),
            ],
        }
    }

    #[test]
    fn test_zone_decodes_from_json() {
        let json = r#"{
            "id": 2,
            "parentId": 1,
            "name": "name",
            "baseId": 1,
            "materialId": 2,
            "construction": [
                {"bodyId": 100, "type": "intersect"},
                {"bodyId": 200, "type": "subtract"},
                {"bodyId": 300, "type": "union"}
            ]
        }"#;
        let zone: Zone = serde_json::from_str(json).unwrap();
        assert_eq!(zone, zone_two());
    }

    #[test]
    fn test_zone_json_roundtrip_is_stable() {
        let encoded = serde_json::to_value(zone_two()).unwrap();
        assert_eq!(encoded["construction"][1]["type"], "subtract");
        assert_eq!(encoded["parentId"], 1);

        let decoded: Zone = serde_json::from_value(encoded.clone()).unwrap();
        assert_eq!(decoded, zone_two());
        assert_eq!(serde_json::to_value(&decoded).unwrap(), encoded);
    }
}
