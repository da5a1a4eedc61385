//! Serde model of the table document.
//!
//! The document carries map-global events, actor templates and static solids.
//! Node properties use the tile editor's property shape:
//!
//! ```json
//! { "name": "Walk_Right", "kind": "AeAccelerate",
//!   "properties": [ { "name": "XFACTOR", "type": "float", "value": 40 },
//!                   { "name": "XMAX_SPEED", "type": "float", "value": 500 } ] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::error::TableError;
use super::value::{Color, PropertyValue, Value};

/// The whole table document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameTables {
    #[serde(default)]
    pub map_events: Vec<RawNode>,
    #[serde(default)]
    pub actors: Vec<RawTemplate>,
    /// Static level geometry used for ground checks.
    #[serde(default)]
    pub solids: Vec<RawRect>,
}

impl GameTables {
    pub fn from_json_str(text: &str) -> Result<Self, TableError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let tables = Self::from_json_str(&text)?;
        info!(
            "Loaded tables from {:?}: {} map events, {} actor templates",
            path,
            tables.map_events.len(),
            tables.actors.len()
        );
        Ok(tables)
    }
}

/// One node as written in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub properties: Vec<RawProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProperty {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    pub value: serde_json::Value,
}

impl RawProperty {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            ty: None,
            value,
        }
    }

    pub fn typed(name: impl Into<String>, ty: &str, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty.to_string()),
            value,
        }
    }

    /// Convert the JSON value into a typed property. Strings starting with
    /// `*` become indirect references whatever the declared type.
    pub fn to_property_value(&self) -> Result<PropertyValue, String> {
        use serde_json::Value as Json;

        if let Json::String(s) = &self.value {
            if let Some(var) = s.strip_prefix('*') {
                return Ok(PropertyValue::Indirect(var.to_string()));
            }
        }

        let mismatch = |expected: &str| format!("expected {expected}, found {}", self.value);
        let value = match (self.ty.as_deref(), &self.value) {
            (None, Json::Bool(b)) => Value::Bool(*b),
            (None, Json::Number(n)) => match n.as_i64() {
                Some(i) => Value::Int(i as i32),
                None => Value::Float(n.as_f64().unwrap_or_default() as f32),
            },
            (None | Some("string"), Json::String(s)) => Value::Str(s.clone()),
            (Some("int"), Json::Number(n)) => {
                Value::Int(n.as_i64().ok_or_else(|| mismatch("int"))? as i32)
            }
            (Some("int"), Json::String(s)) => {
                Value::Int(s.trim().parse().map_err(|_| mismatch("int"))?)
            }
            (Some("float"), Json::Number(n)) => {
                Value::Float(n.as_f64().ok_or_else(|| mismatch("float"))? as f32)
            }
            (Some("float"), Json::String(s)) => {
                Value::Float(s.trim().parse().map_err(|_| mismatch("float"))?)
            }
            (Some("bool"), Json::Bool(b)) => Value::Bool(*b),
            (Some("bool"), Json::String(s)) => match s.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(mismatch("bool")),
            },
            (Some("color"), Json::String(s)) => {
                Value::Color(Color::from_hex(s).ok_or_else(|| mismatch("color"))?)
            }
            (Some("file"), Json::String(s)) => Value::File(s.clone()),
            (Some(ty @ ("int" | "float" | "bool" | "color" | "file" | "string")), _) => {
                return Err(mismatch(ty));
            }
            (Some(other), _) => return Err(format!("unknown property type '{other}'")),
            (None, _) => return Err(mismatch("string, number or bool")),
        };
        Ok(PropertyValue::Literal(value))
    }
}

/// An actor template: its private events, key bindings and hitboxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTemplate {
    pub name: String,
    #[serde(default)]
    pub events: Vec<RawNode>,
    #[serde(default)]
    pub bindings: Vec<RawBinding>,
    /// Response name (`ON_SPAWN`, `ON_ALWAYS`, `ON_COLLISION`) to root event.
    #[serde(default)]
    pub responses: BTreeMap<String, String>,
    #[serde(default)]
    pub hitboxes: Vec<RawHitbox>,
}

/// Physical key to root event, with trigger flags as properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBinding {
    pub key: String,
    #[serde(default)]
    pub properties: Vec<RawProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHitbox {
    pub name: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_document() {
        let text = r#"{
            "map_events": [
                { "name": "Quit", "kind": "GeQuit" }
            ],
            "actors": [
                { "name": "Hero",
                  "events": [ { "name": "Walk", "kind": "accelerate",
                                "properties": [ { "name": "XFACTOR", "type": "float", "value": 40 } ] } ],
                  "bindings": [ { "key": "D", "properties": [ { "name": "EVENT", "value": "Walk" } ] } ],
                  "responses": { "ON_ALWAYS": "Walk" },
                  "hitboxes": [ { "name": "BODY", "width": 16, "height": 32 } ] }
            ]
        }"#;
        let tables = GameTables::from_json_str(text).unwrap();
        assert_eq!(tables.map_events.len(), 1);
        assert_eq!(tables.actors[0].events[0].properties[0].name, "XFACTOR");
        assert_eq!(tables.actors[0].responses["ON_ALWAYS"], "Walk");
        assert_eq!(tables.actors[0].hitboxes[0].x, 0.0);
        assert!(tables.solids.is_empty());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(
            GameTables::from_json_str("{ not json"),
            Err(TableError::Json(_))
        ));
    }

    #[test]
    fn test_untyped_string_is_string() {
        let p = RawProperty::new("PATH", json!("sfx/coin.wav"));
        assert_eq!(
            p.to_property_value().unwrap(),
            PropertyValue::Literal(Value::Str("sfx/coin.wav".into()))
        );
    }

    #[test]
    fn test_star_prefix_is_indirect() {
        let p = RawProperty::new("VALUE", json!("*CoinCount"));
        assert_eq!(
            p.to_property_value().unwrap(),
            PropertyValue::Indirect("CoinCount".into())
        );
    }

    #[test]
    fn test_typed_values() {
        let f = RawProperty::typed("XFACTOR", "float", json!(-500));
        assert_eq!(
            f.to_property_value().unwrap(),
            PropertyValue::Literal(Value::Float(-500.0))
        );
        let i = RawProperty::typed("CYCLES", "int", json!(3));
        assert_eq!(
            i.to_property_value().unwrap(),
            PropertyValue::Literal(Value::Int(3))
        );
        let c = RawProperty::typed("COLOR", "color", json!("#ff000000"));
        assert!(matches!(
            c.to_property_value().unwrap(),
            PropertyValue::Literal(Value::Color(_))
        ));
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let p = RawProperty::typed("SUSTAINED", "bool", json!(12));
        assert!(p.to_property_value().is_err());
        let q = RawProperty::typed("X", "vector", json!(1));
        assert!(q.to_property_value().unwrap_err().contains("unknown property type"));
    }
}
