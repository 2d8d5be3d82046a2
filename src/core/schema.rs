//! Example-derived schemas.
//!
//! A schema is built from one flat example document: every top-level key
//! records the kind of its example value and uses that value as the default.
//! Schemas are closed, so once one is attached to a profile's root type only
//! its keys can be written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Boolean,
    Number,
    String,
    Array,
    Object,
    Null,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Null => ValueKind::Null,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Null => "null",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: ValueKind,
    #[serde(rename = "default")]
    pub default_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySchema>,
}

/// Outcome of checking one write against a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Validation {
    Ok,
    UnknownKey,
    TypeMismatch { expected: ValueKind, found: ValueKind },
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok)
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Ok => f.write_str("ok"),
            Validation::UnknownKey => f.write_str("key is not declared by the schema"),
            Validation::TypeMismatch { expected, found } => {
                write!(f, "expected {}, got {}", expected, found)
            }
        }
    }
}

impl Schema {
    pub fn from_example(example: &Map<String, Value>) -> Self {
        let properties = example
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    PropertySchema {
                        kind: ValueKind::of(value),
                        default_value: value.clone(),
                    },
                )
            })
            .collect();
        Schema {
            schema_type: "object".to_string(),
            properties,
        }
    }

    pub fn default_for(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).map(|p| &p.default_value)
    }

    /// Check a write of `value` to the dotted `key`.
    ///
    /// Schemas are flat: a nested key is judged by its first segment, which
    /// must be declared as an object or an array. The shape below it is not
    /// checked.
    pub fn validate(&self, key: &str, value: &Value) -> Validation {
        let (head, nested) = match key.split_once('.') {
            Some((head, _)) => (head, true),
            None => (key, false),
        };
        let Some(property) = self.properties.get(head) else {
            return Validation::UnknownKey;
        };
        if nested && property.kind == ValueKind::Array {
            return Validation::Ok;
        }
        let found = if nested {
            ValueKind::Object
        } else {
            ValueKind::of(value)
        };
        if found != property.kind {
            return Validation::TypeMismatch {
                expected: property.kind,
                found,
            };
        }
        Validation::Ok
    }
}

/// Validate against an optional schema; no schema accepts everything.
pub fn validate(schema: Option<&Schema>, key: &str, value: &Value) -> Validation {
    schema.map_or(Validation::Ok, |s| s.validate(key, value))
}
