//! Typed views over decoded JSON records

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;

/// Record identifier: a database-assigned address `#{cluster}:{position}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    /// Cluster id; negative for temporary records
    pub cluster: i64,
    /// Position within the cluster
    pub position: i64,
}

impl Rid {
    /// Create a RID from its parts
    pub fn new(cluster: i64, position: i64) -> Self {
        Self { cluster, position }
    }

    /// Parse a RID, accepting both `#12:0` and `12:0` forms
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let unprefixed = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let (cluster, position) = unprefixed
            .split_once(':')
            .ok_or_else(|| Error::invalid_argument(format!("bad RID format: {s}")))?;
        let cluster = cluster
            .parse()
            .map_err(|_| Error::invalid_argument(format!("bad RID format: {s}")))?;
        let position = position
            .parse()
            .map_err(|_| Error::invalid_argument(format!("bad RID format: {s}")))?;
        Ok(Self { cluster, position })
    }

    /// Render without the `#` prefix, as REST paths expect
    pub fn unprefixed(&self) -> String {
        format!("{}:{}", self.cluster, self.position)
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

impl std::str::FromStr for Rid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A decoded record with explicit accessors for its `@`-prefixed metadata
///
/// Named properties are the non-`@` keys; there is no dynamic dispatch, only
/// [`Document::property`].
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    /// Wrap a decoded JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::protocol(format!(
                "expected a JSON object for a document, got {other}"
            ))),
        }
    }

    /// Start an empty document, e.g. for `create_document`
    pub fn empty() -> Self {
        Self { fields: Map::new() }
    }

    /// Record identifier, when the server supplied one
    pub fn rid(&self) -> Option<Rid> {
        self.fields
            .get("@rid")
            .and_then(Value::as_str)
            .and_then(|s| Rid::parse(s).ok())
    }

    /// Record version, used for optimistic concurrency
    pub fn version(&self) -> Option<i64> {
        self.fields.get("@version").and_then(Value::as_i64)
    }

    /// Schema class of the record
    pub fn class_name(&self) -> Option<&str> {
        self.fields.get("@class").and_then(Value::as_str)
    }

    /// Record type marker (`d` for documents)
    pub fn record_type(&self) -> Option<&str> {
        self.fields.get("@type").and_then(Value::as_str)
    }

    /// Named property value; metadata keys are not reachable this way
    pub fn property(&self, name: &str) -> Option<&Value> {
        if name.starts_with('@') {
            return None;
        }
        self.fields.get(name)
    }

    /// All named (non-`@`) properties
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .filter(|(key, _)| !key.starts_with('@'))
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Set a field
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Remove a field, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// The underlying JSON object
    pub fn as_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Consume the wrapper
    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }
}

/// Schema property of a class, built from decoded JSON
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaProperty {
    fields: Map<String, Value>,
}

impl SchemaProperty {
    /// Build from a decoded property hash
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = value
            .as_object()
            .cloned()
            .ok_or_else(|| Error::protocol("expected a JSON object for a schema property"))?;
        if !fields.contains_key("name") {
            return Err(Error::protocol("schema property has no name"));
        }
        Ok(Self { fields })
    }

    /// Property name
    pub fn name(&self) -> &str {
        self.fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Declared property type, e.g. `STRING`
    pub fn property_type(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    /// Whether the property is mandatory
    pub fn mandatory(&self) -> Option<bool> {
        self.fields.get("mandatory").and_then(Value::as_bool)
    }

    /// Any other attribute of the property
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Schema class, built from decoded JSON
///
/// A class without properties is valid.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaClass {
    fields: Map<String, Value>,
    properties: Vec<SchemaProperty>,
}

impl SchemaClass {
    /// Build from a decoded class hash
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = value
            .as_object()
            .cloned()
            .ok_or_else(|| Error::protocol("expected a JSON object for a schema class"))?;
        if !fields.contains_key("name") {
            return Err(Error::protocol("schema class has no name"));
        }
        let properties = match fields.get("properties") {
            Some(Value::Array(items)) => items
                .iter()
                .map(SchemaProperty::from_value)
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };
        Ok(Self { fields, properties })
    }

    /// Class name
    pub fn name(&self) -> &str {
        self.fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Declared properties
    pub fn properties(&self) -> &[SchemaProperty] {
        &self.properties
    }

    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Any other attribute of the class
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
