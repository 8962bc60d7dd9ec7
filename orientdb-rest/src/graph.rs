//! Graph-record views and SQL target conversion

use crate::model::Rid;
use crate::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

fn rid_like_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^#\d+:\d+$").unwrap()
    })
}

/// A graph vertex built from a query result hash
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    rid: Rid,
    version: Option<i64>,
    class: Option<String>,
    properties: Map<String, Value>,
}

impl Vertex {
    /// Build from a decoded result hash; the record must carry a `@rid`
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = value
            .as_object()
            .ok_or_else(|| Error::protocol("expected a JSON object for a vertex"))?;
        let rid = fields
            .get("@rid")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol("vertex record has no @rid"))?;
        let properties = fields
            .iter()
            .filter(|(key, _)| !key.starts_with('@'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Self {
            rid: Rid::parse(rid)?,
            version: fields.get("@version").and_then(Value::as_i64),
            class: fields
                .get("@class")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            properties,
        })
    }

    /// Record identifier
    pub fn rid(&self) -> Rid {
        self.rid
    }

    /// Record version
    pub fn version(&self) -> Option<i64> {
        self.version
    }

    /// Schema class
    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Named (non-`@`) property
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// A graph edge built from a query result hash
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    record_type: Option<String>,
    version: Option<i64>,
    class: Option<String>,
    in_rid: Option<Rid>,
    out_rid: Option<Rid>,
}

impl Edge {
    /// Build from a decoded result hash
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = value
            .as_object()
            .ok_or_else(|| Error::protocol("expected a JSON object for an edge"))?;
        let parse_rid = |key: &str| -> Result<Option<Rid>> {
            fields
                .get(key)
                .and_then(Value::as_str)
                .map(Rid::parse)
                .transpose()
        };
        Ok(Self {
            record_type: fields
                .get("@type")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            version: fields.get("@version").and_then(Value::as_i64),
            class: fields
                .get("@class")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            in_rid: parse_rid("in")?,
            out_rid: parse_rid("out")?,
        })
    }

    /// Record type marker
    pub fn record_type(&self) -> Option<&str> {
        self.record_type.as_deref()
    }

    /// Record version
    pub fn version(&self) -> Option<i64> {
        self.version
    }

    /// Schema class
    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// RID of the incoming endpoint
    pub fn in_rid(&self) -> Option<Rid> {
        self.in_rid
    }

    /// RID of the outgoing endpoint
    pub fn out_rid(&self) -> Option<Rid> {
        self.out_rid
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_rid = |rid: Option<Rid>| rid.map_or_else(|| "?".to_string(), |r| r.to_string());
        write!(
            f,
            "Edge {} : {} -> {}",
            self.class.as_deref().unwrap_or("?"),
            fmt_rid(self.in_rid),
            fmt_rid(self.out_rid)
        )
    }
}

/// An edge endpoint expression, resolved to its SQL target form
///
/// Replaces dispatch on the argument's runtime type: each accepted shape is a
/// variant with one conversion rule.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeTarget {
    /// A vertex; targets its RID
    Vertex(Vertex),
    /// A record identifier
    Rid(Rid),
    /// A string already in `#cluster:position` form, passed through
    RidString(String),
    /// Any other expression, treated as a subquery and parenthesized
    Query(String),
}

impl EdgeTarget {
    /// Classify a string endpoint: RID-like input passes through, anything
    /// else becomes a subquery
    pub fn from_string(s: impl Into<String>) -> Self {
        let s = s.into();
        if rid_like_pattern().is_match(&s) {
            Self::RidString(s)
        } else {
            Self::Query(s)
        }
    }

    /// The SQL-target representation of this endpoint
    pub fn to_sql_target(&self) -> String {
        match self {
            Self::Vertex(vertex) => vertex.rid().to_string(),
            Self::Rid(rid) => rid.to_string(),
            Self::RidString(s) => s.clone(),
            Self::Query(q) => format!("({q})"),
        }
    }
}

impl From<Vertex> for EdgeTarget {
    fn from(vertex: Vertex) -> Self {
        Self::Vertex(vertex)
    }
}

impl From<Rid> for EdgeTarget {
    fn from(rid: Rid) -> Self {
        Self::Rid(rid)
    }
}
