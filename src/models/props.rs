//! Domain property bags attached to nodes and links.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Property bag keyed by property name.
pub type PropBag = BTreeMap<String, PropValue>;

/// A single domain property value.
///
/// Datasets carry different property sets (smoker/drinker flags, grades, ...),
/// so values are kept as tagged data rather than typed structs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl PropValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    /// Categorical key used by lookup-table encodings.
    pub fn category(&self) -> CategoryKey {
        match self {
            PropValue::Null => CategoryKey::Missing,
            PropValue::Bool(b) => CategoryKey::Bool(*b),
            PropValue::Number(n) => CategoryKey::Text(format_number(*n)),
            PropValue::Text(s) => CategoryKey::Text(s.clone()),
            PropValue::Other(v) => CategoryKey::Text(v.to_string()),
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => write!(f, "null"),
            PropValue::Bool(b) => write!(f, "{}", b),
            PropValue::Number(n) => write!(f, "{}", format_number(*n)),
            PropValue::Text(s) => write!(f, "{}", s),
            PropValue::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Key of a categorical lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryKey {
    Text(String),
    Bool(bool),
    Missing,
}

impl From<&str> for CategoryKey {
    fn from(value: &str) -> Self {
        CategoryKey::Text(value.to_string())
    }
}

impl From<bool> for CategoryKey {
    fn from(value: bool) -> Self {
        CategoryKey::Bool(value)
    }
}

/// Integers print without a trailing `.0` so `grade = 3` matches the key "3".
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
