// identifier.rs — Entity identifiers as recorded in log entries.
//
// An identifier is either a single scalar (the common auto-increment or
// uuid case) or a compound key with named components in declaration order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The identifier of an audited or related entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// A multi-column key, components in declaration order.
    Compound(Vec<(String, Value)>),
    /// A single-column key.
    Scalar(Value),
}

impl Identifier {
    /// Build a compound identifier from `(component, value)` pairs.
    pub fn compound<K, I>(components: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Identifier::Compound(
            components
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// The string form stored in `LogEntry::object_id`.
    ///
    /// Scalar strings are used verbatim, other scalars use their JSON text,
    /// compound keys join their component values with a single space.
    pub fn to_object_id(&self) -> String {
        match self {
            Identifier::Scalar(value) => scalar_text(value),
            Identifier::Compound(components) => components
                .iter()
                .map(|(_, v)| scalar_text(v))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// The value stored in `LogEntry::data` for a reference field.
    pub fn to_value(&self) -> Value {
        match self {
            Identifier::Scalar(value) => value.clone(),
            Identifier::Compound(components) => {
                let mut map = serde_json::Map::new();
                for (name, value) in components {
                    map.insert(name.clone(), value.clone());
                }
                Value::Object(map)
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Identifier::Scalar(Value::from(id))
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Identifier::Scalar(Value::from(id))
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Identifier::Scalar(Value::from(id))
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_object_id())
    }
}
