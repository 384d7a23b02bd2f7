//! Core types for spark-view.
//!
//! These types define the foundation that everything builds on: the value
//! tree held by every data store, the keys used to walk it, and the
//! identifiers that flow through the update pipeline.

use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;

// =============================================================================
// Component Identity
// =============================================================================

/// Unique component identity.
///
/// Allocated by the registry and never reused within a thread, so a stale id
/// held as a back reference simply resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u64);

impl ComponentId {
    /// Raw numeric id.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// =============================================================================
// Key
// =============================================================================

/// One resolved step of a path into a [`Value`] tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Object property name.
    Name(String),
    /// Array position.
    Index(usize),
}

impl Key {
    /// Key as it would appear in an object.
    pub fn as_name(&self) -> String {
        match self {
            Key::Name(name) => name.clone(),
            Key::Index(index) => index.to_string(),
        }
    }

    /// Key as an array position, if it can be one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(name) => name.parse().ok(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

// =============================================================================
// Value
// =============================================================================

/// Tree-shaped data held by a data store.
///
/// Objects keep insertion order, so iteration over spread bindings and
/// hydrated data matches the order the author wrote.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(NaiveDateTime),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Empty object.
    pub fn object() -> Self {
        Value::Object(IndexMap::new())
    }

    /// Empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Script-style truthiness: null, false, 0, NaN and "" are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Date(_) | Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Name used in diagnostics and data type checks.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Read one step down the tree.
    ///
    /// Arrays also answer `length`; objects accept numeric keys by name.
    pub fn get_key(&self, key: &Key) -> Option<Value> {
        match self {
            Value::Array(items) => match key {
                Key::Name(name) if name == "length" => Some(Value::Number(items.len() as f64)),
                _ => key.as_index().and_then(|i| items.get(i).cloned()),
            },
            Value::Object(map) => map.get(&key.as_name()).cloned(),
            Value::String(s) => match key {
                Key::Name(name) if name == "length" => {
                    Some(Value::Number(s.chars().count() as f64))
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Borrow one step down the tree.
    pub fn child(&self, key: &Key) -> Option<&Value> {
        match self {
            Value::Array(items) => key.as_index().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(&key.as_name()),
            _ => None,
        }
    }

    /// Mutable slot one step down, creating it when missing.
    ///
    /// A scalar in the way is replaced by a container shaped after the key:
    /// arrays for indexes, objects for names.
    pub(crate) fn child_mut_or_insert(&mut self, key: &Key) -> &mut Value {
        let wants_array = matches!(key, Key::Index(_));
        if !matches!(self, Value::Array(_) | Value::Object(_)) {
            *self = if wants_array { Value::array() } else { Value::object() };
        }

        // Named key on an array: promote to an object keyed by position.
        if matches!(self, Value::Array(_)) && key.as_index().is_none() {
            if let Value::Array(items) = std::mem::take(self) {
                *self = Value::Object(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v))
                        .collect(),
                );
            }
        }

        match (self, key.as_index()) {
            (Value::Array(items), Some(index)) => {
                if index >= items.len() {
                    items.resize(index + 1, Value::Null);
                }
                &mut items[index]
            }
            (Value::Object(map), _) => map.entry(key.as_name()).or_insert(Value::Null),
            _ => unreachable!("container ensured above"),
        }
    }

    /// Resolve a key-path, returning `Null` for anything missing.
    pub fn at_path(&self, keys: &[Key]) -> Value {
        let mut current = self;
        for (i, key) in keys.iter().enumerate() {
            match current.child(key) {
                Some(next) => current = next,
                None => {
                    // Synthesized answers like `length` only exist at the leaf.
                    if i + 1 == keys.len() {
                        return current.get_key(key).unwrap_or(Value::Null);
                    }
                    return Value::Null;
                }
            }
        }
        current.clone()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S")),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Object(_) => f.write_str("[object Object]"),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Date(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::array().is_truthy());
    }

    #[test]
    fn test_at_path() {
        let value = Value::from(json!({"a": {"list": [1, 2, {"c": "deep"}]}}));

        let keys = [
            Key::Name("a".into()),
            Key::Name("list".into()),
            Key::Index(2),
            Key::Name("c".into()),
        ];
        assert_eq!(value.at_path(&keys), Value::from("deep"));

        let len = [Key::Name("a".into()), Key::Name("list".into()), Key::Name("length".into())];
        assert_eq!(value.at_path(&len), Value::from(3));

        let missing = [Key::Name("nope".into()), Key::Name("x".into())];
        assert_eq!(value.at_path(&missing), Value::Null);
    }

    #[test]
    fn test_child_mut_or_insert_builds_containers() {
        let mut value = Value::Null;
        *value
            .child_mut_or_insert(&Key::Name("items".into()))
            .child_mut_or_insert(&Key::Index(1)) = Value::from(7);

        assert_eq!(value, Value::from(json!({"items": [null, 7]})));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "1,2");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(ComponentId(4).to_string(), "c4");
    }
}
