//! # Structured Values
//!
//! Tree-structured payload values carried by packets.
//!
//! A `Value` is the JSON data model plus a `Bytes` variant, which is what a
//! binary packet's placeholders are replaced with once reconstruction completes.
//! Values are hashable so that any scalar (not just a string) can be used as an
//! event-name key.
//!
//! ## Placeholders
//! ```text
//! {"_placeholder": true, "num": 0}
//! ```
//! stands in for the attachment with index `0`.

use crate::error::constants::{PLACEHOLDER_KEY, PLACEHOLDER_NUM_KEY};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A structured payload value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Bytes),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Build a placeholder marker referencing attachment `num`.
    pub fn placeholder(num: usize) -> Self {
        let mut map = BTreeMap::new();
        map.insert(PLACEHOLDER_KEY.to_string(), Value::Bool(true));
        map.insert(PLACEHOLDER_NUM_KEY.to_string(), Value::Int(num as i64));
        Value::Object(map)
    }

    /// Returns the attachment index if this value is a placeholder marker.
    pub fn placeholder_index(&self) -> Option<usize> {
        let Value::Object(map) = self else {
            return None;
        };
        match (map.get(PLACEHOLDER_KEY), map.get(PLACEHOLDER_NUM_KEY)) {
            (Some(Value::Bool(true)), Some(Value::Int(num))) if *num >= 0 => Some(*num as usize),
            _ => None,
        }
    }

    /// Collect the indices of every placeholder in this tree, in traversal order.
    pub fn placeholder_indices(&self) -> Vec<usize> {
        let mut found = Vec::new();
        self.collect_placeholders(&mut found);
        found
    }

    fn collect_placeholders(&self, found: &mut Vec<usize>) {
        if let Some(num) = self.placeholder_index() {
            found.push(num);
            return;
        }
        match self {
            Value::Array(items) => items.iter().for_each(|v| v.collect_placeholders(found)),
            Value::Object(map) => map.values().for_each(|v| v.collect_placeholders(found)),
            _ => {}
        }
    }

    /// Replace the placeholder referencing attachment `num` with `data`.
    ///
    /// Returns false if no such placeholder exists in the tree.
    pub fn fill_placeholder(&mut self, num: usize, data: Bytes) -> bool {
        if self.placeholder_index() == Some(num) {
            *self = Value::Bytes(data);
            return true;
        }
        match self {
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if item.fill_placeholder(num, data.clone()) {
                        return true;
                    }
                }
                false
            }
            Value::Object(map) => {
                for item in map.values_mut() {
                    if item.fill_placeholder(num, data.clone()) {
                        return true;
                    }
                }
                false
            }
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Convert to a `serde_json::Value`. Bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::Array(b.iter().map(|x| Json::from(*x)).collect()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // Bitwise so that Eq and Hash agree
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Array(items) => items.hash(state),
            Value::Object(map) => map.hash(state),
        }
    }
}

/// Strings render raw; everything else renders as compact JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_placeholder_recognition() {
        assert_eq!(Value::placeholder(3).placeholder_index(), Some(3));
        assert_eq!(Value::from(json!({"_placeholder": true, "num": 1})).placeholder_index(), Some(1));
        assert_eq!(Value::from(json!({"_placeholder": false, "num": 1})).placeholder_index(), None);
        assert_eq!(Value::from(json!({"num": 1})).placeholder_index(), None);
        assert_eq!(Value::from("num").placeholder_index(), None);
    }

    #[test]
    fn test_nested_placeholders_are_found_and_filled() {
        let mut value = Value::from(json!([
            "upload",
            {"file": {"_placeholder": true, "num": 1}, "meta": [{"_placeholder": true, "num": 0}]}
        ]));

        let mut indices = value.placeholder_indices();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1]);

        assert!(value.fill_placeholder(0, Bytes::from_static(b"a")));
        assert!(value.fill_placeholder(1, Bytes::from_static(b"b")));
        assert!(!value.fill_placeholder(2, Bytes::from_static(b"c")));
        assert!(value.placeholder_indices().is_empty());

        let obj = &value.as_array().unwrap()[1];
        let Value::Object(map) = obj else { panic!("expected object") };
        assert_eq!(map["file"], Value::Bytes(Bytes::from_static(b"b")));
    }

    #[test]
    fn test_scalar_keys_hash_by_value() {
        let mut set = HashSet::new();
        set.insert(Value::from("chat"));
        set.insert(Value::from(7i64));
        set.insert(Value::from(1.5f64));

        assert!(set.contains(&Value::from("chat")));
        assert!(set.contains(&Value::Int(7)));
        assert!(set.contains(&Value::Float(1.5)));
        assert!(!set.contains(&Value::from("7")));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("boom").to_string(), "boom");
        assert_eq!(Value::from(json!({"code": 3})).to_string(), r#"{"code":3}"#);
        assert_eq!(Value::Null.to_string(), "null");
    }
}
