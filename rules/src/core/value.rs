//! Rule values and keypath access.
//!
//! Values are plain JSON values. `Value::Null` means "nothing": lookups never
//! return `Some(Value::Null)`.

use std::collections::BTreeMap;

pub use serde_json::Value;

use crate::core::error::{Error, Result};

/// Key-value access used by qualifiers and key assignments.
///
/// Implementors provide single-key lookup; dotted keypaths resolve the first
/// segment through [`value_for_key`](Self::value_for_key) and then descend
/// into the returned JSON value.
pub trait KeyValueCoding {
    fn value_for_key(&self, key: &str) -> Result<Option<Value>>;

    fn value_for_key_path(&self, path: &str) -> Result<Option<Value>> {
        let segments = split_key_path(path)?;
        let Some((first, rest)) = segments.split_first() else {
            return Ok(None);
        };
        match self.value_for_key(first)? {
            Some(value) => Ok(descend(&value, rest)),
            None => Ok(None),
        }
    }
}

impl KeyValueCoding for BTreeMap<String, Value> {
    fn value_for_key(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.get(key).filter(|v| !v.is_null()).cloned())
    }
}

impl KeyValueCoding for Value {
    fn value_for_key(&self, key: &str) -> Result<Option<Value>> {
        Ok(value_for_segment(self, key))
    }
}

/// Split a dotted keypath into its segments.
pub fn split_key_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(Error::InvalidKeyPath {
            path: path.to_string(),
        });
    }
    Ok(segments)
}

/// Follow `segments` into `value`, returning `None` as soon as a step misses.
pub fn descend(value: &Value, segments: &[&str]) -> Option<Value> {
    let mut current = value.clone();
    for segment in segments {
        current = value_for_segment(&current, segment)?;
    }
    (!current.is_null()).then_some(current)
}

/// Single-step lookup: object member, array index or `@count`.
fn value_for_segment(value: &Value, segment: &str) -> Option<Value> {
    let found = match value {
        Value::Object(map) => map.get(segment).cloned(),
        Value::Array(items) if segment == "@count" => Some(Value::from(items.len())),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index).cloned()),
        Value::String(s) if segment == "length" => Some(Value::from(s.chars().count())),
        _ => None,
    };
    found.filter(|v| !v.is_null())
}

/// Write `value` at `segments` inside `target`, creating intermediate objects.
///
/// Non-object intermediates are replaced by objects.
pub fn assign_path(target: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *target = value;
        return;
    };
    let mut current = target;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(map) = current {
        if value.is_null() {
            map.remove(*last);
        } else {
            map.insert((*last).to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_path_descends_into_objects_and_arrays() {
        let mut values = BTreeMap::new();
        values.insert(
            "user".to_string(),
            json!({"name": "hh", "roles": ["admin", "dev"]}),
        );

        assert_eq!(
            values.value_for_key_path("user.name").expect("lookup"),
            Some(json!("hh"))
        );
        assert_eq!(
            values.value_for_key_path("user.roles.1").expect("lookup"),
            Some(json!("dev"))
        );
        assert_eq!(
            values.value_for_key_path("user.roles.@count").expect("lookup"),
            Some(json!(2))
        );
        assert_eq!(values.value_for_key_path("user.missing").expect("lookup"), None);
    }

    #[test]
    fn empty_segment_is_invalid() {
        let values: BTreeMap<String, Value> = BTreeMap::new();
        let err = values.value_for_key_path("a..b").unwrap_err();
        assert_eq!(
            err,
            Error::InvalidKeyPath {
                path: "a..b".to_string()
            }
        );
    }

    #[test]
    fn assign_path_creates_intermediate_objects() {
        let mut target = Value::Null;
        assign_path(&mut target, &["a", "b"], json!(1));
        assert_eq!(target, json!({"a": {"b": 1}}));

        assign_path(&mut target, &["a", "b"], Value::Null);
        assert_eq!(target, json!({"a": {}}));
    }
}
