//! Tiny nested-object helpers for building the outgoing FCM payload tree.
//!
//! The transformer deals in `serde_json::Value` because the incoming `data`
//! tree is genuinely free-form — a fixed struct can't model that and still
//! pass through unknown nested keys untouched.

use serde_json::{Map, Value};

/// Navigate (creating empty objects along the way) to the object at `path`
/// inside `root`, returning a mutable reference to it.
pub fn object_at_mut<'a>(root: &'a mut Value, path: &[&str]) -> &'a mut Map<String, Value> {
    let mut current = root;
    for segment in path {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = current.as_object_mut().expect("just ensured object");
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    current.as_object_mut().expect("just ensured object")
}

/// Set `root.<path...>.<key> = value`, creating intermediate objects.
pub fn set(root: &mut Value, path: &[&str], key: &str, value: Value) {
    object_at_mut(root, path).insert(key.to_string(), value);
}

/// Read `root.<path...>.<key>`.
pub fn get<'a>(root: &'a Value, path: &[&str], key: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        current = current.get(segment)?;
    }
    current.get(key)
}

/// Remove `root.<path...>.<key>`, if present.
pub fn remove(root: &mut Value, path: &[&str], key: &str) {
    let mut current = root;
    for segment in path {
        match current.get_mut(segment) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(map) = current.as_object_mut() {
        map.remove(key);
    }
}

/// Shallow-copy every key of `source` into the object at `path`, overwriting
/// any existing key of the same name.
pub fn shallow_merge_into(root: &mut Value, path: &[&str], source: &Map<String, Value>) {
    let target = object_at_mut(root, path);
    for (k, v) in source {
        target.insert(k.clone(), v.clone());
    }
}
