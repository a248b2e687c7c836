// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data model access for scripts.
//!
//! Paths are dotted: object keys and list indices separated by `.`, for example
//! `cpu.cores.0.load`. The empty path addresses the root.

use crate::value::{PinType, Value};
use parking_lot::RwLock;

/// Source of external values addressed by path
pub trait DataModel: Send + Sync {
    /// Current value at a path
    fn value_at(&self, path: &str) -> Option<Value>;

    /// Whether the path currently resolves
    fn is_valid_path(&self, path: &str) -> bool {
        self.value_at(path).is_some()
    }

    /// Type of the value at a path
    fn type_at(&self, path: &str) -> Option<PinType> {
        self.value_at(path).map(|value| value.pin_type())
    }
}

/// In-memory data model backed by a JSON tree
#[derive(Debug, Default)]
pub struct JsonDataModel {
    root: RwLock<serde_json::Value>,
}

impl JsonDataModel {
    /// Create a data model from a JSON tree
    pub fn new(root: serde_json::Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    /// Replace the whole tree
    pub fn replace(&self, root: serde_json::Value) {
        *self.root.write() = root;
    }

    /// Overwrite the value at an existing path
    pub fn set(&self, path: &str, value: serde_json::Value) -> bool {
        let mut root = self.root.write();
        match resolve_mut(&mut root, path) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Copy of the current tree
    pub fn snapshot(&self) -> serde_json::Value {
        self.root.read().clone()
    }
}

impl DataModel for JsonDataModel {
    fn value_at(&self, path: &str) -> Option<Value> {
        let root = self.root.read();
        resolve(&root, path).map(Value::from_json)
    }

    fn is_valid_path(&self, path: &str) -> bool {
        resolve(&self.root.read(), path).is_some()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

fn resolve<'a>(root: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    segments(path).try_fold(root, |current, segment| match current {
        serde_json::Value::Object(fields) => fields.get(segment),
        serde_json::Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn resolve_mut<'a>(root: &'a mut serde_json::Value, path: &str) -> Option<&'a mut serde_json::Value> {
    segments(path).try_fold(root, |current, segment| match current {
        serde_json::Value::Object(fields) => fields.get_mut(segment),
        serde_json::Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dotted_paths() {
        let model = JsonDataModel::new(json!({
            "cpu": { "load": 0.5, "cores": [{ "load": 10 }, { "load": 90 }] }
        }));

        assert_eq!(model.value_at("cpu.load"), Some(Value::Float(0.5)));
        assert_eq!(model.value_at("cpu.cores.1.load"), Some(Value::Int(90)));
        assert!(model.is_valid_path("cpu.cores"));
        assert!(!model.is_valid_path("cpu.cores.5"));
        assert!(!model.is_valid_path("gpu"));
        assert_eq!(model.type_at("cpu.load"), Some(PinType::Float));
    }

    #[test]
    fn test_set_existing_path() {
        let model = JsonDataModel::new(json!({ "audio": { "levels": [0.1, 0.2] } }));
        assert!(model.set("audio.levels.0", json!(0.9)));
        assert!(!model.set("audio.peak", json!(1.0)));
        assert_eq!(model.value_at("audio.levels.0"), Some(Value::Float(0.9)));
    }
}
