// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node reading a property of the element the script belongs to.
//!
//! A property with an object type (a position, a size) exposes one output per field. The
//! pins come from the node's bucket, so switching between properties keeps pin identities
//! and the connections that still type-check.

use super::field_outputs::FieldOutputs;
use crate::context::ScriptContext;
use crate::evaluation::{NodeError, NodeEvaluator, StorageError};
use crate::pin_set::PinSet;
use crate::registry::NodeRegistry;
use crate::value::PinType;
use serde::{Deserialize, Serialize};

/// Registry kind
pub const KIND: &str = "layer.property";

/// Persisted configuration of [`LayerPropertyNode`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerPropertyStorage {
    /// Name of the selected property
    #[serde(default)]
    pub property: Option<String>,
    /// Type of the property when last seen
    #[serde(default)]
    pub value_type: Option<PinType>,
}

/// Exposes the current value of one layer property
#[derive(Default)]
pub struct LayerPropertyNode {
    storage: LayerPropertyStorage,
    outputs: FieldOutputs,
}

impl LayerPropertyNode {
    /// Create a node with no property selected
    pub fn new(_pins: &mut PinSet) -> Self {
        Self::default()
    }

    /// Follow the selected property's type; returns whether the pins changed.
    ///
    /// Without a property source the last seen type is kept, but a source lacking the
    /// property clears the pins.
    fn sync_pins(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> bool {
        let Some(properties) = &ctx.properties else {
            return false;
        };
        let value_type = self
            .storage
            .property
            .as_deref()
            .and_then(|name| properties.property_type(name));
        if self.outputs.pin_type() == value_type.as_ref() {
            return false;
        }
        if value_type.is_none() {
            tracing::debug!(property = ?self.storage.property, "Layer property not found, removing pins");
        }
        self.outputs.change_type(pins, value_type.as_ref());
        self.storage.value_type = value_type;
        true
    }
}

impl NodeEvaluator for LayerPropertyNode {
    fn initialize(&mut self, pins: &mut PinSet, ctx: &ScriptContext) {
        self.sync_pins(pins, ctx);
    }

    fn refresh(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> bool {
        self.sync_pins(pins, ctx)
    }

    fn evaluate(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> Result<(), NodeError> {
        let value = match (&ctx.properties, &self.storage.property) {
            (Some(properties), Some(name)) => properties.property_value(name),
            _ => None,
        };
        self.outputs.set_values(pins, value.as_ref());
        Ok(())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.storage).ok()
    }

    fn load_storage(&mut self, pins: &mut PinSet, storage: serde_json::Value, _registry: &NodeRegistry) -> Result<(), StorageError> {
        let storage: LayerPropertyStorage = serde_json::from_value(storage)?;
        self.outputs.change_type(pins, storage.value_type.as_ref());
        self.storage = storage;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::PropertySource;
    use crate::script::NodeScript;
    use crate::value::Value;
    use indexmap::IndexMap;
    use parking_lot::RwLock;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Default)]
    struct Properties(RwLock<IndexMap<String, Value>>);

    impl Properties {
        fn set(&self, name: &str, value: Value) {
            self.0.write().insert(name.to_string(), value);
        }

        fn remove(&self, name: &str) {
            self.0.write().shift_remove(name);
        }
    }

    impl PropertySource for Properties {
        fn property_names(&self) -> Vec<String> {
            self.0.read().keys().cloned().collect()
        }

        fn property_type(&self, name: &str) -> Option<PinType> {
            self.0.read().get(name).map(Value::pin_type)
        }

        fn property_value(&self, name: &str) -> Option<Value> {
            self.0.read().get(name).cloned()
        }
    }

    fn position(x: f32, y: f32) -> Value {
        Value::Object(IndexMap::from([
            ("X".to_string(), Value::Float(x)),
            ("Y".to_string(), Value::Float(y)),
        ]))
    }

    fn script_with(properties: Arc<Properties>) -> (NodeScript, crate::node::NodeId, NodeRegistry) {
        let registry = NodeRegistry::with_builtins();
        let script = NodeScript::new("Property", PinType::Float);
        script.set_context(ScriptContext::default().with_properties(properties));
        let node = script.add_node(registry.create_node(KIND).unwrap()).unwrap();
        (script, node, registry)
    }

    #[test]
    fn test_property_fields_become_pins() {
        let properties = Arc::new(Properties::default());
        properties.set("Position", position(3.0, 4.0));
        properties.set("Opacity", Value::Float(0.5));
        let (script, node, registry) = script_with(properties.clone());
        assert!(script.pins(node).unwrap().is_empty());

        script
            .set_storage(node, json!({ "property": "Position" }), &registry)
            .unwrap();
        let names: Vec<String> = script.pins(node).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["X".to_string(), "Y".to_string()]);

        let exit = script.exit_node().unwrap();
        script
            .connect(node, script.pin_named(node, "Y").unwrap(), exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();
        assert_eq!(script.run(), Value::Float(4.0));

        properties.set("Position", position(3.0, 7.5));
        assert_eq!(script.run(), Value::Float(7.5));
    }

    #[test]
    fn test_switching_property_reuses_bucket_pins() {
        let properties = Arc::new(Properties::default());
        properties.set("Position", position(1.0, 2.0));
        properties.set("Opacity", Value::Float(0.5));
        let (script, node, registry) = script_with(properties);

        script
            .set_storage(node, json!({ "property": "Position" }), &registry)
            .unwrap();
        let x = script.pin_named(node, "X").unwrap();
        let exit = script.exit_node().unwrap();
        script
            .connect(node, x, exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();

        script
            .set_storage(node, json!({ "property": "Opacity" }), &registry)
            .unwrap();
        assert_eq!(script.pin_named(node, "Value"), Some(x));
        assert_eq!(script.connections().len(), 1);
        assert_eq!(script.run(), Value::Float(0.5));
    }

    #[test]
    fn test_pins_follow_property_presence() {
        let properties = Arc::new(Properties::default());
        let (script, node, registry) = script_with(properties.clone());
        script
            .set_storage(node, json!({ "property": "Brightness" }), &registry)
            .unwrap();
        assert!(script.pins(node).unwrap().is_empty());

        properties.set("Brightness", Value::Int(80));
        script.run();
        assert!(script.pin_named(node, "Value").is_some());
        assert_eq!(
            script.storage(node).unwrap()["value_type"],
            serde_json::to_value(PinType::Int).unwrap()
        );

        properties.remove("Brightness");
        script.run();
        assert!(script.pins(node).unwrap().is_empty());
        assert_eq!(properties.property_names(), Vec::<String>::new());
    }
}
