// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node reading a value from the script's data model.

use super::field_outputs::FieldOutputs;
use crate::context::ScriptContext;
use crate::evaluation::{NodeError, NodeEvaluator, StorageError};
use crate::pin_set::PinSet;
use crate::registry::NodeRegistry;
use crate::value::PinType;
use serde::{Deserialize, Serialize};

/// Persisted configuration of [`DataModelValueNode`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataModelStorage {
    /// Dotted path into the data model
    pub path: String,
    /// Type the path resolved to when last seen, used while no data model is present
    #[serde(default)]
    pub value_type: Option<PinType>,
}

/// Exposes the value at a data model path through typed output pins
#[derive(Default)]
pub struct DataModelValueNode {
    storage: DataModelStorage,
    outputs: FieldOutputs,
}

impl DataModelValueNode {
    /// Create an unconfigured node; it has no pins until a path is set
    pub fn new(_pins: &mut PinSet) -> Self {
        Self::default()
    }

    /// Retype the outputs from the data model; returns whether the path resolved
    fn resolve(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> bool {
        let Some(data_model) = &ctx.data_model else {
            return false;
        };
        if self.storage.path.is_empty() {
            return false;
        }
        let Some(value_type) = data_model.type_at(&self.storage.path) else {
            return false;
        };
        self.outputs.change_type(pins, Some(&value_type));
        self.storage.value_type = Some(value_type);
        true
    }
}

impl NodeEvaluator for DataModelValueNode {
    fn initialize(&mut self, pins: &mut PinSet, ctx: &ScriptContext) {
        if !self.resolve(pins, ctx) && !self.storage.path.is_empty() && ctx.data_model.is_some() {
            tracing::debug!(path = %self.storage.path, "Data model path does not resolve");
        }
    }

    fn refresh(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> bool {
        // a path that never resolved is retried until the data model grows it
        if self.outputs.pin_type().is_some() || !self.resolve(pins, ctx) {
            return false;
        }
        tracing::debug!(path = %self.storage.path, "Data model path resolved");
        true
    }

    fn evaluate(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> Result<(), NodeError> {
        let value = ctx
            .data_model
            .as_ref()
            .and_then(|data_model| data_model.value_at(&self.storage.path));
        self.outputs.set_values(pins, value.as_ref());
        Ok(())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.storage).ok()
    }

    fn load_storage(&mut self, pins: &mut PinSet, storage: serde_json::Value, _registry: &NodeRegistry) -> Result<(), StorageError> {
        let storage: DataModelStorage = serde_json::from_value(storage)?;
        self.outputs.change_type(pins, storage.value_type.as_ref());
        self.storage = storage;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::JsonDataModel;
    use crate::script::NodeScript;
    use crate::value::Value;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_object_fields_become_pins() {
        let registry = NodeRegistry::with_builtins();
        let model = Arc::new(JsonDataModel::new(json!({
            "gpu": { "fan": 40, "temperature": 71.5 }
        })));
        let script = NodeScript::new("Temperature", PinType::Float);
        script.set_context(ScriptContext::with_data_model(model.clone()));

        let node = script.add_node(registry.create_node("data_model.value").unwrap()).unwrap();
        assert!(script.pins(node).unwrap().is_empty());
        script
            .set_storage(node, json!({ "path": "gpu" }), &registry)
            .unwrap();

        let names: Vec<String> = script.pins(node).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["fan".to_string(), "temperature".to_string()]);

        let exit = script.exit_node().unwrap();
        script
            .connect(node, script.pin_named(node, "temperature").unwrap(), exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();
        assert_eq!(script.run(), Value::Float(71.5));

        model.set("gpu.temperature", json!(80.0));
        assert_eq!(script.run(), Value::Float(80.0));
    }

    #[test]
    fn test_path_resolving_later_creates_pins() {
        let registry = NodeRegistry::with_builtins();
        let model = Arc::new(JsonDataModel::new(json!({})));
        let script = NodeScript::new("Temperature", PinType::Float);
        script.set_context(ScriptContext::with_data_model(model.clone()));
        let node = script.add_node(registry.create_node("data_model.value").unwrap()).unwrap();
        script
            .set_storage(node, json!({ "path": "gpu.temperature" }), &registry)
            .unwrap();
        assert!(script.pins(node).unwrap().is_empty());

        model.replace(json!({ "gpu": { "temperature": 70.0 } }));
        script.run();
        let pin = script.pin_named(node, "Value").unwrap();

        let exit = script.exit_node().unwrap();
        script
            .connect(node, pin, exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();
        assert_eq!(script.run(), Value::Float(70.0));
        assert_eq!(
            script.storage(node).unwrap()["value_type"],
            serde_json::to_value(PinType::Float).unwrap()
        );
    }

    #[test]
    fn test_retype_reuses_pins_and_keeps_valid_links() {
        let registry = NodeRegistry::with_builtins();
        let model = Arc::new(JsonDataModel::new(json!({ "load": 0.5, "name": "cpu" })));
        let script = NodeScript::new("Load", PinType::Float);
        script.set_context(ScriptContext::with_data_model(model.clone()));
        let node = script.add_node(registry.create_node("data_model.value").unwrap()).unwrap();
        script
            .set_storage(node, json!({ "path": "load" }), &registry)
            .unwrap();

        let pin = script.pin_named(node, "Value").unwrap();
        let exit = script.exit_node().unwrap();
        script
            .connect(node, pin, exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();

        model.replace(json!({ "load": 3, "name": "cpu" }));
        script.set_context(ScriptContext::with_data_model(model.clone()));
        assert_eq!(script.pin_named(node, "Value"), Some(pin));
        assert_eq!(script.connections().len(), 1);
        assert_eq!(script.run(), Value::Float(3.0));

        script
            .set_storage(node, json!({ "path": "name" }), &registry)
            .unwrap();
        assert_eq!(script.pin_named(node, "Value"), Some(pin));
        assert!(script.connections().is_empty());
    }
}
