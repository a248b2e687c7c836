// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant value nodes.

use crate::context::ScriptContext;
use crate::evaluation::{NodeError, NodeEvaluator, StorageError};
use crate::node::Node;
use crate::pin::PinSlot;
use crate::pin_set::PinSet;
use crate::registry::NodeRegistry;
use crate::value::{PinType, Value};

/// Outputs a value held in its storage
pub struct StaticValueNode {
    output: PinSlot,
    value: Value,
}

impl StaticValueNode {
    /// Create the pins of a constant node of the given type
    pub fn new(pins: &mut PinSet, value_type: PinType) -> Self {
        let value = value_type.default_value();
        Self {
            output: pins.create_output("Value", value_type),
            value,
        }
    }

    /// Registry kind holding constants of a type
    pub fn kind_for(value_type: &PinType) -> Option<&'static str> {
        match value_type {
            PinType::Float => Some("static.float"),
            PinType::Int => Some("static.int"),
            PinType::Bool => Some("static.bool"),
            PinType::String => Some("static.string"),
            PinType::Color => Some("static.color"),
            _ => None,
        }
    }

    /// Build a constant node holding `value`
    pub fn node(value: Value) -> Node {
        let value_type = value.pin_type();
        let kind = Self::kind_for(&value_type).unwrap_or("static.value");
        Node::build(kind, "Value", "Constant value", |pins| {
            let mut node = Self::new(pins, value_type);
            node.value = value;
            Box::new(node)
        })
    }
}

impl NodeEvaluator for StaticValueNode {
    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        pins.set_value(self.output, self.value.clone());
        Ok(())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.value).ok()
    }

    fn load_storage(&mut self, pins: &mut PinSet, storage: serde_json::Value, _registry: &NodeRegistry) -> Result<(), StorageError> {
        let value: Value = serde_json::from_value(storage)?;
        self.value = value.cast(pins.pin(self.output).pin_type());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::NodeScript;
    use crate::value::Color;

    #[test]
    fn test_storage_replaces_value() {
        let registry = NodeRegistry::with_builtins();
        let script = NodeScript::new("Color", PinType::Color);
        let node = script.add_node(registry.create_node("static.color").unwrap()).unwrap();
        let exit = script.exit_node().unwrap();
        script
            .connect(node, script.pin_named(node, "Value").unwrap(), exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();
        assert_eq!(script.run(), Value::Color(Color::default()));

        let red = Value::Color(Color::rgb(255, 0, 0));
        script
            .set_storage(node, serde_json::to_value(&red).unwrap(), &registry)
            .unwrap();
        assert_eq!(script.storage(node), Some(serde_json::to_value(&red).unwrap()));
        assert_eq!(script.run(), red);
    }
}
