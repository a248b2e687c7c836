// SPDX-License-Identifier: MIT OR Apache-2.0
//! Script result node.

use crate::context::ScriptContext;
use crate::evaluation::{NodeError, NodeEvaluator, StorageError};
use crate::node::Node;
use crate::pin::PinSlot;
use crate::pin_set::PinSet;
use crate::registry::NodeRegistry;
use crate::value::{PinType, Value};

/// Registry kind of the exit node
pub const KIND: &str = "exit";

/// Passes its single input through as the script result
pub struct ExitNode {
    input: PinSlot,
    result_type: PinType,
}

impl ExitNode {
    /// Create the pins of an exit node
    pub fn new(pins: &mut PinSet, result_type: PinType) -> Self {
        Self {
            input: pins.create_input("Result", result_type.clone()),
            result_type,
        }
    }

    /// Build an exit node for a script of the given result type
    pub fn node(result_type: PinType) -> Node {
        Node::build(KIND, "Result", "Script result", |pins| {
            Box::new(Self::new(pins, result_type))
        })
    }
}

impl NodeEvaluator for ExitNode {
    fn evaluate(&mut self, _pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        Ok(())
    }

    fn is_exit_node(&self) -> bool {
        true
    }

    fn exit_value(&self, pins: &PinSet) -> Option<Value> {
        Some(pins.value(self.input).clone())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.result_type).ok()
    }

    fn load_storage(&mut self, pins: &mut PinSet, storage: serde_json::Value, _registry: &NodeRegistry) -> Result<(), StorageError> {
        let result_type: PinType = serde_json::from_value(storage)?;
        pins.retype(self.input, result_type.clone());
        self.result_type = result_type;
        Ok(())
    }
}
