// SPDX-License-Identifier: MIT OR Apache-2.0
//! List nodes.
//!
//! A list operator owns a private predicate script with result type `Bool`. The predicate
//! sees one element at a time through its item source node, and the operator runs it once
//! per element inside its own evaluation.

use super::exit::ExitNode;
use super::field_outputs::FieldOutputs;
use crate::context::ScriptContext;
use crate::evaluation::{NodeError, NodeEvaluator, StorageError};
use crate::node::Node;
use crate::persistence::ScriptModel;
use crate::pin::PinSlot;
use crate::pin_set::{PinEvent, PinSet};
use crate::registry::NodeRegistry;
use crate::script::NodeScript;
use crate::value::{PinType, Value};
use serde::{Deserialize, Serialize};

/// Registry kind of the item source inside predicate scripts
pub const ITEM_KIND: &str = "list.item";

/// How a predicate is combined over the elements of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListOperator {
    /// At least one element matches
    #[default]
    Any,
    /// Every element matches
    All,
    /// No element matches
    None,
}

impl ListOperator {
    /// Combine `predicate` over `items`, stopping as soon as the answer is known
    pub fn apply<E>(self, items: &[Value], mut predicate: impl FnMut(&Value) -> Result<bool, E>) -> Result<bool, E> {
        match self {
            Self::Any => {
                for item in items {
                    if predicate(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::All => {
                for item in items {
                    if !predicate(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::None => {
                for item in items {
                    if predicate(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

/// Exposes the current list element of a predicate script
#[derive(Default)]
pub struct ItemSourceNode {
    outputs: FieldOutputs,
}

impl ItemSourceNode {
    /// Create the node; its pins follow the script's item type
    pub fn new(_pins: &mut PinSet) -> Self {
        Self::default()
    }

    /// Build an item source node
    pub fn node() -> Node {
        Node::build(ITEM_KIND, "Item", "Current list element", |pins| {
            Box::new(Self::new(pins))
        })
    }
}

impl NodeEvaluator for ItemSourceNode {
    fn evaluate(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> Result<(), NodeError> {
        self.outputs.set_values(pins, ctx.item.as_ref());
        Ok(())
    }

    fn is_default_node(&self) -> bool {
        true
    }

    fn on_item_type_changed(&mut self, pins: &mut PinSet, item_type: Option<&PinType>) {
        self.outputs.change_type(pins, item_type);
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.outputs.pin_type()).ok()
    }

    fn load_storage(&mut self, pins: &mut PinSet, storage: serde_json::Value, _registry: &NodeRegistry) -> Result<(), StorageError> {
        let item_type: Option<PinType> = serde_json::from_value(storage)?;
        self.outputs.change_type(pins, item_type.as_ref());
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct ListOperatorStorage {
    operator: ListOperator,
    #[serde(default)]
    script: Option<ScriptModel>,
}

/// Tests a predicate script against the elements of a list
pub struct ListOperatorNode {
    operator: ListOperator,
    list: PinSlot,
    output: PinSlot,
    script: NodeScript,
}

impl ListOperatorNode {
    /// Create the pins and an empty predicate script
    pub fn new(pins: &mut PinSet) -> Self {
        let script = NodeScript::empty("Predicate", PinType::Bool);
        {
            let mut graph = script.lock();
            graph.insert_node(ItemSourceNode::node());
            graph.insert_node(ExitNode::node(PinType::Bool));
        }
        Self {
            operator: ListOperator::default(),
            list: pins.create_input("List", PinType::list_of(PinType::Any)),
            output: pins.create_output("Result", PinType::Bool),
            script,
        }
    }

    /// Current operator
    pub fn operator(&self) -> ListOperator {
        self.operator
    }
}

impl NodeEvaluator for ListOperatorNode {
    fn initialize(&mut self, _pins: &mut PinSet, ctx: &ScriptContext) {
        self.script.set_context(ScriptContext {
            item: None,
            ..ctx.clone()
        });
    }

    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        let items = pins
            .value(self.list)
            .as_list()
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        let result = self
            .operator
            .apply(&items, |item| {
                self.script
                    .try_run_item(item.clone())
                    .map(|value| value.as_bool().unwrap_or(false))
            })
            .map_err(|error| NodeError::SubScript(Box::new(error)))?;
        pins.set_value(self.output, Value::Bool(result));
        Ok(())
    }

    fn on_pin_event(&mut self, _pins: &mut PinSet, event: &PinEvent) {
        // Item pins keep their type when the list is disconnected so the predicate survives
        if let PinEvent::Connected { pin, peer_type } = event {
            if *pin != self.list {
                return;
            }
            if let Some(element) = peer_type.element_type().filter(|t| **t != PinType::Any) {
                self.script.set_item_type(Some(element.clone()));
            }
        }
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(ListOperatorStorage {
            operator: self.operator,
            script: Some(self.script.to_model()),
        })
        .ok()
    }

    fn load_storage(&mut self, _pins: &mut PinSet, storage: serde_json::Value, registry: &NodeRegistry) -> Result<(), StorageError> {
        let storage: ListOperatorStorage = serde_json::from_value(storage)?;
        if let Some(model) = storage.script {
            if model.result_type != PinType::Bool {
                return Err(StorageError::Invalid(format!(
                    "predicate must produce Bool, not {}",
                    model.result_type
                )));
            }
            let (script, report) = NodeScript::from_model(&model, registry, self.script.context());
            if !report.is_complete() {
                tracing::warn!(
                    dropped_nodes = report.dropped_nodes.len(),
                    dropped_connections = report.dropped_connections.len(),
                    "Predicate script restored partially"
                );
            }
            self.script = script;
        }
        self.operator = storage.operator;
        Ok(())
    }

    fn sub_script(&self) -> Option<&NodeScript> {
        Some(&self.script)
    }
}

/// Number of elements in a list
pub struct ListCountNode {
    list: PinSlot,
    output: PinSlot,
}

impl ListCountNode {
    /// Create the pins
    pub fn new(pins: &mut PinSet) -> Self {
        Self {
            list: pins.create_input("List", PinType::list_of(PinType::Any)),
            output: pins.create_output("Count", PinType::Int),
        }
    }
}

impl NodeEvaluator for ListCountNode {
    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        let count = pins.value(self.list).as_list().map_or(0, <[Value]>::len);
        pins.set_value(self.output, Value::Int(i64::try_from(count).unwrap_or(i64::MAX)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::JsonDataModel;
    use crate::node::NodeId;
    use crate::nodes::literal::StaticValueNode;
    use serde_json::json;
    use std::sync::Arc;

    fn connect(script: &NodeScript, from: NodeId, from_pin: &str, to: NodeId, to_pin: &str) {
        script
            .connect(from, script.pin_named(from, from_pin).unwrap(), to, script.pin_named(to, to_pin).unwrap())
            .unwrap();
    }

    /// Script testing `values` elements with `item > 2`
    fn greater_than_two(values: serde_json::Value) -> (NodeScript, NodeId, NodeRegistry) {
        let registry = NodeRegistry::with_builtins();
        let model = Arc::new(JsonDataModel::new(json!({ "values": values })));
        let script = NodeScript::new("Condition", PinType::Bool);
        script.set_context(ScriptContext::with_data_model(model));

        let source = script.add_node(registry.create_node("data_model.value").unwrap()).unwrap();
        script
            .set_storage(source, json!({ "path": "values" }), &registry)
            .unwrap();
        let operator = script.add_node(registry.create_node("list.operator").unwrap()).unwrap();
        let exit = script.exit_node().unwrap();
        connect(&script, source, "Value", operator, "List");
        connect(&script, operator, "Result", exit, "Result");

        script
            .with_sub_script(operator, |predicate| {
                // an empty list carries no element type
                if predicate.item_type().is_none() {
                    predicate.set_item_type(Some(PinType::Int));
                }
                let item = predicate.find_node(ITEM_KIND).unwrap();
                let compare = predicate
                    .add_node(registry.create_node("logic.greater_than").unwrap())
                    .unwrap();
                let two = predicate.add_node(StaticValueNode::node(Value::Float(2.0))).unwrap();
                let exit = predicate.exit_node().unwrap();
                connect(predicate, item, "Value", compare, "A");
                connect(predicate, two, "Value", compare, "B");
                connect(predicate, compare, "Result", exit, "Result");
            })
            .unwrap();

        (script, operator, registry)
    }

    fn run_with(script: &NodeScript, operator: NodeId, mode: &str, registry: &NodeRegistry) -> Value {
        script
            .set_storage(operator, json!({ "operator": mode }), registry)
            .unwrap();
        script.run()
    }

    #[test]
    fn test_operators_over_values() {
        let (script, operator, registry) = greater_than_two(json!([1, 2, 3]));
        assert_eq!(run_with(&script, operator, "Any", &registry), Value::Bool(true));
        assert_eq!(run_with(&script, operator, "All", &registry), Value::Bool(false));
        assert_eq!(run_with(&script, operator, "None", &registry), Value::Bool(false));
    }

    #[test]
    fn test_operators_over_empty_list() {
        let (script, operator, registry) = greater_than_two(json!([]));
        assert_eq!(run_with(&script, operator, "Any", &registry), Value::Bool(false));
        assert_eq!(run_with(&script, operator, "All", &registry), Value::Bool(true));
        assert_eq!(run_with(&script, operator, "None", &registry), Value::Bool(true));
    }

    #[test]
    fn test_short_circuit() {
        let mut calls = 0;
        let items = [Value::Int(5), Value::Int(1), Value::Int(7)];
        let result: Result<bool, ()> = ListOperator::Any.apply(&items, |item| {
            calls += 1;
            Ok(item.as_int() == Some(5))
        });
        assert_eq!(result, Ok(true));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_item_source_cannot_be_removed() {
        let (script, operator, _registry) = greater_than_two(json!([4]));
        let removed = script
            .with_sub_script(operator, |predicate| {
                let item = predicate.find_node(ITEM_KIND).unwrap();
                predicate.remove_node(item)
            })
            .unwrap();
        assert!(removed.is_err());
    }

    #[test]
    fn test_predicate_survives_round_trip() {
        let (script, _operator, registry) = greater_than_two(json!([0, 5]));
        assert_eq!(script.run(), Value::Bool(true));

        let model = script.to_model();
        let (loaded, report) = NodeScript::from_model(&model, &registry, script.context());
        assert!(report.is_complete());
        assert_eq!(loaded.to_model(), model);
        assert_eq!(loaded.run(), Value::Bool(true));
    }

    #[test]
    fn test_mixed_numbers_keep_fractions() {
        let (script, operator, registry) = greater_than_two(json!([1, 2.4]));
        let item_type = script.with_sub_script(operator, NodeScript::item_type).unwrap();
        assert_eq!(item_type, Some(PinType::Float));
        assert_eq!(run_with(&script, operator, "Any", &registry), Value::Bool(true));
        assert_eq!(run_with(&script, operator, "All", &registry), Value::Bool(false));
    }

    #[test]
    fn test_item_type_survives_round_trip() {
        let registry = NodeRegistry::with_builtins();
        let script = NodeScript::new("Condition", PinType::Bool);
        let operator = script.add_node(registry.create_node("list.operator").unwrap()).unwrap();
        script
            .with_sub_script(operator, |predicate| predicate.set_item_type(Some(PinType::Float)))
            .unwrap();

        let (loaded, report) = NodeScript::from_model(&script.to_model(), &registry, ScriptContext::default());
        assert!(report.is_complete());
        let item_type = loaded.with_sub_script(operator, NodeScript::item_type).unwrap();
        assert_eq!(item_type, Some(PinType::Float));
        let item_pin = loaded
            .with_sub_script(operator, |predicate| {
                let item = predicate.find_node(ITEM_KIND).unwrap();
                predicate.pin_named(item, "Value")
            })
            .unwrap();
        assert!(item_pin.is_some());
    }

    #[test]
    fn test_count() {
        let registry = NodeRegistry::with_builtins();
        let model = Arc::new(JsonDataModel::new(json!({ "devices": ["kbd", "mouse", "strip"] })));
        let script = NodeScript::new("Count", PinType::Int);
        script.set_context(ScriptContext::with_data_model(model));
        let source = script.add_node(registry.create_node("data_model.value").unwrap()).unwrap();
        script
            .set_storage(source, json!({ "path": "devices" }), &registry)
            .unwrap();
        let count = script.add_node(registry.create_node("list.count").unwrap()).unwrap();
        let exit = script.exit_node().unwrap();
        connect(&script, source, "Value", count, "List");
        connect(&script, count, "Count", exit, "Result");
        assert_eq!(script.run(), Value::Int(3));
    }
}
