// SPDX-License-Identifier: MIT OR Apache-2.0
//! Comparison, boolean and selection nodes.

use crate::context::ScriptContext;
use crate::evaluation::{NodeError, NodeEvaluator};
use crate::pin::PinSlot;
use crate::pin_collection::CollectionSlot;
use crate::pin_set::{PinEvent, PinSet};
use crate::value::{PinType, Value};

/// Comparison between two inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `a > b`
    GreaterThan,
    /// `a < b`
    LessThan,
    /// `a == b`, numeric values compare by magnitude
    Equals,
}

impl Comparison {
    /// Evaluate the comparison
    pub fn compare(self, a: &Value, b: &Value) -> bool {
        match self {
            Self::GreaterThan => matches!((a.as_float(), b.as_float()), (Some(a), Some(b)) if a > b),
            Self::LessThan => matches!((a.as_float(), b.as_float()), (Some(a), Some(b)) if a < b),
            Self::Equals => match (a.as_float(), b.as_float()) {
                (Some(a), Some(b)) => (a - b).abs() <= f32::EPSILON,
                _ => a == b,
            },
        }
    }
}

/// Node applying a [`Comparison`]
pub struct CompareNode {
    comparison: Comparison,
    a: PinSlot,
    b: PinSlot,
    output: PinSlot,
}

impl CompareNode {
    /// Create the pins; equality accepts any type, ordering needs numbers
    pub fn new(pins: &mut PinSet, comparison: Comparison) -> Self {
        let input_type = match comparison {
            Comparison::Equals => PinType::Any,
            Comparison::GreaterThan | Comparison::LessThan => PinType::Float,
        };
        Self {
            comparison,
            a: pins.create_input("A", input_type.clone()),
            b: pins.create_input("B", input_type),
            output: pins.create_output("Result", PinType::Bool),
        }
    }
}

impl NodeEvaluator for CompareNode {
    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        let result = self.comparison.compare(pins.value(self.a), pins.value(self.b));
        pins.set_value(self.output, Value::Bool(result));
        Ok(())
    }
}

/// Boolean fold over a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    /// All inputs true
    And,
    /// Any input true
    Or,
}

/// Node applying a [`BoolOp`] to a variable number of inputs
pub struct BoolNode {
    op: BoolOp,
    inputs: CollectionSlot,
    output: PinSlot,
}

impl BoolNode {
    /// Create the pins; the collection starts with two inputs
    pub fn new(pins: &mut PinSet, op: BoolOp) -> Self {
        Self {
            op,
            inputs: pins.create_input_collection("Inputs", PinType::Bool, 2),
            output: pins.create_output("Result", PinType::Bool),
        }
    }
}

impl NodeEvaluator for BoolNode {
    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        let result = {
            let mut values = pins
                .collection_values(self.inputs)
                .map(|v| v.as_bool().unwrap_or(false));
            match self.op {
                BoolOp::And => values.all(|v| v),
                BoolOp::Or => values.any(|v| v),
            }
        };
        pins.set_value(self.output, Value::Bool(result));
        Ok(())
    }
}

/// Boolean negation
pub struct NotNode {
    input: PinSlot,
    output: PinSlot,
}

impl NotNode {
    /// Create the pins
    pub fn new(pins: &mut PinSet) -> Self {
        Self {
            input: pins.create_input("Input", PinType::Bool),
            output: pins.create_output("Result", PinType::Bool),
        }
    }
}

impl NodeEvaluator for NotNode {
    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        let value = pins.value(self.input).as_bool().unwrap_or(false);
        pins.set_value(self.output, Value::Bool(!value));
        Ok(())
    }
}

/// Give `values` and `output` the type of the first source connected to the collection,
/// going back to `Any` once nothing is connected
pub(crate) fn follow_collection_type(pins: &mut PinSet, event: &PinEvent, values: CollectionSlot, output: PinSlot) {
    let retype = |pins: &mut PinSet, pin_type: PinType| {
        pins.retype_collection(values, pin_type.clone());
        pins.retype(output, pin_type);
    };
    match event {
        PinEvent::Connected { pin, peer_type } if pins.collection_of(*pin) == Some(values) => {
            let untyped = pins
                .collection(values)
                .is_some_and(|collection| collection.pin_type() == &PinType::Any);
            if untyped && peer_type != &PinType::Any {
                retype(pins, peer_type.clone());
            }
        }
        PinEvent::Disconnected { pin } if pins.collection_of(*pin) == Some(values) => {
            let any_connected = pins
                .collection(values)
                .is_some_and(|collection| collection.pins().iter().any(|slot| pins.pin(*slot).is_connected()));
            if !any_connected {
                retype(pins, PinType::Any);
            }
        }
        _ => {}
    }
}

/// Selects one of its values by index.
///
/// The value pins start untyped; the first connection fixes their type (and the output's)
/// to the connected source, and they go back to `Any` once nothing is connected.
pub struct SwitchNode {
    index: PinSlot,
    values: CollectionSlot,
    output: PinSlot,
}

impl SwitchNode {
    /// Create the pins; the collection starts with two values
    pub fn new(pins: &mut PinSet) -> Self {
        Self {
            index: pins.create_input("Index", PinType::Int),
            values: pins.create_input_collection("Values", PinType::Any, 2),
            output: pins.create_output("Value", PinType::Any),
        }
    }
}

impl NodeEvaluator for SwitchNode {
    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        let selected = pins.collection(self.values).and_then(|values| {
            let len = i64::try_from(values.len()).ok().filter(|len| *len > 0)?;
            let index = pins.value(self.index).as_int().unwrap_or_default().rem_euclid(len);
            usize::try_from(index).ok().and_then(|i| values.pins().get(i).copied())
        });
        let value = selected.map(|slot| pins.value(slot).clone()).unwrap_or_default();
        pins.set_value(self.output, value);
        Ok(())
    }

    fn on_pin_event(&mut self, pins: &mut PinSet, event: &PinEvent) {
        follow_collection_type(pins, event, self.values, self.output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use crate::nodes::literal::StaticValueNode;
    use crate::registry::NodeRegistry;
    use crate::script::NodeScript;

    #[test]
    fn test_numeric_equality() {
        assert!(Comparison::Equals.compare(&Value::Int(2), &Value::Float(2.0)));
        assert!(!Comparison::Equals.compare(&Value::Bool(true), &Value::Int(1)));
        assert!(Comparison::Equals.compare(&Value::from("a"), &Value::from("a")));
        assert!(Comparison::GreaterThan.compare(&Value::Int(3), &Value::Float(2.5)));
        assert!(!Comparison::LessThan.compare(&Value::Empty, &Value::Int(1)));
    }

    fn values_of(script: &NodeScript, node: NodeId) -> Vec<crate::pin::PinInfo> {
        script
            .pins(node)
            .unwrap()
            .into_iter()
            .filter(|p| p.collection == Some(0))
            .collect()
    }

    #[test]
    fn test_switch_takes_type_of_first_connection() {
        let registry = NodeRegistry::with_builtins();
        let script = NodeScript::new("Switch", PinType::Float);
        let switch = script.add_node(registry.create_node("logic.switch").unwrap()).unwrap();
        let index = script.add_node(StaticValueNode::node(Value::Int(3))).unwrap();
        let low = script.add_node(StaticValueNode::node(Value::Float(0.1))).unwrap();
        let high = script.add_node(StaticValueNode::node(Value::Float(0.9))).unwrap();
        let flag = script.add_node(StaticValueNode::node(Value::Bool(true))).unwrap();
        let exit = script.exit_node().unwrap();

        let values = values_of(&script, switch);
        let low_link = script
            .connect(low, script.pin_named(low, "Value").unwrap(), switch, values[0].id)
            .unwrap();
        assert!(values_of(&script, switch).iter().all(|p| p.pin_type == PinType::Float));

        assert!(script
            .connect(flag, script.pin_named(flag, "Value").unwrap(), switch, values[1].id)
            .is_err());
        script
            .connect(high, script.pin_named(high, "Value").unwrap(), switch, values[1].id)
            .unwrap();
        script
            .connect(index, script.pin_named(index, "Value").unwrap(), switch, script.pin_named(switch, "Index").unwrap())
            .unwrap();
        script
            .connect(switch, script.pin_named(switch, "Value").unwrap(), exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();

        // index 3 wraps onto the second value
        assert_eq!(script.run(), Value::Float(0.9));

        assert!(script.disconnect(low_link));
        assert!(values_of(&script, switch).iter().all(|p| p.pin_type == PinType::Float));
        let high_pin = script.pin_named(high, "Value").unwrap();
        assert!(script.disconnect_pins(values[1].id, high_pin));
        assert!(values_of(&script, switch).iter().all(|p| p.pin_type == PinType::Any));
    }

    #[test]
    fn test_and_or() {
        let registry = NodeRegistry::with_builtins();
        for (kind, expected) in [("logic.and", false), ("logic.or", true)] {
            let script = NodeScript::new("Bool", PinType::Bool);
            let node = script.add_node(registry.create_node(kind).unwrap()).unwrap();
            let yes = script.add_node(StaticValueNode::node(Value::Bool(true))).unwrap();
            let exit = script.exit_node().unwrap();
            let inputs = values_of(&script, node);
            script
                .connect(yes, script.pin_named(yes, "Value").unwrap(), node, inputs[0].id)
                .unwrap();
            script
                .connect(node, script.pin_named(node, "Result").unwrap(), exit, script.pin_named(exit, "Result").unwrap())
                .unwrap();
            assert_eq!(script.run(), Value::Bool(expected), "{kind}");
        }
    }

    #[test]
    fn test_and_over_all_true_inputs() {
        let registry = NodeRegistry::with_builtins();
        let script = NodeScript::new("Bool", PinType::Bool);
        let node = script.add_node(registry.create_node("logic.and").unwrap()).unwrap();
        let exit = script.exit_node().unwrap();
        let inputs = values_of(&script, node);
        for input in inputs.iter().take(2) {
            let yes = script.add_node(StaticValueNode::node(Value::Bool(true))).unwrap();
            script
                .connect(yes, script.pin_named(yes, "Value").unwrap(), node, input.id)
                .unwrap();
        }
        script
            .connect(node, script.pin_named(node, "Result").unwrap(), exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();
        assert_eq!(script.run(), Value::Bool(true));
    }
}
