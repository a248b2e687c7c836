// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node kinds.

pub mod data_model;
pub mod data_model_event;
pub mod exit;
pub mod field_outputs;
pub mod layer_property;
pub mod list;
pub mod literal;
pub mod logic;
pub mod math;

use crate::node::NodeCategory;
use crate::registry::{NodeRegistry, NodeType};
use crate::value::PinType;

/// Register every built-in node kind
pub fn register_builtins(registry: &mut NodeRegistry) {
    // ========================================================================
    // Output
    // ========================================================================

    registry.register(NodeType::new(exit::KIND, "Result", NodeCategory::Output, "Script result", |pins| {
        Box::new(exit::ExitNode::new(pins, PinType::Any))
    }));

    // ========================================================================
    // Constants
    // ========================================================================

    for (id, name, value_type) in [
        ("static.float", "Float", PinType::Float),
        ("static.int", "Integer", PinType::Int),
        ("static.bool", "Boolean", PinType::Bool),
        ("static.string", "Text", PinType::String),
        ("static.color", "Color", PinType::Color),
        ("static.value", "Value", PinType::Any),
    ] {
        registry.register(NodeType::new(id, name, NodeCategory::Input, "Constant value", move |pins| {
            Box::new(literal::StaticValueNode::new(pins, value_type.clone()))
        }));
    }

    // ========================================================================
    // Math
    // ========================================================================

    registry.register(NodeType::new("math.sum", "Sum", NodeCategory::Math, "Sum of all inputs", |pins| {
        Box::new(math::ReduceNode::new(pins, math::Reduction::Sum))
    }));
    registry.register(NodeType::new("math.multiply", "Multiply", NodeCategory::Math, "Product of all inputs", |pins| {
        Box::new(math::ReduceNode::new(pins, math::Reduction::Product))
    }));
    registry.register(NodeType::new("math.subtract", "Subtract", NodeCategory::Math, "A minus B", |pins| {
        Box::new(math::BinaryMathNode::new(pins, math::BinaryOp::Subtract))
    }));
    registry.register(NodeType::new("math.divide", "Divide", NodeCategory::Math, "A divided by B, zero when B is zero", |pins| {
        Box::new(math::BinaryMathNode::new(pins, math::BinaryOp::Divide))
    }));
    registry.register(NodeType::new("math.clamp", "Clamp", NodeCategory::Math, "Value limited to [Min, Max]", |pins| {
        Box::new(math::ClampNode::new(pins))
    }));

    // ========================================================================
    // Logic
    // ========================================================================

    for (id, name, comparison) in [
        ("logic.greater_than", "Greater Than", logic::Comparison::GreaterThan),
        ("logic.less_than", "Less Than", logic::Comparison::LessThan),
        ("logic.equals", "Equals", logic::Comparison::Equals),
    ] {
        registry.register(NodeType::new(id, name, NodeCategory::Logic, "Compare A with B", move |pins| {
            Box::new(logic::CompareNode::new(pins, comparison))
        }));
    }
    registry.register(NodeType::new("logic.and", "And", NodeCategory::Logic, "True when all inputs are true", |pins| {
        Box::new(logic::BoolNode::new(pins, logic::BoolOp::And))
    }));
    registry.register(NodeType::new("logic.or", "Or", NodeCategory::Logic, "True when any input is true", |pins| {
        Box::new(logic::BoolNode::new(pins, logic::BoolOp::Or))
    }));
    registry.register(NodeType::new("logic.not", "Not", NodeCategory::Logic, "Negated input", |pins| {
        Box::new(logic::NotNode::new(pins))
    }));
    registry.register(NodeType::new("logic.switch", "Switch", NodeCategory::Logic, "Value selected by index", |pins| {
        Box::new(logic::SwitchNode::new(pins))
    }));

    // ========================================================================
    // Data model & lists
    // ========================================================================

    registry.register(NodeType::new(
        "data_model.value",
        "Data Model Value",
        NodeCategory::DataModel,
        "Value at a data model path",
        |pins| Box::new(data_model::DataModelValueNode::new(pins)),
    ));
    registry.register(NodeType::new(
        data_model_event::EVENT_KIND,
        "Data Model Event",
        NodeCategory::DataModel,
        "Latest change of a data model value",
        |pins| Box::new(data_model_event::DataModelEventNode::new(pins)),
    ));
    registry.register(NodeType::new(
        data_model_event::CYCLE_KIND,
        "Data Model Event Cycle",
        NodeCategory::DataModel,
        "Next value each time a data model value changes",
        |pins| Box::new(data_model_event::DataModelEventCycleNode::new(pins)),
    ));
    registry.register(NodeType::new(
        "list.operator",
        "List Operator",
        NodeCategory::List,
        "Test a condition against the elements of a list",
        |pins| Box::new(list::ListOperatorNode::new(pins)),
    ));
    registry.register(NodeType::new("list.count", "Count", NodeCategory::List, "Number of list elements", |pins| {
        Box::new(list::ListCountNode::new(pins))
    }));
    registry.register(NodeType::new(list::ITEM_KIND, "Item", NodeCategory::Internal, "Current list element", |pins| {
        Box::new(list::ItemSourceNode::new(pins))
    }));

    // ========================================================================
    // External
    // ========================================================================

    registry.register(NodeType::new(
        layer_property::KIND,
        "Layer Property",
        NodeCategory::External,
        "Current value of a property of the owning layer",
        |pins| Box::new(layer_property::LayerPropertyNode::new(pins)),
    ));
}
