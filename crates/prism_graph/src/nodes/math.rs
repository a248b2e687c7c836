// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arithmetic nodes.

use crate::context::ScriptContext;
use crate::evaluation::{NodeError, NodeEvaluator};
use crate::pin::PinSlot;
use crate::pin_collection::CollectionSlot;
use crate::pin_set::PinSet;
use crate::value::{PinType, Value};

/// Operation folding a collection of numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Sum of all values
    Sum,
    /// Product of all values
    Product,
}

/// Folds a variable number of float inputs into one output
pub struct ReduceNode {
    reduction: Reduction,
    values: CollectionSlot,
    output: PinSlot,
}

impl ReduceNode {
    /// Create the pins; the collection starts with two inputs
    pub fn new(pins: &mut PinSet, reduction: Reduction) -> Self {
        let output_name = match reduction {
            Reduction::Sum => "Sum",
            Reduction::Product => "Product",
        };
        Self {
            reduction,
            values: pins.create_input_collection("Values", PinType::Float, 2),
            output: pins.create_output(output_name, PinType::Float),
        }
    }
}

impl NodeEvaluator for ReduceNode {
    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        let values = pins.collection_values(self.values).filter_map(Value::as_float);
        let result = match self.reduction {
            Reduction::Sum => values.sum(),
            Reduction::Product => values.product(),
        };
        pins.set_value(self.output, Value::Float(result));
        Ok(())
    }
}

/// Two-operand arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `a - b`
    Subtract,
    /// `a / b`, zero when `b` is zero
    Divide,
}

impl BinaryOp {
    /// Apply the operation
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            Self::Subtract => a - b,
            Self::Divide if b == 0.0 => 0.0,
            Self::Divide => a / b,
        }
    }
}

/// Node applying a [`BinaryOp`]
pub struct BinaryMathNode {
    op: BinaryOp,
    a: PinSlot,
    b: PinSlot,
    output: PinSlot,
}

impl BinaryMathNode {
    /// Create the pins
    pub fn new(pins: &mut PinSet, op: BinaryOp) -> Self {
        Self {
            op,
            a: pins.create_input("A", PinType::Float),
            b: pins.create_input("B", PinType::Float),
            output: pins.create_output("Result", PinType::Float),
        }
    }
}

impl NodeEvaluator for BinaryMathNode {
    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        let a = pins.value(self.a).as_float().unwrap_or_default();
        let b = pins.value(self.b).as_float().unwrap_or_default();
        pins.set_value(self.output, Value::Float(self.op.apply(a, b)));
        Ok(())
    }
}

/// Clamps a value between a minimum and a maximum
pub struct ClampNode {
    value: PinSlot,
    min: PinSlot,
    max: PinSlot,
    output: PinSlot,
}

impl ClampNode {
    /// Create the pins
    pub fn new(pins: &mut PinSet) -> Self {
        Self {
            value: pins.create_input("Value", PinType::Float),
            min: pins.create_input("Min", PinType::Float),
            max: pins.create_input("Max", PinType::Float),
            output: pins.create_output("Result", PinType::Float),
        }
    }
}

impl NodeEvaluator for ClampNode {
    fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
        let value = pins.value(self.value).as_float().unwrap_or_default();
        let min = pins.value(self.min).as_float().unwrap_or_default();
        let max = pins.value(self.max).as_float().unwrap_or_default();
        // An inverted range collapses onto its minimum
        let result = if min > max { min } else { value.clamp(min, max) };
        pins.set_value(self.output, Value::Float(result));
        Ok(())
    }
}
