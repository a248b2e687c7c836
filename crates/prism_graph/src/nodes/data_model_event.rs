// SPDX-License-Identifier: MIT OR Apache-2.0
//! Nodes reacting to changes of a data model value.
//!
//! A change is any difference between the value seen by the previous run and the current
//! one. Nodes keep their change state across runs; editing the path starts over.

use super::data_model::DataModelStorage;
use super::logic::follow_collection_type;
use crate::context::ScriptContext;
use crate::evaluation::{NodeError, NodeEvaluator, StorageError};
use crate::pin::PinSlot;
use crate::pin_collection::CollectionSlot;
use crate::pin_set::{PinEvent, PinSet};
use crate::registry::NodeRegistry;
use crate::value::{PinType, Value};
use std::time::Instant;

/// Registry kind of [`DataModelEventNode`]
pub const EVENT_KIND: &str = "data_model.event";

/// Registry kind of [`DataModelEventCycleNode`]
pub const CYCLE_KIND: &str = "data_model.event_cycle";

fn current_value(ctx: &ScriptContext, path: &str) -> Option<Value> {
    if path.is_empty() {
        return None;
    }
    ctx.data_model.as_ref()?.value_at(path)
}

/// Outputs the last change of a data model value: the value before and after it, how
/// many changes were seen and the milliseconds since the latest one.
///
/// The first value observed counts as a change from nothing.
pub struct DataModelEventNode {
    storage: DataModelStorage,
    time_since_trigger: PinSlot,
    trigger_count: PinSlot,
    value_pins: Option<(PinSlot, PinSlot)>,
    last_value: Option<Value>,
    old_value: Value,
    count: i64,
    last_trigger: Option<Instant>,
}

impl DataModelEventNode {
    /// Create the counter pins; value pins follow once a path resolves
    pub fn new(pins: &mut PinSet) -> Self {
        Self {
            storage: DataModelStorage::default(),
            time_since_trigger: pins.create_output("Time since trigger", PinType::Float),
            trigger_count: pins.create_output("Trigger count", PinType::Int),
            value_pins: None,
            last_value: None,
            old_value: Value::Empty,
            count: 0,
            last_trigger: None,
        }
    }

    fn change_value_type(&mut self, pins: &mut PinSet, value_type: Option<PinType>) {
        if let Some((old, new)) = self.value_pins.take() {
            pins.remove_pin(old);
            pins.remove_pin(new);
        }
        if let Some(value_type) = &value_type {
            self.value_pins = Some((
                pins.create_or_reuse_output("Old value", value_type.clone()),
                pins.create_or_reuse_output("New value", value_type.clone()),
            ));
        }
        self.storage.value_type = value_type;
        self.last_value = None;
        self.old_value = Value::Empty;
        self.count = 0;
        self.last_trigger = None;
    }

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
        if self.storage.value_type.as_ref() != Some(&value_type) || self.value_pins.is_none() {
            self.change_value_type(pins, Some(value_type));
        }
        true
    }
}

impl NodeEvaluator for DataModelEventNode {
    fn initialize(&mut self, pins: &mut PinSet, ctx: &ScriptContext) {
        self.resolve(pins, ctx);
    }

    fn refresh(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> bool {
        self.value_pins.is_none() && self.resolve(pins, ctx)
    }

    fn evaluate(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> Result<(), NodeError> {
        let mut triggered = false;
        if let Some((old_pin, new_pin)) = self.value_pins {
            let value = current_value(ctx, &self.storage.path);
            if value != self.last_value {
                self.old_value = self.last_value.take().unwrap_or_default();
                self.last_value = value;
                self.count += 1;
                self.last_trigger = Some(Instant::now());
                triggered = true;
            }
            pins.set_value(old_pin, self.old_value.clone());
            pins.set_value(new_pin, self.last_value.clone().unwrap_or_default());
        }

        let elapsed = match self.last_trigger {
            Some(at) if !triggered => at.elapsed().as_secs_f32() * 1000.0,
            _ => 0.0,
        };
        pins.set_value(self.time_since_trigger, Value::Float(elapsed));
        pins.set_value(self.trigger_count, Value::Int(self.count));
        Ok(())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.storage).ok()
    }

    fn load_storage(&mut self, pins: &mut PinSet, storage: serde_json::Value, _registry: &NodeRegistry) -> Result<(), StorageError> {
        let storage: DataModelStorage = serde_json::from_value(storage)?;
        self.change_value_type(pins, storage.value_type.clone());
        self.storage = storage;
        Ok(())
    }
}

/// Steps through its input values each time a data model value changes
pub struct DataModelEventCycleNode {
    storage: DataModelStorage,
    values: CollectionSlot,
    output: PinSlot,
    last_value: Option<Value>,
    index: usize,
}

impl DataModelEventCycleNode {
    /// Create the pins; the collection starts with two values
    pub fn new(pins: &mut PinSet) -> Self {
        Self {
            storage: DataModelStorage::default(),
            values: pins.create_input_collection("Values", PinType::Any, 2),
            output: pins.create_output("Value", PinType::Any),
            last_value: None,
            index: 0,
        }
    }
}

impl NodeEvaluator for DataModelEventCycleNode {
    fn evaluate(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> Result<(), NodeError> {
        let len = pins.collection(self.values).map_or(0, |values| values.len());
        let value = current_value(ctx, &self.storage.path);
        if value != self.last_value {
            // the first value seen only sets the baseline
            if self.last_value.is_some() && len > 0 {
                self.index = (self.index + 1) % len;
            }
            self.last_value = value;
        }
        if self.index >= len {
            self.index = 0;
        }

        let selected = pins
            .collection(self.values)
            .and_then(|values| values.pins().get(self.index).copied());
        let output = selected.map(|slot| pins.value(slot).clone()).unwrap_or_default();
        pins.set_value(self.output, output);
        Ok(())
    }

    fn on_pin_event(&mut self, pins: &mut PinSet, event: &PinEvent) {
        follow_collection_type(pins, event, self.values, self.output);
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.storage).ok()
    }

    fn load_storage(&mut self, _pins: &mut PinSet, storage: serde_json::Value, _registry: &NodeRegistry) -> Result<(), StorageError> {
        self.storage = serde_json::from_value(storage)?;
        self.last_value = None;
        self.index = 0;
        Ok(())
    }
}
