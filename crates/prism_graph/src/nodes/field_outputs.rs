// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output pins derived from a value type.

use crate::pin::PinSlot;
use crate::pin_set::PinSet;
use crate::value::{PinType, Value};

/// Exposes a value through output pins: one per field for objects, a single `Value` pin
/// for everything else.
///
/// Changing the type releases every pin to the node's bucket before acquiring the new set,
/// so pins keep their identity (and connections that still type-check) across changes.
#[derive(Debug, Default)]
pub struct FieldOutputs {
    pin_type: Option<PinType>,
    pins: Vec<(Option<String>, PinSlot)>,
}

impl FieldOutputs {
    /// Type currently exposed
    pub fn pin_type(&self) -> Option<&PinType> {
        self.pin_type.as_ref()
    }

    /// Rebuild the output pins for `pin_type`
    pub fn change_type(&mut self, pins: &mut PinSet, pin_type: Option<&PinType>) {
        if self.pin_type.as_ref() == pin_type {
            return;
        }

        for (_, slot) in self.pins.drain(..) {
            pins.remove_pin(slot);
        }

        match pin_type {
            Some(PinType::Object(schema)) => {
                for field in &schema.fields {
                    let slot = pins.create_or_reuse_output(field.name.clone(), field.field_type.clone());
                    self.pins.push((Some(field.name.clone()), slot));
                }
            }
            Some(other) => {
                let slot = pins.create_or_reuse_output("Value", other.clone());
                self.pins.push((None, slot));
            }
            None => {}
        }
        self.pin_type = pin_type.cloned();
    }

    /// Write `value` into the output pins; missing values become defaults
    pub fn set_values(&self, pins: &mut PinSet, value: Option<&Value>) {
        for (field, slot) in &self.pins {
            let value = match field {
                Some(name) => value.and_then(|v| v.field(name)),
                None => value,
            };
            pins.set_value(*slot, value.cloned().unwrap_or_default());
        }
    }
}
