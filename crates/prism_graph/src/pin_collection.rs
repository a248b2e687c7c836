// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variable-arity pin groups.

use crate::pin::{PinDirection, PinSlot};
use crate::value::PinType;

/// Node-local handle to a pin collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionSlot(pub(crate) usize);

impl CollectionSlot {
    /// Index of the collection on its node
    pub fn index(self) -> usize {
        self.0
    }
}

/// An ordered, growable group of pins sharing one direction and type
#[derive(Debug, Clone)]
pub struct PinCollection {
    pub(crate) name: String,
    pub(crate) direction: PinDirection,
    pub(crate) pin_type: PinType,
    pub(crate) pins: Vec<PinSlot>,
}

impl PinCollection {
    pub(crate) fn new(name: impl Into<String>, pin_type: PinType, direction: PinDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            pin_type,
            pins: Vec::new(),
        }
    }

    /// Collection name, also used for its pins
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direction shared by all pins
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// Type shared by all pins
    pub fn pin_type(&self) -> &PinType {
        &self.pin_type
    }

    /// Pins in order
    pub fn pins(&self) -> &[PinSlot] {
        &self.pins
    }

    /// Number of pins
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Whether the collection has no pins
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
