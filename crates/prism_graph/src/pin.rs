// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin definitions for node inputs/outputs.

use crate::value::{PinType, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a pin, preserved across save/load and pin reuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinId(pub Uuid);

impl PinId {
    /// Create a new random pin ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Node-local handle to a pin.
///
/// Slots index the owning node's pin arena and stay valid for the lifetime of the node,
/// including while the pin sits unused in the node's pin bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinSlot(pub(crate) usize);

impl PinSlot {
    /// Index into the node's pin arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

/// A typed value slot on a node
#[derive(Debug, Clone)]
pub struct Pin {
    pub(crate) id: PinId,
    pub(crate) name: String,
    pub(crate) direction: PinDirection,
    pub(crate) pin_type: PinType,
    pub(crate) value: Value,
    pub(crate) evaluated: bool,
    pub(crate) links: usize,
}

impl Pin {
    pub(crate) fn new(name: impl Into<String>, pin_type: PinType, direction: PinDirection) -> Self {
        let value = pin_type.default_value();
        Self {
            id: PinId::new(),
            name: name.into(),
            direction,
            pin_type,
            value,
            evaluated: false,
            links: 0,
        }
    }

    /// Stable pin ID
    pub fn id(&self) -> PinId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pin direction
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// Runtime type tag
    pub fn pin_type(&self) -> &PinType {
        &self.pin_type
    }

    /// Current held or computed value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether the value was produced during the current run
    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    /// Whether at least one connection ends at this pin
    pub fn is_connected(&self) -> bool {
        self.links > 0
    }

    pub(crate) fn reset(&mut self) {
        self.value = self.pin_type.default_value();
        self.evaluated = false;
    }
}

/// Read-only snapshot of a pin, for editors and persistence
#[derive(Debug, Clone, PartialEq)]
pub struct PinInfo {
    /// Stable pin ID
    pub id: PinId,
    /// Display name
    pub name: String,
    /// Direction
    pub direction: PinDirection,
    /// Data type
    pub pin_type: PinType,
    /// Index of the owning pin collection, if any
    pub collection: Option<usize>,
    /// Value as of the last run
    pub value: Value,
}
