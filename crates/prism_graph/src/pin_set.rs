// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-node pin arena with collections, pin bucket and change notifications.
//!
//! Every pin a node ever created lives in the arena and is addressed by its [`PinSlot`].
//! Removing a pin releases it into the bucket; the next pin created in the same direction
//! takes it back, keeping its [`PinId`] so connections recorded elsewhere (undo stacks,
//! saved scripts) keep pointing at the same identity.

use crate::pin::{Pin, PinDirection, PinId, PinInfo, PinSlot};
use crate::pin_collection::{CollectionSlot, PinCollection};
use crate::value::{PinType, Value};
use std::collections::VecDeque;

/// Notification delivered to a node's evaluator after a structural change
#[derive(Debug, Clone, PartialEq)]
pub enum PinEvent {
    /// A pin became part of the node
    Added {
        /// The pin
        pin: PinSlot,
        /// Owning collection, if any
        collection: Option<CollectionSlot>,
    },
    /// A pin was taken off the node and released to the bucket
    Removed {
        /// The pin
        pin: PinSlot,
        /// Owning collection, if any
        collection: Option<CollectionSlot>,
    },
    /// A connection to the pin was made
    Connected {
        /// The pin
        pin: PinSlot,
        /// Type of the pin on the other end
        peer_type: PinType,
    },
    /// A connection to the pin was removed
    Disconnected {
        /// The pin
        pin: PinSlot,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Released,
    Simple,
    Collection(usize),
}

#[derive(Debug)]
struct SlotEntry {
    pin: Pin,
    membership: Membership,
}

/// Free list of released pins, FIFO per direction
#[derive(Debug, Default)]
struct PinBucket {
    inputs: VecDeque<PinSlot>,
    outputs: VecDeque<PinSlot>,
}

impl PinBucket {
    fn queue(&mut self, direction: PinDirection) -> &mut VecDeque<PinSlot> {
        match direction {
            PinDirection::Input => &mut self.inputs,
            PinDirection::Output => &mut self.outputs,
        }
    }

    fn acquire(&mut self, direction: PinDirection) -> Option<PinSlot> {
        self.queue(direction).pop_front()
    }

    fn release(&mut self, slot: PinSlot, direction: PinDirection) {
        self.queue(direction).push_back(slot);
    }

    fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }
}

/// The pins and pin collections of one node
#[derive(Debug, Default)]
pub struct PinSet {
    slots: Vec<SlotEntry>,
    pins: Vec<PinSlot>,
    collections: Vec<PinCollection>,
    bucket: PinBucket,
    events: Vec<PinEvent>,
}

impl PinSet {
    /// Create an empty pin set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new input pin
    pub fn create_input(&mut self, name: impl Into<String>, pin_type: PinType) -> PinSlot {
        self.create_pin(name.into(), pin_type, PinDirection::Input, false)
    }

    /// Create a new output pin
    pub fn create_output(&mut self, name: impl Into<String>, pin_type: PinType) -> PinSlot {
        self.create_pin(name.into(), pin_type, PinDirection::Output, false)
    }

    /// Add an output pin, reusing a released pin from the bucket when one is available
    pub fn create_or_reuse_output(&mut self, name: impl Into<String>, pin_type: PinType) -> PinSlot {
        self.create_pin(name.into(), pin_type, PinDirection::Output, true)
    }

    /// Add an input pin, reusing a released pin from the bucket when one is available
    pub fn create_or_reuse_input(&mut self, name: impl Into<String>, pin_type: PinType) -> PinSlot {
        self.create_pin(name.into(), pin_type, PinDirection::Input, true)
    }

    fn create_pin(&mut self, name: String, pin_type: PinType, direction: PinDirection, reuse: bool) -> PinSlot {
        let slot = if reuse {
            self.acquire(name, pin_type, direction, Membership::Simple)
        } else {
            self.allocate(name, pin_type, direction, Membership::Simple)
        };
        self.pins.push(slot);
        self.events.push(PinEvent::Added { pin: slot, collection: None });
        slot
    }

    fn allocate(&mut self, name: String, pin_type: PinType, direction: PinDirection, membership: Membership) -> PinSlot {
        let slot = PinSlot(self.slots.len());
        self.slots.push(SlotEntry {
            pin: Pin::new(name, pin_type, direction),
            membership,
        });
        slot
    }

    fn acquire(&mut self, name: String, pin_type: PinType, direction: PinDirection, membership: Membership) -> PinSlot {
        let Some(slot) = self.bucket.acquire(direction) else {
            return self.allocate(name, pin_type, direction, membership);
        };

        let entry = &mut self.slots[slot.0];
        entry.pin.name = name;
        entry.pin.pin_type = pin_type;
        entry.pin.reset();
        entry.membership = membership;
        slot
    }

    fn release(&mut self, slot: PinSlot) {
        let entry = &mut self.slots[slot.0];
        entry.membership = Membership::Released;
        let direction = entry.pin.direction;
        self.bucket.release(slot, direction);
    }

    /// Remove a simple pin from the node, releasing it to the bucket
    pub fn remove_pin(&mut self, slot: PinSlot) -> bool {
        let Some(position) = self.pins.iter().position(|s| *s == slot) else {
            return false;
        };
        self.pins.remove(position);
        self.release(slot);
        self.events.push(PinEvent::Removed { pin: slot, collection: None });
        true
    }

    /// Create an input pin collection with `initial_count` pins
    pub fn create_input_collection(&mut self, name: impl Into<String>, pin_type: PinType, initial_count: usize) -> CollectionSlot {
        self.create_collection(name.into(), pin_type, PinDirection::Input, initial_count)
    }

    /// Create an output pin collection with `initial_count` pins
    pub fn create_output_collection(&mut self, name: impl Into<String>, pin_type: PinType, initial_count: usize) -> CollectionSlot {
        self.create_collection(name.into(), pin_type, PinDirection::Output, initial_count)
    }

    fn create_collection(&mut self, name: String, pin_type: PinType, direction: PinDirection, initial_count: usize) -> CollectionSlot {
        let collection = CollectionSlot(self.collections.len());
        self.collections.push(PinCollection::new(name, pin_type, direction));
        for _ in 0..initial_count {
            self.add_collection_pin(collection);
        }
        collection
    }

    /// Append a pin to a collection
    pub fn add_collection_pin(&mut self, collection: CollectionSlot) -> Option<PinSlot> {
        let group = self.collections.get(collection.0)?;
        let (name, pin_type, direction) = (group.name.clone(), group.pin_type.clone(), group.direction);

        let slot = self.acquire(name, pin_type, direction, Membership::Collection(collection.0));
        self.collections[collection.0].pins.push(slot);
        self.events.push(PinEvent::Added {
            pin: slot,
            collection: Some(collection),
        });
        Some(slot)
    }

    /// Remove a pin from a collection, releasing it to the bucket
    pub fn remove_collection_pin(&mut self, collection: CollectionSlot, slot: PinSlot) -> bool {
        let Some(group) = self.collections.get_mut(collection.0) else {
            return false;
        };
        let Some(position) = group.pins.iter().position(|s| *s == slot) else {
            return false;
        };
        group.pins.remove(position);
        self.release(slot);
        self.events.push(PinEvent::Removed {
            pin: slot,
            collection: Some(collection),
        });
        true
    }

    /// Grow or shrink a collection from its end
    pub fn resize_collection(&mut self, collection: CollectionSlot, len: usize) {
        while self.collections.get(collection.0).is_some_and(|c| c.len() < len) {
            self.add_collection_pin(collection);
        }
        while let Some(last) = self
            .collections
            .get(collection.0)
            .filter(|c| c.len() > len)
            .and_then(|c| c.pins.last().copied())
        {
            self.remove_collection_pin(collection, last);
        }
    }

    /// Change the type of a collection and all of its pins
    pub fn retype_collection(&mut self, collection: CollectionSlot, pin_type: PinType) {
        let Some(group) = self.collections.get_mut(collection.0) else {
            return;
        };
        group.pin_type = pin_type.clone();
        let pins = group.pins.clone();
        for slot in pins {
            self.retype(slot, pin_type.clone());
        }
    }

    /// Change the type of a pin in place; its value resets to the new type's default
    pub fn retype(&mut self, slot: PinSlot, pin_type: PinType) {
        let pin = &mut self.slots[slot.0].pin;
        if pin.pin_type != pin_type {
            pin.pin_type = pin_type;
            pin.reset();
        }
    }

    /// Rename a pin
    pub fn rename(&mut self, slot: PinSlot, name: impl Into<String>) {
        self.slots[slot.0].pin.name = name.into();
    }

    /// Get a pin by slot
    pub fn pin(&self, slot: PinSlot) -> &Pin {
        &self.slots[slot.0].pin
    }

    /// Current value of a pin
    pub fn value(&self, slot: PinSlot) -> &Value {
        &self.slots[slot.0].pin.value
    }

    /// Write a pin value, cast to the pin's type
    pub fn set_value(&mut self, slot: PinSlot, value: Value) {
        let pin = &mut self.slots[slot.0].pin;
        pin.value = value.cast(&pin.pin_type);
        pin.evaluated = true;
    }

    /// Get a collection
    pub fn collection(&self, collection: CollectionSlot) -> Option<&PinCollection> {
        self.collections.get(collection.0)
    }

    /// All collections in creation order
    pub fn collections(&self) -> &[PinCollection] {
        &self.collections
    }

    /// Values of all pins in a collection, in order
    pub fn collection_values(&self, collection: CollectionSlot) -> impl Iterator<Item = &Value> + '_ {
        self.collections
            .get(collection.0)
            .into_iter()
            .flat_map(|c| c.pins.iter())
            .map(|slot| self.value(*slot))
    }

    /// Collection containing a pin
    pub fn collection_of(&self, slot: PinSlot) -> Option<CollectionSlot> {
        match self.slots.get(slot.0)?.membership {
            Membership::Collection(index) => Some(CollectionSlot(index)),
            _ => None,
        }
    }

    /// Simple (non-collection) pins in order
    pub fn simple_pins(&self) -> &[PinSlot] {
        &self.pins
    }

    /// Whether a slot is currently part of the node
    pub fn is_active(&self, slot: PinSlot) -> bool {
        self.slots
            .get(slot.0)
            .is_some_and(|e| e.membership != Membership::Released)
    }

    /// All pins on the node: simple pins first, then each collection
    pub fn active_slots(&self) -> impl Iterator<Item = PinSlot> + '_ {
        self.pins
            .iter()
            .chain(self.collections.iter().flat_map(|c| c.pins.iter()))
            .copied()
    }

    /// Active input pins
    pub fn inputs(&self) -> impl Iterator<Item = PinSlot> + '_ {
        self.active_slots()
            .filter(|slot| self.pin(*slot).direction == PinDirection::Input)
    }

    /// Active output pins
    pub fn outputs(&self) -> impl Iterator<Item = PinSlot> + '_ {
        self.active_slots()
            .filter(|slot| self.pin(*slot).direction == PinDirection::Output)
    }

    /// Find an active pin by ID
    pub fn slot_of(&self, id: PinId) -> Option<PinSlot> {
        self.active_slots().find(|slot| self.pin(*slot).id == id)
    }

    /// Number of released pins waiting for reuse
    pub fn bucket_len(&self) -> usize {
        self.bucket.len()
    }

    /// Snapshot of all active pins
    pub fn infos(&self) -> Vec<PinInfo> {
        self.active_slots()
            .map(|slot| {
                let pin = self.pin(slot);
                PinInfo {
                    id: pin.id,
                    name: pin.name.clone(),
                    direction: pin.direction,
                    pin_type: pin.pin_type.clone(),
                    collection: self.collection_of(slot).map(CollectionSlot::index),
                    value: pin.value.clone(),
                }
            })
            .collect()
    }

    pub(crate) fn notify_connected(&mut self, slot: PinSlot, peer_type: PinType) {
        self.slots[slot.0].pin.links += 1;
        self.events.push(PinEvent::Connected { pin: slot, peer_type });
    }

    pub(crate) fn notify_disconnected(&mut self, slot: PinSlot) {
        let pin = &mut self.slots[slot.0].pin;
        pin.links = pin.links.saturating_sub(1);
        self.events.push(PinEvent::Disconnected { pin: slot });
    }

    /// Overwrite link counts from the owning script's connection list
    pub(crate) fn recount_links(&mut self, count: impl Fn(PinId) -> usize) {
        for entry in &mut self.slots {
            entry.pin.links = match entry.membership {
                Membership::Released => 0,
                _ => count(entry.pin.id),
            };
        }
    }

    pub(crate) fn take_events(&mut self) -> Vec<PinEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn reset(&mut self) {
        for entry in &mut self.slots {
            entry.pin.reset();
        }
    }

    pub(crate) fn resolve_input(&mut self, slot: PinSlot, value: Option<Value>) {
        let pin = &mut self.slots[slot.0].pin;
        pin.value = match value {
            Some(value) => value.cast(&pin.pin_type),
            None => pin.pin_type.default_value(),
        };
        pin.evaluated = true;
    }

    /// IDs of the simple pins and of each collection's pins, in layout order
    pub(crate) fn layout(&self) -> (Vec<PinId>, Vec<Vec<PinId>>) {
        let simple = self.pins.iter().map(|slot| self.pin(*slot).id).collect();
        let collections = self
            .collections
            .iter()
            .map(|c| c.pins.iter().map(|slot| self.pin(*slot).id).collect())
            .collect();
        (simple, collections)
    }

    /// Reapply persisted IDs by layout position
    pub(crate) fn restore_layout(&mut self, simple: &[PinId], collections: &[Vec<PinId>]) {
        for (index, ids) in collections.iter().enumerate() {
            self.resize_collection(CollectionSlot(index), ids.len());
        }

        let mut assignments: Vec<(PinSlot, PinId)> =
            self.pins.iter().copied().zip(simple.iter().copied()).collect();
        for (group, ids) in self.collections.iter().zip(collections) {
            assignments.extend(group.pins.iter().copied().zip(ids.iter().copied()));
        }

        for (slot, id) in assignments {
            self.slots[slot.0].pin.id = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_reuses_pin_identity() {
        let mut pins = PinSet::new();
        let first = pins.create_or_reuse_output("Brightness", PinType::Float);
        let second = pins.create_or_reuse_output("Color", PinType::Color);
        let first_id = pins.pin(first).id();
        let second_id = pins.pin(second).id();

        assert!(pins.remove_pin(first));
        assert!(pins.remove_pin(second));
        assert_eq!(pins.bucket_len(), 2);
        assert!(pins.slot_of(first_id).is_none());

        let reused = pins.create_or_reuse_output("Hue", PinType::Int);
        assert_eq!(reused, first);
        assert_eq!(pins.pin(reused).id(), first_id);
        assert_eq!(pins.pin(reused).name(), "Hue");
        assert_eq!(pins.pin(reused).pin_type(), &PinType::Int);
        assert_eq!(pins.value(reused), &Value::Int(0));

        let again = pins.create_or_reuse_output("Saturation", PinType::Float);
        assert_eq!(pins.pin(again).id(), second_id);
        assert_eq!(pins.bucket_len(), 0);

        let fresh = pins.create_or_reuse_output("Lightness", PinType::Float);
        assert_ne!(pins.pin(fresh).id(), first_id);
        assert_ne!(pins.pin(fresh).id(), second_id);
    }

    #[test]
    fn test_collection_add_remove_events() {
        let mut pins = PinSet::new();
        let values = pins.create_input_collection("Values", PinType::Float, 2);
        let _ = pins.take_events();

        let added = pins.add_collection_pin(values).expect("collection exists");
        assert_eq!(pins.collection(values).map(PinCollection::len), Some(3));
        assert!(pins.remove_collection_pin(values, added));

        let events = pins.take_events();
        assert_eq!(
            events,
            vec![
                PinEvent::Added { pin: added, collection: Some(values) },
                PinEvent::Removed { pin: added, collection: Some(values) },
            ]
        );
    }

    #[test]
    fn test_resize_and_retype_collection() {
        let mut pins = PinSet::new();
        let values = pins.create_input_collection("Values", PinType::Any, 1);
        pins.resize_collection(values, 4);
        assert_eq!(pins.collection(values).map(PinCollection::len), Some(4));
        pins.resize_collection(values, 2);
        assert_eq!(pins.collection(values).map(PinCollection::len), Some(2));

        pins.retype_collection(values, PinType::Color);
        assert!(pins
            .collection_values(values)
            .all(|v| matches!(v, Value::Color(_))));
    }

    #[test]
    fn test_set_value_casts_to_pin_type() {
        let mut pins = PinSet::new();
        let slot = pins.create_output("Value", PinType::Float);
        pins.set_value(slot, Value::Int(4));
        assert_eq!(pins.value(slot), &Value::Float(4.0));
        assert!(pins.pin(slot).is_evaluated());
        pins.reset();
        assert!(!pins.pin(slot).is_evaluated());
        assert_eq!(pins.value(slot), &Value::Float(0.0));
    }
}
