// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for node scripts.

use crate::context::ScriptContext;
use crate::evaluation::NodeEvaluator;
use crate::pin::PinId;
use crate::pin_set::PinSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pin event rounds dispatched per edit before giving up on a node that keeps emitting
const MAX_EVENT_ROUNDS: usize = 16;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Input nodes (constants)
    Input,
    /// Output nodes (script result)
    Output,
    /// Math operations
    Math,
    /// Logic/flow control
    Logic,
    /// List operations
    List,
    /// Data model readers
    DataModel,
    /// Readers of the element the script belongs to
    External,
    /// Nodes that only exist inside other nodes' scripts
    Internal,
}

/// A node instance in a script
pub struct Node {
    pub(crate) id: NodeId,
    kind: String,
    name: String,
    description: String,
    pub(crate) position: [f32; 2],
    pub(crate) pins: PinSet,
    pub(crate) evaluator: Box<dyn NodeEvaluator>,
    pub(crate) evaluated: bool,
}

impl Node {
    /// Build a node, letting `build` create its pins and return its behaviour
    pub fn build(
        kind: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        build: impl FnOnce(&mut PinSet) -> Box<dyn NodeEvaluator>,
    ) -> Self {
        let mut pins = PinSet::new();
        let evaluator = build(&mut pins);
        Self {
            id: NodeId::new(),
            kind: kind.into(),
            name: name.into(),
            description: description.into(),
            position: [0.0, 0.0],
            pins,
            evaluator,
            evaluated: false,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Unique instance ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Registry kind ID
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Position in the editor
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Pins of this node
    pub fn pins(&self) -> &PinSet {
        &self.pins
    }

    /// Look up an active pin ID by name
    pub fn pin_named(&self, name: &str) -> Option<PinId> {
        self.pins
            .active_slots()
            .map(|slot| self.pins.pin(slot))
            .find(|pin| pin.name() == name)
            .map(|pin| pin.id())
    }

    /// Persisted configuration
    pub fn storage(&self) -> Option<serde_json::Value> {
        self.evaluator.storage()
    }

    pub(crate) fn initialize(&mut self, ctx: &ScriptContext) {
        self.evaluator.initialize(&mut self.pins, ctx);
    }

    /// Deliver queued pin events to the evaluator; returns whether any were delivered
    pub(crate) fn dispatch_events(&mut self) -> bool {
        let mut delivered = false;
        for _ in 0..MAX_EVENT_ROUNDS {
            let events = self.pins.take_events();
            if events.is_empty() {
                return delivered;
            }
            delivered = true;
            for event in &events {
                self.evaluator.on_pin_event(&mut self.pins, event);
            }
        }
        tracing::warn!(node = %self.id, kind = %self.kind, "Pin events did not settle");
        delivered
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("position", &self.position)
            .field("pins", &self.pins)
            .finish_non_exhaustive()
    }
}
