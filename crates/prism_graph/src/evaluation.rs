// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node behaviour and evaluation errors.

use crate::context::ScriptContext;
use crate::node::NodeId;
use crate::pin_set::{PinEvent, PinSet};
use crate::registry::NodeRegistry;
use crate::script::NodeScript;
use crate::value::{PinType, Value};

/// Behaviour of one node kind.
///
/// An evaluator owns no pins itself. It keeps [`PinSlot`](crate::PinSlot) handles into the
/// [`PinSet`] it created them in, and the script hands that set back on every call.
pub trait NodeEvaluator: Send {
    /// Compute output pin values from the already resolved input pins
    fn evaluate(&mut self, pins: &mut PinSet, ctx: &ScriptContext) -> Result<(), NodeError>;

    /// Called when the node joins a script and again whenever the script context is replaced
    fn initialize(&mut self, _pins: &mut PinSet, _ctx: &ScriptContext) {}

    /// Drop per-run state before a new evaluation pass
    fn reset(&mut self) {}

    /// Revisit pins that depend on external state before a run; returns whether pins changed
    fn refresh(&mut self, _pins: &mut PinSet, _ctx: &ScriptContext) -> bool {
        false
    }

    /// Whether this node provides the script result
    fn is_exit_node(&self) -> bool {
        false
    }

    /// Whether this node ships with its script and cannot be removed
    fn is_default_node(&self) -> bool {
        false
    }

    /// Result value of an exit node after evaluation
    fn exit_value(&self, _pins: &PinSet) -> Option<Value> {
        None
    }

    /// Persisted configuration
    fn storage(&self) -> Option<serde_json::Value> {
        None
    }

    /// Replace the persisted configuration
    fn load_storage(
        &mut self,
        _pins: &mut PinSet,
        _storage: serde_json::Value,
        _registry: &NodeRegistry,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    /// React to a structural change of the node's pins
    fn on_pin_event(&mut self, _pins: &mut PinSet, _event: &PinEvent) {}

    /// React to the owning script's list item type changing
    fn on_item_type_changed(&mut self, _pins: &mut PinSet, _item_type: Option<&PinType>) {}

    /// Private script owned by this node, if any
    fn sub_script(&self) -> Option<&NodeScript> {
        None
    }
}

/// Failure reported by a single node
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeError {
    /// A nested script failed
    #[error("sub-script failed: {0}")]
    SubScript(Box<EvaluationError>),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

/// Error during script evaluation.
///
/// Any of these aborts the current run; the script falls back to its default result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// A node was reached again while it was still being evaluated
    #[error("Cycle detected at node {node}")]
    CycleDetected {
        /// Node that closed the cycle
        node: NodeId,
    },

    /// A node returned an error
    #[error("Node {node} ({kind}) failed: {source}")]
    NodeFault {
        /// Failing node
        node: NodeId,
        /// Kind of the failing node
        kind: String,
        /// What went wrong
        #[source]
        source: NodeError,
    },

    /// A node panicked during evaluation
    #[error("Evaluation panicked (node: {node:?})")]
    Panicked {
        /// Node being evaluated when the panic happened
        node: Option<NodeId>,
    },
}

/// Error while applying persisted node configuration
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Storage does not have the expected shape
    #[error("Invalid storage: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage is well formed but unusable
    #[error("{0}")]
    Invalid(String),
}
