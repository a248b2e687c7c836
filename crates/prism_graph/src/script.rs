// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node scripts: nodes, connections, a single exit node and the evaluation pass.
//!
//! Every structural edit and every run takes the script's mutex, so a run always sees a
//! consistent graph even while an editor thread is changing it. Scripts owned by nodes
//! (list operator predicates) have their own mutex and are only ever locked after their
//! parent.

use crate::connection::{Connection, ConnectionId};
use crate::context::ScriptContext;
use crate::evaluation::{EvaluationError, StorageError};
use crate::node::{Node, NodeId};
use crate::nodes::exit::ExitNode;
use crate::pin::{PinDirection, PinId, PinInfo, PinSlot};
use crate::pin_collection::CollectionSlot;
use crate::registry::NodeRegistry;
use crate::value::{PinType, Value};
use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

/// Settle rounds per edit before pruning gives up
const MAX_SETTLE_ROUNDS: usize = 16;

/// Error when editing a script
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Pin not found
    #[error("Pin not found: {0}")]
    PinNotFound(PinId),

    /// Both pins point the same way
    #[error("Cannot connect two pins of the same direction")]
    SameDirection,

    /// Input pin cannot accept the output type
    #[error("Incompatible pin types: {from} -> {to}")]
    IncompatibleTypes {
        /// Output pin type
        from: PinType,
        /// Input pin type
        to: PinType,
    },

    /// Both pins belong to one node
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// The connection would close a cycle
    #[error("Connection would create a cycle")]
    WouldCycle,

    /// Default nodes ship with their script
    #[error("Node {0} cannot be removed")]
    DefaultNode(NodeId),

    /// The script already has an exit node
    #[error("Script already has an exit node")]
    DuplicateExitNode,

    /// The node rejected its new storage
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub(crate) struct ScriptGraph {
    pub(crate) nodes: IndexMap<NodeId, Node>,
    pub(crate) connections: IndexMap<ConnectionId, Connection>,
    pub(crate) context: ScriptContext,
    pub(crate) item_type: Option<PinType>,
    result: Value,
    last_fault: Option<EvaluationError>,
}

impl ScriptGraph {
    fn exit_node(&self) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| node.evaluator.is_exit_node())
            .map(Node::id)
    }

    fn find_pin(&self, node_id: NodeId, pin_id: PinId) -> Result<PinSlot, EditError> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(EditError::NodeNotFound(node_id))?;
        node.pins.slot_of(pin_id).ok_or(EditError::PinNotFound(pin_id))
    }

    /// Whether `target` is reachable from `start` by walking connections upstream
    fn reaches_upstream(&self, start: NodeId, target: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![start];
        while let Some(node_id) = pending.pop() {
            if node_id == target {
                return true;
            }
            if !visited.insert(node_id) {
                continue;
            }
            pending.extend(
                self.connections
                    .values()
                    .filter(|c| c.to_node == node_id)
                    .map(|c| c.from_node),
            );
        }
        false
    }

    fn notify_disconnected(&mut self, connection: &Connection) {
        for (node_id, pin_id) in [
            (connection.from_node, connection.from_pin),
            (connection.to_node, connection.to_pin),
        ] {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                if let Some(slot) = node.pins.slot_of(pin_id) {
                    node.pins.notify_disconnected(slot);
                }
            }
        }
    }

    fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.shift_remove(&id)?;
        self.notify_disconnected(&connection);
        Some(connection)
    }

    pub(crate) fn insert_connection(&mut self, connection: Connection) {
        let from_type = self.pin_type(connection.from_node, connection.from_pin);
        let to_type = self.pin_type(connection.to_node, connection.to_pin);

        if let (Some(from_type), Some(to_type)) = (from_type, to_type) {
            if let Some(node) = self.nodes.get_mut(&connection.from_node) {
                if let Some(slot) = node.pins.slot_of(connection.from_pin) {
                    node.pins.notify_connected(slot, to_type);
                }
            }
            if let Some(node) = self.nodes.get_mut(&connection.to_node) {
                if let Some(slot) = node.pins.slot_of(connection.to_pin) {
                    node.pins.notify_connected(slot, from_type);
                }
            }
        }
        self.connections.insert(connection.id, connection);
    }

    fn pin_type(&self, node_id: NodeId, pin_id: PinId) -> Option<PinType> {
        let node = self.nodes.get(&node_id)?;
        let slot = node.pins.slot_of(pin_id)?;
        Some(node.pins.pin(slot).pin_type().clone())
    }

    pub(crate) fn is_valid(&self, connection: &Connection) -> bool {
        let endpoint = |node_id: NodeId, pin_id: PinId| {
            let node = self.nodes.get(&node_id)?;
            let slot = node.pins.slot_of(pin_id)?;
            Some(node.pins.pin(slot))
        };
        match (
            endpoint(connection.from_node, connection.from_pin),
            endpoint(connection.to_node, connection.to_pin),
        ) {
            (Some(from), Some(to)) => {
                from.direction() == PinDirection::Output
                    && to.direction() == PinDirection::Input
                    && to.pin_type().is_assignable_from(from.pin_type())
            }
            _ => false,
        }
    }

    /// Deliver pin events and drop connections the resulting pin changes invalidated,
    /// until nothing changes
    pub(crate) fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let mut changed = false;
            for node in self.nodes.values_mut() {
                changed |= node.dispatch_events();
            }

            let invalid: Vec<ConnectionId> = self
                .connections
                .values()
                .filter(|c| !self.is_valid(c))
                .map(|c| c.id)
                .collect();
            for id in invalid {
                if let Some(connection) = self.remove_connection(id) {
                    tracing::debug!(
                        from = %connection.from_node,
                        to = %connection.to_node,
                        "Dropped connection invalidated by pin change"
                    );
                }
                changed = true;
            }

            if !changed {
                break;
            }
        }
        self.recount_links();
    }

    fn recount_links(&mut self) {
        let mut counts: HashMap<PinId, usize> = HashMap::new();
        for connection in self.connections.values() {
            *counts.entry(connection.from_pin).or_default() += 1;
            *counts.entry(connection.to_pin).or_default() += 1;
        }
        for node in self.nodes.values_mut() {
            node.pins
                .recount_links(|id| counts.get(&id).copied().unwrap_or_default());
        }
    }

    pub(crate) fn insert_node(&mut self, mut node: Node) -> NodeId {
        node.initialize(&self.context);
        if let Some(item_type) = &self.item_type {
            node.evaluator
                .on_item_type_changed(&mut node.pins, Some(item_type));
        }
        let id = node.id;
        self.nodes.insert(id, node);
        self.settle();
        id
    }
}

/// State threaded through one evaluation pass
struct Pass {
    incoming: HashMap<PinId, (NodeId, PinId)>,
    stack: Vec<NodeId>,
}

fn evaluate_node(graph: &mut ScriptGraph, node_id: NodeId, pass: &mut Pass) -> Result<(), EvaluationError> {
    let Some(node) = graph.nodes.get(&node_id) else {
        return Ok(());
    };
    if node.evaluated {
        return Ok(());
    }
    if pass.stack.contains(&node_id) {
        return Err(EvaluationError::CycleDetected { node: node_id });
    }
    pass.stack.push(node_id);

    let inputs: Vec<(PinSlot, Option<(NodeId, PinId)>)> = node
        .pins
        .inputs()
        .map(|slot| (slot, pass.incoming.get(&node.pins.pin(slot).id()).copied()))
        .collect();

    for (slot, upstream) in inputs {
        let value = match upstream {
            Some((upstream_node, upstream_pin)) => {
                evaluate_node(graph, upstream_node, pass)?;
                graph.nodes.get(&upstream_node).and_then(|n| {
                    n.pins
                        .slot_of(upstream_pin)
                        .map(|s| n.pins.value(s).clone())
                })
            }
            None => None,
        };
        if let Some(node) = graph.nodes.get_mut(&node_id) {
            node.pins.resolve_input(slot, value);
        }
    }

    let ScriptGraph { nodes, context, .. } = graph;
    if let Some(node) = nodes.get_mut(&node_id) {
        node.evaluator
            .evaluate(&mut node.pins, context)
            .map_err(|source| EvaluationError::NodeFault {
                node: node_id,
                kind: node.kind().to_string(),
                source,
            })?;
        node.evaluated = true;
    }

    pass.stack.pop();
    Ok(())
}

fn evaluate_script(graph: &mut ScriptGraph, result_type: &PinType, pass: &mut Pass) -> Result<Value, EvaluationError> {
    for node in graph.nodes.values_mut() {
        node.pins.reset();
        node.evaluator.reset();
        node.evaluated = false;
    }

    let Some(exit) = graph.exit_node() else {
        return Ok(result_type.default_value());
    };
    evaluate_node(graph, exit, pass)?;

    let value = graph
        .nodes
        .get(&exit)
        .and_then(|node| node.evaluator.exit_value(&node.pins));
    Ok(match value {
        Some(value) if result_type.is_assignable_from(&value.pin_type()) => value.cast(result_type),
        _ => result_type.default_value(),
    })
}

/// A runnable graph of nodes with one typed result
pub struct NodeScript {
    name: String,
    result_type: PinType,
    graph: Mutex<ScriptGraph>,
}

impl NodeScript {
    /// Create a script with an exit node of the given result type
    pub fn new(name: impl Into<String>, result_type: PinType) -> Self {
        let script = Self::empty(name, result_type.clone());
        script.graph.lock().insert_node(ExitNode::node(result_type));
        script
    }

    /// Create a script without any nodes
    pub fn empty(name: impl Into<String>, result_type: PinType) -> Self {
        let result = result_type.default_value();
        Self {
            name: name.into(),
            result_type,
            graph: Mutex::new(ScriptGraph {
                nodes: IndexMap::new(),
                connections: IndexMap::new(),
                context: ScriptContext::default(),
                item_type: None,
                result,
                last_fault: None,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ScriptGraph> {
        self.graph.lock()
    }

    /// Script name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type of the script result
    pub fn result_type(&self) -> &PinType {
        &self.result_type
    }

    /// Add a node; it is initialized with the script context
    pub fn add_node(&self, node: Node) -> Result<NodeId, EditError> {
        let mut graph = self.graph.lock();
        if node.evaluator.is_exit_node() && graph.exit_node().is_some() {
            return Err(EditError::DuplicateExitNode);
        }
        Ok(graph.insert_node(node))
    }

    /// Remove a node and all connections to it
    pub fn remove_node(&self, node_id: NodeId) -> Result<(), EditError> {
        let mut graph = self.graph.lock();
        let node = graph
            .nodes
            .get(&node_id)
            .ok_or(EditError::NodeNotFound(node_id))?;
        if node.evaluator.is_default_node() {
            return Err(EditError::DefaultNode(node_id));
        }

        let attached: Vec<ConnectionId> = graph
            .connections
            .values()
            .filter(|c| c.involves_node(node_id))
            .map(|c| c.id)
            .collect();
        for id in attached {
            graph.remove_connection(id);
        }
        graph.nodes.shift_remove(&node_id);
        graph.settle();
        Ok(())
    }

    /// Connect two pins; either argument order works.
    ///
    /// An input already fed by another output loses that connection first.
    pub fn connect(&self, node_a: NodeId, pin_a: PinId, node_b: NodeId, pin_b: PinId) -> Result<ConnectionId, EditError> {
        let mut graph = self.graph.lock();
        let slot_a = graph.find_pin(node_a, pin_a)?;
        let slot_b = graph.find_pin(node_b, pin_b)?;
        let direction_a = graph.nodes[&node_a].pins.pin(slot_a).direction();
        let direction_b = graph.nodes[&node_b].pins.pin(slot_b).direction();

        let ((from_node, from_pin, from_slot), (to_node, to_pin, to_slot)) = match (direction_a, direction_b) {
            (PinDirection::Output, PinDirection::Input) => ((node_a, pin_a, slot_a), (node_b, pin_b, slot_b)),
            (PinDirection::Input, PinDirection::Output) => ((node_b, pin_b, slot_b), (node_a, pin_a, slot_a)),
            _ => return Err(EditError::SameDirection),
        };

        if from_node == to_node {
            return Err(EditError::SelfLoop);
        }

        let from_type = graph.nodes[&from_node].pins.pin(from_slot).pin_type().clone();
        let to_type = graph.nodes[&to_node].pins.pin(to_slot).pin_type().clone();
        if !to_type.is_assignable_from(&from_type) {
            return Err(EditError::IncompatibleTypes {
                from: from_type,
                to: to_type,
            });
        }

        if graph.reaches_upstream(from_node, to_node) {
            return Err(EditError::WouldCycle);
        }

        let replaced: Vec<ConnectionId> = graph
            .connections
            .values()
            .filter(|c| c.to_node == to_node && c.to_pin == to_pin)
            .map(|c| c.id)
            .collect();
        for id in replaced {
            graph.remove_connection(id);
        }

        let connection = Connection::new(from_node, from_pin, to_node, to_pin);
        let id = connection.id;
        graph.insert_connection(connection);
        graph.settle();
        Ok(id)
    }

    /// Remove a connection by ID
    pub fn disconnect(&self, connection_id: ConnectionId) -> bool {
        let mut graph = self.graph.lock();
        let removed = graph.remove_connection(connection_id).is_some();
        graph.settle();
        removed
    }

    /// Remove the connection between two pins, in either order
    pub fn disconnect_pins(&self, pin_a: PinId, pin_b: PinId) -> bool {
        let mut graph = self.graph.lock();
        let found = graph
            .connections
            .values()
            .find(|c| {
                (c.from_pin == pin_a && c.to_pin == pin_b) || (c.from_pin == pin_b && c.to_pin == pin_a)
            })
            .map(|c| c.id);
        let removed = found.and_then(|id| graph.remove_connection(id)).is_some();
        graph.settle();
        removed
    }

    /// All connections
    pub fn connections(&self) -> Vec<Connection> {
        self.graph.lock().connections.values().copied().collect()
    }

    /// Pins connected to a pin, as `(node, pin)` pairs
    pub fn connected_to(&self, node_id: NodeId, pin_id: PinId) -> Vec<(NodeId, PinId)> {
        self.graph
            .lock()
            .connections
            .values()
            .filter_map(|c| {
                if c.from_node == node_id && c.from_pin == pin_id {
                    Some((c.to_node, c.to_pin))
                } else if c.to_node == node_id && c.to_pin == pin_id {
                    Some((c.from_node, c.from_pin))
                } else {
                    None
                }
            })
            .collect()
    }

    /// IDs of all nodes in insertion order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.graph.lock().nodes.keys().copied().collect()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.lock().nodes.len()
    }

    /// Kind ID of a node
    pub fn node_kind(&self, node_id: NodeId) -> Option<String> {
        self.graph
            .lock()
            .nodes
            .get(&node_id)
            .map(|node| node.kind().to_string())
    }

    /// ID of the exit node, if the script has one
    pub fn exit_node(&self) -> Option<NodeId> {
        self.graph.lock().exit_node()
    }

    /// First node of a kind
    pub fn find_node(&self, kind: &str) -> Option<NodeId> {
        self.graph
            .lock()
            .nodes
            .values()
            .find(|node| node.kind() == kind)
            .map(Node::id)
    }

    /// Snapshot of a node's pins
    pub fn pins(&self, node_id: NodeId) -> Option<Vec<PinInfo>> {
        self.graph
            .lock()
            .nodes
            .get(&node_id)
            .map(|node| node.pins.infos())
    }

    /// Look up a pin ID by node and pin name
    pub fn pin_named(&self, node_id: NodeId, name: &str) -> Option<PinId> {
        self.graph.lock().nodes.get(&node_id)?.pin_named(name)
    }

    /// Persisted configuration of a node
    pub fn storage(&self, node_id: NodeId) -> Option<serde_json::Value> {
        self.graph.lock().nodes.get(&node_id)?.storage()
    }

    /// Replace a node's persisted configuration; the node is re-initialized afterwards
    pub fn set_storage(&self, node_id: NodeId, storage: serde_json::Value, registry: &NodeRegistry) -> Result<(), EditError> {
        let mut graph = self.graph.lock();
        let ScriptGraph { nodes, context, .. } = &mut *graph;
        let node = nodes
            .get_mut(&node_id)
            .ok_or(EditError::NodeNotFound(node_id))?;
        node.evaluator.load_storage(&mut node.pins, storage, registry)?;
        node.initialize(context);
        graph.settle();
        Ok(())
    }

    /// Move a node in the editor
    pub fn set_position(&self, node_id: NodeId, position: [f32; 2]) -> bool {
        match self.graph.lock().nodes.get_mut(&node_id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Append a pin to one of a node's collections
    pub fn add_collection_pin(&self, node_id: NodeId, collection: usize) -> Result<PinId, EditError> {
        let mut graph = self.graph.lock();
        let node = graph
            .nodes
            .get_mut(&node_id)
            .ok_or(EditError::NodeNotFound(node_id))?;
        let slot = node
            .pins
            .add_collection_pin(CollectionSlot(collection))
            .ok_or(EditError::NodeNotFound(node_id))?;
        let id = node.pins.pin(slot).id();
        graph.settle();
        Ok(id)
    }

    /// Remove a pin from its collection, dropping its connections
    pub fn remove_collection_pin(&self, node_id: NodeId, pin_id: PinId) -> Result<(), EditError> {
        let mut graph = self.graph.lock();
        let slot = graph.find_pin(node_id, pin_id)?;

        let attached: Vec<ConnectionId> = graph
            .connections
            .values()
            .filter(|c| c.involves_pin(pin_id))
            .map(|c| c.id)
            .collect();
        for id in attached {
            graph.remove_connection(id);
        }

        let node = graph
            .nodes
            .get_mut(&node_id)
            .ok_or(EditError::NodeNotFound(node_id))?;
        let collection = node
            .pins
            .collection_of(slot)
            .ok_or(EditError::PinNotFound(pin_id))?;
        node.pins.remove_collection_pin(collection, slot);
        graph.settle();
        Ok(())
    }

    /// Replace the context and re-initialize every node
    pub fn set_context(&self, context: ScriptContext) {
        let mut graph = self.graph.lock();
        graph.context = context;
        let ScriptGraph { nodes, context, .. } = &mut *graph;
        for node in nodes.values_mut() {
            node.initialize(context);
        }
        graph.settle();
    }

    /// Current context
    pub fn context(&self) -> ScriptContext {
        self.graph.lock().context.clone()
    }

    /// Set the element type of the items this script is run against
    pub fn set_item_type(&self, item_type: Option<PinType>) {
        let mut graph = self.graph.lock();
        if graph.item_type == item_type {
            return;
        }
        graph.item_type = item_type;
        let ScriptGraph { nodes, item_type, .. } = &mut *graph;
        for node in nodes.values_mut() {
            node.evaluator
                .on_item_type_changed(&mut node.pins, item_type.as_ref());
        }
        graph.settle();
    }

    /// Element type of the items this script is run against
    pub fn item_type(&self) -> Option<PinType> {
        self.graph.lock().item_type.clone()
    }

    /// Run with `item` as the current list element
    pub fn try_run_item(&self, item: Value) -> Result<Value, EvaluationError> {
        let mut graph = self.graph.lock();
        graph.context.item = Some(item);
        let outcome = self.run_locked(&mut graph);
        graph.context.item = None;
        outcome
    }

    /// Evaluate the script; faults yield the result type's default
    pub fn run(&self) -> Value {
        self.try_run()
            .unwrap_or_else(|_| self.result_type.default_value())
    }

    /// Evaluate the script, reporting any fault
    pub fn try_run(&self) -> Result<Value, EvaluationError> {
        let mut graph = self.graph.lock();
        self.run_locked(&mut graph)
    }

    fn run_locked(&self, graph: &mut ScriptGraph) -> Result<Value, EvaluationError> {
        let refreshed = {
            let ScriptGraph { nodes, context, .. } = &mut *graph;
            nodes
                .values_mut()
                .fold(false, |changed, node| node.evaluator.refresh(&mut node.pins, context) | changed)
        };
        if refreshed {
            graph.settle();
        }

        let incoming = graph
            .connections
            .values()
            .map(|c| (c.to_pin, (c.from_node, c.from_pin)))
            .collect();
        let mut pass = Pass {
            incoming,
            stack: Vec::new(),
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            evaluate_script(graph, &self.result_type, &mut pass)
        }))
        .unwrap_or_else(|_| {
            Err(EvaluationError::Panicked {
                node: pass.stack.last().copied(),
            })
        });

        match outcome {
            Ok(value) => {
                if graph.last_fault.take().is_some() {
                    tracing::info!(script = %self.name, "Script recovered");
                }
                graph.result = value.clone();
                Ok(value)
            }
            Err(error) => {
                if graph.last_fault.as_ref() != Some(&error) {
                    tracing::warn!(script = %self.name, %error, "Script evaluation failed");
                }
                graph.last_fault = Some(error.clone());
                graph.result = self.result_type.default_value();
                Err(error)
            }
        }
    }

    /// Result of the most recent run
    pub fn result(&self) -> Value {
        self.graph.lock().result.clone()
    }

    /// Fault of the most recent run, cleared by the next successful one
    pub fn last_fault(&self) -> Option<EvaluationError> {
        self.graph.lock().last_fault.clone()
    }

    /// Work on the private script of a node, if it has one
    pub fn with_sub_script<R>(&self, node_id: NodeId, f: impl FnOnce(&NodeScript) -> R) -> Option<R> {
        let graph = self.graph.lock();
        let script = graph.nodes.get(&node_id)?.evaluator.sub_script()?;
        Some(f(script))
    }
}

impl std::fmt::Debug for NodeScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeScript")
            .field("name", &self.name)
            .field("result_type", &self.result_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{NodeError, NodeEvaluator};
    use crate::nodes::literal::StaticValueNode;
    use crate::pin_set::PinSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Adds one to its input and counts its evaluations
    struct Counting {
        input: PinSlot,
        output: PinSlot,
        calls: Arc<AtomicUsize>,
    }

    impl NodeEvaluator for Counting {
        fn evaluate(&mut self, pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let value = pins.value(self.input).as_float().unwrap_or_default();
            pins.set_value(self.output, Value::Float(value + 1.0));
            Ok(())
        }
    }

    fn counting(calls: &Arc<AtomicUsize>) -> Node {
        let calls = calls.clone();
        Node::build("test.counting", "Counting", "", move |pins| {
            Box::new(Counting {
                input: pins.create_input("In", PinType::Float),
                output: pins.create_output("Out", PinType::Float),
                calls,
            })
        })
    }

    struct Panicking;

    impl NodeEvaluator for Panicking {
        fn evaluate(&mut self, _pins: &mut PinSet, _ctx: &ScriptContext) -> Result<(), NodeError> {
            panic!("node exploded");
        }
    }

    fn pin(script: &NodeScript, node: NodeId, name: &str) -> PinId {
        script.pin_named(node, name).unwrap()
    }

    fn exit_pin(script: &NodeScript) -> (NodeId, PinId) {
        let exit = script.exit_node().unwrap();
        (exit, pin(script, exit, "Result"))
    }

    #[test]
    fn test_second_output_replaces_first() {
        let script = NodeScript::new("Replace", PinType::Float);
        let a = script.add_node(StaticValueNode::node(Value::Float(1.0))).unwrap();
        let b = script.add_node(StaticValueNode::node(Value::Float(2.0))).unwrap();
        let (exit, result) = exit_pin(&script);

        script.connect(a, pin(&script, a, "Value"), exit, result).unwrap();
        assert_eq!(script.run(), Value::Float(1.0));

        // reversed argument order connects the same way
        script.connect(exit, result, b, pin(&script, b, "Value")).unwrap();
        assert_eq!(script.connections().len(), 1);
        assert_eq!(script.connected_to(exit, result), vec![(b, pin(&script, b, "Value"))]);
        assert_eq!(script.run(), Value::Float(2.0));
    }

    #[test]
    fn test_invalid_connections_change_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let script = NodeScript::new("Invalid", PinType::Float);
        let first = script.add_node(counting(&calls)).unwrap();
        let second = script.add_node(counting(&calls)).unwrap();
        let text = script.add_node(StaticValueNode::node(Value::from("text"))).unwrap();

        assert!(matches!(
            script.connect(first, pin(&script, first, "Out"), second, pin(&script, second, "Out")),
            Err(EditError::SameDirection)
        ));
        assert!(matches!(
            script.connect(text, pin(&script, text, "Value"), first, pin(&script, first, "In")),
            Err(EditError::IncompatibleTypes { .. })
        ));
        assert!(matches!(
            script.connect(first, pin(&script, first, "Out"), first, pin(&script, first, "In")),
            Err(EditError::SelfLoop)
        ));

        script
            .connect(first, pin(&script, first, "Out"), second, pin(&script, second, "In"))
            .unwrap();
        assert!(matches!(
            script.connect(second, pin(&script, second, "Out"), first, pin(&script, first, "In")),
            Err(EditError::WouldCycle)
        ));
        assert_eq!(script.connections().len(), 1);
    }

    #[test]
    fn test_shared_upstream_evaluates_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = NodeRegistry::with_builtins();
        let script = NodeScript::new("Diamond", PinType::Float);
        let shared = script.add_node(counting(&calls)).unwrap();
        let left = script.add_node(counting(&calls)).unwrap();
        let right = script.add_node(counting(&calls)).unwrap();
        let sum = script.add_node(registry.create_node("math.sum").unwrap()).unwrap();
        let (exit, result) = exit_pin(&script);

        let out = pin(&script, shared, "Out");
        script.connect(shared, out, left, pin(&script, left, "In")).unwrap();
        script.connect(shared, out, right, pin(&script, right, "In")).unwrap();
        let values: Vec<PinId> = script
            .pins(sum)
            .unwrap()
            .into_iter()
            .filter(|p| p.collection.is_some())
            .map(|p| p.id)
            .collect();
        script.connect(left, pin(&script, left, "Out"), sum, values[0]).unwrap();
        script.connect(right, pin(&script, right, "Out"), sum, values[1]).unwrap();
        script.connect(sum, pin(&script, sum, "Sum"), exit, result).unwrap();

        assert_eq!(script.run(), Value::Float(4.0));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(script.run(), Value::Float(4.0));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(script.result(), Value::Float(4.0));
    }

    #[test]
    fn test_missing_exit_yields_default() {
        let script = NodeScript::new("Default", PinType::Color);
        assert_eq!(script.run(), PinType::Color.default_value());

        let (exit, _) = exit_pin(&script);
        script.remove_node(exit).unwrap();
        assert!(script.exit_node().is_none());
        assert_eq!(script.try_run(), Ok(PinType::Color.default_value()));

        script.add_node(ExitNode::node(PinType::Color)).unwrap();
        assert!(matches!(
            script.add_node(ExitNode::node(PinType::Color)),
            Err(EditError::DuplicateExitNode)
        ));
    }

    #[test]
    fn test_removing_node_drops_its_connections() {
        let script = NodeScript::new("Remove", PinType::Float);
        let value = script.add_node(StaticValueNode::node(Value::Float(0.4))).unwrap();
        let (exit, result) = exit_pin(&script);
        script.connect(value, pin(&script, value, "Value"), exit, result).unwrap();
        assert_eq!(script.run(), Value::Float(0.4));

        script.remove_node(value).unwrap();
        assert!(script.connections().is_empty());
        assert_eq!(script.run(), Value::Float(0.0));
        assert!(matches!(script.remove_node(value), Err(EditError::NodeNotFound(_))));
    }

    #[test]
    fn test_panic_is_contained() {
        let script = NodeScript::new("Panic", PinType::Float);
        let node = script
            .add_node(Node::build("test.panic", "Panic", "", |pins| {
                pins.create_output("Out", PinType::Float);
                Box::new(Panicking)
            }))
            .unwrap();
        let (exit, result) = exit_pin(&script);
        script.connect(node, pin(&script, node, "Out"), exit, result).unwrap();

        assert_eq!(
            script.try_run(),
            Err(EvaluationError::Panicked { node: Some(node) })
        );
        assert_eq!(script.run(), Value::Float(0.0));

        script.remove_node(node).unwrap();
        assert_eq!(script.try_run(), Ok(Value::Float(0.0)));
        assert!(script.last_fault().is_none());
    }

    #[test]
    fn test_edits_race_with_runs() {
        let script = Arc::new(NodeScript::new("Race", PinType::Float));
        let (exit, result) = exit_pin(&script);

        let editor = {
            let script = script.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let node = script
                        .add_node(StaticValueNode::node(Value::Float(i as f32)))
                        .unwrap();
                    let out = script.pin_named(node, "Value").unwrap();
                    script.connect(node, out, exit, result).unwrap();
                    script.remove_node(node).unwrap();
                }
            })
        };

        for _ in 0..200 {
            assert!(script.try_run().is_ok());
        }
        editor.join().unwrap();
        assert_eq!(script.node_count(), 1);
    }
}
