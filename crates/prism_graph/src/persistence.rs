// SPDX-License-Identifier: MIT OR Apache-2.0
//! Script persistence.
//!
//! A script is stored as its node list (kind, position, storage and the ordered pin IDs of
//! every pin and collection) plus its connections by stable pin ID. Loading rebuilds each
//! node from the registry, applies its storage and then hands the saved pin IDs back by
//! position, so connections resolve against the same identities they were saved with.

use crate::connection::Connection;
use crate::context::ScriptContext;
use crate::node::NodeId;
use crate::pin::PinId;
use crate::registry::NodeRegistry;
use crate::script::NodeScript;
use crate::value::PinType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Serialized form of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeModel {
    /// Node ID
    pub id: NodeId,
    /// Registry kind
    pub kind: String,
    /// Position in the editor
    pub position: [f32; 2],
    /// Kind-specific configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<serde_json::Value>,
    /// IDs of the simple pins in order
    #[serde(default)]
    pub pins: Vec<PinId>,
    /// IDs of each collection's pins in order
    #[serde(default)]
    pub collections: Vec<Vec<PinId>>,
}

/// Serialized form of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionModel {
    /// Node owning the output pin
    pub from_node: NodeId,
    /// Output pin
    pub from_pin: PinId,
    /// Node owning the input pin
    pub to_node: NodeId,
    /// Input pin
    pub to_pin: PinId,
}

/// Serialized form of a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptModel {
    /// Script name
    pub name: String,
    /// Result type
    pub result_type: PinType,
    /// Element type fed to the item source of a predicate script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<PinType>,
    /// Nodes
    pub nodes: Vec<NodeModel>,
    /// Connections
    pub connections: Vec<ConnectionModel>,
}

impl ScriptModel {
    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Parse from RON
    pub fn from_ron(ron: &str) -> Result<Self, LoadError> {
        Ok(ron::from_str(ron)?)
    }
}

/// Error when a script document cannot be parsed at all
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Invalid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid RON
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Parts of a script model that could not be restored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Nodes with an unknown kind or unusable storage
    pub dropped_nodes: Vec<NodeId>,
    /// Connections whose endpoints are missing or incompatible
    pub dropped_connections: Vec<ConnectionModel>,
}

impl LoadReport {
    /// Whether everything was restored
    pub fn is_complete(&self) -> bool {
        self.dropped_nodes.is_empty() && self.dropped_connections.is_empty()
    }
}

impl NodeScript {
    /// Capture the script structure and node configuration
    pub fn to_model(&self) -> ScriptModel {
        let graph = self.lock();
        let nodes = graph
            .nodes
            .values()
            .map(|node| {
                let (pins, collections) = node.pins.layout();
                NodeModel {
                    id: node.id(),
                    kind: node.kind().to_string(),
                    position: node.position(),
                    storage: node.storage(),
                    pins,
                    collections,
                }
            })
            .collect();
        let connections = graph
            .connections
            .values()
            .map(|c| ConnectionModel {
                from_node: c.from_node,
                from_pin: c.from_pin,
                to_node: c.to_node,
                to_pin: c.to_pin,
            })
            .collect();

        ScriptModel {
            name: self.name().to_string(),
            result_type: self.result_type().clone(),
            item_type: graph.item_type.clone(),
            nodes,
            connections,
        }
    }

    /// Rebuild a script, skipping nodes and connections that cannot be restored.
    ///
    /// Connections are restored as saved; a cycle in the document is reported by the first
    /// run rather than rejected here.
    pub fn from_model(model: &ScriptModel, registry: &NodeRegistry, context: ScriptContext) -> (NodeScript, LoadReport) {
        let script = NodeScript::empty(model.name.clone(), model.result_type.clone());
        let mut report = LoadReport::default();

        {
            let mut graph = script.lock();
            graph.context = context;
            graph.item_type = model.item_type.clone();

            for node_model in &model.nodes {
                let Some(mut node) = registry.create_node(&node_model.kind) else {
                    tracing::warn!(node = %node_model.id, kind = %node_model.kind, "Unknown node kind, dropping node");
                    report.dropped_nodes.push(node_model.id);
                    continue;
                };
                if graph.nodes.contains_key(&node_model.id) {
                    tracing::warn!(node = %node_model.id, "Duplicate node ID, dropping node");
                    report.dropped_nodes.push(node_model.id);
                    continue;
                }

                node.id = node_model.id;
                node.position = node_model.position;
                if let Some(storage) = &node_model.storage {
                    if let Err(error) = node
                        .evaluator
                        .load_storage(&mut node.pins, storage.clone(), registry)
                    {
                        tracing::warn!(node = %node_model.id, kind = %node_model.kind, %error, "Invalid node storage, dropping node");
                        report.dropped_nodes.push(node_model.id);
                        continue;
                    }
                }
                node.initialize(&graph.context);
                node.pins
                    .restore_layout(&node_model.pins, &node_model.collections);
                node.dispatch_events();
                graph.nodes.insert(node.id, node);
            }

            let mut fed_inputs = HashSet::new();
            for saved in &model.connections {
                let connection = Connection::new(saved.from_node, saved.from_pin, saved.to_node, saved.to_pin);
                if !graph.is_valid(&connection) || !fed_inputs.insert((saved.to_node, saved.to_pin)) {
                    tracing::warn!(from = %saved.from_node, to = %saved.to_node, "Dropping unrestorable connection");
                    report.dropped_connections.push(*saved);
                    continue;
                }
                graph.insert_connection(connection);
            }
            graph.settle();
        }

        (script, report)
    }
}
