// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of node kinds.

use crate::evaluation::NodeEvaluator;
use crate::node::{Node, NodeCategory};
use crate::pin_set::PinSet;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Builds the pins and behaviour of a fresh node
pub type NodeFactory = Arc<dyn Fn(&mut PinSet) -> Box<dyn NodeEvaluator> + Send + Sync>;

/// Node type definition
#[derive(Clone)]
pub struct NodeType {
    /// Unique kind identifier, also the persisted kind
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    factory: NodeFactory,
}

impl NodeType {
    /// Create a new node type
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: NodeCategory,
        description: impl Into<String>,
        factory: impl Fn(&mut PinSet) -> Box<dyn NodeEvaluator> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: description.into(),
            factory: Arc::new(factory),
        }
    }

    /// Create a node of this type
    pub fn instantiate(&self) -> Node {
        Node::build(
            self.id.clone(),
            self.name.clone(),
            self.description.clone(),
            |pins| (self.factory)(pins),
        )
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Registry of available node types
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Create a registry holding every built-in node kind
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }

    /// Register a node type, replacing any type with the same ID
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(NodeType::instantiate)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
