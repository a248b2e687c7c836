// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node script runtime for Prism.
//!
//! Scripts compute the values that drive animated layer properties. This crate provides:
//! - Typed pins and variable-arity pin collections
//! - Connection validation (direction, type, cycles)
//! - Lazy, memoized evaluation with a per-run fault boundary
//! - List operators running a nested predicate script per element
//! - Data model and layer property access
//! - Script persistence
//!
//! ## Architecture
//!
//! A [`NodeScript`] owns its nodes and connections behind one mutex, so an editor thread
//! can restructure a script while the render thread keeps running it. Node behaviour is
//! supplied by a [`NodeEvaluator`] created from the [`NodeRegistry`].

pub mod connection;
pub mod context;
pub mod data_model;
pub mod driver;
pub mod evaluation;
pub mod node;
pub mod nodes;
pub mod persistence;
pub mod pin;
pub mod pin_collection;
pub mod pin_set;
pub mod properties;
pub mod registry;
pub mod script;
pub mod value;

pub use connection::{Connection, ConnectionId};
pub use context::ScriptContext;
pub use data_model::{DataModel, JsonDataModel};
pub use driver::{Evaluable, EvaluationDriver, TickReport};
pub use evaluation::{EvaluationError, NodeError, NodeEvaluator, StorageError};
pub use node::{Node, NodeCategory, NodeId};
pub use persistence::{ConnectionModel, LoadError, LoadReport, NodeModel, ScriptModel};
pub use pin::{Pin, PinDirection, PinId, PinInfo, PinSlot};
pub use pin_collection::{CollectionSlot, PinCollection};
pub use pin_set::{PinEvent, PinSet};
pub use properties::PropertySource;
pub use registry::{NodeFactory, NodeRegistry, NodeType};
pub use script::{EditError, NodeScript};
pub use value::{Color, Field, PinType, Schema, Value};
