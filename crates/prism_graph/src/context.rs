// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-script context handed to nodes.

use crate::data_model::DataModel;
use crate::properties::PropertySource;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// External services and the current list item, as seen by the nodes of one script
#[derive(Clone, Default)]
pub struct ScriptContext {
    /// Data model nodes read external values from
    pub data_model: Option<Arc<dyn DataModel>>,
    /// Properties of the element the script belongs to
    pub properties: Option<Arc<dyn PropertySource>>,
    /// Element currently being tested by a list operator
    pub item: Option<Value>,
}

impl ScriptContext {
    /// Context backed by a data model
    pub fn with_data_model(data_model: Arc<dyn DataModel>) -> Self {
        Self {
            data_model: Some(data_model),
            ..Self::default()
        }
    }

    /// Expose the properties of the owning element
    pub fn with_properties(mut self, properties: Arc<dyn PropertySource>) -> Self {
        self.properties = Some(properties);
        self
    }
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("data_model", &self.data_model.is_some())
            .field("properties", &self.properties.is_some())
            .field("item", &self.item)
            .finish()
    }
}
