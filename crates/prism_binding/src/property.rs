// SPDX-License-Identifier: MIT OR Apache-2.0
//! Properties written by data bindings.

use crate::timeline::Timeline;
use indexmap::IndexMap;
use parking_lot::RwLock;
use prism_graph::{PinType, PropertySource, Value};
use std::sync::Arc;

/// Receives the values a binding computes
pub trait PropertySink: Send + Sync {
    /// Property name, used as the binding label
    fn name(&self) -> &str;

    /// Type of the values this property holds
    fn value_type(&self) -> PinType;

    /// Store a new current value
    fn apply_value(&self, value: Value);

    /// Current value
    fn value(&self) -> Value;

    /// Value the property has without the binding, used for composition
    fn base_value(&self) -> Value {
        self.value()
    }

    /// Lower bound for numeric values
    fn min_input_value(&self) -> Option<f32> {
        None
    }

    /// Upper bound for numeric values
    fn max_input_value(&self) -> Option<f32> {
        None
    }
}

#[derive(Debug)]
struct LayerPropertyState {
    base: Value,
    current: Value,
    time: f32,
    timeline: Option<Timeline>,
}

/// An animatable property of a layer
#[derive(Debug)]
pub struct LayerProperty {
    name: String,
    value_type: PinType,
    range: (Option<f32>, Option<f32>),
    state: RwLock<LayerPropertyState>,
}

impl LayerProperty {
    /// Create a property holding `initial`
    pub fn new(name: impl Into<String>, initial: Value) -> Self {
        Self {
            name: name.into(),
            value_type: initial.pin_type(),
            range: (None, None),
            state: RwLock::new(LayerPropertyState {
                base: initial.clone(),
                current: initial,
                time: 0.0,
                timeline: None,
            }),
        }
    }

    /// Bound numeric values applied by bindings
    pub fn with_range(mut self, min: Option<f32>, max: Option<f32>) -> Self {
        self.range = (min, max);
        self
    }

    /// Take the base value from keyframes
    pub fn with_timeline(self, timeline: Timeline) -> Self {
        {
            let mut state = self.state.write();
            state.timeline = Some(timeline);
            Self::refresh_base(&mut state, &self.value_type);
        }
        self
    }

    /// Replace the base value; ignored while a timeline drives it
    pub fn set_base_value(&self, value: Value) {
        let mut state = self.state.write();
        if state.timeline.is_none() {
            state.base = value.cast(&self.value_type);
        }
    }

    /// Move the playhead, re-sampling the timeline
    pub fn set_time(&self, time: f32) {
        let mut state = self.state.write();
        state.time = time;
        Self::refresh_base(&mut state, &self.value_type);
    }

    /// Current playhead
    pub fn time(&self) -> f32 {
        self.state.read().time
    }

    fn refresh_base(state: &mut LayerPropertyState, value_type: &PinType) {
        if let Some(value) = state.timeline.as_ref().and_then(|t| t.evaluate(state.time)) {
            state.base = value.cast(value_type);
        }
    }
}

impl PropertySink for LayerProperty {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_type(&self) -> PinType {
        self.value_type.clone()
    }

    fn apply_value(&self, value: Value) {
        self.state.write().current = value.cast(&self.value_type);
    }

    fn value(&self) -> Value {
        self.state.read().current.clone()
    }

    fn base_value(&self) -> Value {
        self.state.read().base.clone()
    }

    fn min_input_value(&self) -> Option<f32> {
        self.range.0
    }

    fn max_input_value(&self) -> Option<f32> {
        self.range.1
    }
}

/// The properties of one layer, readable from its scripts
#[derive(Default)]
pub struct PropertyGroup {
    properties: RwLock<IndexMap<String, Arc<dyn PropertySink>>>,
}

impl PropertyGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property, replacing one with the same name
    pub fn insert(&self, property: Arc<dyn PropertySink>) {
        self.properties
            .write()
            .insert(property.name().to_string(), property);
    }

    /// Remove a property by name
    pub fn remove(&self, name: &str) -> Option<Arc<dyn PropertySink>> {
        self.properties.write().shift_remove(name)
    }

    /// Property by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn PropertySink>> {
        self.properties.read().get(name).cloned()
    }
}

impl PropertySource for PropertyGroup {
    fn property_names(&self) -> Vec<String> {
        self.properties.read().keys().cloned().collect()
    }

    fn property_type(&self, name: &str) -> Option<PinType> {
        self.properties.read().get(name).map(|p| p.value_type())
    }

    fn property_value(&self, name: &str) -> Option<Value> {
        self.properties.read().get(name).map(|p| p.value())
    }
}

impl std::fmt::Debug for PropertyGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.properties.read().keys()).finish()
    }
}
