// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data bindings from node scripts to layer properties.
//!
//! Each update runs the script, converts its result to the property's value type, applies
//! the modifier chain in order, composes with the property's base value, eases from the
//! previously applied value and finally clamps to the property's range.

use crate::converter::{converter_for_id, DataBindingConverter};
use crate::easing::Easing;
use crate::modifier::{DataBindingModifier, ModifierParameter, ModifierRegistry, ModifierType};
use crate::property::PropertySink;
use parking_lot::{Mutex, RwLock};
use prism_graph::{
    Evaluable, EvaluationError, LoadError, LoadReport, NodeRegistry, NodeScript, PinType, ScriptContext,
    ScriptModel, Value,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Errors raised while configuring a binding
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    /// Converter output does not match the property
    #[error("converter produces {converter} but the property holds {property}")]
    ConverterMismatch {
        /// Converter value type
        converter: PinType,
        /// Property value type
        property: PinType,
    },

    /// Converter cannot take the script result
    #[error("converter '{converter}' cannot convert script results of type {result_type}")]
    UnsupportedResult {
        /// Converter identifier
        converter: String,
        /// Script result type
        result_type: PinType,
    },

    /// Modifier does not accept the property type
    #[error("modifier '{modifier}' does not support {value_type}")]
    UnsupportedModifier {
        /// Modifier identifier
        modifier: String,
        /// Property value type
        value_type: PinType,
    },

    /// Modifier parameter missing, unexpected or of the wrong type
    #[error("modifier '{modifier}' expects parameter {expected:?}, got {found:?}")]
    ParameterMismatch {
        /// Modifier identifier
        modifier: String,
        /// Declared parameter type
        expected: Option<PinType>,
        /// Supplied parameter type
        found: Option<PinType>,
    },

    /// Converter lacks the operation a composition mode needs
    #[error("converter '{converter}' does not support {composition:?} composition")]
    UnsupportedComposition {
        /// Converter identifier
        converter: String,
        /// Rejected mode
        composition: Composition,
    },

    /// Converter cannot interpolate, so it cannot ease
    #[error("converter '{converter}' cannot ease between values")]
    UnsupportedEasing {
        /// Converter identifier
        converter: String,
    },

    /// No modifier at this index
    #[error("no modifier at index {0}")]
    ModifierIndex(usize),

    /// Condition scripts must produce `Bool`
    #[error("condition scripts must produce Bool, not {0}")]
    ConditionResult(PinType),

    /// No condition at this index
    #[error("no condition at index {0}")]
    ConditionIndex(usize),

    /// Converter identifier not known
    #[error("unknown converter '{0}'")]
    UnknownConverter(String),

    /// Modifier identifier not known
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
}

/// How the binding's value combines with the property's base value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Composition {
    /// The binding's value replaces the base value
    #[default]
    Replace,
    /// The binding's value is added to the base value
    Sum,
    /// Blend from the base value towards the binding's value
    Blend(f32),
}

#[derive(Debug, Default)]
struct BindingConfig {
    modifiers: Vec<DataBindingModifier>,
    composition: Composition,
    easing: Easing,
    easing_time: Duration,
}

#[derive(Debug, Default)]
struct EasingState {
    from: Option<Value>,
    target: Option<Value>,
    output: Option<Value>,
    elapsed: Duration,
}

/// Drives one property from one script
pub struct DataBinding {
    target: Arc<dyn PropertySink>,
    script: Arc<NodeScript>,
    converter: Arc<dyn DataBindingConverter>,
    config: RwLock<BindingConfig>,
    easing_state: Mutex<EasingState>,
}

impl DataBinding {
    /// Bind `script` to `target` through `converter`
    pub fn new(
        target: Arc<dyn PropertySink>,
        script: Arc<NodeScript>,
        converter: Arc<dyn DataBindingConverter>,
    ) -> Result<Self, BindingError> {
        let property = target.value_type();
        if converter.value_type() != property {
            return Err(BindingError::ConverterMismatch {
                converter: converter.value_type(),
                property,
            });
        }
        if !converter.accepts(script.result_type()) {
            return Err(BindingError::UnsupportedResult {
                converter: converter.id().to_string(),
                result_type: script.result_type().clone(),
            });
        }

        Ok(Self {
            target,
            script,
            converter,
            config: RwLock::new(BindingConfig::default()),
            easing_state: Mutex::new(EasingState::default()),
        })
    }

    /// Property this binding writes
    pub fn target(&self) -> &Arc<dyn PropertySink> {
        &self.target
    }

    /// Script computing the raw value
    pub fn script(&self) -> &Arc<NodeScript> {
        &self.script
    }

    /// Converter in use
    pub fn converter(&self) -> &Arc<dyn DataBindingConverter> {
        &self.converter
    }

    /// Append a modifier to the chain, returning its index
    pub fn add_modifier(
        &self,
        modifier_type: Arc<dyn ModifierType>,
        parameter: ModifierParameter,
    ) -> Result<usize, BindingError> {
        let data_model = self.script.context().data_model;
        let modifier = DataBindingModifier::new(
            modifier_type,
            parameter,
            &self.converter.value_type(),
            data_model.as_deref(),
        )?;
        tracing::debug!(property = self.target.name(), modifier = modifier.kind(), "Added modifier");

        let mut config = self.config.write();
        config.modifiers.push(modifier);
        Ok(config.modifiers.len() - 1)
    }

    /// Remove the modifier at `index`
    pub fn remove_modifier(&self, index: usize) -> Result<(), BindingError> {
        let mut config = self.config.write();
        if index >= config.modifiers.len() {
            return Err(BindingError::ModifierIndex(index));
        }
        config.modifiers.remove(index);
        Ok(())
    }

    /// Move a modifier to a new position in the chain
    pub fn move_modifier(&self, from: usize, to: usize) -> Result<(), BindingError> {
        let mut config = self.config.write();
        let len = config.modifiers.len();
        if from >= len {
            return Err(BindingError::ModifierIndex(from));
        }
        if to >= len {
            return Err(BindingError::ModifierIndex(to));
        }
        let modifier = config.modifiers.remove(from);
        config.modifiers.insert(to, modifier);
        Ok(())
    }

    /// Modifier kinds and parameters in chain order
    pub fn modifiers(&self) -> Vec<(String, ModifierParameter)> {
        self.config
            .read()
            .modifiers
            .iter()
            .map(|m| (m.kind().to_string(), m.parameter().clone()))
            .collect()
    }

    /// Change how the value combines with the base value
    pub fn set_composition(&self, composition: Composition) -> Result<(), BindingError> {
        let supported = match composition {
            Composition::Replace => true,
            Composition::Sum => self.converter.supports_sum(),
            Composition::Blend(_) => self.converter.supports_interpolate(),
        };
        if !supported {
            return Err(BindingError::UnsupportedComposition {
                converter: self.converter.id().to_string(),
                composition,
            });
        }
        self.config.write().composition = composition;
        Ok(())
    }

    /// Current composition mode
    pub fn composition(&self) -> Composition {
        self.config.read().composition
    }

    /// Ease value changes over `duration`; zero applies changes immediately
    pub fn set_easing(&self, easing: Easing, duration: Duration) -> Result<(), BindingError> {
        if !duration.is_zero() && !self.converter.supports_interpolate() {
            return Err(BindingError::UnsupportedEasing {
                converter: self.converter.id().to_string(),
            });
        }
        let mut config = self.config.write();
        config.easing = easing;
        config.easing_time = duration;
        Ok(())
    }

    /// Current easing curve and duration
    pub fn easing(&self) -> (Easing, Duration) {
        let config = self.config.read();
        (config.easing, config.easing_time)
    }

    /// Evaluate the script and write the result into the property.
    ///
    /// A script fault still writes a value computed from the result type's default; the
    /// fault is returned after the property is updated.
    pub fn update(&self, delta: Duration) -> Result<Value, EvaluationError> {
        let outcome = self.script.try_run();
        let raw = match &outcome {
            Ok(value) => value.clone(),
            Err(_) => self.script.result_type().default_value(),
        };
        let data_model = self.script.context().data_model;

        let config = self.config.read();
        let mut value = self.converter.convert(&raw);
        for modifier in &config.modifiers {
            value = self
                .converter
                .convert(&modifier.apply(value, data_model.as_deref()));
        }

        value = match config.composition {
            Composition::Replace => value,
            Composition::Sum => self.converter.sum(&self.target.base_value(), &value),
            Composition::Blend(progress) => self
                .converter
                .interpolate(&self.target.base_value(), &value, progress),
        };
        value = self.ease(&config, value, delta);
        drop(config);

        value = self.clamp(value);
        self.target.apply_value(value.clone());
        outcome.map(|_| value)
    }

    fn ease(&self, config: &BindingConfig, value: Value, delta: Duration) -> Value {
        let mut state = self.easing_state.lock();
        if config.easing_time.is_zero() {
            state.from = None;
            state.target = Some(value.clone());
            state.output = Some(value.clone());
            return value;
        }

        if state.target.as_ref() != Some(&value) {
            state.from = Some(state.output.clone().unwrap_or_else(|| value.clone()));
            state.target = Some(value.clone());
            state.elapsed = Duration::ZERO;
        }
        state.elapsed = (state.elapsed + delta).min(config.easing_time);

        let progress = config.easing.ease(state.elapsed.as_secs_f32() / config.easing_time.as_secs_f32());
        let output = match &state.from {
            Some(from) => self.converter.interpolate(from, &value, progress),
            None => value,
        };
        state.output = Some(output.clone());
        output
    }

    fn clamp(&self, value: Value) -> Value {
        let (min, max) = (self.target.min_input_value(), self.target.max_input_value());
        let bound = |v: f32| {
            let v = min.map_or(v, |m| v.max(m));
            max.map_or(v, |m| v.min(m))
        };
        match value {
            Value::Float(v) => Value::Float(bound(v)),
            Value::Int(v) => {
                let clamped = bound(v as f32);
                if clamped == v as f32 {
                    Value::Int(v)
                } else {
                    Value::Int(clamped.round() as i64)
                }
            }
            other => other,
        }
    }

    /// Capture the binding configuration and its script
    pub fn to_model(&self) -> BindingModel {
        let config = self.config.read();
        BindingModel {
            script: self.script.to_model(),
            converter: self.converter.id().to_string(),
            modifiers: config
                .modifiers
                .iter()
                .map(|m| ModifierModel {
                    kind: m.kind().to_string(),
                    parameter: m.parameter().clone(),
                })
                .collect(),
            easing: config.easing,
            easing_time_ms: u64::try_from(config.easing_time.as_millis()).unwrap_or(u64::MAX),
            composition: config.composition,
        }
    }

    /// Rebuild a binding for `target`.
    ///
    /// Script nodes that cannot be restored are reported, not fatal; a configuration the
    /// binding would reject when built by hand is an error.
    pub fn from_model(
        model: &BindingModel,
        target: Arc<dyn PropertySink>,
        nodes: &NodeRegistry,
        modifiers: &ModifierRegistry,
        context: ScriptContext,
    ) -> Result<(Self, LoadReport), BindingError> {
        let converter =
            converter_for_id(&model.converter).ok_or_else(|| BindingError::UnknownConverter(model.converter.clone()))?;
        let (script, report) = NodeScript::from_model(&model.script, nodes, context);
        let binding = Self::new(target, Arc::new(script), converter)?;

        for saved in &model.modifiers {
            let modifier_type = modifiers
                .get(&saved.kind)
                .ok_or_else(|| BindingError::UnknownModifier(saved.kind.clone()))?;
            binding.add_modifier(modifier_type, saved.parameter.clone())?;
        }
        binding.set_composition(model.composition)?;
        binding.set_easing(model.easing, Duration::from_millis(model.easing_time_ms))?;
        Ok((binding, report))
    }
}

impl Evaluable for DataBinding {
    fn label(&self) -> &str {
        self.target.name()
    }

    fn tick(&self, delta: Duration) -> Result<(), EvaluationError> {
        self.update(delta).map(|_| ())
    }
}

impl std::fmt::Debug for DataBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBinding")
            .field("property", &self.target.name())
            .field("script", &self.script.name())
            .field("converter", &self.converter.id())
            .field("config", &*self.config.read())
            .finish()
    }
}

/// Serialized form of a configured modifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierModel {
    /// Modifier identifier
    pub kind: String,
    /// Parameter source
    #[serde(default)]
    pub parameter: ModifierParameter,
}

/// Serialized form of a binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingModel {
    /// Script computing the raw value
    pub script: ScriptModel,
    /// Converter identifier
    pub converter: String,
    /// Modifier chain in order
    #[serde(default)]
    pub modifiers: Vec<ModifierModel>,
    /// Easing curve
    #[serde(default)]
    pub easing: Easing,
    /// Easing duration in milliseconds
    #[serde(default)]
    pub easing_time_ms: u64,
    /// Composition mode
    #[serde(default)]
    pub composition: Composition,
}

impl BindingModel {
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
