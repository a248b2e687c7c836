// SPDX-License-Identifier: MIT OR Apache-2.0
//! Modifiers applied to converted binding values.
//!
//! A modifier type is a pure transform over one value. Each type declares the property
//! types it accepts and the type of its optional parameter; both are checked when the
//! modifier is added to a binding, never per tick.

use crate::binding::BindingError;
use indexmap::IndexMap;
use prism_graph::{Color, DataModel, PinType, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A pure value transform
pub trait ModifierType: Send + Sync {
    /// Stable identifier used in binding documents
    fn id(&self) -> &'static str;

    /// Display name
    fn name(&self) -> &'static str;

    /// Whether values of `value_type` can be modified
    fn supports_type(&self, value_type: &PinType) -> bool;

    /// Parameter type, `None` if the modifier takes no parameter
    fn parameter_type(&self) -> Option<PinType>;

    /// Transform `value`; `parameter` is already cast to [`ModifierType::parameter_type`]
    fn apply(&self, value: Value, parameter: Option<&Value>) -> Value;
}

/// Where a modifier's parameter comes from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ModifierParameter {
    /// No parameter
    #[default]
    None,
    /// A fixed value
    Static(Value),
    /// A data-model path read on every update
    DataModel(String),
}

/// A modifier type together with its parameter, as configured on a binding
#[derive(Clone)]
pub struct DataBindingModifier {
    modifier_type: Arc<dyn ModifierType>,
    parameter: ModifierParameter,
}

impl DataBindingModifier {
    /// Check that the modifier fits properties of `value_type`
    pub fn new(
        modifier_type: Arc<dyn ModifierType>,
        parameter: ModifierParameter,
        value_type: &PinType,
        data_model: Option<&dyn DataModel>,
    ) -> Result<Self, BindingError> {
        if !modifier_type.supports_type(value_type) {
            return Err(BindingError::UnsupportedModifier {
                modifier: modifier_type.id().to_string(),
                value_type: value_type.clone(),
            });
        }

        let expected = modifier_type.parameter_type();
        let found = match &parameter {
            ModifierParameter::None => None,
            ModifierParameter::Static(value) => Some(value.pin_type()),
            // An unresolved path may become valid later; only a resolved one is checked now.
            ModifierParameter::DataModel(path) => match data_model.and_then(|model| model.type_at(path)) {
                Some(found) => Some(found),
                None => expected.clone(),
            },
        };
        let matches = match (&expected, &found) {
            (None, None) => true,
            (Some(expected), Some(found)) => expected.is_assignable_from(found),
            _ => false,
        };
        if !matches {
            return Err(BindingError::ParameterMismatch {
                modifier: modifier_type.id().to_string(),
                expected,
                found,
            });
        }

        Ok(Self {
            modifier_type,
            parameter,
        })
    }

    /// Modifier type identifier
    pub fn kind(&self) -> &'static str {
        self.modifier_type.id()
    }

    /// Configured parameter
    pub fn parameter(&self) -> &ModifierParameter {
        &self.parameter
    }

    /// Resolve the parameter and transform `value`
    pub fn apply(&self, value: Value, data_model: Option<&dyn DataModel>) -> Value {
        let Some(parameter_type) = self.modifier_type.parameter_type() else {
            return self.modifier_type.apply(value, None);
        };
        let parameter = match &self.parameter {
            ModifierParameter::None => parameter_type.default_value(),
            ModifierParameter::Static(value) => value.clone().cast(&parameter_type),
            ModifierParameter::DataModel(path) => data_model
                .and_then(|model| model.value_at(path))
                .map_or_else(|| parameter_type.default_value(), |value| value.cast(&parameter_type)),
        };
        self.modifier_type.apply(value, Some(&parameter))
    }
}

impl std::fmt::Debug for DataBindingModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBindingModifier")
            .field("kind", &self.kind())
            .field("parameter", &self.parameter)
            .finish()
    }
}

fn float_parameter(parameter: Option<&Value>) -> f32 {
    parameter.and_then(Value::as_float).unwrap_or(0.0)
}

fn map_numeric(value: Value, f: impl FnOnce(f32) -> f32) -> Value {
    match value.as_float() {
        Some(v) => Value::Float(f(v)),
        None => value,
    }
}

fn map_lightness(value: Value, f: impl FnOnce(f32) -> f32) -> Value {
    match value.as_color() {
        Some(color) => {
            let (hue, saturation, lightness) = color.to_hsl();
            Value::Color(Color::from_hsl(hue, saturation, f(lightness).clamp(0.0, 1.0), color.a))
        }
        None => value,
    }
}

/// Multiplies by the parameter
pub struct MultiplyModifier;

impl ModifierType for MultiplyModifier {
    fn id(&self) -> &'static str {
        "multiply"
    }

    fn name(&self) -> &'static str {
        "Multiply"
    }

    fn supports_type(&self, value_type: &PinType) -> bool {
        value_type.is_numeric()
    }

    fn parameter_type(&self) -> Option<PinType> {
        Some(PinType::Float)
    }

    fn apply(&self, value: Value, parameter: Option<&Value>) -> Value {
        let factor = float_parameter(parameter);
        map_numeric(value, |v| v * factor)
    }
}

/// Rounds down
pub struct FloorModifier;

impl ModifierType for FloorModifier {
    fn id(&self) -> &'static str {
        "floor"
    }

    fn name(&self) -> &'static str {
        "Floor"
    }

    fn supports_type(&self, value_type: &PinType) -> bool {
        value_type.is_numeric()
    }

    fn parameter_type(&self) -> Option<PinType> {
        None
    }

    fn apply(&self, value: Value, _parameter: Option<&Value>) -> Value {
        map_numeric(value, f32::floor)
    }
}

/// Expresses the value as a percentage of the parameter; zero when the parameter is zero
pub struct PercentageOfModifier;

impl ModifierType for PercentageOfModifier {
    fn id(&self) -> &'static str {
        "percentage_of"
    }

    fn name(&self) -> &'static str {
        "Percentage of"
    }

    fn supports_type(&self, value_type: &PinType) -> bool {
        value_type.is_numeric()
    }

    fn parameter_type(&self) -> Option<PinType> {
        Some(PinType::Float)
    }

    fn apply(&self, value: Value, parameter: Option<&Value>) -> Value {
        let total = float_parameter(parameter);
        map_numeric(value, |v| if total == 0.0 { 0.0 } else { v / total * 100.0 })
    }
}

/// Raises lightness by the parameter, in percent
pub struct BrightenModifier;

impl ModifierType for BrightenModifier {
    fn id(&self) -> &'static str {
        "brighten"
    }

    fn name(&self) -> &'static str {
        "Brighten"
    }

    fn supports_type(&self, value_type: &PinType) -> bool {
        *value_type == PinType::Color
    }

    fn parameter_type(&self) -> Option<PinType> {
        Some(PinType::Float)
    }

    fn apply(&self, value: Value, parameter: Option<&Value>) -> Value {
        let amount = float_parameter(parameter) / 100.0;
        map_lightness(value, |l| l * (1.0 + amount))
    }
}

/// Lowers lightness by the parameter, in percent
pub struct DarkenModifier;

impl ModifierType for DarkenModifier {
    fn id(&self) -> &'static str {
        "darken"
    }

    fn name(&self) -> &'static str {
        "Darken"
    }

    fn supports_type(&self, value_type: &PinType) -> bool {
        *value_type == PinType::Color
    }

    fn parameter_type(&self) -> Option<PinType> {
        Some(PinType::Float)
    }

    fn apply(&self, value: Value, parameter: Option<&Value>) -> Value {
        let amount = float_parameter(parameter) / 100.0;
        map_lightness(value, |l| l * (1.0 - amount))
    }
}

/// Rotates the hue by the parameter, in degrees
pub struct RotateHueModifier;

impl ModifierType for RotateHueModifier {
    fn id(&self) -> &'static str {
        "rotate_hue"
    }

    fn name(&self) -> &'static str {
        "Rotate hue"
    }

    fn supports_type(&self, value_type: &PinType) -> bool {
        *value_type == PinType::Color
    }

    fn parameter_type(&self) -> Option<PinType> {
        Some(PinType::Float)
    }

    fn apply(&self, value: Value, parameter: Option<&Value>) -> Value {
        let degrees = float_parameter(parameter);
        match value.as_color() {
            Some(color) => {
                let (hue, saturation, lightness) = color.to_hsl();
                Value::Color(Color::from_hsl(
                    (hue + degrees).rem_euclid(360.0),
                    saturation,
                    lightness,
                    color.a,
                ))
            }
            None => value,
        }
    }
}

/// Inverts color channels, alpha is kept
pub struct InvertModifier;

impl ModifierType for InvertModifier {
    fn id(&self) -> &'static str {
        "invert"
    }

    fn name(&self) -> &'static str {
        "Invert"
    }

    fn supports_type(&self, value_type: &PinType) -> bool {
        *value_type == PinType::Color
    }

    fn parameter_type(&self) -> Option<PinType> {
        None
    }

    fn apply(&self, value: Value, _parameter: Option<&Value>) -> Value {
        match value.as_color() {
            Some(c) => Value::Color(Color::rgba(255 - c.r, 255 - c.g, 255 - c.b, c.a)),
            None => value,
        }
    }
}

/// Modifier types by identifier
#[derive(Default)]
pub struct ModifierRegistry {
    types: IndexMap<String, Arc<dyn ModifierType>>,
}

impl ModifierRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in modifier
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MultiplyModifier));
        registry.register(Arc::new(FloorModifier));
        registry.register(Arc::new(PercentageOfModifier));
        registry.register(Arc::new(BrightenModifier));
        registry.register(Arc::new(DarkenModifier));
        registry.register(Arc::new(RotateHueModifier));
        registry.register(Arc::new(InvertModifier));
        registry
    }

    /// Register a modifier type, replacing one with the same identifier
    pub fn register(&mut self, modifier_type: Arc<dyn ModifierType>) {
        self.types.insert(modifier_type.id().to_string(), modifier_type);
    }

    /// Look up a modifier type
    pub fn get(&self, id: &str) -> Option<Arc<dyn ModifierType>> {
        self.types.get(id).cloned()
    }

    /// Modifier types usable on properties of `value_type`
    pub fn types_for<'a>(&'a self, value_type: &'a PinType) -> impl Iterator<Item = &'a Arc<dyn ModifierType>> + 'a {
        self.types.values().filter(move |t| t.supports_type(value_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_graph::JsonDataModel;
    use serde_json::json;

    fn modifier(id: &str, parameter: ModifierParameter, value_type: &PinType) -> Result<DataBindingModifier, BindingError> {
        let registry = ModifierRegistry::with_builtins();
        DataBindingModifier::new(registry.get(id).unwrap(), parameter, value_type, None)
    }

    #[test]
    fn test_numeric_modifiers() {
        let multiply = modifier("multiply", ModifierParameter::Static(Value::Float(2.0)), &PinType::Float).unwrap();
        assert_eq!(multiply.apply(Value::Float(1.5), None), Value::Float(3.0));

        let floor = modifier("floor", ModifierParameter::None, &PinType::Float).unwrap();
        assert_eq!(floor.apply(Value::Float(2.9), None), Value::Float(2.0));

        let percent = modifier("percentage_of", ModifierParameter::Static(Value::Int(200)), &PinType::Float).unwrap();
        assert_eq!(percent.apply(Value::Float(50.0), None), Value::Float(25.0));

        let by_zero = modifier("percentage_of", ModifierParameter::Static(Value::Float(0.0)), &PinType::Float).unwrap();
        assert_eq!(by_zero.apply(Value::Float(50.0), None), Value::Float(0.0));
    }

    #[test]
    fn test_rejected_when_added() {
        let wrong_type = modifier("brighten", ModifierParameter::Static(Value::Float(10.0)), &PinType::Float);
        assert!(matches!(wrong_type, Err(BindingError::UnsupportedModifier { .. })));

        let wrong_parameter = modifier("multiply", ModifierParameter::Static(Value::Bool(true)), &PinType::Float);
        assert!(matches!(wrong_parameter, Err(BindingError::ParameterMismatch { .. })));

        let missing = modifier("multiply", ModifierParameter::None, &PinType::Float);
        assert!(matches!(missing, Err(BindingError::ParameterMismatch { .. })));

        let unexpected = modifier("invert", ModifierParameter::Static(Value::Float(1.0)), &PinType::Color);
        assert!(matches!(unexpected, Err(BindingError::ParameterMismatch { .. })));
    }

    #[test]
    fn test_color_modifiers() {
        let invert = modifier("invert", ModifierParameter::None, &PinType::Color).unwrap();
        assert_eq!(
            invert.apply(Value::Color(Color::rgba(255, 0, 55, 128)), None),
            Value::Color(Color::rgba(0, 255, 200, 128))
        );

        let rotate = modifier("rotate_hue", ModifierParameter::Static(Value::Float(120.0)), &PinType::Color).unwrap();
        let rotated = rotate.apply(Value::Color(Color::rgb(255, 0, 0)), None).as_color().unwrap();
        assert!(rotated.g > 250 && rotated.r < 5 && rotated.b < 5, "{rotated:?}");

        let darken = modifier("darken", ModifierParameter::Static(Value::Float(100.0)), &PinType::Color).unwrap();
        let dark = darken.apply(Value::Color(Color::rgb(200, 100, 50)), None).as_color().unwrap();
        assert_eq!((dark.r, dark.g, dark.b), (0, 0, 0));
    }

    #[test]
    fn test_data_model_parameter() {
        let model = JsonDataModel::new(json!({ "scale": 4.0, "label": "x" }));
        let registry = ModifierRegistry::with_builtins();
        let multiply = registry.get("multiply").unwrap();

        let dynamic = DataBindingModifier::new(
            multiply.clone(),
            ModifierParameter::DataModel("scale".to_string()),
            &PinType::Float,
            Some(&model),
        )
        .unwrap();
        assert_eq!(dynamic.apply(Value::Float(0.5), Some(&model)), Value::Float(2.0));
        // Unresolved paths fall back to the parameter default
        assert_eq!(dynamic.apply(Value::Float(0.5), None), Value::Float(0.0));

        let mismatched = DataBindingModifier::new(
            multiply,
            ModifierParameter::DataModel("label".to_string()),
            &PinType::Float,
            Some(&model),
        );
        assert!(matches!(mismatched, Err(BindingError::ParameterMismatch { .. })));
    }

    #[test]
    fn test_types_for() {
        let registry = ModifierRegistry::with_builtins();
        let color: Vec<_> = registry.types_for(&PinType::Color).map(|t| t.id()).collect();
        assert_eq!(color, vec!["brighten", "darken", "rotate_hue", "invert"]);
    }
}
