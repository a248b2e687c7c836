// SPDX-License-Identifier: MIT OR Apache-2.0
//! Converters from script results to property values.
//!
//! A converter fixes the value type of the property it feeds and decides how two values of
//! that type are summed or interpolated. Interpolation progress is always clamped to
//! `[0, 1]`.

use crate::keyframe::Interpolation;
use prism_graph::{Color, PinType, Value};
use std::sync::Arc;

/// Maps script results onto one property value type
pub trait DataBindingConverter: Send + Sync {
    /// Stable identifier used in binding documents
    fn id(&self) -> &'static str;

    /// Value type this converter produces
    fn value_type(&self) -> PinType;

    /// Whether a script result of `result_type` can be converted
    fn accepts(&self, result_type: &PinType) -> bool {
        self.value_type().is_assignable_from(result_type)
    }

    /// Convert a script result into a property value
    fn convert(&self, value: &Value) -> Value {
        value.clone().cast(&self.value_type())
    }

    /// Whether [`DataBindingConverter::sum`] is meaningful
    fn supports_sum(&self) -> bool;

    /// Whether [`DataBindingConverter::interpolate`] is meaningful
    fn supports_interpolate(&self) -> bool;

    /// Combine two values
    fn sum(&self, a: &Value, b: &Value) -> Value;

    /// Blend from `a` to `b`
    fn interpolate(&self, a: &Value, b: &Value, progress: f32) -> Value;
}

fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Float properties
#[derive(Debug, Default, Clone, Copy)]
pub struct FloatConverter;

impl DataBindingConverter for FloatConverter {
    fn id(&self) -> &'static str {
        "float"
    }

    fn value_type(&self) -> PinType {
        PinType::Float
    }

    fn supports_sum(&self) -> bool {
        true
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    fn sum(&self, a: &Value, b: &Value) -> Value {
        Value::Float(a.as_float().unwrap_or(0.0) + b.as_float().unwrap_or(0.0))
    }

    fn interpolate(&self, a: &Value, b: &Value, progress: f32) -> Value {
        let (a, b) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
        Value::Float(Interpolation::lerp(a, b, clamp_progress(progress)))
    }
}

/// Integer properties, interpolated values round to the nearest integer
#[derive(Debug, Default, Clone, Copy)]
pub struct IntConverter;

impl DataBindingConverter for IntConverter {
    fn id(&self) -> &'static str {
        "int"
    }

    fn value_type(&self) -> PinType {
        PinType::Int
    }

    fn supports_sum(&self) -> bool {
        true
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    fn sum(&self, a: &Value, b: &Value) -> Value {
        Value::Int(a.as_int().unwrap_or(0).saturating_add(b.as_int().unwrap_or(0)))
    }

    fn interpolate(&self, a: &Value, b: &Value, progress: f32) -> Value {
        let (a, b) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
        Value::Int(Interpolation::lerp(a, b, clamp_progress(progress)).round() as i64)
    }
}

/// Boolean properties.
///
/// Booleans cannot be summed or blended; interpolation holds `a` until progress reaches 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolConverter;

impl DataBindingConverter for BoolConverter {
    fn id(&self) -> &'static str {
        "bool"
    }

    fn value_type(&self) -> PinType {
        PinType::Bool
    }

    fn supports_sum(&self) -> bool {
        false
    }

    fn supports_interpolate(&self) -> bool {
        false
    }

    fn sum(&self, _a: &Value, b: &Value) -> Value {
        b.clone()
    }

    fn interpolate(&self, a: &Value, b: &Value, progress: f32) -> Value {
        if clamp_progress(progress) >= 1.0 {
            b.clone()
        } else {
            a.clone()
        }
    }
}

/// Color properties, channels clamp to 0..=255
#[derive(Debug, Default, Clone, Copy)]
pub struct ColorConverter;

impl DataBindingConverter for ColorConverter {
    fn id(&self) -> &'static str {
        "color"
    }

    fn value_type(&self) -> PinType {
        PinType::Color
    }

    fn supports_sum(&self) -> bool {
        true
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    fn sum(&self, a: &Value, b: &Value) -> Value {
        let (a, b) = (a.as_color().unwrap_or_default(), b.as_color().unwrap_or_default());
        Value::Color(Color::rgba(
            a.r.saturating_add(b.r),
            a.g.saturating_add(b.g),
            a.b.saturating_add(b.b),
            a.a.saturating_add(b.a),
        ))
    }

    fn interpolate(&self, a: &Value, b: &Value, progress: f32) -> Value {
        let (a, b) = (a.as_color().unwrap_or_default(), b.as_color().unwrap_or_default());
        Value::Color(Interpolation::lerp_color(a, b, clamp_progress(progress)))
    }
}

/// Hue angles in degrees, kept in `[0, 360)`
#[derive(Debug, Default, Clone, Copy)]
pub struct HueConverter;

impl DataBindingConverter for HueConverter {
    fn id(&self) -> &'static str {
        "hue"
    }

    fn value_type(&self) -> PinType {
        PinType::Float
    }

    fn convert(&self, value: &Value) -> Value {
        Value::Float(value.as_float().unwrap_or(0.0).rem_euclid(360.0))
    }

    fn supports_sum(&self) -> bool {
        true
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    fn sum(&self, a: &Value, b: &Value) -> Value {
        Value::Float((a.as_float().unwrap_or(0.0) + b.as_float().unwrap_or(0.0)).rem_euclid(360.0))
    }

    fn interpolate(&self, a: &Value, b: &Value, progress: f32) -> Value {
        let (a, b) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
        Value::Float(Interpolation::lerp_hue(a, b, clamp_progress(progress)))
    }
}

/// Look up a built-in converter by its identifier
pub fn converter_for_id(id: &str) -> Option<Arc<dyn DataBindingConverter>> {
    let converter: Arc<dyn DataBindingConverter> = match id {
        "float" => Arc::new(FloatConverter),
        "int" => Arc::new(IntConverter),
        "bool" => Arc::new(BoolConverter),
        "color" => Arc::new(ColorConverter),
        "hue" => Arc::new(HueConverter),
        _ => return None,
    };
    Some(converter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_interpolation_clamps_progress() {
        let c = FloatConverter;
        assert_eq!(c.interpolate(&Value::Float(0.0), &Value::Float(10.0), 0.5), Value::Float(5.0));
        assert_eq!(c.interpolate(&Value::Float(0.0), &Value::Float(10.0), 1.5), Value::Float(10.0));
        assert_eq!(c.interpolate(&Value::Float(0.0), &Value::Float(10.0), -1.0), Value::Float(0.0));
        assert_eq!(c.interpolate(&Value::Float(0.0), &Value::Float(10.0), f32::NAN), Value::Float(0.0));
    }

    #[test]
    fn test_int_converter() {
        let c = IntConverter;
        assert_eq!(c.convert(&Value::Float(2.7)), Value::Int(3));
        assert_eq!(c.sum(&Value::Int(2), &Value::Int(3)), Value::Int(5));
        assert_eq!(c.interpolate(&Value::Int(0), &Value::Int(10), 0.25), Value::Int(3));
    }

    #[test]
    fn test_color_channels_clamp() {
        let c = ColorConverter;
        let sum = c.sum(
            &Value::Color(Color::rgba(200, 10, 0, 255)),
            &Value::Color(Color::rgba(100, 20, 0, 0)),
        );
        assert_eq!(sum, Value::Color(Color::rgba(255, 30, 0, 255)));

        let mid = c.interpolate(
            &Value::Color(Color::rgb(0, 0, 0)),
            &Value::Color(Color::rgb(255, 255, 255)),
            2.0,
        );
        assert_eq!(mid, Value::Color(Color::rgb(255, 255, 255)));
    }

    #[test]
    fn test_hue_wraps() {
        let c = HueConverter;
        assert_eq!(c.convert(&Value::Float(370.0)), Value::Float(10.0));
        assert_eq!(c.sum(&Value::Float(300.0), &Value::Float(90.0)), Value::Float(30.0));
        assert_eq!(c.interpolate(&Value::Float(340.0), &Value::Float(20.0), 0.5), Value::Float(0.0));
    }

    #[test]
    fn test_bool_steps_and_lookup() {
        let c = BoolConverter;
        assert!(!c.supports_sum());
        assert_eq!(c.interpolate(&Value::Bool(false), &Value::Bool(true), 0.9), Value::Bool(false));
        assert_eq!(c.interpolate(&Value::Bool(false), &Value::Bool(true), 1.0), Value::Bool(true));

        assert_eq!(converter_for_id("hue").unwrap().id(), "hue");
        assert!(converter_for_id("vector").is_none());
    }

    #[test]
    fn test_accepts_assignable_results() {
        assert!(FloatConverter.accepts(&PinType::Int));
        assert!(!ColorConverter.accepts(&PinType::Float));
    }
}
