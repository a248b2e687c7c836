// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime values and the pin type system.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color with byte channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Color {
    /// Create a color from all four channels
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to hue (degrees), saturation and lightness (both 0..=1)
    pub fn to_hsl(&self) -> (f32, f32, f32) {
        let r = f32::from(self.r) / 255.0;
        let g = f32::from(self.g) / 255.0;
        let b = f32::from(self.b) / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let lightness = (max + min) / 2.0;

        if (max - min).abs() < f32::EPSILON {
            return (0.0, 0.0, lightness);
        }

        let delta = max - min;
        let saturation = if lightness > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };

        let hue = if max == r {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        (hue * 60.0, saturation, lightness)
    }

    /// Build a color from hue (degrees, wrapped), saturation, lightness and alpha
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32, alpha: u8) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        if s <= f32::EPSILON {
            let v = channel_to_byte(l);
            return Self::rgba(v, v, v, alpha);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        Self::rgba(
            channel_to_byte(hue_to_channel(p, q, h + 1.0 / 3.0)),
            channel_to_byte(hue_to_channel(p, q, h)),
            channel_to_byte(hue_to_channel(p, q, h - 1.0 / 3.0)),
            alpha,
        )
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn channel_to_byte(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// A named, typed field of an object schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field type
    pub field_type: PinType,
}

impl Field {
    /// Create a new field
    pub fn new(name: impl Into<String>, field_type: PinType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered field layout of an object value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Fields in declaration order
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a schema from fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Look up a field type by name
    pub fn field(&self, name: &str) -> Option<&PinType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.field_type)
    }
}

/// Data type that can flow through pins
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// Boolean value
    Bool,
    /// String value
    String,
    /// RGBA color
    Color,
    /// Homogeneous list
    List(Box<PinType>),
    /// Record with a fixed schema
    Object(Schema),
    /// Any type (for polymorphic pins)
    Any,
}

impl PinType {
    /// List of the given element type
    pub fn list_of(element: PinType) -> Self {
        Self::List(Box::new(element))
    }

    /// Whether this is one of the mutually castable numeric types
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// Element type of a list type
    pub fn element_type(&self) -> Option<&PinType> {
        match self {
            Self::List(element) => Some(element),
            _ => None,
        }
    }

    /// Check if a value of `source` type can flow into a pin of this type
    pub fn is_assignable_from(&self, source: &PinType) -> bool {
        if matches!(self, Self::Any) || matches!(source, Self::Any) {
            return true;
        }

        if self == source {
            return true;
        }

        match (self, source) {
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => true,
            (Self::List(target), Self::List(source)) => target.is_assignable_from(source),
            _ => false,
        }
    }

    /// Narrowest type holding values of both `self` and `other`.
    ///
    /// `Int` and `Float` widen to `Float`, lists unify their elements and objects merge
    /// their schemas field by field. Any other mismatch yields `Any`.
    pub fn unify(&self, other: &PinType) -> PinType {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => Self::Float,
            (Self::List(a), Self::List(b)) => Self::list_of(a.unify(b)),
            (Self::Object(a), Self::Object(b)) => {
                let mut fields = a.fields.clone();
                for field in &b.fields {
                    match fields.iter_mut().find(|f| f.name == field.name) {
                        Some(existing) => {
                            existing.field_type = existing.field_type.unify(&field.field_type);
                        }
                        None => fields.push(field.clone()),
                    }
                }
                Self::Object(Schema::new(fields))
            }
            _ => Self::Any,
        }
    }

    /// The neutral value of this type
    pub fn default_value(&self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Bool => Value::Bool(false),
            Self::String => Value::String(String::new()),
            Self::Color => Value::Color(Color::default()),
            Self::List(_) => Value::List(Vec::new()),
            Self::Object(schema) => Value::Object(
                schema
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.field_type.default_value()))
                    .collect(),
            ),
            Self::Any => Value::Empty,
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "Int"),
            Self::Float => write!(f, "Float"),
            Self::Bool => write!(f, "Bool"),
            Self::String => write!(f, "String"),
            Self::Color => write!(f, "Color"),
            Self::List(element) => write!(f, "List<{element}>"),
            Self::Object(schema) => {
                write!(f, "Object{{")?;
                for (i, field) in schema.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.field_type)?;
                }
                write!(f, "}}")
            }
            Self::Any => write!(f, "Any"),
        }
    }
}

/// Value that can be stored in a pin
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// No value (default of `Any`)
    #[default]
    Empty,
    /// Integer
    Int(i64),
    /// Float
    Float(f32),
    /// Boolean
    Bool(bool),
    /// String
    String(String),
    /// Color
    Color(Color),
    /// List of values
    List(Vec<Value>),
    /// Named fields
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Get the pin type for this value.
    ///
    /// A list's element type covers every element (see [`PinType::unify`]); empty lists are
    /// `List<Any>`.
    pub fn pin_type(&self) -> PinType {
        match self {
            Self::Empty => PinType::Any,
            Self::Int(_) => PinType::Int,
            Self::Float(_) => PinType::Float,
            Self::Bool(_) => PinType::Bool,
            Self::String(_) => PinType::String,
            Self::Color(_) => PinType::Color,
            Self::List(items) => {
                let element = items
                    .iter()
                    .map(Value::pin_type)
                    .reduce(|a, b| a.unify(&b))
                    .unwrap_or(PinType::Any);
                PinType::list_of(element)
            }
            Self::Object(fields) => PinType::Object(Schema::new(
                fields
                    .iter()
                    .map(|(name, value)| Field::new(name.clone(), value.pin_type()))
                    .collect(),
            )),
        }
    }

    /// Convert this value so it fits a pin of `target` type.
    ///
    /// Numeric values cast between `Int` and `Float`; anything else that does not fit
    /// becomes the target type's default.
    pub fn cast(self, target: &PinType) -> Value {
        match (target, self) {
            (PinType::Any, value) => value,
            (PinType::Int, Value::Int(v)) => Value::Int(v),
            (PinType::Int, Value::Float(v)) => Value::Int(v.round() as i64),
            (PinType::Float, Value::Float(v)) => Value::Float(v),
            (PinType::Float, Value::Int(v)) => Value::Float(v as f32),
            (PinType::Bool, Value::Bool(v)) => Value::Bool(v),
            (PinType::String, Value::String(v)) => Value::String(v),
            (PinType::Color, Value::Color(v)) => Value::Color(v),
            (PinType::List(element), Value::List(items)) => {
                Value::List(items.into_iter().map(|item| item.cast(element)).collect())
            }
            (PinType::Object(schema), Value::Object(mut fields)) => Value::Object(
                schema
                    .fields
                    .iter()
                    .map(|field| {
                        let value = fields
                            .swap_remove(&field.name)
                            .map_or_else(|| field.field_type.default_value(), |v| {
                                v.cast(&field.field_type)
                            });
                        (field.name.clone(), value)
                    })
                    .collect(),
            ),
            (target, _) => target.default_value(),
        }
    }

    /// Numeric view (integers widen to float)
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Integer view (floats round)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(v.round() as i64),
            _ => None,
        }
    }

    /// Get as bool if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string slice if possible
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get as color if possible
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as list if possible
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get a field of an object value
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Build a value from a JSON tree.
    ///
    /// Whole JSON numbers become `Int`, everything else numeric becomes `Float`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Empty,
            serde_json::Value::Bool(v) => Value::Bool(*v),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(v) => Value::Int(v),
                None => Value::Float(n.as_f64().unwrap_or_default() as f32),
            },
            serde_json::Value::String(v) => Value::String(v.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Convert into a JSON tree
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::Value::Null,
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Value::from(f64::from(*v)),
            Self::Bool(v) => serde_json::Value::Bool(*v),
            Self::String(v) => serde_json::Value::String(v.clone()),
            Self::Color(c) => serde_json::json!({ "r": c.r, "g": c.g, "b": c.b, "a": c.a }),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Self::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Self::Color(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_types_are_castable() {
        assert!(PinType::Float.is_assignable_from(&PinType::Int));
        assert!(PinType::Int.is_assignable_from(&PinType::Float));
        assert!(!PinType::Bool.is_assignable_from(&PinType::Float));
        assert!(PinType::Any.is_assignable_from(&PinType::Color));
        assert!(PinType::list_of(PinType::Any).is_assignable_from(&PinType::list_of(PinType::Float)));
        assert!(!PinType::list_of(PinType::Bool).is_assignable_from(&PinType::list_of(PinType::Float)));
    }

    #[test]
    fn test_cast() {
        assert_eq!(Value::Int(3).cast(&PinType::Float), Value::Float(3.0));
        assert_eq!(Value::Float(2.6).cast(&PinType::Int), Value::Int(3));
        assert_eq!(Value::Bool(true).cast(&PinType::Float), Value::Float(0.0));
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::Int(2)]).cast(&PinType::list_of(PinType::Float)),
            Value::List(vec![Value::Float(1.0), Value::Float(2.0)])
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PinType::Float.default_value(), Value::Float(0.0));
        assert_eq!(PinType::Bool.default_value(), Value::Bool(false));
        assert_eq!(PinType::String.default_value(), Value::String(String::new()));
        assert_eq!(PinType::Any.default_value(), Value::Empty);
    }

    #[test]
    fn test_json_object_schema() {
        let json = serde_json::json!([{ "load": 42.5, "name": "core0" }]);
        let value = Value::from_json(&json);
        let expected = PinType::list_of(PinType::Object(Schema::new(vec![
            Field::new("load", PinType::Float),
            Field::new("name", PinType::String),
        ])));
        assert_eq!(value.pin_type(), expected);
    }

    #[test]
    fn test_list_element_type_covers_all_items() {
        let mixed = Value::from_json(&serde_json::json!([1, 2.4]));
        assert_eq!(mixed.pin_type(), PinType::list_of(PinType::Float));

        let objects = Value::from_json(&serde_json::json!([{ "load": 1 }, { "load": 0.5, "name": "gpu" }]));
        let expected = PinType::list_of(PinType::Object(Schema::new(vec![
            Field::new("load", PinType::Float),
            Field::new("name", PinType::String),
        ])));
        assert_eq!(objects.pin_type(), expected);

        let unrelated = Value::from_json(&serde_json::json!([1, "a"]));
        assert_eq!(unrelated.pin_type(), PinType::list_of(PinType::Any));
        assert_eq!(Value::List(Vec::new()).pin_type(), PinType::list_of(PinType::Any));
    }

    #[test]
    fn test_hsl_round_trip() {
        let color = Color::rgb(200, 40, 90);
        let (h, s, l) = color.to_hsl();
        let back = Color::from_hsl(h, s, l, 255);
        assert!((i16::from(back.r) - 200).abs() <= 1);
        assert!((i16::from(back.g) - 40).abs() <= 1);
        assert!((i16::from(back.b) - 90).abs() <= 1);
    }
}
