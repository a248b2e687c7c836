// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for property timelines.

use crate::easing::Easing;
use prism_graph::{Color, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframeId(pub Uuid);

impl KeyframeId {
    /// Create a new random keyframe ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KeyframeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A keyframe on a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Unique keyframe ID
    pub id: KeyframeId,
    /// Time in seconds
    pub time: f32,
    /// Value at this keyframe
    pub value: Value,
    /// Easing towards the next keyframe
    pub easing: Easing,
}

impl Keyframe {
    /// Create a new keyframe with linear easing
    pub fn new(time: f32, value: Value) -> Self {
        Self {
            id: KeyframeId::new(),
            time,
            value,
            easing: Easing::Linear,
        }
    }

    /// Set the easing towards the next keyframe
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// Interpolation utilities
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two floats
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Per-channel interpolation, rounded and clamped to byte range
    pub fn lerp_color(a: Color, b: Color, t: f32) -> Color {
        let channel = |a: u8, b: u8| Self::lerp(f32::from(a), f32::from(b), t).round().clamp(0.0, 255.0) as u8;
        Color::rgba(
            channel(a.r, b.r),
            channel(a.g, b.g),
            channel(a.b, b.b),
            channel(a.a, b.a),
        )
    }

    /// Interpolation of angles in degrees along the shorter arc, wrapped to `[0, 360)`
    pub fn lerp_hue(a: f32, b: f32, t: f32) -> f32 {
        let delta = (b - a + 180.0).rem_euclid(360.0) - 180.0;
        (a + delta * t).rem_euclid(360.0)
    }

    /// Interpolate two values of the same kind; anything not interpolatable steps at `t = 1`
    pub fn lerp_value(a: &Value, b: &Value, t: f32) -> Value {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => {
                Value::Int(Self::lerp(*x as f32, *y as f32, t).round() as i64)
            }
            (Value::Color(x), Value::Color(y)) => Value::Color(Self::lerp_color(*x, *y, t)),
            (x, y) => match (x.as_float(), y.as_float()) {
                (Some(x), Some(y)) => Value::Float(Self::lerp(x, y, t)),
                _ if t >= 1.0 => b.clone(),
                _ => a.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hue_takes_shorter_arc() {
        assert!((Interpolation::lerp_hue(350.0, 10.0, 0.5) - 0.0).abs() < 1e-4);
        assert!((Interpolation::lerp_hue(10.0, 350.0, 0.25) - 5.0).abs() < 1e-4);
        assert!((Interpolation::lerp_hue(0.0, 90.0, 0.5) - 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_lerp_value() {
        assert_eq!(Interpolation::lerp_value(&Value::Float(0.0), &Value::Float(10.0), 0.5), Value::Float(5.0));
        assert_eq!(Interpolation::lerp_value(&Value::Int(0), &Value::Int(3), 0.5), Value::Int(2));
        assert_eq!(
            Interpolation::lerp_value(&Value::Bool(false), &Value::Bool(true), 0.5),
            Value::Bool(false)
        );
        assert_eq!(
            Interpolation::lerp_value(&Value::Color(Color::rgb(0, 0, 0)), &Value::Color(Color::rgb(255, 100, 0)), 0.5),
            Value::Color(Color::rgb(128, 50, 0))
        );
    }
}
