// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing curves for keyframes and binding transitions.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Easing function type
pub type EaseFn = fn(f32) -> f32;

/// Standard easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    /// Holds the start value until the end
    Step,
    /// No easing
    #[default]
    Linear,
    /// Quadratic ease in
    QuadIn,
    /// Quadratic ease out
    QuadOut,
    /// Quadratic ease in-out
    QuadInOut,
    /// Cubic ease in
    CubicIn,
    /// Cubic ease out
    CubicOut,
    /// Cubic ease in-out
    CubicInOut,
    /// Sine ease in
    SineIn,
    /// Sine ease out
    SineOut,
    /// Sine ease in-out
    SineInOut,
    /// Bounce ease out
    BounceOut,
}

impl Easing {
    /// Evaluate the curve; `t` is clamped to `[0, 1]`
    pub fn ease(self, t: f32) -> f32 {
        self.as_fn()(t.clamp(0.0, 1.0))
    }

    /// Corresponding function pointer
    pub fn as_fn(self) -> EaseFn {
        match self {
            Self::Step => step,
            Self::Linear => linear,
            Self::QuadIn => quad_in,
            Self::QuadOut => quad_out,
            Self::QuadInOut => quad_in_out,
            Self::CubicIn => cubic_in,
            Self::CubicOut => cubic_out,
            Self::CubicInOut => cubic_in_out,
            Self::SineIn => sine_in,
            Self::SineOut => sine_out,
            Self::SineInOut => sine_in_out,
            Self::BounceOut => bounce_out,
        }
    }
}

/// Jump at the end
#[inline]
pub fn step(t: f32) -> f32 {
    t.floor()
}

/// No easing
#[inline]
pub fn linear(t: f32) -> f32 {
    t
}

/// Quadratic ease in
#[inline]
pub fn quad_in(t: f32) -> f32 {
    t * t
}

/// Quadratic ease out
#[inline]
pub fn quad_out(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease in-out
#[inline]
pub fn quad_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cubic ease in
#[inline]
pub fn cubic_in(t: f32) -> f32 {
    t * t * t
}

/// Cubic ease out
#[inline]
pub fn cubic_out(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Cubic ease in-out
#[inline]
pub fn cubic_in_out(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Sine ease in
#[inline]
pub fn sine_in(t: f32) -> f32 {
    1.0 - (t * PI / 2.0).cos()
}

/// Sine ease out
#[inline]
pub fn sine_out(t: f32) -> f32 {
    (t * PI / 2.0).sin()
}

/// Sine ease in-out
#[inline]
pub fn sine_in_out(t: f32) -> f32 {
    -((PI * t).cos() - 1.0) / 2.0
}

/// Bounce ease out
pub fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 12] = [
        Easing::Step,
        Easing::Linear,
        Easing::QuadIn,
        Easing::QuadOut,
        Easing::QuadInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
        Easing::SineIn,
        Easing::SineOut,
        Easing::SineInOut,
        Easing::BounceOut,
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(easing.ease(0.0).abs() < 1e-5, "{easing:?} at 0");
            assert!((easing.ease(1.0) - 1.0).abs() < 1e-5, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_input_is_clamped() {
        assert_eq!(Easing::Linear.ease(-2.0), 0.0);
        assert_eq!(Easing::Linear.ease(3.0), 1.0);
        assert_eq!(Easing::Step.ease(0.99), 0.0);
    }
}
