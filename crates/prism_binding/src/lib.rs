// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data bindings for Prism.
//!
//! A binding feeds an animated layer property from a node script:
//! - Converters map script results to the property's value type
//! - Modifiers transform the converted value in order
//! - Composition sums with or blends against the property's base value
//! - Easing smooths changes over time
//!
//! A [`ConditionalBinding`] instead applies the value of the first condition script that
//! holds.
//!
//! Properties may take their base value from a keyframe [`Timeline`].

pub mod binding;
pub mod conditional;
pub mod converter;
pub mod easing;
pub mod keyframe;
pub mod modifier;
pub mod property;
pub mod timeline;

pub use binding::{BindingError, BindingModel, Composition, DataBinding, ModifierModel};
pub use conditional::{ConditionModel, ConditionalBinding, ConditionalBindingModel};
pub use converter::{
    converter_for_id, BoolConverter, ColorConverter, DataBindingConverter, FloatConverter, HueConverter, IntConverter,
};
pub use easing::Easing;
pub use keyframe::{Interpolation, Keyframe, KeyframeId};
pub use modifier::{DataBindingModifier, ModifierParameter, ModifierRegistry, ModifierType};
pub use property::{LayerProperty, PropertyGroup, PropertySink};
pub use timeline::Timeline;
