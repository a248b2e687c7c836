// SPDX-License-Identifier: MIT OR Apache-2.0
//! Access to the layer properties a script runs next to.

use crate::value::{PinType, Value};

/// Animatable properties of the element a script belongs to, addressed by name
pub trait PropertySource: Send + Sync {
    /// Names of the available properties in display order
    fn property_names(&self) -> Vec<String>;

    /// Type of a property's values
    fn property_type(&self, name: &str) -> Option<PinType>;

    /// Current value of a property
    fn property_value(&self, name: &str) -> Option<Value>;
}
