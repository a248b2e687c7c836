// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bindings that pick a fixed value by condition.
//!
//! Each condition is a script with a `Bool` result paired with the value to apply. The
//! first condition whose script yields `true` wins; when none does, the property falls
//! back to its base value.

use crate::binding::BindingError;
use crate::property::PropertySink;
use parking_lot::RwLock;
use prism_graph::{
    Evaluable, EvaluationError, LoadReport, NodeRegistry, NodeScript, PinType, ScriptContext, ScriptModel, Value,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

struct Condition {
    script: Arc<NodeScript>,
    value: Value,
}

/// Applies the value of the first matching condition to a property
pub struct ConditionalBinding {
    target: Arc<dyn PropertySink>,
    conditions: RwLock<Vec<Condition>>,
}

impl ConditionalBinding {
    /// Create a binding without conditions
    pub fn new(target: Arc<dyn PropertySink>) -> Self {
        Self {
            target,
            conditions: RwLock::new(Vec::new()),
        }
    }

    /// Property this binding writes
    pub fn target(&self) -> &Arc<dyn PropertySink> {
        &self.target
    }

    /// Append a condition, returning its index.
    ///
    /// The value is cast to the property's type.
    pub fn add_condition(&self, script: Arc<NodeScript>, value: Value) -> Result<usize, BindingError> {
        if script.result_type() != &PinType::Bool {
            return Err(BindingError::ConditionResult(script.result_type().clone()));
        }
        let value = value.cast(&self.target.value_type());
        let mut conditions = self.conditions.write();
        conditions.push(Condition { script, value });
        Ok(conditions.len() - 1)
    }

    /// Remove the condition at `index`
    pub fn remove_condition(&self, index: usize) -> Result<(), BindingError> {
        let mut conditions = self.conditions.write();
        if index >= conditions.len() {
            return Err(BindingError::ConditionIndex(index));
        }
        conditions.remove(index);
        Ok(())
    }

    /// Move a condition to a new position, changing its priority
    pub fn move_condition(&self, from: usize, to: usize) -> Result<(), BindingError> {
        let mut conditions = self.conditions.write();
        let len = conditions.len();
        if from >= len {
            return Err(BindingError::ConditionIndex(from));
        }
        if to >= len {
            return Err(BindingError::ConditionIndex(to));
        }
        let condition = conditions.remove(from);
        conditions.insert(to, condition);
        Ok(())
    }

    /// Number of conditions
    pub fn condition_count(&self) -> usize {
        self.conditions.read().len()
    }

    /// Script of the condition at `index`
    pub fn condition_script(&self, index: usize) -> Option<Arc<NodeScript>> {
        self.conditions
            .read()
            .get(index)
            .map(|c| c.script.clone())
    }

    /// Run the conditions in order and apply the winning value.
    ///
    /// A faulting condition counts as `false`; the first fault is returned after the
    /// property is updated.
    pub fn update(&self) -> Result<Value, EvaluationError> {
        let mut fault = None;
        let matched = self.conditions.read().iter().find_map(|condition| {
            match condition.script.try_run() {
                Ok(result) if result.as_bool() == Some(true) => Some(condition.value.clone()),
                Ok(_) => None,
                Err(error) => {
                    if fault.is_none() {
                        fault = Some(error);
                    }
                    None
                }
            }
        });

        let value = matched.unwrap_or_else(|| self.target.base_value());
        self.target.apply_value(value.clone());
        match fault {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }

    /// Capture the conditions and their scripts
    pub fn to_model(&self) -> ConditionalBindingModel {
        ConditionalBindingModel {
            conditions: self
                .conditions
                .read()
                .iter()
                .map(|c| ConditionModel {
                    script: c.script.to_model(),
                    value: c.value.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a binding for `target`; load reports are returned per condition
    pub fn from_model(
        model: &ConditionalBindingModel,
        target: Arc<dyn PropertySink>,
        nodes: &NodeRegistry,
        context: ScriptContext,
    ) -> Result<(Self, Vec<LoadReport>), BindingError> {
        let binding = Self::new(target);
        let mut reports = Vec::with_capacity(model.conditions.len());
        for saved in &model.conditions {
            let (script, report) = NodeScript::from_model(&saved.script, nodes, context.clone());
            binding.add_condition(Arc::new(script), saved.value.clone())?;
            reports.push(report);
        }
        Ok((binding, reports))
    }
}

impl Evaluable for ConditionalBinding {
    fn label(&self) -> &str {
        self.target.name()
    }

    fn tick(&self, _delta: Duration) -> Result<(), EvaluationError> {
        self.update().map(|_| ())
    }
}

impl std::fmt::Debug for ConditionalBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalBinding")
            .field("property", &self.target.name())
            .field("conditions", &self.condition_count())
            .finish()
    }
}

/// Serialized form of one condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionModel {
    /// Script deciding whether the condition holds
    pub script: ScriptModel,
    /// Value applied while it holds
    pub value: Value,
}

/// Serialized form of a conditional binding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBindingModel {
    /// Conditions in priority order
    #[serde(default)]
    pub conditions: Vec<ConditionModel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::LayerProperty;
    use prism_graph::nodes::literal::StaticValueNode;
    use prism_graph::JsonDataModel;
    use serde_json::json;

    fn flag_script(registry: &NodeRegistry, model: &Arc<JsonDataModel>, path: &str) -> Arc<NodeScript> {
        let script = NodeScript::new(path, PinType::Bool);
        script.set_context(ScriptContext::with_data_model(model.clone()));
        let node = script.add_node(registry.create_node("data_model.value").unwrap()).unwrap();
        script
            .set_storage(node, json!({ "path": path }), registry)
            .unwrap();
        let exit = script.exit_node().unwrap();
        script
            .connect(node, script.pin_named(node, "Value").unwrap(), exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();
        Arc::new(script)
    }

    fn constant_bool(value: bool) -> Arc<NodeScript> {
        let script = NodeScript::new("Flag", PinType::Bool);
        let node = script.add_node(StaticValueNode::node(Value::Bool(value))).unwrap();
        let exit = script.exit_node().unwrap();
        script
            .connect(node, script.pin_named(node, "Value").unwrap(), exit, script.pin_named(exit, "Result").unwrap())
            .unwrap();
        Arc::new(script)
    }

    #[test]
    fn test_first_matching_condition_wins() {
        let registry = NodeRegistry::with_builtins();
        let model = Arc::new(JsonDataModel::new(json!({ "muted": false, "recording": false })));
        let property = Arc::new(LayerProperty::new("Brightness", Value::Float(0.2)));
        let binding = ConditionalBinding::new(property.clone());
        binding
            .add_condition(flag_script(&registry, &model, "recording"), Value::Float(1.0))
            .unwrap();
        binding
            .add_condition(flag_script(&registry, &model, "muted"), Value::Int(0))
            .unwrap();

        assert_eq!(binding.update().unwrap(), Value::Float(0.2));

        model.set("muted", json!(true));
        binding.update().unwrap();
        assert_eq!(property.value(), Value::Float(0.0));

        model.set("recording", json!(true));
        binding.update().unwrap();
        assert_eq!(property.value(), Value::Float(1.0));

        binding.move_condition(1, 0).unwrap();
        binding.update().unwrap();
        assert_eq!(property.value(), Value::Float(0.0));
        assert_eq!(binding.label(), "Brightness");
    }

    #[test]
    fn test_rejects_non_bool_conditions() {
        let property = Arc::new(LayerProperty::new("Brightness", Value::Float(0.2)));
        let binding = ConditionalBinding::new(property);
        let script = Arc::new(NodeScript::new("Level", PinType::Float));
        assert_eq!(
            binding.add_condition(script, Value::Float(1.0)),
            Err(BindingError::ConditionResult(PinType::Float))
        );
        assert_eq!(binding.remove_condition(0), Err(BindingError::ConditionIndex(0)));
    }

    #[test]
    fn test_model_round_trip() {
        let registry = NodeRegistry::with_builtins();
        let property = Arc::new(LayerProperty::new("Visible", Value::Bool(true)));
        let binding = ConditionalBinding::new(property.clone());
        binding.add_condition(constant_bool(true), Value::Bool(false)).unwrap();

        let model = binding.to_model();
        let json = serde_json::to_string(&model).unwrap();
        let parsed: ConditionalBindingModel = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, model);

        let (loaded, reports) =
            ConditionalBinding::from_model(&parsed, property.clone(), &registry, ScriptContext::default()).unwrap();
        assert!(reports.iter().all(LoadReport::is_complete));
        loaded.update().unwrap();
        assert_eq!(property.value(), Value::Bool(false));
    }
}
