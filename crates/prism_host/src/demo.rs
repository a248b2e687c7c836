// SPDX-License-Identifier: MIT OR Apache-2.0
//! Demo profile: a simulated system monitor driving four layer properties.
//!
//! | property | script                                 | binding                          |
//! |----------|----------------------------------------|----------------------------------|
//! | Opacity  | `audio.level`                          | float, eased, clamped to `0..=1` |
//! | Hue      | `cpu.load`                             | hue, `* 360`, summed onto keyframes |
//! | Tint     | constant color                         | color, brightened by `audio.boost` |
//! | Alert    | any of `cpu.cores` has `load > 90`     | bool                             |

use prism_binding::{
    BindingError, BoolConverter, ColorConverter, Composition, DataBinding, Easing, FloatConverter, HueConverter,
    Keyframe, LayerProperty, ModifierParameter, ModifierRegistry, PropertySink, Timeline,
};
use prism_graph::nodes::list::ITEM_KIND;
use prism_graph::nodes::literal::StaticValueNode;
use prism_graph::{
    Color, EditError, EvaluationDriver, JsonDataModel, NodeId, NodeRegistry, NodeScript, PinType, ScriptContext, Value,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Error building the demo profile
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// A script edit was rejected
    #[error(transparent)]
    Edit(#[from] EditError),

    /// A binding was rejected
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Node kind missing from the registry
    #[error("Unknown node kind: {0}")]
    UnknownKind(&'static str),

    /// Node has no pin with this name
    #[error("Node {node} has no pin named {pin}")]
    MissingPin {
        /// Node searched
        node: NodeId,
        /// Pin name
        pin: String,
    },
}

fn create(script: &NodeScript, registry: &NodeRegistry, kind: &'static str) -> Result<NodeId, DemoError> {
    let node = registry.create_node(kind).ok_or(DemoError::UnknownKind(kind))?;
    Ok(script.add_node(node)?)
}

fn connect(script: &NodeScript, from: NodeId, from_pin: &str, to: NodeId, to_pin: &str) -> Result<(), DemoError> {
    let pin = |node: NodeId, name: &str| {
        script.pin_named(node, name).ok_or_else(|| DemoError::MissingPin {
            node,
            pin: name.to_string(),
        })
    };
    script.connect(from, pin(from, from_pin)?, to, pin(to, to_pin)?)?;
    Ok(())
}

fn exit_node(script: &NodeScript) -> Result<NodeId, DemoError> {
    script.exit_node().ok_or(DemoError::UnknownKind("exit"))
}

/// Sensor readings at `time` seconds
fn sensors(time: f32) -> serde_json::Value {
    let cores: Vec<serde_json::Value> = (0..4)
        .map(|i| json!({ "load": (55.0 + 44.0 * (time * 0.8 + i as f32).sin()).round() as i64 }))
        .collect();
    json!({
        "audio": {
            "level": 0.5 + 0.5 * (time * 2.0).sin(),
            "boost": 25.0 * (1.0 + time.sin()),
        },
        "cpu": {
            "load": 0.5 + 0.4 * (time * 0.7).sin(),
            "cores": cores,
        },
    })
}

/// Data model, properties and bindings of the demo
pub struct Demo {
    data_model: Arc<JsonDataModel>,
    registry: NodeRegistry,
    opacity: Arc<LayerProperty>,
    hue: Arc<LayerProperty>,
    tint: Arc<LayerProperty>,
    alert: Arc<LayerProperty>,
    bindings: Vec<Arc<DataBinding>>,
    level_script: Arc<NodeScript>,
    level_node: NodeId,
}

impl Demo {
    /// Build scripts and bindings against a freshly sampled data model
    pub fn build() -> Result<Self, DemoError> {
        let registry = NodeRegistry::with_builtins();
        let modifiers = ModifierRegistry::with_builtins();
        let data_model = Arc::new(JsonDataModel::new(sensors(0.0)));
        let context = ScriptContext::with_data_model(data_model.clone());

        let path_script = |name: &str, result_type: PinType, path: &str| -> Result<(Arc<NodeScript>, NodeId), DemoError> {
            let script = NodeScript::new(name, result_type);
            script.set_context(context.clone());
            let node = create(&script, &registry, "data_model.value")?;
            script.set_storage(node, json!({ "path": path }), &registry)?;
            connect(&script, node, "Value", exit_node(&script)?, "Result")?;
            Ok((Arc::new(script), node))
        };

        let opacity = Arc::new(LayerProperty::new("Opacity", Value::Float(1.0)).with_range(Some(0.0), Some(1.0)));
        let (level_script, level_node) = path_script("Audio level", PinType::Float, "audio.level")?;
        let opacity_binding = DataBinding::new(opacity.clone(), level_script.clone(), Arc::new(FloatConverter))?;
        opacity_binding.set_easing(Easing::SineInOut, Duration::from_millis(200))?;

        let mut keyframes = Timeline::new();
        keyframes.add_keyframe(Keyframe::new(0.0, Value::Float(0.0)));
        keyframes.add_keyframe(Keyframe::new(5.0, Value::Float(120.0)).with_easing(Easing::QuadInOut));
        let hue = Arc::new(LayerProperty::new("Hue", Value::Float(0.0)).with_timeline(keyframes));
        let (load_script, _) = path_script("CPU load", PinType::Float, "cpu.load")?;
        let hue_binding = DataBinding::new(hue.clone(), load_script, Arc::new(HueConverter))?;
        if let Some(multiply) = modifiers.get("multiply") {
            hue_binding.add_modifier(multiply, ModifierParameter::Static(Value::Float(360.0)))?;
        }
        hue_binding.set_composition(Composition::Sum)?;

        let tint = Arc::new(LayerProperty::new("Tint", Value::Color(Color::rgb(255, 255, 255))));
        let tint_script = NodeScript::new("Tint", PinType::Color);
        let base = tint_script.add_node(StaticValueNode::node(Value::Color(Color::rgb(0, 96, 160))))?;
        connect(&tint_script, base, "Value", exit_node(&tint_script)?, "Result")?;
        tint_script.set_context(context.clone());
        let tint_binding = DataBinding::new(tint.clone(), Arc::new(tint_script), Arc::new(ColorConverter))?;
        if let Some(brighten) = modifiers.get("brighten") {
            tint_binding.add_modifier(brighten, ModifierParameter::DataModel("audio.boost".to_string()))?;
        }

        let alert = Arc::new(LayerProperty::new("Alert", Value::Bool(false)));
        let alert_script = Arc::new(Self::hot_core_script(&registry, context.clone())?);
        let alert_binding = DataBinding::new(alert.clone(), alert_script, Arc::new(BoolConverter))?;

        Ok(Self {
            data_model,
            registry,
            opacity,
            hue,
            tint,
            alert,
            bindings: vec![
                Arc::new(opacity_binding),
                Arc::new(hue_binding),
                Arc::new(tint_binding),
                Arc::new(alert_binding),
            ],
            level_script,
            level_node,
        })
    }

    /// `cpu.cores` contains an element whose `load` exceeds 90
    fn hot_core_script(registry: &NodeRegistry, context: ScriptContext) -> Result<NodeScript, DemoError> {
        let script = NodeScript::new("Hot core", PinType::Bool);
        script.set_context(context);

        let cores = create(&script, registry, "data_model.value")?;
        script.set_storage(cores, json!({ "path": "cpu.cores" }), registry)?;
        let any = create(&script, registry, "list.operator")?;
        script.set_storage(any, json!({ "operator": "Any" }), registry)?;
        connect(&script, cores, "Value", any, "List")?;
        connect(&script, any, "Result", exit_node(&script)?, "Result")?;

        script
            .with_sub_script(any, |predicate| -> Result<(), DemoError> {
                let item = predicate.find_node(ITEM_KIND).ok_or(DemoError::UnknownKind(ITEM_KIND))?;
                let compare = create(predicate, registry, "logic.greater_than")?;
                let threshold = predicate.add_node(StaticValueNode::node(Value::Float(90.0)))?;
                connect(predicate, item, "load", compare, "A")?;
                connect(predicate, threshold, "Value", compare, "B")?;
                connect(predicate, compare, "Result", exit_node(predicate)?, "Result")
            })
            .ok_or(DemoError::UnknownKind("list.operator"))??;
        Ok(script)
    }

    /// Driver evaluating every binding once per tick
    pub fn driver(&self) -> EvaluationDriver {
        let mut driver = EvaluationDriver::new();
        for binding in &self.bindings {
            driver.register(binding.clone());
        }
        driver
    }

    /// Node kinds available to loaded scripts
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Shared data model
    pub fn data_model(&self) -> &Arc<JsonDataModel> {
        &self.data_model
    }

    /// Resample sensors and move keyframed properties to `time` seconds
    pub fn advance(&self, time: f32) {
        self.data_model.replace(sensors(time));
        self.hue.set_time(time);
    }

    /// Log the current property values
    pub fn log_state(&self, frame: u64) {
        tracing::info!(
            frame,
            opacity = ?self.opacity.value(),
            hue = ?self.hue.value(),
            tint = ?self.tint.value(),
            alert = ?self.alert.value(),
            "Properties"
        );
    }

    /// Editor acting on the audio level script
    pub fn editor(&self) -> Editor<'_> {
        Editor {
            demo: self,
            inserted: None,
        }
    }
}

/// Restructures the audio level script while it is being evaluated.
///
/// Each step alternately routes the level through a halving multiply node and removes
/// that node again, so every other step leaves the script in its original shape.
pub struct Editor<'a> {
    demo: &'a Demo,
    inserted: Option<(NodeId, NodeId)>,
}

impl Editor<'_> {
    /// Apply the next edit
    pub fn step(&mut self) -> Result<(), DemoError> {
        let script = &self.demo.level_script;
        let exit = exit_node(script)?;
        match self.inserted.take() {
            None => {
                let multiply = create(script, &self.demo.registry, "math.multiply")?;
                let half = script.add_node(StaticValueNode::node(Value::Float(0.5)))?;
                self.inserted = Some((multiply, half));

                let values: Vec<_> = script
                    .pins(multiply)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|pin| pin.collection.is_some())
                    .map(|pin| pin.id)
                    .collect();
                let [first, second] = values[..] else {
                    return Err(DemoError::MissingPin {
                        node: multiply,
                        pin: "Values".to_string(),
                    });
                };
                let level_out = script.pin_named(self.demo.level_node, "Value").ok_or(DemoError::MissingPin {
                    node: self.demo.level_node,
                    pin: "Value".to_string(),
                })?;
                let half_out = script.pin_named(half, "Value").ok_or(DemoError::MissingPin {
                    node: half,
                    pin: "Value".to_string(),
                })?;
                script.connect(self.demo.level_node, level_out, multiply, first)?;
                script.connect(half, half_out, multiply, second)?;
                connect(script, multiply, "Product", exit, "Result")?;
                tracing::debug!(script = script.name(), "Inserted halving stage");
            }
            Some((multiply, half)) => {
                script.remove_node(multiply)?;
                script.remove_node(half)?;
                connect(script, self.demo.level_node, "Value", exit, "Result")?;
                tracing::debug!(script = script.name(), "Removed halving stage");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_follow_sensors() {
        let demo = Demo::build().unwrap();
        let mut driver = demo.driver();
        assert_eq!(driver.len(), 4);

        let report = driver.tick(Duration::from_millis(16));
        assert!(report.faulted.is_empty(), "{:?}", report.faulted);
        assert_eq!(demo.opacity.value(), Value::Float(0.5));

        // core 1 at t=0 sits at 55 + 44 * sin(1) ~ 92
        assert_eq!(demo.alert.value(), Value::Bool(true));

        demo.data_model.set("cpu.cores", json!([{ "load": 10 }, { "load": 20 }]));
        driver.tick(Duration::from_millis(16));
        assert_eq!(demo.alert.value(), Value::Bool(false));
    }

    #[test]
    fn test_hue_sums_onto_keyframes() {
        let demo = Demo::build().unwrap();
        demo.data_model.set("cpu.load", json!(0.25));
        demo.hue.set_time(5.0);
        demo.driver().tick(Duration::from_millis(16));
        assert_eq!(demo.hue.value(), Value::Float(210.0));
    }

    #[test]
    fn test_editor_steps_keep_script_valid() {
        let demo = Demo::build().unwrap();
        demo.data_model.set("audio.level", json!(0.8));
        let mut editor = demo.editor();

        editor.step().unwrap();
        assert_eq!(demo.level_script.run(), Value::Float(0.4));
        editor.step().unwrap();
        assert_eq!(demo.level_script.run(), Value::Float(0.8));
        assert_eq!(demo.level_script.node_count(), 2);
    }

    #[test]
    fn test_editor_thread_races_render_loop() {
        let demo = Demo::build().unwrap();
        let mut driver = demo.driver();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                let mut editor = demo.editor();
                for _ in 0..200 {
                    editor.step().unwrap();
                }
            });
            for frame in 0..200u64 {
                demo.advance(frame as f32 / 60.0);
                let report = driver.tick(Duration::from_millis(16));
                assert!(report.faulted.is_empty(), "{:?}", report.faulted);
            }
        });

        let level = demo.level_script.run().as_float().unwrap();
        assert!((0.0..=1.0).contains(&level));
    }
}
