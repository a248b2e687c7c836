// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe timelines supplying a property's base value.

use crate::keyframe::{Interpolation, Keyframe, KeyframeId};
use serde::{Deserialize, Serialize};
use prism_graph::Value;

/// Keyframes of one property, sorted by time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    keyframes: Vec<Keyframe>,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyframe
    pub fn add_keyframe(&mut self, keyframe: Keyframe) -> KeyframeId {
        let id = keyframe.id;
        self.keyframes.push(keyframe);
        self.sort_keyframes();
        id
    }

    /// Remove a keyframe
    pub fn remove_keyframe(&mut self, keyframe_id: KeyframeId) -> bool {
        let before = self.keyframes.len();
        self.keyframes.retain(|k| k.id != keyframe_id);
        self.keyframes.len() != before
    }

    /// Move a keyframe to a new time
    pub fn move_keyframe(&mut self, keyframe_id: KeyframeId, new_time: f32) {
        if let Some(kf) = self.keyframes.iter_mut().find(|k| k.id == keyframe_id) {
            kf.time = new_time;
        }
        self.sort_keyframes();
    }

    fn sort_keyframes(&mut self) {
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Keyframes in time order
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Time of the last keyframe
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    /// Find keyframes surrounding a time
    fn find_keyframes(&self, time: f32) -> (Option<&Keyframe>, Option<&Keyframe>) {
        match self.keyframes.iter().position(|k| k.time >= time) {
            None => (self.keyframes.last(), None),
            Some(0) => (None, self.keyframes.first()),
            Some(idx) => (Some(&self.keyframes[idx - 1]), Some(&self.keyframes[idx])),
        }
    }

    /// Value at `time`, eased with the earlier keyframe's curve; `None` without keyframes
    pub fn evaluate(&self, time: f32) -> Option<Value> {
        match self.find_keyframes(time) {
            (None, None) => None,
            (Some(kf), None) | (None, Some(kf)) => Some(kf.value.clone()),
            (Some(a), Some(b)) => {
                if (b.time - a.time).abs() < 0.0001 {
                    return Some(b.value.clone());
                }
                let t = a.easing.ease((time - a.time) / (b.time - a.time));
                Some(Interpolation::lerp_value(&a.value, &b.value, t))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;

    #[test]
    fn test_evaluate_between_keyframes() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.evaluate(1.0), None);

        timeline.add_keyframe(Keyframe::new(2.0, Value::Float(10.0)));
        timeline.add_keyframe(Keyframe::new(0.0, Value::Float(0.0)));
        assert_eq!(timeline.duration(), 2.0);

        assert_eq!(timeline.evaluate(-1.0), Some(Value::Float(0.0)));
        assert_eq!(timeline.evaluate(1.0), Some(Value::Float(5.0)));
        assert_eq!(timeline.evaluate(5.0), Some(Value::Float(10.0)));
    }

    #[test]
    fn test_easing_and_removal() {
        let mut timeline = Timeline::new();
        let first = timeline.add_keyframe(Keyframe::new(0.0, Value::Float(0.0)).with_easing(Easing::Step));
        timeline.add_keyframe(Keyframe::new(1.0, Value::Float(1.0)));
        assert_eq!(timeline.evaluate(0.9), Some(Value::Float(0.0)));

        timeline.move_keyframe(first, 3.0);
        assert_eq!(timeline.keyframes()[0].time, 1.0);
        assert!(timeline.remove_keyframe(first));
        assert!(!timeline.remove_keyframe(first));
        assert_eq!(timeline.evaluate(0.0), Some(Value::Float(1.0)));
    }
}
