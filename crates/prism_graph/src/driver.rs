// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-tick evaluation of scripts and everything built on them.

use crate::evaluation::EvaluationError;
use crate::script::NodeScript;
use std::sync::Arc;
use std::time::Duration;

/// Something the driver updates once per tick
pub trait Evaluable: Send + Sync {
    /// Name used in logs and reports
    fn label(&self) -> &str;

    /// Advance by `delta` and re-evaluate
    fn tick(&self, delta: Duration) -> Result<(), EvaluationError>;
}

impl Evaluable for NodeScript {
    fn label(&self) -> &str {
        self.name()
    }

    fn tick(&self, _delta: Duration) -> Result<(), EvaluationError> {
        self.try_run().map(|_| ())
    }
}

/// Outcome of one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Frame number of this tick, starting at 1
    pub frame: u64,
    /// Entries evaluated
    pub evaluated: usize,
    /// Entries that fell back to their default this tick
    pub faulted: Vec<(String, EvaluationError)>,
}

/// Runs registered scripts and bindings once per render tick.
///
/// A fault in one entry never stops the others; the entry itself degrades to its default
/// result for the tick and recovers on its own once the fault goes away.
#[derive(Default)]
pub struct EvaluationDriver {
    entries: Vec<Arc<dyn Evaluable>>,
    frame: u64,
}

impl EvaluationDriver {
    /// Create an empty driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, evaluated in registration order
    pub fn register(&mut self, entry: Arc<dyn Evaluable>) {
        tracing::debug!(label = entry.label(), "Registered evaluable");
        self.entries.push(entry);
    }

    /// Number of registered entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frames ticked so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Evaluate every entry once
    pub fn tick(&mut self, delta: Duration) -> TickReport {
        self.frame += 1;
        let mut report = TickReport {
            frame: self.frame,
            ..TickReport::default()
        };

        for entry in &self.entries {
            report.evaluated += 1;
            if let Err(error) = entry.tick(delta) {
                report.faulted.push((entry.label().to_string(), error));
            }
        }
        report
    }
}
