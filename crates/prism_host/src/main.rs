// SPDX-License-Identifier: MIT OR Apache-2.0
//! Prism host - headless render loop for node scripts and data bindings
//!
//! Drives a demo system-monitor profile:
//! - Scripts read a simulated sensor data model
//! - Bindings write the results into layer properties every tick
//! - An optional editor thread restructures a script while it is evaluated
//!
//! ## Configuration
//!
//! Settings come from `prism.ron` in the working directory when present. `RUST_LOG`
//! overrides the configured log filter. `prism --write-config` writes the current settings
//! to `prism.ron` and exits.

mod config;
mod demo;

use config::{HostConfig, CONFIG_FILE_NAME};
use demo::{Demo, DemoError};
use prism_graph::{EvaluationDriver, LoadError, NodeScript, ScriptContext, ScriptModel};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Error that stops the host
#[derive(Debug, thiserror::Error)]
enum HostError {
    #[error(transparent)]
    Demo(#[from] DemoError),

    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse script: {0}")]
    Load(#[from] LoadError),
}

fn main() {
    let config = match HostConfig::load_or_default(Path::new(CONFIG_FILE_NAME)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_FILE_NAME}: {e}");
            std::process::exit(1);
        }
    };

    if std::env::args().any(|arg| arg == "--write-config") {
        if let Err(e) = config.save(Path::new(CONFIG_FILE_NAME)) {
            eprintln!("Failed to write {CONFIG_FILE_NAME}: {e}");
            std::process::exit(1);
        }
        println!("Wrote {CONFIG_FILE_NAME}");
        return;
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Prism host v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&config) {
        tracing::error!("Host failed: {e}");
        std::process::exit(1);
    }
}

fn run(config: &HostConfig) -> Result<(), HostError> {
    let demo = Demo::build()?;
    let mut driver = demo.driver();
    if let Some(path) = &config.script_path {
        driver.register(load_script(path, &demo)?);
    }

    let stop = AtomicBool::new(false);
    let interval = config.tick_interval();
    std::thread::scope(|scope| {
        if config.editor_thread {
            scope.spawn(|| edit_loop(&demo, &stop, interval * 10));
        }
        render_loop(config, &demo, &mut driver);
        stop.store(true, Ordering::Relaxed);
    });

    tracing::info!(frames = driver.frame(), "Host stopped");
    Ok(())
}

fn load_script(path: &Path, demo: &Demo) -> Result<Arc<NodeScript>, HostError> {
    let content = std::fs::read_to_string(path)?;
    let model = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => ScriptModel::from_json(&content)?,
        _ => ScriptModel::from_ron(&content)?,
    };

    let context = ScriptContext::with_data_model(demo.data_model().clone());
    let (script, report) = NodeScript::from_model(&model, demo.registry(), context);
    if report.is_complete() {
        tracing::info!(path = %path.display(), nodes = script.node_count(), "Loaded script");
    } else {
        tracing::warn!(
            path = %path.display(),
            dropped_nodes = report.dropped_nodes.len(),
            dropped_connections = report.dropped_connections.len(),
            "Script loaded partially"
        );
    }
    Ok(Arc::new(script))
}

fn render_loop(config: &HostConfig, demo: &Demo, driver: &mut EvaluationDriver) {
    let interval = config.tick_interval();
    let started = Instant::now();
    let mut faulted = 0usize;

    while config.frames == 0 || driver.frame() < config.frames {
        let tick_start = Instant::now();
        demo.advance(started.elapsed().as_secs_f32());

        let report = driver.tick(interval);
        if !report.faulted.is_empty() {
            faulted += report.faulted.len();
            for (label, error) in &report.faulted {
                tracing::debug!(frame = report.frame, label = label.as_str(), %error, "Degraded to default");
            }
        }
        if report.frame % u64::from(config.tick_rate_hz) == 0 {
            demo.log_state(report.frame);
        }

        if let Some(remaining) = interval.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    if faulted > 0 {
        tracing::warn!(faulted, "Evaluations fell back to defaults during the run");
    }
}

fn edit_loop(demo: &Demo, stop: &AtomicBool, period: Duration) {
    let mut editor = demo.editor();
    let mut edits = 0u64;
    while !stop.load(Ordering::Relaxed) {
        match editor.step() {
            Ok(()) => edits += 1,
            Err(e) => tracing::warn!("Edit rejected: {e}"),
        }
        std::thread::sleep(period);
    }
    tracing::info!(edits, "Editor thread finished");
}
