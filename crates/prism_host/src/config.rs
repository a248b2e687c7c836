// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host configuration.
//!
//! Read from an optional `prism.ron` in the working directory. Every field has a default,
//! so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "prism.ron";

/// Error loading or saving the host configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON
    #[error("Invalid configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Configuration could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// A value is out of range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Settings of the headless host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Render ticks per second
    pub tick_rate_hz: u32,
    /// Ticks to run before exiting, 0 runs until interrupted
    pub frames: u64,
    /// Filter directives used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Run the editor thread that restructures scripts while they are evaluated
    pub editor_thread: bool,
    /// Extra script document (RON or JSON) to load and drive
    pub script_path: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            frames: 300,
            log_filter: "prism_host=info,prism_graph=info,prism_binding=info".to_string(),
            editor_thread: true,
            script_path: None,
        }
    }
}

impl HostConfig {
    /// Load configuration from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: HostConfig = ron::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration if the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration as pretty RON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 1000 {
            return Err(ConfigError::Invalid {
                field: "tick_rate_hz",
                reason: format!("{} is outside 1..=1000", self.tick_rate_hz),
            });
        }
        Ok(())
    }

    /// Time between ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}
