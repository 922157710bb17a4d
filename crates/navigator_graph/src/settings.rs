// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine settings.
//!
//! Settings are stored as RON next to the pipelines they apply to:
//!
//! ```ron
//! PipelineSettings(
//!     version: 1,
//!     execution: ExecutionLimits(
//!         max_visits: 10000,
//!     ),
//!     log_filter: "navigator_graph=info",
//! )
//! ```

use crate::evaluation::ExecutionLimits;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "navigator.ron";

/// Log directive used when the settings do not name one
pub const DEFAULT_LOG_FILTER: &str = "navigator_graph=info";

/// Error reading or writing settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The file could not be read or written
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid settings RON
    #[error("Invalid settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer format than this build understands
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },
}

/// Settings shared by every pipeline a host runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Settings format version
    pub version: u32,
    /// Bounds applied by [`Graph::execute`]
    pub execution: ExecutionLimits,
    /// `tracing` filter directive for hosts that install a subscriber
    pub log_filter: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            execution: ExecutionLimits::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PipelineSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse settings from RON text
    pub fn from_ron(content: &str) -> Result<Self, SettingsError> {
        let settings: PipelineSettings = ron::from_str(content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the settings file path for a directory
    pub fn settings_file_path(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE_NAME)
    }

    /// Empty graph that runs under these settings
    pub fn new_graph(&self) -> Graph {
        Graph::with_limits(self.execution.clone())
    }
}
