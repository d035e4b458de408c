// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration.
//!
//! Settings live in a RON file next to the user's projects. They control the
//! frame grid and the undo depth; they are not part of any motion document.

use crate::project::FrameScale;
use motion_editor_sequencer::document::DEFAULT_MAX_FRAME;
use motion_editor_sequencer::Frame;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "motion_editor.ron";

/// Errors raised while loading or saving the config
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON
    #[error("Config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Config could not be serialized
    #[error("Config serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer editor
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Format version
    pub version: u32,
    /// Frames per second of the editing grid
    pub frames_per_second: u32,
    /// Last addressable frame
    pub max_frame_index: Frame,
    /// Undo depth
    pub history_depth: usize,
    /// Version written into project metadata
    pub app_version: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            frames_per_second: 10,
            max_frame_index: DEFAULT_MAX_FRAME,
            history_depth: crate::history::MAX_HISTORY,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl EditorConfig {
    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::info!("Loaded editor config from {:?}", path);
        Ok(config)
    }

    /// Load config, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config text
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = ron::from_str(content)?;

        // Version check
        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }

        Ok(config)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved editor config to {:?}", path);
        Ok(())
    }

    /// Default config location inside a directory
    pub fn config_file_path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    /// Frame/time conversion for this grid
    pub fn frame_scale(&self) -> FrameScale {
        FrameScale::new(self.frames_per_second)
    }
}
