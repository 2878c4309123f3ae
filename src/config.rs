//! Host configuration file
//!
//! Small TOML file with the project defaults the host applies when no
//! project overrides them. Lives under the platform config directory.

use crate::effect_host::types::{HostError, HostResult};
use crate::rect::Format;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default render format declared in the config file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormatConfig {
    pub width: i32,
    pub height: i32,
    pub pixel_aspect: f64,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            pixel_aspect: 1.0,
        }
    }
}

/// Host configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Project frame rate in frames per second
    pub frame_rate: f64,
    /// Default render format
    pub format: FormatConfig,
    /// Override for the effect-registry cache location
    pub cache_dir: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame_rate: 24.0,
            format: FormatConfig::default(),
            cache_dir: None,
        }
    }
}

impl HostConfig {
    /// Default config file location, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("photon").join("config.toml"))
    }

    /// Load from file; a missing file yields the defaults
    pub fn load(path: &Path) -> HostResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        toml::from_str(&data).map_err(|e| HostError::SerdeError(e.to_string()))
    }

    /// Save to file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> HostResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self).map_err(|e| HostError::SerdeError(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// The render format this config declares
    pub fn render_format(&self) -> Format {
        Format::new(
            "project",
            self.format.width,
            self.format.height,
            self.format.pixel_aspect,
        )
    }

    /// Where the effect-registry cache lives
    pub fn cache_path(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Some(dir.join("effects.json"));
        }
        dirs::cache_dir().map(|d| d.join("photon").join("effects.json"))
    }
}
