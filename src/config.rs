use std::{fs, path::Path};

pub use delta_config::DeltaConfig;
pub use diff_config::{ConflictDetection, DiffConfig};
pub use output_config::OutputConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod delta_config;
pub mod diff_config;
pub mod output_config;

/// Tunables for the diff engine, the delta window engine and the text
/// renderers. Every field has a default, so an empty document is a valid
/// configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub delta: DeltaConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration")]
    Parse(#[from] serde_yaml::Error),
}

impl Config {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from '{}'", path.display());

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> { Ok(serde_yaml::to_string(self)?) }
}
