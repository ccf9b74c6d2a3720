use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::function_object::Options;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid step_delay '{value}': {reason}")]
    InvalidDelay { value: String, reason: String },
    #[error("end_index must be at least 1")]
    EmptyRun,
}

/// A run file: where the case lives, how long to iterate and which function
/// objects to drive.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Defaults to the directory holding the run file.
    #[serde(default)]
    pub case_root: Option<PathBuf>,
    pub control: ControlConfig,
    #[serde(default)]
    pub functions: Options,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    pub end_index: u64,
    #[serde(default = "default_write_interval")]
    pub write_interval: u64,
    /// Pause after each iteration, e.g. `250ms`.
    #[serde(default)]
    pub step_delay: Option<String>,
    /// Re-read `functions` whenever the run file changes on disk.
    #[serde(default)]
    pub reload: bool,
}

fn default_write_interval() -> u64 {
    1
}

impl ControlConfig {
    pub fn step_delay(&self) -> Result<Option<Duration>, ConfigError> {
        self.step_delay
            .as_deref()
            .map(|value| {
                humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidDelay {
                    value: value.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        if config.control.end_index == 0 {
            return Err(ConfigError::EmptyRun);
        }
        config.control.step_delay()?;
        Ok(config)
    }

    /// Case root for a run file read from `path`.
    pub fn case_root(&self, path: &Path) -> PathBuf {
        match &self.case_root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => config_dir(path).join(root),
            None => config_dir(path),
        }
    }
}

fn config_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
