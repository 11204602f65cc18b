//! Scheduler configuration

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on artifacts dispatched concurrently within one level.
    /// Dependencies an analysis pulls in run on the requester's slot.
    pub max_concurrency: usize,
    /// In a subtree analysis, skip the children of an artifact that failed.
    pub stop_on_error_in_subtree: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            stop_on_error_in_subtree: true,
        }
    }
}

impl SchedulerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded scheduler config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
