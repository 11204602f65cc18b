//! Scheduler and configuration errors

use std::path::PathBuf;
use thiserror::Error;
use trellis_core::ArtifactId;

/// Failure of a whole pass. Per-artifact failures are never reported here;
/// they are recorded in that artifact's result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("analysis canceled")]
    Canceled,
    #[error("artifact {id} is not part of the graph")]
    UnknownArtifact { id: ArtifactId },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scheduler config: {0}")]
    Parse(#[from] toml::de::Error),
}
