//! Dependency-ordered analysis passes over the artifact graph
//!
//! An [`AnalysisScheduler`] walks a [`trellis_core::Graph`] level by level and
//! hands every artifact to an injected [`Analyzer`] at most once per pass. The
//! analyzer may pull in the results of other artifacts through the
//! [`PassContext`] it receives, which shares one single-flight cache per pass.

pub mod analyzer;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod progress;
pub mod results;
pub mod scheduler;

#[cfg(test)]
mod test_utils;


pub use analyzer::Analyzer;
pub use config::SchedulerConfig;
pub use context::PassContext;
pub use error::{ConfigError, SchedulerError};
pub use filter::filter_root_errors;
pub use progress::{NoProgress, ProgressSink, TracingProgress};
pub use results::{AnalysisResults, Location, Ranges, convert_location};
pub use scheduler::AnalysisScheduler;
