//! The external SQL analyzer, seen from the scheduler

use crate::context::PassContext;
use anyhow::Result;
use trellis_core::{AnalysisResult, Artifact};

/// Analyzes the compiled text of one artifact.
///
/// Semantic or syntactic problems belong in the error variant of the returned
/// [`AnalysisResult`]. An `Err` means the call itself failed (engine crashed,
/// transport broke); the scheduler records it as that artifact's error and
/// carries on with the rest of the pass.
///
/// To resolve a relation the text refers to, call
/// [`PassContext::analyze_by_id`]; the dependency is analyzed at most once
/// per pass no matter how many artifacts ask for it.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        artifact: &Artifact,
        compiled_text: &str,
        cx: &PassContext,
    ) -> Result<AnalysisResult>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "analyzer"
    }
}
