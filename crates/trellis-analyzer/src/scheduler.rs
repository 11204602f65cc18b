//! Level-order analysis passes over the artifact graph
//!
//! A pass starts from a set of roots and dispatches one level at a time: every
//! node of the current frontier is analyzed concurrently, the level is awaited
//! as a whole, and only then are the children of that level considered. The
//! scheduler does not wait on specific parents beyond that barrier; an
//! analysis that needs a dependency's result asks for it through its
//! [`PassContext`].

use crate::analyzer::Analyzer;
use crate::config::SchedulerConfig;
use crate::context::PassContext;
use crate::error::SchedulerError;
use crate::filter::filter_root_errors;
use crate::progress::{NoProgress, ProgressSink};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trellis_core::{AnalysisResult, ArtifactAnalysisRecord, Graph, NodeId};

/// Which children a walk follows.
struct Walk<'a> {
    /// Only follow children that belong to this project.
    project: Option<&'a str>,
    /// Do not descend below failed nodes.
    prune_failed: bool,
    /// Denominator for progress reports.
    total: usize,
}

pub struct AnalysisScheduler {
    graph: Arc<Graph>,
    analyzer: Arc<dyn Analyzer>,
    progress: Arc<dyn ProgressSink>,
    config: SchedulerConfig,
}

impl AnalysisScheduler {
    pub fn new(graph: Arc<Graph>, analyzer: Arc<dyn Analyzer>) -> Self {
        AnalysisScheduler {
            graph,
            analyzer,
            progress: Arc::new(NoProgress),
            config: SchedulerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Analyze every artifact of a project once, starting from its roots.
    ///
    /// Returns one record per artifact, except failures whose failure is
    /// already explained by a failed ancestor. Canceling `cancel` makes the
    /// pass stop at the next level boundary with [`SchedulerError::Canceled`].
    pub async fn run(
        &self,
        project: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArtifactAnalysisRecord>, SchedulerError> {
        let roots = self.graph.roots(project);
        let total = self.graph.node_count_in(project);
        info!("Project analysis started: {} ({} models, {} roots)", project, total, roots.len());

        self.progress.begin();
        let walk = Walk {
            project: Some(project),
            prune_failed: false,
            total,
        };
        let outcome = self.walk(roots, walk, cancel).await;
        self.progress.end();

        let records = outcome?;
        Ok(self.finish(project, records))
    }

    /// Analyze one artifact and then, level by level, the artifacts that
    /// depend on it.
    ///
    /// With `stop_on_error_in_subtree` set, the dependents of an artifact that
    /// failed are not analyzed at all.
    pub async fn analyze_subtree(
        &self,
        artifact_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArtifactAnalysisRecord>, SchedulerError> {
        let root = self
            .graph
            .node_id(artifact_id)
            .ok_or_else(|| SchedulerError::UnknownArtifact { id: artifact_id.into() })?;
        let total = self.graph.descendants(root).len() + 1;
        debug!("Subtree analysis started: {} ({} models)", artifact_id, total);

        let walk = Walk {
            project: None,
            prune_failed: self.config.stop_on_error_in_subtree,
            total,
        };
        let records = self.walk(vec![root], walk, cancel).await?;
        Ok(self.finish(artifact_id, records))
    }

    fn finish(&self, scope: &str, records: Vec<ArtifactAnalysisRecord>) -> Vec<ArtifactAnalysisRecord> {
        let collected = records.len();
        let records = filter_root_errors(&self.graph, records);
        let errors = records.iter().filter(|r| r.result.is_err()).count();
        info!(
            "Analysis of {} completed: {} records, {} root errors, {} suppressed",
            scope,
            records.len(),
            errors,
            collected - records.len()
        );
        records
    }

    async fn walk(
        &self,
        roots: Vec<NodeId>,
        walk: Walk<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArtifactAnalysisRecord>, SchedulerError> {
        let cx = PassContext::new(Arc::clone(&self.graph), Arc::clone(&self.analyzer), cancel.clone());
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut records = Vec::new();
        let mut frontier = roots;
        let mut depth = 0usize;

        self.progress.report(visited.len(), walk.total);

        while !frontier.is_empty() {
            if cancel.is_cancelled() {
                info!("Analysis canceled before level {}", depth);
                return Err(SchedulerError::Canceled);
            }

            let level: Vec<NodeId> = frontier.into_iter().filter(|node| visited.insert(*node)).collect();
            debug!("Dispatching level {} ({} models)", depth, level.len());

            let mut aborts = Vec::with_capacity(level.len());
            let mut handles = Vec::with_capacity(level.len());
            for &node in &level {
                let cx = cx.clone();
                let permits = Arc::clone(&permits);
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    cx.analyze(node).await
                });
                aborts.push(handle.abort_handle());
                handles.push(handle);
            }

            let settled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    for abort in &aborts {
                        abort.abort();
                    }
                    info!("Analysis canceled during level {}", depth);
                    return Err(SchedulerError::Canceled);
                }
                settled = join_all(handles) => settled,
            };

            let mut next = Vec::new();
            for (node, joined) in level.iter().copied().zip(settled) {
                let Some(artifact) = self.graph.artifact(node) else {
                    continue;
                };
                let result = match joined {
                    Ok(result) => result,
                    Err(err) => {
                        warn!("Analysis task for {} did not complete: {}", artifact.id, err);
                        Arc::new(AnalysisResult::error(format!("analysis of {} aborted: {}", artifact.id, err)))
                    }
                };

                let descend = !(walk.prune_failed && result.is_err());
                records.push(ArtifactAnalysisRecord::new(artifact.id.clone(), result));

                if descend {
                    next.extend(self.graph.children(node).filter(|child| {
                        !visited.contains(child)
                            && walk
                                .project
                                .is_none_or(|p| self.graph.artifact(*child).is_some_and(|a| a.project == p))
                    }));
                }
            }

            if cancel.is_cancelled() {
                info!("Analysis canceled after level {}", depth);
                return Err(SchedulerError::Canceled);
            }

            self.progress.report(visited.len(), walk.total);
            frontier = next;
            depth += 1;
        }

        Ok(records)
    }
}
