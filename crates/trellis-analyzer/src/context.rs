//! Per-pass state shared by every analysis of one pass
//!
//! The single-flight cache maps each node to a cell that is initialized by
//! whichever request reaches it first; every later request for the same node
//! awaits that same cell instead of invoking the analyzer again. The cache
//! lives exactly as long as the pass that created it.

use crate::analyzer::Analyzer;
use dashmap::DashMap;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use trellis_core::{AnalysisResult, Graph, NodeId};

type Slot = Arc<OnceCell<Arc<AnalysisResult>>>;

struct PassShared {
    graph: Arc<Graph>,
    analyzer: Arc<dyn Analyzer>,
    inflight: DashMap<NodeId, Slot>,
    cancel: CancellationToken,
}

/// Handle to the running pass, given to the analyzer with every request.
///
/// Cloning is cheap. Each nested request carries the chain of nodes that led
/// to it. A nested request may only target a graph ancestor of the artifact
/// issuing it; anything else gets an error result. Since the graph is acyclic,
/// no two analyses can end up waiting on each other's cells.
#[derive(Clone)]
pub struct PassContext {
    shared: Arc<PassShared>,
    chain: Vec<NodeId>,
}

impl PassContext {
    pub(crate) fn new(graph: Arc<Graph>, analyzer: Arc<dyn Analyzer>, cancel: CancellationToken) -> Self {
        PassContext {
            shared: Arc::new(PassShared {
                graph,
                analyzer,
                inflight: DashMap::new(),
                cancel,
            }),
            chain: Vec::new(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.shared.graph
    }

    /// Token canceled when the pass is asked to stop. Long-running analyzers
    /// should watch it.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.shared.cancel
    }

    pub fn is_canceled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Artifacts whose analysis this request is nested in, outermost first.
    pub fn chain(&self) -> &[NodeId] {
        &self.chain
    }

    /// Result of a node, if its analysis already completed in this pass.
    pub fn completed(&self, node: NodeId) -> Option<Arc<AnalysisResult>> {
        self.shared
            .inflight
            .get(&node)
            .and_then(|slot| slot.get().cloned())
    }

    /// Analyze an artifact by id, reusing this pass's result when one exists
    /// or is being computed. `None` if the id is not part of the graph.
    pub async fn analyze_by_id(&self, artifact_id: &str) -> Option<Arc<AnalysisResult>> {
        let node = self.graph().node_id(artifact_id)?;
        Some(self.analyze(node).await)
    }

    /// Analyze a node at most once per pass.
    pub async fn analyze(&self, node: NodeId) -> Arc<AnalysisResult> {
        if self.chain.contains(&node) {
            let id = self.artifact_label(node);
            tracing::warn!("{} requested its own analysis through {:?}", id, self.chain);
            return Arc::new(AnalysisResult::error(format!("cyclic reference to artifact {}", id)));
        }
        if let Some(&requester) = self.chain.last() {
            if !self.graph().is_ancestor(node, requester) {
                let (id, by) = (self.artifact_label(node), self.artifact_label(requester));
                tracing::warn!("{} requested {}, which it does not depend on", by, id);
                return Arc::new(AnalysisResult::error(format!(
                    "artifact {} is not a dependency of {}",
                    id, by
                )));
            }
        }

        let slot = self.shared.inflight.entry(node).or_default().clone();
        Arc::clone(slot.get_or_init(|| self.invoke(node)).await)
    }

    async fn invoke(&self, node: NodeId) -> Arc<AnalysisResult> {
        let Some(artifact) = self.graph().artifact(node) else {
            return Arc::new(AnalysisResult::error(format!("unknown node {:?}", node)));
        };
        let Some(compiled_text) = artifact.compiled_text.as_deref() else {
            return Arc::new(AnalysisResult::error(format!(
                "compiled text not found for artifact {}",
                artifact.id
            )));
        };

        let mut nested = self.clone();
        nested.chain.push(node);

        let analyzer = &self.shared.analyzer;
        tracing::debug!("{} analyzing {}", analyzer.name(), artifact.id);

        let outcome = tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => {
                return Arc::new(AnalysisResult::error(format!("analysis of {} canceled", artifact.id)));
            }
            outcome = AssertUnwindSafe(analyzer.analyze(artifact, compiled_text, &nested)).catch_unwind() => outcome,
        };

        match outcome {
            Ok(Ok(result)) => Arc::new(result),
            Ok(Err(err)) => {
                tracing::warn!("{} failed on {}: {:#}", analyzer.name(), artifact.id, err);
                Arc::new(AnalysisResult::error(format!("analysis of {} failed: {:#}", artifact.id, err)))
            }
            // The cell must still be filled, or the next waiter would run the
            // analysis again.
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!("{} panicked on {}: {}", analyzer.name(), artifact.id, message);
                Arc::new(AnalysisResult::error(format!("analysis of {} panicked: {}", artifact.id, message)))
            }
        }
    }

    fn artifact_label(&self, node: NodeId) -> String {
        self.graph()
            .artifact(node)
            .map(|a| a.id.to_string())
            .unwrap_or_else(|| format!("{:?}", node))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
