//! Test fixtures for trellis-analyzer

use crate::analyzer::Analyzer;
use crate::context::PassContext;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trellis_core::{
    AnalysisResult, Artifact, ArtifactAnalysisRecord, Ast, Graph, GraphBuilder, ParseMetadata,
};

pub const PROJECT: &str = "shop";

/// A compiled artifact of the test project.
pub fn model(id: &str, deps: &[&str]) -> Artifact {
    deps.iter()
        .fold(Artifact::new(id, PROJECT), |a, dep| a.with_dependency(*dep))
        .with_raw_text(format!("select * from {{{{ ref('{}') }}}}", id))
        .with_compiled_text(format!("select * from {}", id))
}

pub fn graph(artifacts: Vec<Artifact>) -> Arc<Graph> {
    let mut builder = GraphBuilder::new();
    builder.extend(artifacts);
    Arc::new(builder.build().unwrap())
}

/// Sorted artifact ids of a record list.
pub fn record_ids(records: &[ArtifactAnalysisRecord]) -> Vec<String> {
    let mut ids: Vec<String> = records.iter().map(|r| r.artifact_id.to_string()).collect();
    ids.sort();
    ids
}

/// Analyzer whose behavior per artifact is scripted up front. It logs
/// `start:<id>` / `end:<id>` events and counts real invocations.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    failing: HashSet<String>,
    crashing: HashSet<String>,
    panicking: HashSet<String>,
    extra_requests: HashMap<String, Vec<String>>,
    delays: HashMap<String, Duration>,
    resolve_dependencies: bool,
    cancel_on: Option<(String, CancellationToken)>,
    events: Mutex<Vec<String>>,
    calls: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a semantic error for `id`.
    pub fn fail(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Make the call itself fail for `id`.
    pub fn crash(mut self, id: &str) -> Self {
        self.crashing.insert(id.to_string());
        self
    }

    /// Panic while analyzing `id`.
    pub fn panic_on(mut self, id: &str) -> Self {
        self.panicking.insert(id.to_string());
        self
    }

    /// Request `other` through the pass context after the delay of `id`,
    /// whether or not `id` declares it.
    pub fn requesting(mut self, id: &str, other: &str) -> Self {
        self.extra_requests.entry(id.to_string()).or_default().push(other.to_string());
        self
    }

    pub fn delay(mut self, id: &str, millis: u64) -> Self {
        self.delays.insert(id.to_string(), Duration::from_millis(millis));
        self
    }

    /// Request every declared dependency through the pass context first.
    pub fn resolving(mut self) -> Self {
        self.resolve_dependencies = true;
        self
    }

    /// Cancel `token` while analyzing `id`.
    pub fn cancel_on(mut self, id: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((id.to_string(), token));
        self
    }

    pub fn calls(&self, id: &str) -> usize {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Index of an event in the log.
    pub fn event_index(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn log(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait::async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn analyze(
        &self,
        artifact: &Artifact,
        _compiled_text: &str,
        cx: &PassContext,
    ) -> Result<AnalysisResult> {
        let id = artifact.id.to_string();
        self.log(format!("start:{}", id));
        *self.calls.lock().unwrap().entry(id.clone()).or_default() += 1;
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let mut upstream_failure = None;
        if self.resolve_dependencies {
            for dep in &artifact.depends_on {
                if let Some(result) = cx.analyze_by_id(dep.as_str()).await {
                    if result.is_err() && upstream_failure.is_none() {
                        upstream_failure = Some(dep.to_string());
                    }
                }
            }
        }

        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        for other in self.extra_requests.get(&id).into_iter().flatten() {
            if let Some(result) = cx.analyze_by_id(other).await {
                if result.is_err() && upstream_failure.is_none() {
                    upstream_failure = Some(other.clone());
                }
            }
        }
        if let Some((target, token)) = &self.cancel_on {
            if *target == id {
                token.cancel();
            }
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.log(format!("end:{}", id));

        if self.panicking.contains(&id) {
            panic!("engine bug");
        }
        if self.crashing.contains(&id) {
            anyhow::bail!("engine connection lost");
        }
        if self.failing.contains(&id) {
            return Ok(AnalysisResult::error(format!("syntax error in {}", id)));
        }
        if let Some(dep) = upstream_failure {
            return Ok(AnalysisResult::error(format!("relation {} is not available", dep)));
        }

        let parse = ParseMetadata {
            references: artifact.depends_on.iter().map(|d| d.to_string()).collect(),
        };
        Ok(AnalysisResult::ok(Ast(serde_json::json!({ "model": id }))).with_parse(parse))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
