//! Root-cause filtering of error records

use std::collections::HashSet;
use trellis_core::{ArtifactAnalysisRecord, Graph, NodeId};

/// Drop every error record that has a failed ancestor among the records.
///
/// Failures downstream of another failure are noise: they are almost always
/// caused by it. Successful records and records of artifacts unknown to the
/// graph are always kept. Relative order is preserved.
pub fn filter_root_errors(graph: &Graph, records: Vec<ArtifactAnalysisRecord>) -> Vec<ArtifactAnalysisRecord> {
    let failed: HashSet<NodeId> = records
        .iter()
        .filter(|r| r.result.is_err())
        .filter_map(|r| graph.node_id(r.artifact_id.as_str()))
        .collect();

    if failed.is_empty() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| {
            if record.result.is_ok() {
                return true;
            }
            match graph.node_id(record.artifact_id.as_str()) {
                Some(node) => !has_failed_ancestor(graph, node, &failed),
                None => true,
            }
        })
        .collect()
}

fn has_failed_ancestor(graph: &Graph, node: NodeId, failed: &HashSet<NodeId>) -> bool {
    let mut seen = HashSet::new();
    let mut to_visit: Vec<NodeId> = graph.parents(node).collect();

    while let Some(current) = to_visit.pop() {
        if !seen.insert(current) {
            continue;
        }
        if failed.contains(&current) {
            return true;
        }
        to_visit.extend(graph.parents(current));
    }

    false
}
