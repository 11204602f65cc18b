//! CLI command implementations

use anyhow::Context;
use serde_json::json;
use std::path::PathBuf;
use trellis_analyzer::SchedulerConfig;
use trellis_core::{Graph, GraphBuilder, InMemoryManifest};
use trellis_position::{Position, PositionMapper};

pub async fn plan(manifest: PathBuf, project: String, config: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Planning project {} from {}", project, manifest.display());

    let config = match config {
        Some(path) => SchedulerConfig::load(&path)?,
        None => SchedulerConfig::default(),
    };

    let graph = load_graph(&manifest).await?;
    tracing::info!("Loaded {} artifacts, {} dependencies", graph.node_count(), graph.edge_count());

    let ids = |nodes: &[trellis_core::NodeId]| -> Vec<String> {
        nodes
            .iter()
            .filter_map(|&node| graph.artifact(node))
            .map(|a| a.id.to_string())
            .collect()
    };

    let levels: Vec<Vec<String>> = graph.levels(&project).iter().map(|level| ids(level)).collect();
    let plan = json!({
        "project": project,
        "models": graph.node_count_in(&project),
        "roots": ids(&graph.roots(&project)),
        "levels": levels,
        "max_concurrency": config.max_concurrency,
        "stop_on_error_in_subtree": config.stop_on_error_in_subtree,
    });

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

pub fn map(raw: PathBuf, compiled: PathBuf, line: u32, character: u32, to_compiled: bool) -> anyhow::Result<()> {
    let raw_text = std::fs::read_to_string(&raw)
        .with_context(|| format!("failed to read {}", raw.display()))?;
    let compiled_text = std::fs::read_to_string(&compiled)
        .with_context(|| format!("failed to read {}", compiled.display()))?;

    let mapper = PositionMapper::new(raw_text, compiled_text);
    let from = Position::new(line, character);
    let to = if to_compiled {
        mapper.to_compiled(from)
    } else {
        mapper.to_raw(from)
    };
    tracing::debug!("Mapped {:?} to {:?}", from, to);

    let (from_side, to_side) = if to_compiled { ("raw", "compiled") } else { ("compiled", "raw") };
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ from_side: from, to_side: to }))?
    );
    Ok(())
}

/// Read a JSON artifact list and link it into a graph.
async fn load_graph(path: &PathBuf) -> anyhow::Result<Graph> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest = InMemoryManifest::from_json(&json)
        .with_context(|| format!("invalid manifest {}", path.display()))?;

    Ok(GraphBuilder::from_manifest(&manifest, None).build()?)
}
