//! Builds a [`Graph`] from a flat list of artifacts and their declared dependencies

use crate::graph::{Graph, NodeId};
use crate::manifest::Manifest;
use crate::model::{Artifact, ArtifactId};
use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("artifact {id} is declared more than once")]
    DuplicateId { id: ArtifactId },
    #[error("dependency cycle through artifact {id}")]
    Cycle { id: ArtifactId },
}

/// Collects artifacts and links `dependency -> dependent` edges.
///
/// Dependencies naming an id that is not part of the artifact list (raw
/// database tables, sources, other untracked artifacts) contribute no edge.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    artifacts: Vec<Artifact>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from every artifact a manifest lists, optionally scoped to one project.
    pub fn from_manifest(manifest: &dyn Manifest, project: Option<&str>) -> Self {
        GraphBuilder {
            artifacts: manifest.artifacts(project),
        }
    }

    pub fn add(&mut self, artifact: Artifact) -> &mut Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn extend(&mut self, artifacts: impl IntoIterator<Item = Artifact>) -> &mut Self {
        self.artifacts.extend(artifacts);
        self
    }

    /// Link all artifacts and freeze the result.
    pub fn build(self) -> Result<Graph, GraphError> {
        let mut inner = StableDiGraph::with_capacity(self.artifacts.len(), 0);
        let mut by_id = HashMap::with_capacity(self.artifacts.len());

        for artifact in self.artifacts {
            if by_id.contains_key(&artifact.id) {
                return Err(GraphError::DuplicateId { id: artifact.id });
            }
            let id = artifact.id.clone();
            let idx = inner.add_node(artifact);
            by_id.insert(id, NodeId(idx.index() as u32));
        }

        let mut edges = Vec::new();
        for child in inner.node_indices() {
            for dependency in &inner[child].depends_on {
                match by_id.get(dependency) {
                    Some(parent) => edges.push((NodeIndex::new(parent.0 as usize), child)),
                    None => tracing::debug!("{} depends on untracked {}, no edge added", inner[child].id, dependency),
                }
            }
        }
        for (parent, child) in edges {
            if !inner.contains_edge(parent, child) {
                inner.add_edge(parent, child, ());
            }
        }

        if let Err(cycle) = toposort(&inner, None) {
            let id = inner[cycle.node_id()].id.clone();
            return Err(GraphError::Cycle { id });
        }

        tracing::debug!("Built graph with {} nodes, {} edges", inner.node_count(), inner.edge_count());
        Ok(Graph::from_parts(inner, by_id))
    }
}
