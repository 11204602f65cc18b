//! Manifest provider interface

use crate::model::Artifact;

/// Source of artifacts and their texts, typically backed by a parsed project
/// manifest.
pub trait Manifest: Send + Sync {
    /// Artifacts of one project, or of every project when `project` is `None`.
    fn artifacts(&self, project: Option<&str>) -> Vec<Artifact>;

    /// Compiled text of an artifact, absent until template expansion ran.
    fn compiled_text(&self, id: &str) -> Option<String>;

    /// Raw template source of an artifact.
    fn raw_text(&self, id: &str) -> Option<String>;
}

/// A manifest held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryManifest {
    artifacts: Vec<Artifact>,
}

impl InMemoryManifest {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        InMemoryManifest { artifacts }
    }

    /// Parse a JSON array of artifacts.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(InMemoryManifest {
            artifacts: serde_json::from_str(json)?,
        })
    }

    fn find(&self, id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id.as_str() == id)
    }
}

impl Manifest for InMemoryManifest {
    fn artifacts(&self, project: Option<&str>) -> Vec<Artifact> {
        self.artifacts
            .iter()
            .filter(|a| project.is_none_or(|p| a.project == p))
            .cloned()
            .collect()
    }

    fn compiled_text(&self, id: &str) -> Option<String> {
        self.find(id).and_then(|a| a.compiled_text.clone())
    }

    fn raw_text(&self, id: &str) -> Option<String> {
        self.find(id).map(|a| a.raw_text.clone())
    }
}
