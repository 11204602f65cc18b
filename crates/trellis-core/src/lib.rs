//! Trellis Core — artifact data model, dependency graph, and graph builder

pub mod builder;
pub mod graph;
pub mod manifest;
pub mod model;


pub use builder::{GraphBuilder, GraphError};
pub use graph::{Graph, GraphNode, NodeId};
pub use manifest::{InMemoryManifest, Manifest};
pub use model::{AnalysisResult, Artifact, ArtifactAnalysisRecord, ArtifactId, Ast, ParseMetadata};
