//! Core data structures for artifacts and their analysis outcomes

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Project-unique artifact identifier, e.g. `model.shop.orders`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    pub fn new(id: impl Into<String>) -> Self {
        ArtifactId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ArtifactId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ArtifactId {
    fn from(id: &str) -> Self {
        ArtifactId(id.to_string())
    }
}

impl From<String> for ArtifactId {
    fn from(id: String) -> Self {
        ArtifactId(id)
    }
}

/// A single generated-text artifact (a "model").
///
/// The raw text is the template-bearing source; the compiled text is what the
/// template expansion produced from it and is absent until expansion ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub name: String,
    /// Project (package) the artifact belongs to.
    pub project: String,
    /// Ids of the artifacts this one depends on. Unknown ids are allowed.
    #[serde(default)]
    pub depends_on: Vec<ArtifactId>,
    /// Path of the raw source file relative to the project root.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub compiled_text: Option<String>,
}

impl Artifact {
    /// Create an artifact with no dependencies and no text. The name is the
    /// last dot-separated segment of the id.
    pub fn new(id: impl Into<ArtifactId>, project: impl Into<String>) -> Self {
        let id = id.into();
        let name = id.as_str().rsplit('.').next().unwrap_or_default().to_string();
        Artifact {
            id,
            name,
            project: project.into(),
            depends_on: Vec::new(),
            path: None,
            raw_text: String::new(),
            compiled_text: None,
        }
    }

    pub fn with_dependency(mut self, id: impl Into<ArtifactId>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_raw_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = text.into();
        self
    }

    pub fn with_compiled_text(mut self, text: impl Into<String>) -> Self {
        self.compiled_text = Some(text.into());
        self
    }
}

/// Structured output of the external SQL analyzer, kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ast(pub serde_json::Value);

/// Facts extracted while parsing, available even when the deeper semantic
/// check failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseMetadata {
    /// Names of the relations the text refers to.
    pub references: Vec<String>,
}

/// Outcome of analyzing one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ast: Result<Ast, String>,
    #[serde(default)]
    pub parse: ParseMetadata,
}

impl AnalysisResult {
    pub fn ok(ast: Ast) -> Self {
        AnalysisResult {
            ast: Ok(ast),
            parse: ParseMetadata::default(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        AnalysisResult {
            ast: Err(message.into()),
            parse: ParseMetadata::default(),
        }
    }

    pub fn with_parse(mut self, parse: ParseMetadata) -> Self {
        self.parse = parse;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.ast.is_ok()
    }

    pub fn is_err(&self) -> bool {
        self.ast.is_err()
    }

    /// The error message, if analysis failed.
    pub fn error_message(&self) -> Option<&str> {
        self.ast.as_ref().err().map(String::as_str)
    }
}

/// One artifact's result from one analysis pass. Never mutated; the next
/// pass produces a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactAnalysisRecord {
    pub artifact_id: ArtifactId,
    pub result: Arc<AnalysisResult>,
}

impl ArtifactAnalysisRecord {
    pub fn new(artifact_id: ArtifactId, result: Arc<AnalysisResult>) -> Self {
        ArtifactAnalysisRecord { artifact_id, result }
    }
}
