//! Latest analysis records of a project and location conversion for them

use std::sync::Arc;
use trellis_core::{AnalysisResult, ArtifactAnalysisRecord, Manifest};
use trellis_position::{DiffEngine, LineIndex, PositionMapper, Range};

/// A span reported by the analyzer, as character offsets into the compiled
/// text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(start: usize, end: usize) -> Self {
        Location { start, end }
    }
}

/// The same span in the compiled text and in the raw template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranges {
    pub compiled: Range,
    pub raw: Range,
}

/// Records of the last pass, patched as single artifacts are re-analyzed.
#[derive(Debug, Default)]
pub struct AnalysisResults {
    records: Vec<ArtifactAnalysisRecord>,
}

impl AnalysisResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with the records of a new pass.
    pub fn update(&mut self, records: Vec<ArtifactAnalysisRecord>) {
        self.records = records;
    }

    /// Replace the record of one artifact, or add it if there was none.
    pub fn update_record(&mut self, record: ArtifactAnalysisRecord) {
        match self.records.iter_mut().find(|r| r.artifact_id == record.artifact_id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn records(&self) -> &[ArtifactAnalysisRecord] {
        &self.records
    }

    pub fn get(&self, artifact_id: &str) -> Option<&Arc<AnalysisResult>> {
        self.records
            .iter()
            .find(|r| r.artifact_id.as_str() == artifact_id)
            .map(|r| &r.result)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ArtifactAnalysisRecord> {
        self.records.iter().filter(|r| r.result.is_err())
    }

    /// Raw/compiled ranges of a location inside an artifact's compiled text.
    /// `None` when the manifest has no compiled text for the artifact.
    pub fn ranges(manifest: &dyn Manifest, artifact_id: &str, location: Location) -> Option<Ranges> {
        let raw = manifest.raw_text(artifact_id)?;
        let compiled = manifest.compiled_text(artifact_id)?;
        let mapper = PositionMapper::new(raw, compiled);
        Some(convert_location(&mapper, location))
    }
}

/// Convert a compiled-text location with an existing mapper.
pub fn convert_location<E: DiffEngine>(mapper: &PositionMapper<E>, location: Location) -> Ranges {
    let compiled_lines: &LineIndex = mapper.compiled_lines();
    let compiled = Range::new(
        compiled_lines.position_at(location.start),
        compiled_lines.position_at(location.end),
    );
    let raw = Range::new(mapper.to_raw(compiled.start), mapper.to_raw(compiled.end));
    Ranges { compiled, raw }
}
