//! Build result types.

use std::path::PathBuf;
use std::time::Duration;

/// A file written by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    /// Where the file was written
    pub path: PathBuf,
    /// Size of the written contents in bytes
    pub bytes: usize,
}

impl OutputArtifact {
    /// File name of the artifact (e.g. `main.css`).
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

/// Both artifacts of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Prefixed, unminified stylesheet
    pub main: OutputArtifact,
    /// Prefixed, minified stylesheet
    pub minified: OutputArtifact,
    /// Entry file followed by every file it imported
    pub sources: Vec<PathBuf>,
    /// CSS the prefix step skipped
    pub warnings: Vec<String>,
    /// Wall time of the run
    pub duration: Duration,
}

impl BuildOutput {
    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        format!(
            "Built {} ({} bytes) and {} ({} bytes) in {:?}",
            self.main.file_name(),
            self.main.bytes,
            self.minified.file_name(),
            self.minified.bytes,
            self.duration
        )
    }
}
