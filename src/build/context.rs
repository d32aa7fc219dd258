//! Build configuration for a single pipeline run.

use crate::config::{resolve_path, StylebuildConfig};
use crate::prefix::PrefixOptions;
use std::path::{Path, PathBuf};

/// Base name of every output artifact, whatever the entry file is called.
pub const OUTPUT_STEM: &str = "main";

/// Suffix inserted before the extension of the minified artifact.
pub const MIN_SUFFIX: &str = ".min";

/// Everything a pipeline run needs: where to read, where to write, and how
/// to prefix.
///
/// Built once per invocation and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    /// Entry `.less` file
    pub source_path: PathBuf,
    /// Directory receiving the artifacts
    pub output_dir: PathBuf,
    /// Prefixing policy
    pub prefix_options: PrefixOptions,
}

impl BuildConfiguration {
    /// Create a configuration from explicit values.
    pub fn new(source_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, prefix_options: PrefixOptions) -> Self {
        Self { source_path: source_path.into(), output_dir: output_dir.into(), prefix_options }
    }

    /// Create a configuration from loaded settings.
    ///
    /// Relative paths in `config` are resolved against `project_root`.
    pub fn from_config(config: &StylebuildConfig, project_root: &Path) -> Self {
        Self {
            source_path: resolve_path(project_root, &config.styles.source),
            output_dir: resolve_path(project_root, &config.styles.out),
            prefix_options: PrefixOptions::from_styles(&config.styles),
        }
    }

    /// Path of the unminified artifact, `{output_dir}/main.css`.
    pub fn main_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.css", OUTPUT_STEM))
    }

    /// Path of the minified artifact, `{output_dir}/main.min.css`.
    pub fn minified_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}{}.css", OUTPUT_STEM, MIN_SUFFIX))
    }
}
