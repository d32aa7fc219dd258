//! Build pipeline orchestration.
//!
//! A run is strictly linear: compile, rename, prefix, write `main.css`,
//! minify, write `main.min.css`. The first failing step ends the run and
//! later steps never execute. Artifacts written before the failure are
//! left in place. CSS the prefix step cannot read is skipped with a
//! warning on stderr rather than failing the run.

use crate::build::{BuildConfiguration, BuildOutput, OutputArtifact};
use crate::less::{self, CompileError};
use crate::minify::{minify, MinifyError};
use crate::prefix::{prefix_with_targets, PrefixError};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Step of the pipeline, used to name where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Compile,
    Prefix,
    Write,
    Minify,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Compile => write!(f, "compile"),
            BuildStep::Prefix => write!(f, "prefix"),
            BuildStep::Write => write!(f, "write"),
            BuildStep::Minify => write!(f, "minify"),
        }
    }
}

/// Error during a pipeline run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The LESS source is missing or invalid
    #[error("compile step failed: {0}")]
    Compile(#[from] CompileError),
    /// Prefixing failed
    #[error("prefix step failed: {0}")]
    Prefix(#[from] PrefixError),
    /// An artifact or the output directory could not be written
    #[error("write step failed: {}: {source}", .path.display())]
    Write {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },
    /// Minification failed
    #[error("minify step failed: {0}")]
    Minify(#[from] MinifyError),
}

impl BuildError {
    /// The step that failed.
    pub fn step(&self) -> BuildStep {
        match self {
            BuildError::Compile(_) => BuildStep::Compile,
            BuildError::Prefix(_) => BuildStep::Prefix,
            BuildError::Write { .. } => BuildStep::Write,
            BuildError::Minify(_) => BuildStep::Minify,
        }
    }

    /// File the failure is attributed to, when one is known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            BuildError::Compile(e) => Some(e.path.as_path()),
            BuildError::Write { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}

/// Pipeline turning one LESS entry file into `main.css` and `main.min.css`.
pub struct StyleBuildPipeline {
    config: BuildConfiguration,
    verbose: bool,
}

impl StyleBuildPipeline {
    /// Create a new pipeline.
    pub fn new(config: BuildConfiguration) -> Self {
        Self { config, verbose: false }
    }

    /// Print a progress line for each step.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &BuildConfiguration {
        &self.config
    }

    /// Run all steps in order.
    pub fn run(&self) -> Result<BuildOutput, BuildError> {
        let start = Instant::now();
        let config = &self.config;

        self.log(format_args!("Compiling {}", config.source_path.display()));
        let compiled = less::compile_file_with_sources(&config.source_path)?;

        let main_path = config.main_path();
        let minified_path = config.minified_path();

        self.log(format_args!("Prefixing for: {}", config.prefix_options.browsers.join(", ")));
        let targets = config.prefix_options.targets()?;
        let filename = config.source_path.display().to_string();
        let prefixed = prefix_with_targets(&compiled.css, targets, config.prefix_options.cascade, &filename)?;
        for warning in &prefixed.warnings {
            eprintln!("Warning: {}", warning);
        }

        fs::create_dir_all(&config.output_dir)
            .map_err(|source| BuildError::Write { path: config.output_dir.clone(), source })?;
        let main = write_artifact(&main_path, &prefixed.css)?;
        self.log(format_args!("Wrote {} ({} bytes)", main.path.display(), main.bytes));

        self.log(format_args!("Minifying"));
        let minified_css = minify(&prefixed.css)?;
        let minified = write_artifact(&minified_path, &minified_css)?;
        self.log(format_args!("Wrote {} ({} bytes)", minified.path.display(), minified.bytes));

        Ok(BuildOutput {
            main,
            minified,
            sources: compiled.sources,
            warnings: prefixed.warnings,
            duration: start.elapsed(),
        })
    }

    fn log(&self, message: fmt::Arguments<'_>) {
        if self.verbose {
            println!("  {}", message);
        }
    }
}

/// Run the pipeline once for `config`.
pub fn run(config: &BuildConfiguration) -> Result<BuildOutput, BuildError> {
    StyleBuildPipeline::new(config.clone()).run()
}

fn write_artifact(path: &Path, contents: &str) -> Result<OutputArtifact, BuildError> {
    fs::write(path, contents).map_err(|source| BuildError::Write { path: path.to_path_buf(), source })?;
    Ok(OutputArtifact { path: path.to_path_buf(), bytes: contents.len() })
}
