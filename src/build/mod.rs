//! Stylesheet build pipeline
//!
//! Turns one LESS entry file into two CSS artifacts in an output directory:
//! `main.css` (prefixed) and `main.min.css` (prefixed and minified).
//!
//! # Example
//!
//! ```ignore
//! use stylebuild::build::{BuildConfiguration, StyleBuildPipeline};
//! use stylebuild::config::load_config;
//!
//! let config = load_config(None)?;
//! let build = BuildConfiguration::from_config(&config, project_root);
//! let output = StyleBuildPipeline::new(build).with_verbose(true).run()?;
//! println!("{}", output.summary());
//! ```

pub mod context;
pub mod pipeline;
pub mod result;

pub use context::*;
pub use pipeline::*;
pub use result::*;
