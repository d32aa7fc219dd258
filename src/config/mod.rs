//! Configuration module for the stylesheet build
//!
//! Provides types and parsing for `stylebuild.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
