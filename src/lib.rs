//! Stylebuild - Library for building the documentation stylesheet
//!
//! This library provides functionality to:
//! - Compile a LESS entry file (variables, nesting, imports, mixins) to CSS
//! - Add vendor prefixes for a browser-target profile
//! - Write `main.css` and a minified `main.min.css`
//! - Rebuild automatically when `.less` sources change

pub mod build;
pub mod cli;
pub mod config;
pub mod less;
pub mod minify;
pub mod prefix;
pub mod watch;
