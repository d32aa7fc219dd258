//! Configuration schema types for `stylebuild.toml`
//!
//! Defines the structure and validation rules for the stylesheet build.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Browser targets used by the `legacy` prefixing profile.
pub const LEGACY_BROWSERS: &[&str] = &["> 0%", "last 2 versions", "Firefox ESR", "Opera 12.1"];

/// Browserslist query used by the `default` prefixing profile.
pub const DEFAULT_BROWSERS: &[&str] = &["defaults"];

/// Named prefixing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrefixProfile {
    /// Broad browserslist defaults, no explicit target list
    #[default]
    Default,
    /// Explicit list reaching back to old browsers
    Legacy,
}

impl PrefixProfile {
    /// Browserslist queries for this profile.
    pub fn browsers(self) -> Vec<String> {
        let queries = match self {
            PrefixProfile::Default => DEFAULT_BROWSERS,
            PrefixProfile::Legacy => LEGACY_BROWSERS,
        };
        queries.iter().map(|q| q.to_string()).collect()
    }
}

impl FromStr for PrefixProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(PrefixProfile::Default),
            "legacy" => Ok(PrefixProfile::Legacy),
            other => Err(format!("unknown prefix profile '{}' (expected 'default' or 'legacy')", other)),
        }
    }
}

impl std::fmt::Display for PrefixProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefixProfile::Default => write!(f, "default"),
            PrefixProfile::Legacy => write!(f, "legacy"),
        }
    }
}

/// Stylesheet build section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Entry `.less` file
    #[serde(default = "default_source")]
    pub source: PathBuf,
    /// Directory receiving `main.css` and `main.min.css`
    #[serde(default = "default_out")]
    pub out: PathBuf,
    /// Prefixing profile
    #[serde(default)]
    pub profile: PrefixProfile,
    /// Explicit browserslist queries (overrides the profile)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browsers: Option<Vec<String>>,
    /// Align prefixed declarations under the unprefixed one
    #[serde(default)]
    pub cascade: bool,
}

fn default_source() -> PathBuf {
    PathBuf::from("src/docs/less/styles.less")
}

fn default_out() -> PathBuf {
    PathBuf::from("src/docs/style")
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            out: default_out(),
            profile: PrefixProfile::default(),
            browsers: None,
            cascade: false,
        }
    }
}

impl StylesConfig {
    /// Browserslist queries in effect: the explicit list, else the profile's.
    pub fn effective_browsers(&self) -> Vec<String> {
        self.browsers.clone().unwrap_or_else(|| self.profile.browsers())
    }
}

/// Watch mode settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default = "default_true")]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100, clear_screen: true }
    }
}

/// Complete stylebuild.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylebuildConfig {
    /// Stylesheet build
    #[serde(default)]
    pub styles: StylesConfig,
    /// Watch mode
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "styles.browsers")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stylebuild.toml: '{}' {}", self.field, self.message)
    }
}

impl StylebuildConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.styles.source.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "styles.source".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        } else if self.styles.source.extension().map_or(true, |ext| ext != "less") {
            errors.push(ConfigValidationError {
                field: "styles.source".to_string(),
                message: "must name a .less file".to_string(),
            });
        }

        if self.styles.out.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "styles.out".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        }

        if let Some(browsers) = &self.styles.browsers {
            if browsers.is_empty() {
                errors.push(ConfigValidationError {
                    field: "styles.browsers".to_string(),
                    message: "must contain at least one query (omit it to use the profile)".to_string(),
                });
            }
            for (index, query) in browsers.iter().enumerate() {
                if query.trim().is_empty() {
                    errors.push(ConfigValidationError {
                        field: format!("styles.browsers[{}]", index),
                        message: "must be a non-empty query".to_string(),
                    });
                }
            }
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
