//! Configuration loading and discovery for `stylebuild.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{PrefixProfile, StylebuildConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up during discovery.
pub const CONFIG_FILE_NAME: &str = "stylebuild.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse stylebuild.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override entry stylesheet
    pub source: Option<PathBuf>,
    /// Override output directory
    pub out: Option<PathBuf>,
    /// Override prefixing profile
    pub profile: Option<PrefixProfile>,
    /// Override browserslist queries
    pub browsers: Option<Vec<String>>,
    /// Override cascade alignment
    pub cascade: Option<bool>,
}

/// Find stylebuild.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find stylebuild.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a stylebuild.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("site/stylebuild.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<StylebuildConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

fn load_config_file(path: &Path) -> Result<StylebuildConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: StylebuildConfig = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Turn validation problems into a single `ConfigError::Validation`.
pub fn validate_config(config: &StylebuildConfig) -> Result<(), ConfigError> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}

/// Configuration used when no stylebuild.toml is found.
pub fn default_config() -> StylebuildConfig {
    StylebuildConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values. An explicit
/// profile on the command line drops any browser list from the file so
/// the profile actually takes effect.
pub fn merge_cli_overrides(config: &mut StylebuildConfig, overrides: &CliOverrides) {
    if let Some(ref source) = overrides.source {
        config.styles.source = source.clone();
    }

    if let Some(ref out) = overrides.out {
        config.styles.out = out.clone();
    }

    if let Some(profile) = overrides.profile {
        config.styles.profile = profile;
        config.styles.browsers = None;
    }

    if let Some(ref browsers) = overrides.browsers {
        config.styles.browsers = Some(browsers.clone());
    }

    if let Some(cascade) = overrides.cascade {
        config.styles.cascade = cascade;
    }
}

/// Get the project root directory from a config file path.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, contents).expect("should write config file");
        config_path
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "[styles]\n");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "[styles]\n");

        let subdir = temp.path().join("src").join("docs").join("less");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(
            temp.path(),
            r#"
[styles]
source = "less/site.less"
out = "dist"
browsers = ["last 2 versions"]
"#,
        );

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.styles.source, PathBuf::from("less/site.less"));
        assert_eq!(config.styles.out, PathBuf::from("dist"));
        assert_eq!(config.styles.browsers, Some(vec!["last 2 versions".to_string()]));
        assert_eq!(config.watch.debounce_ms, 100);
    }

    #[test]
    fn test_load_config_missing_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let result = load_config(Some(&temp.path().join("nonexistent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "this is not valid toml {{{");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "[styles]\nsource = \"\"\n\n[watch]\ndebounce_ms = 0\n");

        let result = load_config(Some(&config_path));
        match result {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_message_lists_each_problem() {
        let err = ConfigError::Validation(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(err.to_string(), "Config validation failed:\n  - first\n  - second");
    }

    #[test]
    fn test_merge_cli_overrides_paths() {
        let mut config = default_config();
        let overrides = CliOverrides {
            source: Some(PathBuf::from("theme/main.less")),
            out: Some(PathBuf::from("public")),
            ..Default::default()
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.styles.source, PathBuf::from("theme/main.less"));
        assert_eq!(config.styles.out, PathBuf::from("public"));
    }

    #[test]
    fn test_merge_cli_profile_clears_file_browsers() {
        let mut config = default_config();
        config.styles.browsers = Some(vec!["ie 8".to_string()]);

        let overrides = CliOverrides { profile: Some(PrefixProfile::Legacy), ..Default::default() };
        merge_cli_overrides(&mut config, &overrides);

        assert_eq!(config.styles.profile, PrefixProfile::Legacy);
        assert_eq!(config.styles.browsers, None);
    }

    #[test]
    fn test_merge_cli_overrides_empty_is_noop() {
        let mut config = default_config();
        merge_cli_overrides(&mut config, &CliOverrides::default());
        assert_eq!(config, default_config());
    }

    #[test]
    fn test_resolve_path_absolute() {
        let root = Path::new("/project");
        assert_eq!(resolve_path(root, Path::new("/other/path")), PathBuf::from("/other/path"));
    }

    #[test]
    fn test_resolve_path_relative() {
        let root = Path::new("/project");
        assert_eq!(
            resolve_path(root, Path::new("src/docs/style")),
            PathBuf::from("/project/src/docs/style")
        );
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/stylebuild.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
    }
}
