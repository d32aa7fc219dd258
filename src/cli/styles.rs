//! Style command implementations (styles, watch)

use std::path::PathBuf;
use std::process::ExitCode;

use super::{StyleArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::{BuildConfiguration, StyleBuildPipeline};
use crate::config::{
    default_config, find_config, load_config, merge_cli_overrides, resolve_path, validate_config,
    ConfigError, StylebuildConfig,
};
use crate::watch::{watch_and_rebuild, WatchOptions};

/// Load stylebuild.toml (explicit or discovered), apply CLI overrides and
/// return the settings with the directory relative paths resolve against.
fn load_settings(args: &StyleArgs) -> Result<(StylebuildConfig, PathBuf), ExitCode> {
    let config_path = args.config.clone().or_else(find_config);

    let (config, project_root) = match config_path {
        Some(config_path) => {
            if args.verbose {
                println!("Using config: {}", config_path.display());
            }
            let config = load_config(Some(&config_path)).map_err(|e| {
                eprintln!("Error loading config: {}", e);
                config_exit_code(&e)
            })?;
            let root = match config_path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => std::env::current_dir().unwrap_or_default(),
            };
            (config, root)
        }
        None => {
            if args.verbose {
                println!("No stylebuild.toml found, using defaults");
            }
            (default_config(), std::env::current_dir().unwrap_or_default())
        }
    };

    // Paths given on the command line are relative to the working directory
    let cwd = std::env::current_dir().unwrap_or_default();
    let mut overrides = args.overrides();
    overrides.source = overrides.source.map(|p| resolve_path(&cwd, &p));
    overrides.out = overrides.out.map(|p| resolve_path(&cwd, &p));

    let mut config = config;
    merge_cli_overrides(&mut config, &overrides);
    if let Err(e) = validate_config(&config) {
        eprintln!("Error: {}", e);
        return Err(config_exit_code(&e));
    }

    Ok((config, project_root))
}

fn config_exit_code(error: &ConfigError) -> ExitCode {
    match error {
        ConfigError::Validation(_) => ExitCode::from(EXIT_INVALID_ARGS),
        _ => ExitCode::from(EXIT_ERROR),
    }
}

/// Run the styles command: one pipeline run
pub fn run_styles(args: &StyleArgs) -> ExitCode {
    let (config, project_root) = match load_settings(args) {
        Ok(settings) => settings,
        Err(code) => return code,
    };

    let build = BuildConfiguration::from_config(&config, &project_root);
    if args.verbose {
        println!("Building {} -> {}", build.source_path.display(), build.output_dir.display());
    }

    match StyleBuildPipeline::new(build).with_verbose(args.verbose).run() {
        Ok(output) => {
            println!("{}", output.summary());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the watch command: build, then rebuild on every .less change
pub fn run_watch(args: &StyleArgs) -> ExitCode {
    let (config, project_root) = match load_settings(args) {
        Ok(settings) => settings,
        Err(code) => return code,
    };

    let options = WatchOptions {
        build: BuildConfiguration::from_config(&config, &project_root),
        config: config.watch.clone(),
        verbose: args.verbose,
    };

    println!("Starting watch mode...");
    println!("Press Ctrl+C to stop");
    println!();

    match watch_and_rebuild(options) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Watch error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
