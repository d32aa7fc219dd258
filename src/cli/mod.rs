//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod styles;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::{CliOverrides, PrefixProfile};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Stylebuild - compile the documentation stylesheet into prefixed and minified CSS
///
/// Running without a subcommand is the same as `stylebuild styles`.
#[derive(Parser)]
#[command(name = "stylebuild")]
#[command(about = "Compile a LESS entry stylesheet into main.css and main.min.css")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub args: StyleArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build main.css and main.min.css once
    Styles(StyleArgs),

    /// Build, then rebuild whenever a .less file changes
    Watch(StyleArgs),
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Path to stylebuild.toml (default: search upward from the current directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Entry .less file
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Output directory for main.css and main.min.css
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Prefixing profile: default or legacy
    #[arg(long)]
    pub profile: Option<PrefixProfile>,

    /// Browserslist queries, comma separated (overrides the profile)
    #[arg(long, value_delimiter = ',')]
    pub browsers: Option<Vec<String>>,

    /// Align prefixed declarations under the unprefixed one
    /// (`--cascade false` turns off a `cascade = true` from the config file)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub cascade: Option<bool>,

    /// Print each pipeline step
    #[arg(short, long)]
    pub verbose: bool,
}

impl StyleArgs {
    /// Config values given on the command line.
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            source: self.source.clone(),
            out: self.out.clone(),
            profile: self.profile,
            browsers: self.browsers.clone(),
            cascade: self.cascade,
        }
    }
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Styles(args)) => styles::run_styles(&args),
        Some(Commands::Watch(args)) => styles::run_watch(&args),
        None => styles::run_styles(&cli.args),
    }
}
