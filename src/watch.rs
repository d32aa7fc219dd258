//! Watch mode for automatic rebuilds on file changes
//!
//! Provides file system watching with debouncing for `stylebuild watch`.
//! Builds run one at a time on the watching thread, so the output directory
//! is never written by two runs at once.

use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::build::{BuildConfiguration, BuildError, BuildOutput, StyleBuildPipeline};
use crate::config::schema::WatchConfig;

/// Error during watch mode
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// Directory holding the entry stylesheet does not exist
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

/// Tracks the file blamed for the last failed build, for recovery detection
#[derive(Debug, Default)]
pub struct ErrorTracker {
    failing: Option<PathBuf>,
}

impl ErrorTracker {
    /// Create a new error tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a build outcome; returns the previously failing file if this
    /// build succeeded after it.
    pub fn update(&mut self, failed_file: Option<&Path>) -> Option<PathBuf> {
        match failed_file {
            Some(path) => {
                self.failing = Some(path.to_path_buf());
                None
            }
            None => self.failing.take(),
        }
    }

    /// Whether the last build failed
    pub fn has_errors(&self) -> bool {
        self.failing.is_some()
    }
}

/// Options for watch mode
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// What to build on each change
    pub build: BuildConfiguration,
    /// Watch configuration (debounce, clear screen)
    pub config: WatchConfig,
    /// Verbose output
    pub verbose: bool,
}

impl WatchOptions {
    /// Create options with default watch settings.
    pub fn new(build: BuildConfiguration) -> Self {
        Self { build, config: WatchConfig::default(), verbose: false }
    }

    /// Directory watched for changes: the one containing the entry file.
    pub fn watch_dir(&self) -> PathBuf {
        match self.build.source_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Directories to watch so that a change to any of `sources` is seen.
///
/// Paths are canonicalized when possible; directories nested inside another
/// returned directory are left out since watches are recursive.
pub fn watch_roots(sources: &[PathBuf]) -> Vec<PathBuf> {
    let dirs: BTreeSet<PathBuf> = sources
        .iter()
        .map(|source| match source.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        })
        .map(|dir| dir.canonicalize().unwrap_or(dir))
        .collect();

    dirs.iter().filter(|dir| !dirs.iter().any(|other| other != *dir && dir.starts_with(other))).cloned().collect()
}

/// Clear the terminal screen
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Perform a single build iteration, timing it.
pub fn do_build(options: &WatchOptions) -> (Result<BuildOutput, BuildError>, Duration) {
    let start = Instant::now();
    let result = StyleBuildPipeline::new(options.build.clone()).with_verbose(options.verbose).run();
    (result, start.elapsed())
}

/// Watch for file changes and rebuild automatically.
///
/// Blocks until interrupted (Ctrl+C). Build failures are reported and
/// watching continues.
///
/// # Returns
/// * `Err(WatchError)` if watch setup fails or the event channel closes
pub fn watch_and_rebuild(options: WatchOptions) -> Result<(), WatchError> {
    let watch_dir = options.watch_dir();
    if !watch_dir.exists() {
        return Err(WatchError::SourceNotFound(watch_dir));
    }

    let (tx, rx) = channel();

    let debounce_duration = Duration::from_millis(u64::from(options.config.debounce_ms));
    let mut debouncer = new_debouncer(debounce_duration, tx).map_err(WatchError::WatcherInit)?;

    debouncer.watcher().watch(&watch_dir, RecursiveMode::Recursive).map_err(WatchError::WatchPath)?;
    let mut watched = vec![watch_dir.canonicalize().unwrap_or_else(|_| watch_dir.clone())];

    let mut error_tracker = ErrorTracker::new();

    if options.config.clear_screen {
        clear_screen();
    }
    let sources = build_and_report(&options, &mut error_tracker);
    watch_imports(debouncer.watcher(), &mut watched, &sources);
    println!("[{}] Watching {} for changes...", timestamp(), watch_dir.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant_changes: Vec<_> = events
                    .iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any) && is_relevant_file(&e.path))
                    .collect();

                if relevant_changes.is_empty() {
                    continue;
                }

                if options.config.clear_screen {
                    clear_screen();
                }
                for event in &relevant_changes {
                    if let Some(name) = event.path.file_name() {
                        println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
                    }
                }

                let sources = build_and_report(&options, &mut error_tracker);
                watch_imports(debouncer.watcher(), &mut watched, &sources);
                println!("[{}] Watching {} for changes...", timestamp(), watch_dir.display());
            }
            Ok(Err(error)) => {
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
                eprintln!("[{}] Continuing to watch...", timestamp());
            }
            Err(e) => {
                return Err(WatchError::Channel(e.to_string()));
            }
        }
    }
}

/// Build once and report; returns the files the build read.
fn build_and_report(options: &WatchOptions, error_tracker: &mut ErrorTracker) -> Vec<PathBuf> {
    println!("[{}] Building...", timestamp());
    let (result, duration) = do_build(options);

    let failed_file = result.as_ref().err().map(|e| e.path().unwrap_or(options.build.source_path.as_path()));
    let fixed = error_tracker.update(failed_file);
    print_build_result(&result, duration, fixed.as_deref());

    result.map(|output| output.sources).unwrap_or_default()
}

/// Start watching directories of imported files not yet covered.
fn watch_imports(watcher: &mut dyn Watcher, watched: &mut Vec<PathBuf>, sources: &[PathBuf]) {
    for dir in watch_roots(sources) {
        if watched.iter().any(|covered| dir.starts_with(covered)) {
            continue;
        }
        match watcher.watch(&dir, RecursiveMode::Recursive) {
            Ok(()) => {
                println!("[{}] Also watching {}", timestamp(), dir.display());
                watched.push(dir);
            }
            Err(e) => eprintln!("[{}] Failed to watch {}: {}", timestamp(), dir.display(), e),
        }
    }
}

/// Check if a file is relevant for rebuilding
fn is_relevant_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("less"))
}

/// Print build result to console with a recovery notification
fn print_build_result(result: &Result<BuildOutput, BuildError>, duration: Duration, fixed: Option<&Path>) {
    if let Some(name) = fixed.and_then(Path::file_name) {
        println!("[{}] Fixed: {}", timestamp(), name.to_string_lossy());
    }

    match result {
        Ok(output) => {
            println!(
                "[{}] Build complete ({}) - {}: {} bytes | {}: {} bytes",
                timestamp(),
                format_duration(duration),
                output.main.file_name(),
                output.main.bytes,
                output.minified.file_name(),
                output.minified.bytes
            );
        }
        Err(error) => {
            println!("[{}] Build failed ({}) in {} step", timestamp(), format_duration(duration), error.step());
            eprintln!("[{}] Error: {}", timestamp(), error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefix::PrefixOptions;
    use tempfile::TempDir;

    fn options_for(source: PathBuf, out: PathBuf) -> WatchOptions {
        WatchOptions::new(BuildConfiguration::new(source, out, PrefixOptions::default()))
    }

    #[test]
    fn test_watch_options_defaults() {
        let options = options_for(PathBuf::from("src/docs/less/styles.less"), PathBuf::from("out"));
        assert_eq!(options.config.debounce_ms, 100);
        assert!(options.config.clear_screen);
        assert_eq!(options.watch_dir(), PathBuf::from("src/docs/less"));
    }

    #[test]
    fn test_watch_dir_for_bare_file_name() {
        let options = options_for(PathBuf::from("styles.less"), PathBuf::from("out"));
        assert_eq!(options.watch_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_is_relevant_file() {
        assert!(is_relevant_file(Path::new("styles.less")));
        assert!(is_relevant_file(Path::new("less/VARIABLES.LESS")));
        assert!(!is_relevant_file(Path::new("style/main.css")));
        assert!(!is_relevant_file(Path::new("readme.md")));
        assert!(!is_relevant_file(Path::new("noextension")));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.as_bytes()[2], b':');
        assert_eq!(ts.as_bytes()[5], b':');
    }

    #[test]
    fn test_watch_error_source_not_found() {
        let options = options_for(PathBuf::from("/nonexistent/path/styles.less"), PathBuf::from("/tmp/out"));
        let result = watch_and_rebuild(options);
        assert!(matches!(result, Err(WatchError::SourceNotFound(_))));
    }

    #[test]
    fn test_do_build_runs_pipeline() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("styles.less");
        std::fs::write(&source, ".a { color: blue; }").unwrap();
        let out = temp.path().join("style");

        let (result, _duration) = do_build(&options_for(source, out.clone()));
        assert!(result.is_ok());
        assert!(out.join("main.css").exists());
        assert!(out.join("main.min.css").exists());
    }

    #[test]
    fn test_watch_roots_cover_imports_outside_entry_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("less/parts")).unwrap();
        std::fs::create_dir_all(root.join("shared")).unwrap();

        let sources = vec![
            root.join("less/styles.less"),
            root.join("less/parts/nav.less"),
            root.join("less/../shared/vars.less"),
        ];

        assert_eq!(watch_roots(&sources), vec![root.join("less"), root.join("shared")]);
    }

    #[test]
    fn test_build_reports_sources_for_watching() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("less")).unwrap();
        std::fs::create_dir_all(temp.path().join("shared")).unwrap();
        std::fs::write(temp.path().join("shared/vars.less"), "@c: red;").unwrap();
        let source = temp.path().join("less/styles.less");
        std::fs::write(&source, "@import \"../shared/vars\";\n.a { color: @c; }").unwrap();

        let mut tracker = ErrorTracker::new();
        let sources = build_and_report(&options_for(source, temp.path().join("style")), &mut tracker);

        let roots = watch_roots(&sources);
        assert!(roots.contains(&temp.path().join("shared").canonicalize().unwrap()), "got: {:?}", roots);
    }

    #[test]
    fn test_error_tracker_detects_recovery() {
        let mut tracker = ErrorTracker::new();
        assert!(!tracker.has_errors());

        assert_eq!(tracker.update(Some(Path::new("less/broken.less"))), None);
        assert!(tracker.has_errors());

        assert_eq!(tracker.update(Some(Path::new("less/broken.less"))), None);
        assert_eq!(tracker.update(None), Some(PathBuf::from("less/broken.less")));
        assert!(!tracker.has_errors());

        assert_eq!(tracker.update(None), None);
    }

    #[test]
    fn test_build_failure_blames_compile_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("styles.less");
        std::fs::write(&source, ".a { color: @missing; }").unwrap();

        let (result, _) = do_build(&options_for(source.clone(), temp.path().join("style")));
        let err = result.unwrap_err();
        assert_eq!(err.path(), Some(source.as_path()));
    }
}
