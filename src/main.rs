//! Stylebuild - Command-line tool compiling LESS into prefixed, minified CSS

use std::process::ExitCode;

use stylebuild::cli;

fn main() -> ExitCode {
    cli::run()
}
