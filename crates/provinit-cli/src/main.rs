//! CLI entrypoint for provinit.
//!
//! The binary delegates to [`provinit_cli::run`], which loads configuration,
//! parses the subcommand and drives the provider plugin pipeline.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    provinit_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
