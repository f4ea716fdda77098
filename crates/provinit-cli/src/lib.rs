//! Command-line interface runtime for provinit.
//!
//! The module owns argument parsing, configuration bootstrapping and the
//! wiring of the provider plugin pipeline. [`run`] takes its IO streams as
//! parameters so the whole CLI can be exercised in-process by tests.

use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use provinit_config::{Config, PluginPaths};
use provinit_plugins::{
    ConstraintSet, FetchError, Fetcher, InitReporter, MirrorFetcher, ModuleTreeExtractor,
    PluginDirs, ProviderInit, StructuredReporter,
};

mod config;
mod errors;
mod output;
mod telemetry;

use config::{ConfigLoader, OrthoConfigLoader, split_arguments};
use errors::AppError;
use output::{ConsoleReporter, INIT_EMPTY, INIT_SUCCESS};

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write + Send,
    E: Write + Send,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write + Send,
    E: Write + Send,
    L: ConfigLoader,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_arguments(&arguments);

    let cli = match Cli::try_parse_from(&split.command) {
        Ok(cli) => cli,
        Err(error) if error.use_stderr() => {
            let _ = write!(stderr, "{error}");
            return ExitCode::FAILURE;
        }
        Err(error) => {
            // Help and version output.
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
    };

    let result = loader
        .load(&split.config)
        .and_then(|config| execute(cli.command, &config, stdout, stderr));
    match result {
        Ok(exit_code) => exit_code,
        Err(error) => {
            tracing::error!(target: "provinit::cli", error = %error, "command failed");
            let _ = writeln!(stderr, "Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W, E>(
    command: CliCommand,
    config: &Config,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    W: Write + Send,
    E: Write + Send,
{
    telemetry::initialise(config)?;
    match command {
        CliCommand::Init { path, get_plugins } => {
            let working_dir = working_dir(path)?;
            init(&working_dir, get_plugins, config, stdout, stderr)
        }
        CliCommand::Verify { path } => {
            let working_dir = working_dir(path)?;
            verify(&working_dir, config, stdout, stderr)
        }
    }
}

fn working_dir(path: Option<PathBuf>) -> Result<PathBuf, AppError> {
    let dir = match path {
        Some(path) => path,
        None => env::current_dir().map_err(AppError::WorkingDirectory)?,
    };
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(AppError::MissingWorkingDirectory(dir))
    }
}

fn pipeline<'a>(
    paths: &PluginPaths,
    config: &Config,
    reporter: &'a dyn InitReporter,
) -> ProviderInit<'a> {
    ProviderInit::new(
        PluginDirs::new(paths.plugin_dir()),
        paths.lock_path(),
        reporter,
    )
    .with_protocol_version(config.protocol_version())
    .with_concurrency(config.fetch_concurrency())
}

fn init<W, E>(
    working_dir: &Path,
    get_plugins: bool,
    config: &Config,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    W: Write + Send,
    E: Write + Send,
{
    let extractor = ModuleTreeExtractor::for_working_dir(working_dir);
    if !extractor.tree_path().exists() {
        writeln!(stdout, "{INIT_EMPTY}")?;
        return Ok(ExitCode::SUCCESS);
    }

    let paths = PluginPaths::resolve(config, working_dir);
    paths.ensure_plugin_dir()?;

    let reporter = ConsoleReporter::new(stdout, stderr);
    let init = pipeline(&paths, config, &reporter).with_fetching(get_plugins);
    if get_plugins {
        reporter.say("Initialising provider plugins...");
    }
    match paths.mirror_dir() {
        Some(mirror) => init.run(&extractor, &MirrorFetcher::new(mirror))?,
        None => init.run(&extractor, &UnconfiguredFetcher)?,
    };
    reporter.say(&format!("\n{INIT_SUCCESS}"));
    Ok(ExitCode::SUCCESS)
}

fn verify<W, E>(
    working_dir: &Path,
    config: &Config,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    W: Write,
    E: Write,
{
    let paths = PluginPaths::resolve(config, working_dir);
    let reporter = StructuredReporter::new();
    let mismatches = pipeline(&paths, config, &reporter)
        .verify(&ModuleTreeExtractor::for_working_dir(working_dir))?;

    if mismatches.is_empty() {
        writeln!(stdout, "Provider plugins match the lock manifest.")?;
        return Ok(ExitCode::SUCCESS);
    }
    for mismatch in &mismatches {
        writeln!(stderr, "- {mismatch}")?;
    }
    Err(AppError::LockMismatch {
        count: mismatches.len(),
    })
}

/// Fetcher used when no plugin source is configured.
struct UnconfiguredFetcher;

impl Fetcher for UnconfiguredFetcher {
    fn fetch(
        &self,
        _destination: &Path,
        _name: &str,
        _constraints: &ConstraintSet,
        _protocol_version: u32,
    ) -> Result<PathBuf, FetchError> {
        Err(FetchError::Other {
            message: String::from(
                "no plugin mirror is configured; set --mirror-dir or PROVINIT_MIRROR_DIR",
            ),
        })
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "provinit",
    version,
    about = "Installs and locks provider plugins for a working directory",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum CliCommand {
    /// Installs missing provider plugins and writes the lock manifest.
    Init {
        /// Working directory holding `providers.json`; defaults to the
        /// current directory.
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
        /// Fetches missing plugins; with `false` only installed plugins are
        /// considered.
        #[arg(
            long,
            value_name = "BOOL",
            action = ArgAction::Set,
            num_args = 0..=1,
            default_value_t = true,
            default_missing_value = "true"
        )]
        get_plugins: bool,
    },
    /// Checks installed plugins against the lock manifest.
    Verify {
        /// Working directory to verify; defaults to the current directory.
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}
