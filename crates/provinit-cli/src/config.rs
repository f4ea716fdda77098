//! Configuration loading for the provinit CLI.
//!
//! Configuration flags must precede the subcommand. Everything up to the
//! first token that is not a recognised configuration flag goes to
//! `ortho-config`; the rest goes to `clap`.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use provinit_config::Config;

use crate::errors::AppError;

/// Flags understood by the configuration loader.
///
/// Kept in sync with the fields of [`provinit_config::Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--protocol-version",
    "--fetch-concurrency",
    "--plugin-dir",
    "--mirror-dir",
];

/// Source of the resolved configuration.
pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered configuration arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

/// Loader backed by `ortho-config` layering.
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

/// Classification of one leading argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFlag {
    /// A configuration flag carrying its value inline (`--flag=value`).
    Inline,
    /// A configuration flag whose value is the next argument.
    Separate,
    /// Not a configuration flag: the command starts here.
    NotConfig,
}

fn classify(argument: &OsStr) -> ConfigFlag {
    let text = argument.to_string_lossy();
    let (flag, inline) = text
        .split_once('=')
        .map_or((&*text, false), |(flag, _)| (flag, true));
    if !CONFIG_CLI_FLAGS.contains(&flag) {
        ConfigFlag::NotConfig
    } else if inline {
        ConfigFlag::Inline
    } else {
        ConfigFlag::Separate
    }
}

/// Arguments split between the configuration loader and the command parser.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ArgumentSplit {
    /// Program name followed by the configuration flags.
    pub(crate) config: Vec<OsString>,
    /// Program name followed by the subcommand and its arguments.
    pub(crate) command: Vec<OsString>,
}

/// Separates the leading configuration flags from the command tokens.
pub(crate) fn split_arguments(args: &[OsString]) -> ArgumentSplit {
    let mut remaining = args.iter();
    let Some(program) = remaining.next() else {
        return ArgumentSplit::default();
    };

    let mut config = vec![program.clone()];
    let mut command = vec![program.clone()];
    while let Some(argument) = remaining.next() {
        match classify(argument) {
            ConfigFlag::Inline => config.push(argument.clone()),
            ConfigFlag::Separate => {
                config.push(argument.clone());
                config.extend(remaining.next().cloned());
            }
            ConfigFlag::NotConfig => {
                command.push(argument.clone());
                command.extend(remaining.by_ref().cloned());
                break;
            }
        }
    }
    ArgumentSplit { config, command }
}
