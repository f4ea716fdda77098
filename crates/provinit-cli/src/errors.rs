//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use provinit_config::PluginPathsError;
use provinit_plugins::InitError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("failed to determine the working directory: {0}")]
    WorkingDirectory(io::Error),
    #[error("working directory '{}' does not exist", .0.display())]
    MissingWorkingDirectory(PathBuf),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    PluginDirectory(#[from] PluginPathsError),
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(
        "{count} provider plugin(s) do not match the lock manifest; run `provinit init` to reinitialise"
    )]
    LockMismatch { count: usize },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
