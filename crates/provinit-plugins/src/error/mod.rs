//! Domain errors raised by the provider initialisation pipeline.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to keep the enums cheap to move between fetch workers.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::version::{ConstraintError, ConstraintSet};

/// Errors raised while deriving requirements from a module tree and state.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// A requirement source could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A requirement source is not a valid document.
    #[error("malformed document '{path}': {message}")]
    Malformed {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// The configured root module is not defined.
    #[error("root module '{root}' is not defined")]
    MissingRoot {
        /// Name of the missing root module.
        root: String,
    },

    /// A module references a child module that is not defined.
    #[error("module '{parent}' references undefined module '{child}'")]
    UnresolvedModule {
        /// Referencing module.
        parent: String,
        /// Name that could not be resolved.
        child: String,
    },

    /// Module references form a cycle.
    #[error("cyclic module reference: {}", .cycle.join(" -> "))]
    CyclicModule {
        /// Module names along the cycle, first and last being equal.
        cycle: Vec<String>,
    },

    /// A module declares a provider with an empty name.
    #[error("module '{module}' declares a provider with an empty name")]
    EmptyProviderName {
        /// Declaring module.
        module: String,
    },

    /// A provider version constraint could not be parsed.
    #[error("module '{module}' has an invalid constraint for provider '{provider}': {source}")]
    InvalidConstraint {
        /// Declaring module.
        module: String,
        /// Provider the constraint applies to.
        provider: String,
        /// Parser error.
        #[source]
        source: ConstraintError,
    },
}

/// Failure of a single provider fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No version in the source satisfies the constraints and protocol.
    #[error("no version of provider '{name}' matches the constraints and protocol {protocol_version}")]
    NoMatchingVersion {
        /// Provider name.
        name: String,
        /// Protocol version that was requested.
        protocol_version: u32,
    },

    /// An I/O error occurred while installing the plugin.
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Any other fetcher-specific failure.
    #[error("{message}")]
    Other {
        /// Human-readable failure description.
        message: String,
    },
}

impl FetchError {
    /// Wraps an I/O error raised at `path`.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

/// A fetch failure together with the requirement that triggered it.
#[derive(Debug)]
pub struct ProviderFetchFailure {
    /// Provider name.
    pub name: String,
    /// Merged constraints the fetch tried to satisfy.
    pub constraints: ConstraintSet,
    /// Underlying fetch error.
    pub error: FetchError,
}

impl fmt::Display for ProviderFetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "provider '{}' ({}): {}",
            self.name,
            display_constraints(&self.constraints),
            self.error
        )
    }
}

/// Every fetch failure of one installer run.
#[derive(Debug)]
pub struct AggregateFetchError {
    failures: Vec<ProviderFetchFailure>,
}

impl AggregateFetchError {
    /// Builds the aggregate, ordering failures by provider name.
    #[must_use]
    pub fn new(mut failures: Vec<ProviderFetchFailure>) -> Self {
        failures.sort_by(|a, b| a.name.cmp(&b.name));
        Self { failures }
    }

    /// Individual failures, sorted by provider name.
    #[must_use]
    pub fn failures(&self) -> &[ProviderFetchFailure] {
        &self.failures
    }
}

impl fmt::Display for AggregateFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} provider(s) could not be installed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  * {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFetchError {}

/// Errors that abort provider initialisation.
#[derive(Debug, Error)]
pub enum InitError {
    /// Requirements could not be extracted.
    #[error("failed to determine required providers: {0}")]
    Extraction(#[from] ExtractionError),

    /// One or more providers could not be fetched.
    #[error(transparent)]
    Fetch(#[from] AggregateFetchError),

    /// No installed version satisfies a requirement.
    #[error("no installed version of provider '{name}' satisfies {}", display_constraints(.constraints))]
    Unsatisfiable {
        /// Provider name.
        name: String,
        /// Full merged constraint set.
        constraints: ConstraintSet,
    },

    /// A chosen plugin binary could not be hashed.
    #[error("failed to read provider plugin '{name}' at '{path}': {source}")]
    DigestComputation {
        /// Provider name.
        name: String,
        /// Binary that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The lock manifest could not be persisted.
    #[error("failed to save provider lock manifest '{path}': {source}")]
    ManifestWrite {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The lock manifest exists but could not be read or parsed.
    #[error("failed to read provider lock manifest '{path}': {message}")]
    ManifestRead {
        /// Manifest path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Renders a constraint set, spelling out the unconstrained case.
pub(crate) fn display_constraints(constraints: &ConstraintSet) -> String {
    if constraints.is_unconstrained() {
        String::from("any version")
    } else {
        constraints.to_string()
    }
}
