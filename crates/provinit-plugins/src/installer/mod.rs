//! Installs missing provider plugins through a [`Fetcher`].
//!
//! Each missing provider is fetched independently. A failure is reported at
//! once and collected, and the remaining providers are still attempted; the
//! stage fails only after every outcome is known, so one run tells the user
//! about every unavailable provider.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::error::{AggregateFetchError, FetchError, ProviderFetchFailure};
use crate::reporter::InitReporter;
use crate::requirement::{ProviderRequirement, Requirements};
use crate::version::ConstraintSet;

/// Source of provider plugin binaries.
///
/// Implementations write the binary into `destination` under its canonical
/// plugin file name, so concurrent fetches of different providers never
/// collide, and return the installed path.
pub trait Fetcher: Send + Sync {
    /// Installs a version of `name` satisfying `constraints` and speaking
    /// `protocol_version`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when no suitable plugin can be installed.
    fn fetch(
        &self,
        destination: &Path,
        name: &str,
        constraints: &ConstraintSet,
        protocol_version: u32,
    ) -> Result<PathBuf, FetchError>;
}

/// Providers installed by one installer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    installed: BTreeMap<String, PathBuf>,
}

impl InstallReport {
    /// Installed binary path per provider, sorted by name.
    #[must_use]
    pub const fn installed(&self) -> &BTreeMap<String, PathBuf> {
        &self.installed
    }

    /// Returns `true` when nothing was installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

/// Running fold of fetch outcomes.
#[derive(Default)]
struct Outcome {
    installed: BTreeMap<String, PathBuf>,
    failures: Vec<ProviderFetchFailure>,
}

impl Outcome {
    fn announce(&self, requirement: &ProviderRequirement, reporter: &dyn InitReporter) {
        reporter.downloading(requirement.name(), requirement.constraints());
    }

    fn record(
        &mut self,
        requirement: &ProviderRequirement,
        result: Result<PathBuf, FetchError>,
        reporter: &dyn InitReporter,
    ) {
        match result {
            Ok(path) => {
                reporter.installed(requirement.name(), &path);
                self.installed.insert(requirement.name().to_owned(), path);
            }
            Err(error) => {
                let failure = ProviderFetchFailure {
                    name: requirement.name().to_owned(),
                    constraints: requirement.constraints().clone(),
                    error,
                };
                reporter.fetch_failed(&failure);
                self.failures.push(failure);
            }
        }
    }

    fn finish(self) -> Result<InstallReport, AggregateFetchError> {
        if self.failures.is_empty() {
            Ok(InstallReport {
                installed: self.installed,
            })
        } else {
            Err(AggregateFetchError::new(self.failures))
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives a [`Fetcher`] over the missing requirement set.
pub struct Installer<'a, F: ?Sized> {
    fetcher: &'a F,
    reporter: &'a dyn InitReporter,
    protocol_version: u32,
    concurrency: usize,
}

impl<'a, F> Installer<'a, F>
where
    F: Fetcher + ?Sized,
{
    /// Creates a sequential installer.
    #[must_use]
    pub fn new(fetcher: &'a F, reporter: &'a dyn InitReporter, protocol_version: u32) -> Self {
        Self {
            fetcher,
            reporter,
            protocol_version,
            concurrency: 1,
        }
    }

    /// Allows up to `concurrency` fetches in flight; zero behaves like one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetches every requirement in `missing` into `destination`.
    ///
    /// An empty `missing` set is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an [`AggregateFetchError`] listing every provider that could
    /// not be fetched, after all providers were attempted.
    pub fn install(
        &self,
        missing: &Requirements,
        destination: &Path,
    ) -> Result<InstallReport, AggregateFetchError> {
        let workers = self.concurrency.min(missing.len());
        if workers <= 1 {
            return self.install_sequential(missing, destination);
        }
        self.install_concurrent(missing, destination, workers)
    }

    fn install_sequential(
        &self,
        missing: &Requirements,
        destination: &Path,
    ) -> Result<InstallReport, AggregateFetchError> {
        missing
            .iter()
            .fold(Outcome::default(), |mut outcome, requirement| {
                outcome.announce(requirement, self.reporter);
                let result = self.fetch_one(requirement, destination);
                outcome.record(requirement, result, self.reporter);
                outcome
            })
            .finish()
    }

    fn install_concurrent(
        &self,
        missing: &Requirements,
        destination: &Path,
        workers: usize,
    ) -> Result<InstallReport, AggregateFetchError> {
        let queue = Mutex::new(missing.iter());
        let outcome = Mutex::new(Outcome::default());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        // Bound first so the queue guard drops before fetching.
                        let next = lock(&queue).next();
                        let Some(requirement) = next else {
                            break;
                        };
                        lock(&outcome).announce(requirement, self.reporter);
                        let result = self.fetch_one(requirement, destination);
                        lock(&outcome).record(requirement, result, self.reporter);
                    }
                });
            }
        });

        outcome
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .finish()
    }

    fn fetch_one(
        &self,
        requirement: &ProviderRequirement,
        destination: &Path,
    ) -> Result<PathBuf, FetchError> {
        self.fetcher.fetch(
            destination,
            requirement.name(),
            requirement.constraints(),
            self.protocol_version,
        )
    }
}
