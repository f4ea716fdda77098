//! Sequencing of the provider initialisation stages.
//!
//! [`ProviderInit::run`] performs extract → scan → resolve → install →
//! re-scan → choose → lock → advise. Each stage either completes or stops
//! the run with an [`InitError`]; nothing after a failed stage executes, so a
//! failed run never rewrites the lock manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::advisor::suggest;
use crate::chooser::{ChosenPlugins, choose};
use crate::error::InitError;
use crate::installer::{Fetcher, Installer};
use crate::inventory::{PluginDirs, scan};
use crate::lock::{DigestMismatch, LockManifest};
use crate::reporter::InitReporter;
use crate::requirement::{RequirementExtractor, Requirements};
use crate::resolver::missing;
use crate::version::ConstraintSet;

/// Result of a successful initialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    /// Extracted requirements.
    pub requirements: Requirements,
    /// Selected plugin per provider.
    pub chosen: ChosenPlugins,
    /// Manifest that was written.
    pub manifest: LockManifest,
    /// Suggested constraints for unconstrained providers.
    pub suggestions: BTreeMap<String, ConstraintSet>,
}

/// Provider initialisation for one working directory.
pub struct ProviderInit<'a> {
    dirs: PluginDirs,
    lock_path: PathBuf,
    protocol_version: u32,
    concurrency: usize,
    fetch_missing: bool,
    reporter: &'a dyn InitReporter,
}

impl<'a> ProviderInit<'a> {
    /// Creates a pipeline installing into `dirs` and locking at `lock_path`.
    ///
    /// Defaults to protocol version 4, sequential fetches and fetching
    /// enabled.
    #[must_use]
    pub fn new(
        dirs: PluginDirs,
        lock_path: impl Into<PathBuf>,
        reporter: &'a dyn InitReporter,
    ) -> Self {
        Self {
            dirs,
            lock_path: lock_path.into(),
            protocol_version: 4,
            concurrency: 1,
            fetch_missing: true,
            reporter,
        }
    }

    /// Sets the host plugin protocol version.
    #[must_use]
    pub const fn with_protocol_version(mut self, protocol_version: u32) -> Self {
        self.protocol_version = protocol_version;
        self
    }

    /// Sets the maximum number of concurrent fetches.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Enables or disables fetching of missing providers.
    ///
    /// With fetching disabled, only plugins already on disk are considered
    /// and a missing provider fails the choose stage.
    #[must_use]
    pub const fn with_fetching(mut self, fetch_missing: bool) -> Self {
        self.fetch_missing = fetch_missing;
        self
    }

    /// Returns the lock manifest path.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Runs every stage and writes the lock manifest.
    ///
    /// # Errors
    ///
    /// Returns the [`InitError`] of the first stage that fails.
    pub fn run<E, F>(&self, extractor: &E, fetcher: &F) -> Result<InitOutcome, InitError>
    where
        E: RequirementExtractor + ?Sized,
        F: Fetcher + ?Sized,
    {
        let requirements = extractor.extract()?;
        debug!(
            target: "provinit::pipeline",
            providers = requirements.len(),
            "requirements extracted"
        );

        if self.fetch_missing {
            let available = scan(&self.dirs);
            let to_fetch = missing(&requirements, &available, self.protocol_version);
            info!(
                target: "provinit::pipeline",
                installed = available.len(),
                missing = to_fetch.len(),
                "resolved provider requirements"
            );
            Installer::new(fetcher, self.reporter, self.protocol_version)
                .with_concurrency(self.concurrency)
                .install(&to_fetch, self.dirs.install_dir())?;
        } else {
            info!(target: "provinit::pipeline", "plugin fetching disabled");
        }

        let chosen = self.choose_installed(&requirements)?;
        let manifest = LockManifest::from_chosen(&chosen)?;
        manifest.write(&self.lock_path)?;
        self.reporter.lock_written(&self.lock_path, &manifest);

        let suggestions = suggest(&chosen, &requirements);
        if !suggestions.is_empty() {
            self.reporter.constraints_suggested(&suggestions);
        }

        Ok(InitOutcome {
            requirements,
            chosen,
            manifest,
            suggestions,
        })
    }

    /// Recomputes the digests of the selected plugins and compares them with
    /// the persisted manifest.
    ///
    /// An empty result means the installed plugins match the lock.
    ///
    /// # Errors
    ///
    /// Fails when requirements cannot be extracted, a requirement has no
    /// installed plugin, a binary cannot be hashed, or the manifest cannot
    /// be read.
    pub fn verify<E>(&self, extractor: &E) -> Result<Vec<DigestMismatch>, InitError>
    where
        E: RequirementExtractor + ?Sized,
    {
        let requirements = extractor.extract()?;
        let chosen = choose(&requirements, &scan(&self.dirs), self.protocol_version)?;
        let current = LockManifest::from_chosen(&chosen)?;
        let locked = LockManifest::read(&self.lock_path)?;
        let mismatches = locked.verify(&current);
        info!(
            target: "provinit::pipeline",
            providers = current.len(),
            mismatches = mismatches.len(),
            "verified provider lock manifest"
        );
        Ok(mismatches)
    }

    fn choose_installed(&self, requirements: &Requirements) -> Result<ChosenPlugins, InitError> {
        let chosen = choose(requirements, &scan(&self.dirs), self.protocol_version)?;
        for plugin in chosen.values() {
            self.reporter.chosen(plugin);
        }
        Ok(chosen)
    }
}
