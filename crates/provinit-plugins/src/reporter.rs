//! Structured reporting of pipeline events.
//!
//! The pipeline never renders user-facing text itself. It hands structured
//! facts to an [`InitReporter`]; the CLI turns them into console output and
//! [`StructuredReporter`] records them with `tracing`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::ProviderFetchFailure;
use crate::inventory::InstalledPlugin;
use crate::lock::LockManifest;
use crate::version::ConstraintSet;

/// Observer for provider initialisation events.
///
/// Fetch events may arrive from several worker threads; the installer
/// serialises the calls, so implementations only need to be `Send + Sync`.
pub trait InitReporter: Send + Sync {
    /// A missing provider is about to be fetched.
    fn downloading(&self, name: &str, constraints: &ConstraintSet);

    /// A provider was fetched and installed at `path`.
    fn installed(&self, name: &str, path: &Path);

    /// Fetching a provider failed; reported as soon as it happens.
    fn fetch_failed(&self, failure: &ProviderFetchFailure);

    /// A plugin was selected for its provider.
    fn chosen(&self, plugin: &InstalledPlugin);

    /// The lock manifest was written.
    fn lock_written(&self, path: &Path, manifest: &LockManifest);

    /// Constraint suggestions for unconstrained providers, sorted by name.
    fn constraints_suggested(&self, suggestions: &BTreeMap<String, ConstraintSet>);
}

impl<T> InitReporter for Arc<T>
where
    T: InitReporter + ?Sized,
{
    fn downloading(&self, name: &str, constraints: &ConstraintSet) {
        (**self).downloading(name, constraints);
    }

    fn installed(&self, name: &str, path: &Path) {
        (**self).installed(name, path);
    }

    fn fetch_failed(&self, failure: &ProviderFetchFailure) {
        (**self).fetch_failed(failure);
    }

    fn chosen(&self, plugin: &InstalledPlugin) {
        (**self).chosen(plugin);
    }

    fn lock_written(&self, path: &Path, manifest: &LockManifest) {
        (**self).lock_written(path, manifest);
    }

    fn constraints_suggested(&self, suggestions: &BTreeMap<String, ConstraintSet>) {
        (**self).constraints_suggested(suggestions);
    }
}

/// Reporter that records events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredReporter;

impl StructuredReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl InitReporter for StructuredReporter {
    fn downloading(&self, name: &str, constraints: &ConstraintSet) {
        tracing::info!(
            target: "provinit::init",
            event = "downloading",
            provider = name,
            constraints = %constraints,
            "downloading provider plugin"
        );
    }

    fn installed(&self, name: &str, path: &Path) {
        tracing::info!(
            target: "provinit::init",
            event = "installed",
            provider = name,
            path = %path.display(),
            "provider plugin installed"
        );
    }

    fn fetch_failed(&self, failure: &ProviderFetchFailure) {
        tracing::error!(
            target: "provinit::init",
            event = "fetch_failed",
            provider = failure.name.as_str(),
            constraints = %failure.constraints,
            error = %failure.error,
            "provider plugin fetch failed"
        );
    }

    fn chosen(&self, plugin: &InstalledPlugin) {
        tracing::info!(
            target: "provinit::init",
            event = "chosen",
            provider = plugin.name(),
            version = %plugin.version(),
            path = %plugin.path().display(),
            "provider plugin selected"
        );
    }

    fn lock_written(&self, path: &Path, manifest: &LockManifest) {
        tracing::info!(
            target: "provinit::init",
            event = "lock_written",
            path = %path.display(),
            providers = manifest.len(),
            "provider lock manifest written"
        );
    }

    fn constraints_suggested(&self, suggestions: &BTreeMap<String, ConstraintSet>) {
        for (name, constraints) in suggestions {
            tracing::warn!(
                target: "provinit::init",
                event = "constraint_suggested",
                provider = name.as_str(),
                suggestion = %constraints,
                "provider has no version constraint"
            );
        }
    }
}
