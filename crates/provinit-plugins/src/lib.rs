//! Provider plugin acquisition and locking for provinit.
//!
//! The `provinit-plugins` crate makes sure that every provider a
//! configuration needs is installed as a local plugin binary at a version
//! satisfying the declared constraints, and records the SHA-256 digest of each
//! selected binary in a lock manifest so later runs can detect tampering.
//!
//! # Architecture
//!
//! Requirements come from a [`RequirementExtractor`]; [`ModuleTreeExtractor`]
//! reads them from a JSON module tree and an optional state snapshot. The
//! [`ProviderInit`] pipeline then runs the stages in strict sequence:
//!
//! 1. [`inventory::scan`] lists the plugin binaries already on disk.
//! 2. [`resolver::missing`] keeps the requirements no installed plugin
//!    satisfies.
//! 3. [`Installer`] drives a [`Fetcher`] over the missing set, collecting
//!    every failure before giving up.
//! 4. [`chooser::choose`] selects one plugin per provider from a fresh scan.
//! 5. [`LockManifest`] hashes the chosen binaries and is written atomically.
//! 6. [`advisor::suggest`] proposes constraints for unconstrained providers.
//!
//! Progress is reported as structured facts through an [`InitReporter`].
//!
//! # Example
//!
//! ```rust,no_run
//! use provinit_plugins::{
//!     MirrorFetcher, ModuleTreeExtractor, PluginDirs, ProviderInit, StructuredReporter,
//! };
//! use std::path::Path;
//!
//! let working_dir = Path::new("/srv/infra");
//! let plugins = working_dir.join(".provinit/plugins");
//! let reporter = StructuredReporter::new();
//!
//! let init = ProviderInit::new(PluginDirs::new(&plugins), plugins.join("lock.json"), &reporter);
//! let outcome = init
//!     .run(
//!         &ModuleTreeExtractor::for_working_dir(working_dir),
//!         &MirrorFetcher::new("/srv/mirror"),
//!     )
//!     .expect("providers initialised");
//! assert!(!outcome.manifest.is_empty());
//! ```

pub mod advisor;
pub mod chooser;
pub mod error;
pub mod installer;
pub mod inventory;
pub mod lock;
pub mod mirror;
pub mod module_tree;
pub mod pipeline;
pub mod reporter;
pub mod requirement;
pub mod resolver;
pub mod version;

#[cfg(test)]
mod tests;

pub use self::chooser::ChosenPlugins;
pub use self::error::{
    AggregateFetchError, ExtractionError, FetchError, InitError, ProviderFetchFailure,
};
pub use self::installer::{Fetcher, InstallReport, Installer};
pub use self::inventory::{InstalledPlugin, PluginDirs, PluginSet};
pub use self::lock::{Digest, DigestMismatch, LockManifest};
pub use self::mirror::MirrorFetcher;
pub use self::module_tree::ModuleTreeExtractor;
pub use self::pipeline::{InitOutcome, ProviderInit};
pub use self::reporter::{InitReporter, StructuredReporter};
pub use self::requirement::{ProviderRequirement, RequirementExtractor, Requirements};
pub use self::version::{Constraint, ConstraintSet, Operator};
