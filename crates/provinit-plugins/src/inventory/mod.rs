//! Discovery of installed provider plugin binaries.
//!
//! Plugins are plain executables whose file name carries their identity:
//! `provinit-provider-<name>_v<version>_x<protocol>`, optionally followed by
//! `.exe`. Scanning never fails: unreadable directories and foreign or
//! malformed entries are logged and skipped so one bad file cannot hide the
//! rest of the inventory.

use std::env;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use semver::Version;
use sha2::{Digest as _, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::lock::Digest;
use crate::version::{ConstraintError, ConstraintSet, parse_version};

/// File name prefix shared by every provider plugin binary.
pub const PLUGIN_PREFIX: &str = "provinit-provider-";

const EXE_SUFFIX: &str = ".exe";

/// Reasons a directory entry is not a usable plugin binary.
#[derive(Debug, Error)]
pub enum PluginNameError {
    /// The entry does not carry the plugin prefix.
    #[error("missing plugin file name prefix")]
    NotAPlugin,
    /// The name lacks the `_v<version>_x<protocol>` suffix.
    #[error("expected '<name>_v<version>_x<protocol>' after the prefix")]
    Unversioned,
    /// The provider name part is empty.
    #[error("provider name is empty")]
    EmptyName,
    /// The protocol suffix is not an integer.
    #[error("invalid protocol version '{0}'")]
    InvalidProtocol(String),
    /// The version part is not a semantic version.
    #[error(transparent)]
    InvalidVersion(#[from] ConstraintError),
}

/// A plugin binary found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    name: String,
    version: Version,
    protocol_version: u32,
    path: PathBuf,
}

impl InstalledPlugin {
    /// Creates a plugin record without touching the filesystem.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: Version,
        protocol_version: u32,
        path: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            protocol_version,
            path,
        }
    }

    /// Parses a plugin record from the file name of `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginNameError`] describing why the name is not a
    /// versioned plugin binary name.
    pub fn from_path(path: &Path) -> Result<Self, PluginNameError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(PluginNameError::NotAPlugin)?;
        let stem = file_name.strip_suffix(EXE_SUFFIX).unwrap_or(file_name);
        let unprefixed = stem
            .strip_prefix(PLUGIN_PREFIX)
            .ok_or(PluginNameError::NotAPlugin)?;
        let (head, protocol) = unprefixed
            .rsplit_once("_x")
            .ok_or(PluginNameError::Unversioned)?;
        let (name, version) = head.rsplit_once("_v").ok_or(PluginNameError::Unversioned)?;
        if name.is_empty() {
            return Err(PluginNameError::EmptyName);
        }
        let protocol_version = protocol
            .parse::<u32>()
            .map_err(|_| PluginNameError::InvalidProtocol(protocol.to_owned()))?;
        Ok(Self {
            name: name.to_owned(),
            version: parse_version(version)?,
            protocol_version,
            path: path.to_path_buf(),
        })
    }

    /// Canonical file name for a plugin binary, carrying the host's
    /// executable suffix.
    #[must_use]
    pub fn file_name(name: &str, version: &Version, protocol_version: u32) -> String {
        let suffix = env::consts::EXE_SUFFIX;
        format!("{PLUGIN_PREFIX}{name}_v{version}_x{protocol_version}{suffix}")
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin version.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// Returns the plugin protocol version.
    #[must_use]
    pub const fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    /// Returns the binary path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reports whether this plugin is usable for the given constraints.
    #[must_use]
    pub fn satisfies(&self, constraints: &ConstraintSet, protocol_version: u32) -> bool {
        self.protocol_version == protocol_version && constraints.allows(&self.version)
    }

    /// Computes the SHA-256 digest of the binary.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while reading the binary.
    pub fn sha256(&self) -> io::Result<Digest> {
        let mut file = File::open(&self.path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(Digest::new(hasher.finalize().into()))
    }
}

/// Directories searched for plugins.
///
/// The first directory is the install destination; further directories are
/// searched read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDirs {
    install_dir: PathBuf,
    search_dirs: Vec<PathBuf>,
}

impl PluginDirs {
    /// Creates a handle for a single install directory.
    #[must_use]
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            search_dirs: Vec::new(),
        }
    }

    /// Adds a read-only search directory.
    #[must_use]
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Directory newly fetched plugins are written to.
    #[must_use]
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Every searched directory, install directory first.
    pub fn all(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.install_dir.as_path()).chain(self.search_dirs.iter().map(PathBuf::as_path))
    }
}

/// Snapshot of the plugins found by one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSet {
    plugins: Vec<InstalledPlugin>,
}

impl PluginSet {
    /// Builds a set, sorting entries by name, version and path.
    #[must_use]
    pub fn new(mut plugins: Vec<InstalledPlugin>) -> Self {
        plugins.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.version.cmp(&b.version))
                .then_with(|| a.path.cmp(&b.path))
        });
        Self { plugins }
    }

    /// Iterates every plugin.
    pub fn iter(&self) -> impl Iterator<Item = &InstalledPlugin> {
        self.plugins.iter()
    }

    /// Iterates the plugins for one provider.
    pub fn with_name<'s, 'n>(
        &'s self,
        name: &'n str,
    ) -> impl Iterator<Item = &'s InstalledPlugin> + use<'s, 'n> {
        self.plugins.iter().filter(move |plugin| plugin.name == name)
    }

    /// Highest usable version of `name`; equal versions resolve to the
    /// lexically smallest path.
    #[must_use]
    pub fn newest_satisfying(
        &self,
        name: &str,
        constraints: &ConstraintSet,
        protocol_version: u32,
    ) -> Option<&InstalledPlugin> {
        self.with_name(name)
            .filter(|plugin| plugin.satisfies(constraints, protocol_version))
            .max_by(|a, b| {
                a.version
                    .cmp(&b.version)
                    .then_with(|| b.path.cmp(&a.path))
            })
    }

    /// Returns the number of plugins found.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugin was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Scans every directory in `dirs` for plugin binaries.
///
/// Missing directories contribute nothing. Each call reads the filesystem
/// afresh.
#[must_use]
pub fn scan(dirs: &PluginDirs) -> PluginSet {
    let plugins = dirs.all().flat_map(scan_dir).collect();
    PluginSet::new(plugins)
}

fn scan_dir(dir: &Path) -> Vec<InstalledPlugin> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            debug!(target: "provinit::inventory", dir = %dir.display(), "plugin directory absent");
            return Vec::new();
        }
        Err(error) => {
            warn!(
                target: "provinit::inventory",
                dir = %dir.display(),
                error = %error,
                "skipping unreadable plugin directory"
            );
            return Vec::new();
        }
    };

    entries
        .filter_map(|read| match read {
            Ok(entry) => Some(entry.path()),
            Err(error) => {
                warn!(target: "provinit::inventory", dir = %dir.display(), error = %error, "skipping unreadable entry");
                None
            }
        })
        .filter(|path| path.is_file())
        .filter_map(|path| match InstalledPlugin::from_path(&path) {
            Ok(plugin) => Some(plugin),
            Err(PluginNameError::NotAPlugin) => {
                debug!(target: "provinit::inventory", path = %path.display(), "ignoring non-plugin file");
                None
            }
            Err(error) => {
                warn!(
                    target: "provinit::inventory",
                    path = %path.display(),
                    error = %error,
                    "skipping malformed plugin binary name"
                );
                None
            }
        })
        .collect()
}
