//! Filesystem mirror fetcher.
//!
//! A mirror is a flat directory of plugin binaries using the canonical
//! plugin file names, typically populated ahead of time for air-gapped
//! environments. [`MirrorFetcher`] installs the newest matching binary from
//! the mirror into the plugin directory.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::Builder;
use tracing::debug;

use crate::error::FetchError;
use crate::installer::Fetcher;
use crate::inventory::{InstalledPlugin, PluginDirs, scan};
use crate::version::ConstraintSet;

/// Installs plugins by copying them from a local mirror directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorFetcher {
    mirror: PathBuf,
}

impl MirrorFetcher {
    /// Creates a fetcher reading from `mirror`.
    #[must_use]
    pub fn new(mirror: impl Into<PathBuf>) -> Self {
        Self {
            mirror: mirror.into(),
        }
    }

    /// Returns the mirror directory.
    #[must_use]
    pub fn mirror(&self) -> &Path {
        &self.mirror
    }
}

impl Fetcher for MirrorFetcher {
    fn fetch(
        &self,
        destination: &Path,
        name: &str,
        constraints: &ConstraintSet,
        protocol_version: u32,
    ) -> Result<PathBuf, FetchError> {
        let available = scan(&PluginDirs::new(self.mirror.as_path()));
        let candidate = available
            .newest_satisfying(name, constraints, protocol_version)
            .ok_or_else(|| FetchError::NoMatchingVersion {
                name: name.to_owned(),
                protocol_version,
            })?;
        debug!(
            target: "provinit::mirror",
            provider = name,
            version = %candidate.version(),
            source = %candidate.path().display(),
            "copying plugin from mirror"
        );
        install_copy(candidate, destination)
    }
}

/// Copies the binary into `destination` via a temporary file and rename.
fn install_copy(candidate: &InstalledPlugin, destination: &Path) -> Result<PathBuf, FetchError> {
    fs::create_dir_all(destination).map_err(|error| FetchError::io(destination, error))?;
    let file_name = InstalledPlugin::file_name(
        candidate.name(),
        candidate.version(),
        candidate.protocol_version(),
    );
    let target = destination.join(&file_name);

    let mut source =
        File::open(candidate.path()).map_err(|error| FetchError::io(candidate.path(), error))?;
    let mut staged = Builder::new()
        .prefix(&file_name)
        .tempfile_in(destination)
        .map_err(|error| FetchError::io(destination, error))?;
    io::copy(&mut source, &mut staged).map_err(|error| FetchError::io(&target, error))?;
    mark_executable(staged.as_file()).map_err(|error| FetchError::io(&target, error))?;
    staged
        .persist(&target)
        .map_err(|error| FetchError::io(&target, error.error))?;
    Ok(target)
}

#[cfg(unix)]
fn mark_executable(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_file: &File) -> io::Result<()> {
    Ok(())
}
