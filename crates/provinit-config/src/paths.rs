//! Derives the on-disk layout shared by the `init` and `verify` commands.
//!
//! Both commands must agree on where plugins are installed and where the lock
//! manifest lives, otherwise `verify` would compare against a manifest that
//! `init` never wrote.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;
use crate::defaults::{DATA_DIR_NAME, LOCK_FILE_NAME};

/// Canonical plugin paths for a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPaths {
    working_dir: PathBuf,
    plugin_dir: PathBuf,
    lock_path: PathBuf,
    mirror_dir: Option<PathBuf>,
}

impl PluginPaths {
    /// Derives plugin paths for `working_dir` from the shared configuration.
    ///
    /// Relative overrides in the configuration are resolved against the
    /// working directory. Nothing is created on disk.
    #[must_use]
    pub fn resolve(config: &Config, working_dir: &Path) -> Self {
        let plugin_dir = config.plugin_dir().map_or_else(
            || working_dir.join(DATA_DIR_NAME).join("plugins"),
            |dir| working_dir.join(dir.as_std_path()),
        );
        let mirror_dir = config
            .mirror_dir()
            .map(|dir| working_dir.join(dir.as_std_path()));
        Self {
            working_dir: working_dir.to_path_buf(),
            lock_path: plugin_dir.join(LOCK_FILE_NAME),
            plugin_dir,
            mirror_dir,
        }
    }

    /// Working directory the paths were derived for.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        self.working_dir.as_path()
    }

    /// Directory plugins are installed into and discovered from.
    #[must_use]
    pub fn plugin_dir(&self) -> &Path {
        self.plugin_dir.as_path()
    }

    /// Path of the plugin lock manifest.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Mirror directory used by the fetcher, when configured.
    #[must_use]
    pub fn mirror_dir(&self) -> Option<&Path> {
        self.mirror_dir.as_deref()
    }

    /// Creates the plugin directory if it does not already exist.
    ///
    /// # Errors
    ///
    /// Returns [`PluginPathsError::PluginDirectory`] when the directory
    /// cannot be created.
    pub fn ensure_plugin_dir(&self) -> Result<(), PluginPathsError> {
        fs::create_dir_all(&self.plugin_dir).map_err(|source| PluginPathsError::PluginDirectory {
            path: self.plugin_dir.clone(),
            source,
        })
    }
}

/// Errors raised while preparing plugin paths.
#[derive(Debug, Error)]
pub enum PluginPathsError {
    /// Creating the plugin directory failed.
    #[error("failed to prepare plugin directory '{path}': {source}")]
    PluginDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
