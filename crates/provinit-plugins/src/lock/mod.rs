//! Provider lock manifest: the persisted provider → digest mapping.
//!
//! `init` records the SHA-256 digest of every chosen plugin binary. Later
//! commands recompute the digests and compare them with the manifest; any
//! difference means a plugin changed outside of a deliberate re-initialisation.
//! The manifest is always written whole and replaced atomically.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tempfile::Builder;

use crate::chooser::ChosenPlugins;
use crate::error::InitError;

/// Length in bytes of a plugin digest.
pub const DIGEST_LEN: usize = 32;

/// SHA-256 digest of a plugin binary.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

impl FromStr for Digest {
    type Err = hex::FromHexError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0_u8; DIGEST_LEN];
        hex::decode_to_slice(text.trim(), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Difference between a persisted manifest and the current plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestMismatch {
    /// The binary changed since the manifest was written.
    Changed {
        /// Provider name.
        name: String,
        /// Digest recorded in the manifest.
        expected: Digest,
        /// Digest of the binary now on disk.
        actual: Digest,
    },
    /// A required provider has no entry in the manifest.
    NotLocked {
        /// Provider name.
        name: String,
    },
    /// The manifest lists a provider that is no longer selected.
    NotInstalled {
        /// Provider name.
        name: String,
    },
}

impl DigestMismatch {
    /// Provider the mismatch concerns.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Changed { name, .. } | Self::NotLocked { name } | Self::NotInstalled { name } => {
                name
            }
        }
    }
}

impl fmt::Display for DigestMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed {
                name,
                expected,
                actual,
            } => write!(
                f,
                "provider '{name}' binary changed: locked {expected}, found {actual}"
            ),
            Self::NotLocked { name } => write!(f, "provider '{name}' is not in the lock manifest"),
            Self::NotInstalled { name } => {
                write!(f, "locked provider '{name}' is no longer installed")
            }
        }
    }
}

/// Provider name → binary digest mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockManifest {
    digests: BTreeMap<String, Digest>,
}

impl LockManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes every chosen plugin binary.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::DigestComputation`] for the first binary that
    /// cannot be read; no partial manifest is produced.
    pub fn from_chosen(chosen: &ChosenPlugins) -> Result<Self, InitError> {
        let digests = chosen
            .iter()
            .map(|(name, plugin)| {
                plugin
                    .sha256()
                    .map(|digest| (name.clone(), digest))
                    .map_err(|source| InitError::DigestComputation {
                        name: name.clone(),
                        path: plugin.path().to_path_buf(),
                        source: Arc::new(source),
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self { digests })
    }

    /// Records a digest for `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, digest: Digest) {
        self.digests.insert(name.into(), digest);
    }

    /// Looks up the digest recorded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Digest> {
        self.digests.get(name)
    }

    /// Iterates entries in provider name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Digest)> {
        self.digests.iter().map(|(name, digest)| (name.as_str(), digest))
    }

    /// Returns the number of locked providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Returns `true` when no provider is locked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Reads a manifest; a missing file reads as an empty manifest.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::ManifestRead`] when the file exists but cannot be
    /// read or parsed.
    pub fn read(path: &Path) -> Result<Self, InitError> {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(error) => {
                return Err(InitError::ManifestRead {
                    path: path.to_path_buf(),
                    message: error.to_string(),
                });
            }
        };
        serde_json::from_slice(&contents).map_err(|error| InitError::ManifestRead {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    /// Serialises the manifest and atomically replaces the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::ManifestWrite`] when the manifest cannot be
    /// persisted; the previous file, if any, is left untouched.
    pub fn write(&self, path: &Path) -> Result<(), InitError> {
        let mut contents = serde_json::to_vec_pretty(self)
            .map_err(|error| manifest_write_error(path, io::Error::other(error)))?;
        contents.push(b'\n');
        atomic_write(path, &contents).map_err(|error| manifest_write_error(path, error))
    }

    /// Compares this persisted manifest with freshly computed digests.
    ///
    /// Returns every mismatch in provider name order; an empty result means
    /// the installed plugins are exactly the locked ones.
    #[must_use]
    pub fn verify(&self, current: &Self) -> Vec<DigestMismatch> {
        let mut mismatches: Vec<DigestMismatch> = current
            .iter()
            .filter_map(|(name, actual)| match self.get(name) {
                None => Some(DigestMismatch::NotLocked { name: name.to_owned() }),
                Some(expected) if expected != actual => Some(DigestMismatch::Changed {
                    name: name.to_owned(),
                    expected: *expected,
                    actual: *actual,
                }),
                Some(_) => None,
            })
            .chain(
                self.iter()
                    .filter(|(name, _)| current.get(name).is_none())
                    .map(|(name, _)| DigestMismatch::NotInstalled {
                        name: name.to_owned(),
                    }),
            )
            .collect();
        mismatches.sort_by(|a, b| a.name().cmp(b.name()));
        mismatches
    }
}

fn manifest_write_error(path: &Path, source: io::Error) -> InitError {
    InitError::ManifestWrite {
        path: path.to_path_buf(),
        source: Arc::new(source),
    }
}

/// Manifest mode on Unix. The manifest holds public digests only and is meant
/// to be shared alongside the configuration, so it stays world-readable.
#[cfg(unix)]
const MANIFEST_MODE: u32 = 0o644;

/// Replaces `path` with `contents` through a synced sibling temp file, so a
/// reader sees either the old manifest or the new one.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let Some(directory) = path.parent() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "lock manifest path has no parent directory",
        ));
    };
    fs::create_dir_all(directory)?;

    let prefix = path.file_name().unwrap_or_else(|| OsStr::new("lock"));
    let mut builder = Builder::new();
    builder.prefix(prefix).suffix(".tmp");

    let mut staged = builder.tempfile_in(directory)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(fs::Permissions::from_mode(MANIFEST_MODE))?;
    }
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}
