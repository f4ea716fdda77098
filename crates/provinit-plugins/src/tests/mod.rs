//! Crate-level helpers, integration tests and BDD scenarios.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mockall::mock;
use semver::Version;

use crate::error::{ExtractionError, FetchError, ProviderFetchFailure};
use crate::installer::Fetcher;
use crate::inventory::{InstalledPlugin, PLUGIN_PREFIX};
use crate::lock::LockManifest;
use crate::reporter::InitReporter;
use crate::requirement::{ProviderRequirement, RequirementExtractor, Requirements};
use crate::version::{ConstraintSet, parse_version};

mod pipeline;

mock! {
    pub Fetcher {}
    impl Fetcher for Fetcher {
        fn fetch(
            &self,
            destination: &Path,
            name: &str,
            constraints: &ConstraintSet,
            protocol_version: u32,
        ) -> Result<PathBuf, FetchError>;
    }
}

mock! {
    pub Extractor {}
    impl RequirementExtractor for Extractor {
        fn extract(&self) -> Result<Requirements, ExtractionError>;
    }
}

/// Extractor mock returning `entries` on every call.
pub(crate) fn extractor_for(entries: &[(&str, &str)]) -> MockExtractor {
    let extracted = requirements(entries);
    let mut extractor = MockExtractor::new();
    extractor
        .expect_extract()
        .returning(move || Ok(extracted.clone()));
    extractor
}

pub(crate) fn version(text: &str) -> Version {
    parse_version(text).expect("valid version")
}

/// Builds a requirement set from `(name, constraints)` pairs.
pub(crate) fn requirements(entries: &[(&str, &str)]) -> Requirements {
    entries
        .iter()
        .map(|(name, constraints)| {
            ProviderRequirement::new(*name, constraints.parse().expect("valid constraints"))
        })
        .collect()
}

/// Writes a plugin binary with the canonical file name into `dir`.
pub(crate) fn write_plugin(
    dir: &Path,
    name: &str,
    plugin_version: &str,
    protocol: u32,
    contents: &[u8],
) -> PathBuf {
    fs::create_dir_all(dir).expect("create plugin dir");
    let path = dir.join(InstalledPlugin::file_name(
        name,
        &version(plugin_version),
        protocol,
    ));
    fs::write(&path, contents).expect("write plugin binary");
    path
}

/// Event captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Downloading(String),
    Installed(String),
    FetchFailed(String),
    Chosen(String, String),
    LockWritten(usize),
    Suggested(String, String),
}

/// Reporter that keeps every event for later assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().expect("events mutex").clone()
    }

    pub(crate) fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    fn push(&self, event: Event) {
        self.events.lock().expect("events mutex").push(event);
    }
}

impl InitReporter for RecordingReporter {
    fn downloading(&self, name: &str, _constraints: &ConstraintSet) {
        self.push(Event::Downloading(name.to_owned()));
    }

    fn installed(&self, name: &str, _path: &Path) {
        self.push(Event::Installed(name.to_owned()));
    }

    fn fetch_failed(&self, failure: &ProviderFetchFailure) {
        self.push(Event::FetchFailed(failure.name.clone()));
    }

    fn chosen(&self, plugin: &InstalledPlugin) {
        self.push(Event::Chosen(
            plugin.name().to_owned(),
            plugin.version().to_string(),
        ));
    }

    fn lock_written(&self, _path: &Path, manifest: &LockManifest) {
        self.push(Event::LockWritten(manifest.len()));
    }

    fn constraints_suggested(&self, suggestions: &BTreeMap<String, ConstraintSet>) {
        for (name, constraints) in suggestions {
            self.push(Event::Suggested(name.clone(), constraints.to_string()));
        }
    }
}

#[test]
fn write_plugin_uses_canonical_prefix() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    let path = write_plugin(temp.path(), "aws", "1.0.0", 4, b"bin");
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .expect("file name");
    assert!(file_name.starts_with(PLUGIN_PREFIX));
}
