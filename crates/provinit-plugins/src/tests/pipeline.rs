//! End-to-end pipeline scenarios using a filesystem mirror.

use std::fs;
use std::path::PathBuf;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::{Event, RecordingReporter, extractor_for, write_plugin};
use crate::error::InitError;
use crate::inventory::PluginDirs;
use crate::lock::LockManifest;
use crate::mirror::MirrorFetcher;
use crate::pipeline::ProviderInit;

struct Sandbox {
    _root: TempDir,
    plugins: PathBuf,
    mirror: PathBuf,
    lock: PathBuf,
}

impl Sandbox {
    fn pipeline<'a>(&self, reporter: &'a RecordingReporter) -> ProviderInit<'a> {
        ProviderInit::new(PluginDirs::new(self.plugins.clone()), self.lock.clone(), reporter)
            .with_concurrency(4)
    }

    fn fetcher(&self) -> MirrorFetcher {
        MirrorFetcher::new(self.mirror.clone())
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let root = TempDir::new().expect("temp dir");
    let plugins = root.path().join(".provinit/plugins");
    let mirror = root.path().join("mirror");
    let lock = plugins.join("lock.json");
    fs::create_dir_all(&mirror).expect("mirror dir");
    Sandbox {
        _root: root,
        plugins,
        mirror,
        lock,
    }
}

#[rstest]
fn installed_plugin_within_range_is_locked(sandbox: Sandbox) {
    write_plugin(&sandbox.plugins, "aws", "1.2.0", 4, b"aws-1.2.0");
    write_plugin(&sandbox.plugins, "aws", "2.0.0", 4, b"aws-2.0.0");
    let reporter = RecordingReporter::default();

    let outcome = sandbox
        .pipeline(&reporter)
        .run(&extractor_for(&[("aws", ">= 1.0, < 2.0")]), &sandbox.fetcher())
        .expect("init succeeds");

    assert_eq!(outcome.chosen["aws"].version().to_string(), "1.2.0");
    assert_eq!(
        reporter.count(|event| matches!(event, Event::Downloading(_))),
        0
    );
    let locked = LockManifest::read(&sandbox.lock).expect("read lock");
    assert_eq!(
        locked.get("aws"),
        Some(&outcome.chosen["aws"].sha256().expect("hash"))
    );
}

#[rstest]
fn empty_inventory_fetches_highest_mirror_version(sandbox: Sandbox) {
    write_plugin(&sandbox.mirror, "google", "2.0.0", 4, b"google-2.0.0");
    write_plugin(&sandbox.mirror, "google", "2.3.0", 4, b"google-2.3.0");
    write_plugin(&sandbox.mirror, "google", "1.9.0", 4, b"google-1.9.0");
    let reporter = RecordingReporter::default();

    let outcome = sandbox
        .pipeline(&reporter)
        .run(&extractor_for(&[("google", ">= 2.0")]), &sandbox.fetcher())
        .expect("init succeeds");

    let google = &outcome.chosen["google"];
    assert_eq!(google.version().to_string(), "2.3.0");
    assert!(google.path().starts_with(&sandbox.plugins));
    assert_eq!(outcome.manifest.len(), 1);
    assert_eq!(
        LockManifest::read(&sandbox.lock).expect("read lock"),
        outcome.manifest
    );
}

#[rstest]
fn unconstrained_provider_gets_suggestion(sandbox: Sandbox) {
    write_plugin(&sandbox.plugins, "azurerm", "3.4.1", 4, b"azurerm");
    write_plugin(&sandbox.plugins, "aws", "1.2.0", 4, b"aws");
    let reporter = RecordingReporter::default();

    let outcome = sandbox
        .pipeline(&reporter)
        .run(
            &extractor_for(&[("azurerm", ""), ("aws", ">= 1.0")]),
            &sandbox.fetcher(),
        )
        .expect("init succeeds");

    assert_eq!(outcome.suggestions.len(), 1);
    assert!(reporter.events().contains(&Event::Suggested(
        String::from("azurerm"),
        String::from(">= 3.4.1, < 4.0.0"),
    )));
}

#[rstest]
fn partial_fetch_failure_installs_the_rest_but_writes_no_lock(sandbox: Sandbox) {
    write_plugin(&sandbox.mirror, "google", "2.3.0", 4, b"google");
    write_plugin(&sandbox.mirror, "random", "3.1.0", 4, b"random");
    let reporter = RecordingReporter::default();

    let err = sandbox
        .pipeline(&reporter)
        .run(
            &extractor_for(&[("aws", ""), ("google", ""), ("null", ""), ("random", "")]),
            &sandbox.fetcher(),
        )
        .expect_err("init fails");

    let aggregate = match err {
        InitError::Fetch(aggregate) => aggregate,
        other => panic!("expected fetch failure, got {other:?}"),
    };
    let failed: Vec<_> = aggregate
        .failures()
        .iter()
        .map(|failure| failure.name.as_str())
        .collect();
    assert_eq!(failed, ["aws", "null"]);
    assert_eq!(
        reporter.count(|event| matches!(event, Event::Installed(_))),
        2
    );
    assert!(!sandbox.lock.exists());
}

#[rstest]
fn reinitialising_is_idempotent(sandbox: Sandbox) {
    write_plugin(&sandbox.mirror, "google", "2.3.0", 4, b"google");
    let reporter = RecordingReporter::default();
    let init = sandbox.pipeline(&reporter);
    let extractor = extractor_for(&[("google", ">= 2.0")]);

    init.run(&extractor, &sandbox.fetcher()).expect("first init");
    let first = fs::read(&sandbox.lock).expect("read lock");
    init.run(&extractor, &sandbox.fetcher()).expect("second init");

    assert_eq!(fs::read(&sandbox.lock).expect("read lock"), first);
    assert_eq!(
        reporter.count(|event| matches!(event, Event::Downloading(_))),
        1
    );
}

#[rstest]
fn verify_detects_tampering_of_one_provider(sandbox: Sandbox) {
    let aws = write_plugin(&sandbox.plugins, "aws", "1.2.0", 4, b"aws");
    write_plugin(&sandbox.plugins, "google", "2.3.0", 4, b"google");
    let reporter = RecordingReporter::default();
    let init = sandbox.pipeline(&reporter);
    let extractor = extractor_for(&[("aws", ""), ("google", "")]);
    init.run(&extractor, &sandbox.fetcher()).expect("init");

    fs::write(&aws, b"tampered").expect("tamper");
    let mismatches = init.verify(&extractor).expect("verify");

    let names: Vec<_> = mismatches.iter().map(|mismatch| mismatch.name()).collect();
    assert_eq!(names, ["aws"]);
}
