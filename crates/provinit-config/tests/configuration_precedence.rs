//! Layering behaviour of the configuration loader.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use provinit_config::{Config, LogFormat, default_log_filter};
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` on edition 2024; the override is
        // serialised through `ENV_MUTEX` and undone in `Drop`.
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

fn args(extra: &[&str]) -> Vec<OsString> {
    std::iter::once("provinit")
        .chain(extra.iter().copied())
        .map(OsString::from)
        .collect()
}

#[test]
fn defaults_apply_without_overrides() {
    let _lock = ENV_MUTEX.lock().expect("env mutex poisoned");
    let config = Config::load_from_iter(args(&[])).expect("load defaults");
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), LogFormat::Compact);
    assert_eq!(config.protocol_version(), 4);
}

#[test]
fn environment_overrides_defaults() {
    let _env = EnvOverride::set_var("PROVINIT_PROTOCOL_VERSION", OsStr::new("5"));
    let config = Config::load_from_iter(args(&[])).expect("load with env");
    assert_eq!(config.protocol_version(), 5);
}

#[test]
fn cli_flags_override_environment() {
    let _env = EnvOverride::set_var("PROVINIT_LOG_FILTER", OsStr::new("warn"));
    let config =
        Config::load_from_iter(args(&["--log-filter", "debug"])).expect("load with cli flag");
    assert_eq!(config.log_filter(), "debug");
}

#[test]
fn configuration_file_is_read() {
    let _lock = ENV_MUTEX.lock().expect("env mutex poisoned");
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join("provinit.toml");
    fs::write(&path, "fetch_concurrency = 2\nlog_format = \"json\"\n")
        .expect("write config file");

    let path_arg = path.to_str().expect("utf-8 temp path");
    let config =
        Config::load_from_iter(args(&["--config-path", path_arg])).expect("load config file");
    assert_eq!(config.fetch_concurrency(), 2);
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[test]
fn malformed_configuration_file_fails() {
    let _lock = ENV_MUTEX.lock().expect("env mutex poisoned");
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join("provinit.toml");
    fs::write(&path, "protocol_version = not_a_number\n").expect("write config file");

    let path_arg = path.to_str().expect("utf-8 temp path");
    let result = Config::load_from_iter(args(&["--config-path", path_arg]));
    assert!(result.is_err(), "malformed configuration should fail");
}
