//! Console rendering of provider initialisation events.
//!
//! Progress goes to standard output and fetch failures to standard error.
//! Every event is also logged through `tracing` by the embedded
//! [`StructuredReporter`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use provinit_plugins::{
    ConstraintSet, InitReporter, InstalledPlugin, LockManifest, ProviderFetchFailure,
    StructuredReporter,
};

const UNCONSTRAINED_NOTICE: &str = "\
The following providers do not have any version constraints in configuration,
so the latest version was installed.

To prevent automatic upgrades to new major versions that may contain breaking
changes, it is recommended to add version constraints to the corresponding
providers, with the constraint strings suggested below.";

pub(crate) const INIT_SUCCESS: &str = "\
provinit has been successfully initialised!

Every required provider plugin is installed and recorded in the lock
manifest. Rerun `provinit init` whenever provider requirements change.";

pub(crate) const INIT_EMPTY: &str = "\
provinit initialised in a directory without a module tree.

No provider plugins are required. Add a providers.json module tree and rerun
`provinit init` to install them.";

/// Renders pipeline events for a terminal user.
pub(crate) struct ConsoleReporter<'a, W, E> {
    stdout: Mutex<&'a mut W>,
    stderr: Mutex<&'a mut E>,
    log: StructuredReporter,
}

impl<'a, W, E> ConsoleReporter<'a, W, E>
where
    W: Write + Send,
    E: Write + Send,
{
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdout: Mutex::new(stdout),
            stderr: Mutex::new(stderr),
            log: StructuredReporter::new(),
        }
    }

    /// Writes a block of text followed by a newline to standard output.
    pub(crate) fn say(&self, text: &str) {
        let _ = writeln!(lock(&self.stdout), "{text}");
    }
}

fn lock<'g, T>(mutex: &'g Mutex<T>) -> MutexGuard<'g, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn describe(constraints: &ConstraintSet) -> String {
    if constraints.is_unconstrained() {
        String::from("any version")
    } else {
        constraints.to_string()
    }
}

impl<W, E> InitReporter for ConsoleReporter<'_, W, E>
where
    W: Write + Send,
    E: Write + Send,
{
    fn downloading(&self, name: &str, constraints: &ConstraintSet) {
        self.log.downloading(name, constraints);
        let _ = writeln!(
            lock(&self.stdout),
            "- Downloading plugin for provider \"{name}\" ({})...",
            describe(constraints)
        );
    }

    fn installed(&self, name: &str, path: &Path) {
        self.log.installed(name, path);
    }

    fn fetch_failed(&self, failure: &ProviderFetchFailure) {
        self.log.fetch_failed(failure);
        let name = &failure.name;
        let _ = writeln!(
            lock(&self.stderr),
            "\nError: Satisfying \"{name}\", provider not found\n\n\
             A version of the \"{name}\" provider that satisfies all version\n\
             constraints could not be found. The requested version\n\
             constraints are shown below.\n\n\
             {name} = \"{}\"\n\n{}\n",
            describe(&failure.constraints),
            failure.error
        );
    }

    fn chosen(&self, plugin: &InstalledPlugin) {
        self.log.chosen(plugin);
        let _ = writeln!(
            lock(&self.stdout),
            "- Using provider \"{}\" version {}",
            plugin.name(),
            plugin.version()
        );
    }

    fn lock_written(&self, path: &Path, manifest: &LockManifest) {
        self.log.lock_written(path, manifest);
    }

    fn constraints_suggested(&self, suggestions: &BTreeMap<String, ConstraintSet>) {
        self.log.constraints_suggested(suggestions);
        let mut stdout = lock(&self.stdout);
        let _ = writeln!(stdout, "\n{UNCONSTRAINED_NOTICE}\n");
        for (name, constraints) in suggestions {
            let _ = writeln!(stdout, "* provider.{name}: version = \"{constraints}\"");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use provinit_plugins::FetchError;
    use provinit_plugins::version::parse_version;

    use super::*;

    fn render(events: impl FnOnce(&ConsoleReporter<'_, Vec<u8>, Vec<u8>>)) -> (String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        events(&ConsoleReporter::new(&mut stdout, &mut stderr));
        (
            String::from_utf8(stdout).expect("utf-8 stdout"),
            String::from_utf8(stderr).expect("utf-8 stderr"),
        )
    }

    #[test]
    fn downloading_names_provider_and_constraints() {
        let (stdout, _) = render(|reporter| {
            reporter.downloading("google", &">= 2.0".parse().expect("constraints"));
            reporter.downloading("null", &ConstraintSet::unconstrained());
        });
        assert!(stdout.contains("- Downloading plugin for provider \"google\" (>= 2.0.0)..."));
        assert!(stdout.contains("\"null\" (any version)"));
    }

    #[test]
    fn fetch_failure_goes_to_stderr() {
        let failure = ProviderFetchFailure {
            name: String::from("aws"),
            constraints: ">= 1.0".parse().expect("constraints"),
            error: FetchError::Other {
                message: String::from("mirror unavailable"),
            },
        };
        let (stdout, stderr) = render(|reporter| reporter.fetch_failed(&failure));
        assert!(stdout.is_empty());
        assert!(stderr.contains("Satisfying \"aws\", provider not found"));
        assert!(stderr.contains("aws = \">= 1.0.0\""));
        assert!(stderr.contains("mirror unavailable"));
    }

    #[test]
    fn suggestions_use_provider_blocks() {
        let version = parse_version("3.4.1").expect("version");
        let mut suggestions = BTreeMap::new();
        suggestions.insert(
            String::from("azurerm"),
            provinit_plugins::advisor::minor_upgrade_constraint(&version),
        );
        let (stdout, _) = render(|reporter| reporter.constraints_suggested(&suggestions));
        assert!(stdout.contains("do not have any version constraints"));
        assert!(stdout.contains("* provider.azurerm: version = \">= 3.4.1, < 4.0.0\""));
    }

    #[test]
    fn chosen_plugin_is_listed() {
        let plugin = InstalledPlugin::new(
            "aws",
            parse_version("1.2.0").expect("version"),
            4,
            PathBuf::from("/plugins/aws"),
        );
        let (stdout, _) = render(|reporter| reporter.chosen(&plugin));
        assert_eq!(stdout, "- Using provider \"aws\" version 1.2.0\n");
    }
}
