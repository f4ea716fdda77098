//! Requirement extraction from a JSON module tree and state snapshot.
//!
//! The module tree names a root module; every module reachable from it
//! through `children` contributes its provider constraints. The optional
//! state snapshot lists providers already managed by existing resources,
//! each contributing an unconstrained reference.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ExtractionError;
use crate::requirement::{ProviderRequirement, RequirementExtractor, Requirements};
use crate::version::ConstraintSet;

/// Name of the root module when the document does not set one.
pub const DEFAULT_ROOT_MODULE: &str = "root";

/// One module of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleSpec {
    /// Provider name → constraint string; the empty string is unconstrained.
    pub providers: BTreeMap<String, String>,
    /// Names of child modules.
    pub children: Vec<String>,
}

/// A module tree document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleTree {
    /// Name of the root module.
    #[serde(default = "default_root")]
    pub root: String,
    /// Every module keyed by name.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleSpec>,
}

fn default_root() -> String {
    String::from(DEFAULT_ROOT_MODULE)
}

impl ModuleTree {
    /// Reads and parses a module tree document.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Io`] or [`ExtractionError::Malformed`].
    pub fn read(path: &Path) -> Result<Self, ExtractionError> {
        read_json(path)
    }

    /// Modules reachable from the root, in depth-first visiting order.
    ///
    /// # Errors
    ///
    /// Fails when the root is undefined, a child reference cannot be
    /// resolved, or module references form a cycle.
    pub fn reachable(&self) -> Result<Vec<(&str, &ModuleSpec)>, ExtractionError> {
        if !self.modules.contains_key(&self.root) {
            return Err(ExtractionError::MissingRoot {
                root: self.root.clone(),
            });
        }
        let mut walk = Walk {
            tree: self,
            path: Vec::new(),
            done: BTreeSet::new(),
            order: Vec::new(),
        };
        walk.visit(&self.root)?;
        Ok(walk.order)
    }

    /// Collects provider requirements from every reachable module.
    ///
    /// # Errors
    ///
    /// Propagates traversal errors and rejects empty provider names and
    /// unparsable constraints.
    pub fn requirements(&self) -> Result<Requirements, ExtractionError> {
        let mut requirements = Requirements::new();
        for (module, spec) in self.reachable()? {
            for (provider, constraints) in &spec.providers {
                requirements.add(module_requirement(module, provider, constraints)?);
            }
        }
        Ok(requirements)
    }
}

/// Depth-first traversal state. `path` holds the modules on the current
/// branch; `done` the modules whose subtree was fully visited.
struct Walk<'t> {
    tree: &'t ModuleTree,
    path: Vec<&'t str>,
    done: BTreeSet<&'t str>,
    order: Vec<(&'t str, &'t ModuleSpec)>,
}

impl<'t> Walk<'t> {
    fn visit(&mut self, name: &'t str) -> Result<(), ExtractionError> {
        let tree = self.tree;
        if self.done.contains(name) {
            return Ok(());
        }
        if let Some(start) = self.path.iter().position(|entry| *entry == name) {
            let mut cycle: Vec<String> = self
                .path
                .iter()
                .skip(start)
                .map(|entry| (*entry).to_owned())
                .collect();
            cycle.push(name.to_owned());
            return Err(ExtractionError::CyclicModule { cycle });
        }
        let Some((key, spec)) = tree.modules.get_key_value(name) else {
            // Only reachable for the root, which `reachable` checks first.
            return Err(ExtractionError::MissingRoot {
                root: name.to_owned(),
            });
        };

        self.path.push(key.as_str());
        self.order.push((key.as_str(), spec));
        for child in &spec.children {
            if !tree.modules.contains_key(child) {
                return Err(ExtractionError::UnresolvedModule {
                    parent: key.clone(),
                    child: child.clone(),
                });
            }
            self.visit(child.as_str())?;
        }
        self.path.pop();
        self.done.insert(key.as_str());
        Ok(())
    }
}

fn module_requirement(
    module: &str,
    provider: &str,
    declared: &str,
) -> Result<ProviderRequirement, ExtractionError> {
    if provider.trim().is_empty() {
        return Err(ExtractionError::EmptyProviderName {
            module: module.to_owned(),
        });
    }
    let constraints =
        declared.parse::<ConstraintSet>().map_err(|source| ExtractionError::InvalidConstraint {
            module: module.to_owned(),
            provider: provider.to_owned(),
            source,
        })?;
    Ok(ProviderRequirement::new(provider, constraints))
}

/// Providers recorded in an existing state snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSnapshot {
    /// Provider names used by existing resources.
    #[serde(default)]
    pub providers: Vec<String>,
}

impl StateSnapshot {
    /// Reads a state snapshot; a missing file reads as an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Io`] or [`ExtractionError::Malformed`] when
    /// the file exists but cannot be used.
    pub fn read(path: &Path) -> Result<Self, ExtractionError> {
        match read_json(path) {
            Err(ExtractionError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(target: "provinit::module_tree", path = %path.display(), "no state snapshot");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Unconstrained requirements for every listed provider.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::EmptyProviderName`] for blank entries.
    pub fn requirements(&self) -> Result<Requirements, ExtractionError> {
        self.providers
            .iter()
            .map(|provider| {
                if provider.trim().is_empty() {
                    Err(ExtractionError::EmptyProviderName {
                        module: String::from("(state)"),
                    })
                } else {
                    Ok(ProviderRequirement::new(
                        provider.as_str(),
                        ConstraintSet::unconstrained(),
                    ))
                }
            })
            .collect()
    }
}

/// Extracts requirements from a module tree file and an optional state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleTreeExtractor {
    tree_path: PathBuf,
    state_path: Option<PathBuf>,
}

impl ModuleTreeExtractor {
    /// Module tree file name looked up inside a working directory.
    pub const TREE_FILE: &'static str = "providers.json";
    /// State snapshot file name looked up inside a working directory.
    pub const STATE_FILE: &'static str = "state.json";

    /// Creates an extractor for an explicit module tree file.
    #[must_use]
    pub fn new(tree_path: impl Into<PathBuf>) -> Self {
        Self {
            tree_path: tree_path.into(),
            state_path: None,
        }
    }

    /// Also reads the state snapshot at `state_path`.
    #[must_use]
    pub fn with_state(mut self, state_path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(state_path.into());
        self
    }

    /// Extractor for the conventional files inside `working_dir`.
    #[must_use]
    pub fn for_working_dir(working_dir: &Path) -> Self {
        Self::new(working_dir.join(Self::TREE_FILE)).with_state(working_dir.join(Self::STATE_FILE))
    }

    /// Returns the module tree path.
    #[must_use]
    pub fn tree_path(&self) -> &Path {
        &self.tree_path
    }
}

impl RequirementExtractor for ModuleTreeExtractor {
    fn extract(&self) -> Result<Requirements, ExtractionError> {
        let mut requirements = ModuleTree::read(&self.tree_path)?.requirements()?;
        if let Some(state_path) = &self.state_path {
            let state = StateSnapshot::read(state_path)?.requirements()?;
            requirements = requirements.merge(&state);
        }
        debug!(
            target: "provinit::module_tree",
            tree = %self.tree_path.display(),
            providers = requirements.len(),
            "extracted provider requirements"
        );
        Ok(requirements)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ExtractionError> {
    let contents = fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })?;
    serde_json::from_slice(&contents).map_err(|error| ExtractionError::Malformed {
        path: path.to_path_buf(),
        message: error.to_string(),
    })
}
