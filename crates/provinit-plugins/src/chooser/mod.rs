//! Selects exactly one installed plugin per required provider.

use std::collections::BTreeMap;

use crate::error::InitError;
use crate::inventory::{InstalledPlugin, PluginSet};
use crate::requirement::Requirements;

/// Chosen plugin per provider name, sorted by name.
pub type ChosenPlugins = BTreeMap<String, InstalledPlugin>;

/// Picks the highest satisfying version for every requirement.
///
/// Equal versions resolve to the lexically smallest path, so the result only
/// depends on the inputs.
///
/// # Errors
///
/// Returns [`InitError::Unsatisfiable`] for the first provider (in name
/// order) without any usable plugin.
pub fn choose(
    requirements: &Requirements,
    available: &PluginSet,
    protocol_version: u32,
) -> Result<ChosenPlugins, InitError> {
    requirements
        .iter()
        .map(|requirement| {
            available
                .newest_satisfying(
                    requirement.name(),
                    requirement.constraints(),
                    protocol_version,
                )
                .map(|plugin| (requirement.name().to_owned(), plugin.clone()))
                .ok_or_else(|| InitError::Unsatisfiable {
                    name: requirement.name().to_owned(),
                    constraints: requirement.constraints().clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests;
