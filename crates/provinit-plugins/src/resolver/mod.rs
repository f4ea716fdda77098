//! Computes which required providers still need to be installed.

use tracing::debug;

use crate::inventory::PluginSet;
use crate::requirement::Requirements;

/// Returns the requirements that no available plugin satisfies.
///
/// A requirement is satisfied when at least one plugin of that name matches
/// both its constraints and `protocol_version`. Unsatisfied requirements are
/// passed through unchanged.
#[must_use]
pub fn missing(
    required: &Requirements,
    available: &PluginSet,
    protocol_version: u32,
) -> Requirements {
    required
        .iter()
        .filter(|requirement| {
            let found = available.newest_satisfying(
                requirement.name(),
                requirement.constraints(),
                protocol_version,
            );
            if let Some(plugin) = found {
                debug!(
                    target: "provinit::resolver",
                    provider = requirement.name(),
                    version = %plugin.version(),
                    "requirement already satisfied"
                );
            }
            found.is_none()
        })
        .cloned()
        .collect()
}
