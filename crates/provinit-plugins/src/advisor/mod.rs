//! Suggests version constraints for providers that have none.
//!
//! An unconstrained provider silently moves to every new release, including
//! breaking major releases. For each one the advisor proposes a constraint
//! that keeps the chosen version and its later minor and patch releases but
//! stops before the next major version.

use std::collections::BTreeMap;

use semver::{BuildMetadata, Version};

use crate::chooser::ChosenPlugins;
use crate::requirement::Requirements;
use crate::version::{Constraint, ConstraintSet, Operator};

/// Constraint allowing `version` up to, but excluding, the next major release.
///
/// # Example
///
/// ```
/// use provinit_plugins::advisor::minor_upgrade_constraint;
/// use provinit_plugins::version::parse_version;
///
/// let suggestion = minor_upgrade_constraint(&parse_version("3.4.1").expect("valid"));
/// assert_eq!(suggestion.to_string(), ">= 3.4.1, < 4.0.0");
/// ```
#[must_use]
pub fn minor_upgrade_constraint(version: &Version) -> ConstraintSet {
    let floor = Version {
        build: BuildMetadata::EMPTY,
        ..version.clone()
    };
    let ceiling = Version::new(version.major.saturating_add(1), 0, 0);
    ConstraintSet::from_constraints([
        Constraint::new(Operator::GreaterOrEqual, floor),
        Constraint::new(Operator::Less, ceiling),
    ])
}

/// Returns a suggested constraint for every chosen provider whose
/// requirement is unconstrained, keyed and sorted by provider name.
///
/// Only requirements with zero predicates qualify; a wide range such as
/// `>= 0.0.0` is a deliberate choice and is left alone.
#[must_use]
pub fn suggest(
    chosen: &ChosenPlugins,
    requirements: &Requirements,
) -> BTreeMap<String, ConstraintSet> {
    chosen
        .iter()
        .filter(|(name, _)| {
            requirements
                .get(name)
                .is_some_and(|requirement| requirement.constraints().is_unconstrained())
        })
        .map(|(name, plugin)| (name.clone(), minor_upgrade_constraint(plugin.version())))
        .collect()
}
