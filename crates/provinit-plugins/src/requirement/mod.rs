//! Provider requirements and the extractor contract.
//!
//! A [`Requirements`] value maps each provider name to the intersection of
//! every constraint that referenced it. Once extracted it is treated as
//! immutable: later stages borrow it, and concurrent fetch workers share it.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::error::ExtractionError;
use crate::version::ConstraintSet;

/// A required provider and its merged version constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequirement {
    name: String,
    constraints: ConstraintSet,
}

impl ProviderRequirement {
    /// Creates a requirement.
    #[must_use]
    pub fn new(name: impl Into<String>, constraints: ConstraintSet) -> Self {
        Self {
            name: name.into(),
            constraints,
        }
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the merged constraint set.
    #[must_use]
    pub const fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }
}

/// Name-keyed, name-sorted set of provider requirements.
///
/// # Example
///
/// ```
/// use provinit_plugins::{ProviderRequirement, Requirements};
///
/// let requirements: Requirements = [
///     ProviderRequirement::new("aws", ">= 1.0".parse().expect("valid")),
///     ProviderRequirement::new("aws", "< 2.0".parse().expect("valid")),
/// ]
/// .into_iter()
/// .collect();
///
/// let aws = requirements.get("aws").expect("aws is required");
/// assert_eq!(aws.constraints().to_string(), ">= 1.0.0, < 2.0.0");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    entries: BTreeMap<String, ProviderRequirement>,
}

impl Requirements {
    /// Creates an empty requirement set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a requirement, intersecting with any existing entry of that name.
    pub fn add(&mut self, requirement: ProviderRequirement) {
        match self.entries.entry(requirement.name.clone()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(requirement);
            }
            btree_map::Entry::Occupied(mut slot) => {
                let merged = slot.get().constraints.merge(&requirement.constraints);
                slot.get_mut().constraints = merged;
            }
        }
    }

    /// Returns a new set holding the requirements of both inputs.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        self.iter().chain(other.iter()).cloned().collect()
    }

    /// Looks up the requirement for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderRequirement> {
        self.entries.get(name)
    }

    /// Iterates requirements in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ProviderRequirement> {
        self.entries.values()
    }

    /// Returns the number of required providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no provider is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ProviderRequirement> for Requirements {
    fn from_iter<I: IntoIterator<Item = ProviderRequirement>>(iter: I) -> Self {
        let mut requirements = Self::new();
        for requirement in iter {
            requirements.add(requirement);
        }
        requirements
    }
}

/// Source of provider requirements, typically a module tree plus state.
///
/// Implementations must fail with [`ExtractionError`] rather than return a
/// partial requirement set when their input is invalid.
pub trait RequirementExtractor {
    /// Produces the merged requirement set.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the inputs are unreadable or invalid.
    fn extract(&self) -> Result<Requirements, ExtractionError>;
}
