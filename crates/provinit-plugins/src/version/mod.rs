//! Semantic versions and version constraint sets.
//!
//! Providers are versioned with semantic versions. Requirements express the
//! acceptable versions as a [`ConstraintSet`]: a conjunction of predicates
//! such as `>= 1.2, < 2.0` or the pessimistic `~> 1.2`. Partial versions
//! (`1`, `1.2`) are accepted everywhere and padded with zeros.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

/// Errors raised while parsing versions and constraints.
#[derive(Debug, Error)]
pub enum ConstraintError {
    /// The version text is not a valid (possibly partial) semantic version.
    #[error("invalid version '{input}': {source}")]
    InvalidVersion {
        /// Offending text.
        input: String,
        /// Underlying parser error.
        #[source]
        source: semver::Error,
    },
    /// A comma-separated constraint list contained an empty predicate.
    #[error("empty predicate in constraint '{input}'")]
    EmptyPredicate {
        /// Full constraint text.
        input: String,
    },
}

/// Parses a version, zero-padding partial versions such as `1.2`.
///
/// # Errors
///
/// Returns [`ConstraintError::InvalidVersion`] when the text is not a
/// semantic version after padding.
pub fn parse_version(text: &str) -> Result<Version, ConstraintError> {
    let trimmed = text.trim();
    let (core, suffix) = split_core(trimmed);
    let padded = match core.matches('.').count() {
        0 => format!("{core}.0.0{suffix}"),
        1 => format!("{core}.0{suffix}"),
        _ => trimmed.to_owned(),
    };
    Version::parse(&padded).map_err(|source| ConstraintError::InvalidVersion {
        input: trimmed.to_owned(),
        source,
    })
}

/// Splits `1.2.3-beta+build` into `("1.2.3", "-beta+build")`.
fn split_core(text: &str) -> (&str, &str) {
    let index = text.find(['-', '+']).unwrap_or(text.len());
    text.split_at(index)
}

fn segment_count(text: &str) -> u8 {
    let (core, _) = split_core(text.trim());
    match core.matches('.').count() {
        0 => 1,
        1 => 2,
        _ => 3,
    }
}

/// Comparison operator of a single version predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`: exactly this version.
    Exact,
    /// `!=`: any version but this one.
    NotEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `~>`: this version or a later one up to the next significant release.
    Pessimistic,
}

impl Operator {
    /// Returns the operator as written in constraint strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "=",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Pessimistic => "~>",
        }
    }

    /// Splits a leading operator from `text`; no operator means [`Self::Exact`].
    fn split(text: &str) -> (Self, &str) {
        const PREFIXES: [(&str, Operator); 7] = [
            ("~>", Operator::Pessimistic),
            (">=", Operator::GreaterOrEqual),
            ("<=", Operator::LessOrEqual),
            ("!=", Operator::NotEqual),
            (">", Operator::Greater),
            ("<", Operator::Less),
            ("=", Operator::Exact),
        ];
        PREFIXES
            .iter()
            .find_map(|(prefix, op)| text.strip_prefix(prefix).map(|rest| (*op, rest)))
            .unwrap_or((Self::Exact, text))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single version predicate such as `>= 1.2.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    operator: Operator,
    version: Version,
    /// Number of version segments written; only meaningful for `~>`.
    segments: u8,
}

impl Constraint {
    /// Builds a predicate from an operator and a full version.
    #[must_use]
    pub const fn new(operator: Operator, version: Version) -> Self {
        Self {
            operator,
            version,
            segments: 3,
        }
    }

    /// Returns the predicate operator.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the version the predicate compares against.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// Reports whether `candidate` satisfies this predicate.
    #[must_use]
    pub fn allows(&self, candidate: &Version) -> bool {
        let bound = &self.version;
        match self.operator {
            Operator::Exact => candidate == bound,
            Operator::NotEqual => candidate != bound,
            Operator::Greater => candidate > bound,
            Operator::GreaterOrEqual => candidate >= bound,
            Operator::Less => candidate < bound,
            Operator::LessOrEqual => candidate <= bound,
            Operator::Pessimistic => candidate >= bound && *candidate < self.pessimistic_ceiling(),
        }
    }

    /// First version excluded by a `~>` predicate.
    const fn pessimistic_ceiling(&self) -> Version {
        let bound = &self.version;
        if self.segments >= 3 {
            Version::new(bound.major, bound.minor.saturating_add(1), 0)
        } else {
            Version::new(bound.major.saturating_add(1), 0, 0)
        }
    }
}

impl FromStr for Constraint {
    type Err = ConstraintError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (operator, rest) = Operator::split(text.trim());
        let version = parse_version(rest)?;
        let segments = match operator {
            Operator::Pessimistic => segment_count(rest),
            _ => 3,
        };
        Ok(Self {
            operator,
            version,
            segments,
        })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = &self.version;
        match (self.operator, self.segments) {
            (Operator::Pessimistic, 1) => write!(f, "~> {}", version.major),
            (Operator::Pessimistic, 2) => write!(f, "~> {}.{}", version.major, version.minor),
            (operator, _) => write!(f, "{operator} {version}"),
        }
    }
}

/// Ordered conjunction of version predicates.
///
/// An empty set is *unconstrained*: it imposes no bound at all. A set such
/// as `>= 0.0.0` is wide but still constrained.
///
/// # Example
///
/// ```
/// use provinit_plugins::version::{ConstraintSet, parse_version};
///
/// let set: ConstraintSet = ">= 1.0, < 2.0".parse().expect("valid constraints");
/// assert!(set.allows(&parse_version("1.4.2").expect("valid version")));
/// assert!(!set.allows(&parse_version("2.0.0").expect("valid version")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// The unconstrained set.
    #[must_use]
    pub const fn unconstrained() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    /// Builds a set from individual predicates, dropping duplicates.
    #[must_use]
    pub fn from_constraints(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        constraints
            .into_iter()
            .fold(Self::unconstrained(), |mut set, constraint| {
                set.push(constraint);
                set
            })
    }

    fn push(&mut self, constraint: Constraint) {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
    }

    /// Intersects two sets: the result allows a version only when both do.
    ///
    /// Neither input is modified.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self::from_constraints(
            self.constraints
                .iter()
                .chain(other.constraints.iter())
                .cloned(),
        )
    }

    /// Reports whether every predicate allows `candidate`.
    #[must_use]
    pub fn allows(&self, candidate: &Version) -> bool {
        self.constraints.iter().all(|c| c.allows(candidate))
    }

    /// True when the set contains no predicates at all.
    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Returns the predicates in declaration order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

impl FromStr for ConstraintSet {
    type Err = ConstraintError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.trim().is_empty() {
            return Ok(Self::unconstrained());
        }
        let constraints = text
            .split(',')
            .map(|piece| {
                if piece.trim().is_empty() {
                    Err(ConstraintError::EmptyPredicate {
                        input: text.trim().to_owned(),
                    })
                } else {
                    piece.parse::<Constraint>()
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_constraints(constraints))
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, constraint) in self.constraints.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{constraint}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
