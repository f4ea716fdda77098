//! Unit tests for version parsing and constraint sets.

use rstest::rstest;

use super::*;

fn v(text: &str) -> Version {
    parse_version(text).expect("valid version")
}

fn set(text: &str) -> ConstraintSet {
    text.parse().expect("valid constraint set")
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

#[rstest]
#[case::major_only("2", "2.0.0")]
#[case::major_minor("1.2", "1.2.0")]
#[case::full("1.2.3", "1.2.3")]
#[case::partial_prerelease("1.2-beta", "1.2.0-beta")]
#[case::whitespace("  3.4.1 ", "3.4.1")]
fn parse_version_pads_partial_versions(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(v(input), Version::parse(expected).expect("expected version"));
}

#[rstest]
#[case("")]
#[case("one.two")]
#[case("1.2.3.4")]
fn parse_version_rejects_garbage(#[case] input: &str) {
    let err = parse_version(input).expect_err("should fail");
    assert!(matches!(err, ConstraintError::InvalidVersion { .. }));
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

#[rstest]
#[case("= 1.2.0", "1.2.0", true)]
#[case("1.2.0", "1.2.1", false)]
#[case("!= 1.2.0", "1.2.0", false)]
#[case("> 1.2.0", "1.2.1", true)]
#[case(">= 1.2", "1.2.0", true)]
#[case("< 2", "1.99.0", true)]
#[case("<= 2.0.0", "2.0.1", false)]
#[case::pessimistic_minor("~> 1.2", "1.9.0", true)]
#[case::pessimistic_minor_ceiling("~> 1.2", "2.0.0", false)]
#[case::pessimistic_patch("~> 1.2.3", "1.2.9", true)]
#[case::pessimistic_patch_ceiling("~> 1.2.3", "1.3.0", false)]
#[case::pessimistic_floor("~> 1.2.3", "1.2.2", false)]
fn constraint_allows(#[case] constraint: &str, #[case] candidate: &str, #[case] expected: bool) {
    let parsed: Constraint = constraint.parse().expect("valid constraint");
    assert_eq!(parsed.allows(&v(candidate)), expected);
}

#[rstest]
#[case(">=1.2", ">= 1.2.0")]
#[case("~> 1.2", "~> 1.2")]
#[case("~>3", "~> 3")]
#[case("1.0.0", "= 1.0.0")]
fn constraint_display_is_canonical(#[case] input: &str, #[case] expected: &str) {
    let parsed: Constraint = input.parse().expect("valid constraint");
    assert_eq!(parsed.to_string(), expected);
}

// ---------------------------------------------------------------------------
// Sets
// ---------------------------------------------------------------------------

#[rstest]
#[case("")]
#[case("   ")]
fn blank_text_is_unconstrained(#[case] input: &str) {
    assert!(set(input).is_unconstrained());
}

#[test]
fn wide_range_is_still_constrained() {
    assert!(!set(">= 0.0.0").is_unconstrained());
}

#[test]
fn empty_predicate_is_rejected() {
    let err = ">= 1.0, , < 2.0"
        .parse::<ConstraintSet>()
        .expect_err("should fail");
    assert!(matches!(err, ConstraintError::EmptyPredicate { .. }));
}

#[test]
fn set_requires_every_predicate() {
    let range = set(">=1.0,<2.0");
    assert!(range.allows(&v("1.2.0")));
    assert!(!range.allows(&v("0.9.0")));
    assert!(!range.allows(&v("2.0.0")));
}

#[test]
fn unconstrained_set_allows_anything() {
    assert!(ConstraintSet::unconstrained().allows(&v("0.0.1")));
    assert!(ConstraintSet::unconstrained().allows(&v("99.0.0")));
}

#[test]
fn merge_intersects_without_mutating_inputs() {
    let lower = set(">= 1.0");
    let upper = set("< 2.0");
    let merged = lower.merge(&upper);

    assert_eq!(merged.constraints().len(), 2);
    assert_eq!(lower.constraints().len(), 1);
    assert_eq!(upper.constraints().len(), 1);
    assert!(merged.allows(&v("1.5.0")));
    assert!(!merged.allows(&v("2.1.0")));
}

#[test]
fn merge_collapses_duplicates() {
    let merged = set(">= 1.0").merge(&set(">=1.0.0"));
    assert_eq!(merged.to_string(), ">= 1.0.0");
}

#[rstest]
#[case(">= 1.0", ">=1.0.0")]
#[case("< 2", "< 2.0.0")]
#[case("= 1.2", "1.2.0")]
fn partial_and_full_spellings_are_equal(#[case] short: &str, #[case] full: &str) {
    let short: Constraint = short.parse().expect("valid");
    let full: Constraint = full.parse().expect("valid");
    assert_eq!(short, full);
}

#[test]
fn merge_keeps_pessimistic_predicates_of_different_precision() {
    let merged = set("~> 1.2").merge(&set("~> 1.2.0"));
    assert_eq!(merged.to_string(), "~> 1.2, ~> 1.2.0");
    assert!(merged.allows(&v("1.2.5")));
    assert!(!merged.allows(&v("1.3.0")));
}

#[test]
fn merge_with_unconstrained_is_identity() {
    let constrained = set(">= 1.0, < 2.0");
    assert_eq!(constrained.merge(&ConstraintSet::unconstrained()), constrained);
    assert!(
        ConstraintSet::unconstrained()
            .merge(&ConstraintSet::unconstrained())
            .is_unconstrained()
    );
}

#[test]
fn set_display_joins_predicates() {
    assert_eq!(set(">=1.0,<2.0").to_string(), ">= 1.0.0, < 2.0.0");
}
