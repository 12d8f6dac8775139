//! BDD scenarios for name resolution.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ResolverContext, resolver_context};

#[scenario(
    path = "tests/features/resolver.feature",
    name = "Resolve a name with an explicit zone"
)]
fn scenario_explicit_zone(resolver_context: ResolverContext) {
    let _ = resolver_context;
}

#[scenario(
    path = "tests/features/resolver.feature",
    name = "Resolve a name found in a single zone"
)]
fn scenario_single_zone(resolver_context: ResolverContext) {
    let _ = resolver_context;
}

#[scenario(
    path = "tests/features/resolver.feature",
    name = "Ask the operator when a name exists in several zones"
)]
fn scenario_ambiguous_zone(resolver_context: ResolverContext) {
    let _ = resolver_context;
}

#[scenario(
    path = "tests/features/resolver.feature",
    name = "Offer every zone when a name is not found"
)]
fn scenario_not_found(resolver_context: ResolverContext) {
    let _ = resolver_context;
}

#[scenario(
    path = "tests/features/resolver.feature",
    name = "Refuse to guess when prompting is disabled"
)]
fn scenario_prompt_disabled(resolver_context: ResolverContext) {
    let _ = resolver_context;
}
