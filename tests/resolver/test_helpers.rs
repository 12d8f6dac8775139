//! Shared fixtures for resolver BDD scenarios.

use nimbus::config::Properties;
use nimbus::resource::{ResolutionError, ResourceReference};
use nimbus::test_support::{ScriptedApi, ScriptedConsole};
use rstest::fixture;

/// Collaborators for one scenario. Clones share the scripted API and console.
#[derive(Clone, Debug)]
pub struct ResolverContext {
    pub api: ScriptedApi,
    pub console: ScriptedConsole,
    pub properties: Properties,
}

/// Result of the resolution under test.
#[derive(Clone, Debug)]
pub struct ResolutionOutcome(pub Result<ResourceReference, ResolutionError>);

#[fixture]
pub fn resolver_context() -> ResolverContext {
    ResolverContext {
        api: ScriptedApi::new(),
        console: ScriptedConsole::new(),
        properties: Properties::for_project("unset"),
    }
}

/// Splits a comma-separated step argument, ignoring blanks.
pub fn split_list(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}
