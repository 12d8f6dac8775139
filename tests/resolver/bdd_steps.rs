//! BDD step definitions for name resolution.

use nimbus::config::Properties;
use nimbus::resource::{Collection, ResourceArg, Resolver};
use nimbus::test_support::{ConsoleEvent, ScriptedConsole, json_aggregated, json_scopes};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Builder;

use super::test_helpers::{ResolutionOutcome, ResolverContext, split_list};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("runtime setup failed: {0}")]
    Runtime(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a resolver for project \"{project}\"")]
fn resolver_for_project(mut resolver_context: ResolverContext, project: String) -> ResolverContext {
    resolver_context.properties = Properties::for_project(project);
    resolver_context
}

#[given("a non-interactive resolver for project \"{project}\"")]
fn non_interactive_resolver(
    mut resolver_context: ResolverContext,
    project: String,
) -> ResolverContext {
    resolver_context.properties = Properties::for_project(project);
    resolver_context.console = ScriptedConsole::non_interactive();
    resolver_context
}

#[given("the instance \"{name}\" exists in zones \"{zones}\"")]
fn instance_in_zones(resolver_context: ResolverContext, name: String, zones: String) -> ResolverContext {
    let items: Vec<(&str, &str)> = split_list(&zones)
        .into_iter()
        .map(|zone| (name.as_str(), zone))
        .collect();
    resolver_context.api.push_ok(json_aggregated("zone", &items));
    resolver_context
}

#[given("the instance \"{name}\" exists in no zone")]
fn instance_nowhere(resolver_context: ResolverContext, name: String) -> ResolverContext {
    let _ = name;
    resolver_context.api.push_ok(json_aggregated("zone", &[]));
    resolver_context
}

#[given("the project has zones \"{zones}\"")]
fn project_zones(resolver_context: ResolverContext, zones: String) -> ResolverContext {
    resolver_context.api.push_ok(json_scopes(&split_list(&zones)));
    resolver_context
}

#[given("the operator picks option \"{index}\"")]
fn operator_picks(resolver_context: ResolverContext, index: usize) -> ResolverContext {
    resolver_context.console.push_choice(Some(index));
    resolver_context
}

fn resolve(
    resolver_context: &ResolverContext,
    arg: &ResourceArg,
) -> Result<ResolutionOutcome, StepError> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| StepError::Runtime(err.to_string()))?;
    let resolver = Resolver::new(
        &resolver_context.api,
        &resolver_context.console,
        &resolver_context.properties,
    );
    Ok(ResolutionOutcome(runtime.block_on(resolver.resolve(arg))))
}

#[when("I resolve instance \"{name}\" in zone \"{zone}\"")]
fn resolve_with_zone(
    resolver_context: ResolverContext,
    name: String,
    zone: String,
) -> Result<ResolutionOutcome, StepError> {
    let arg = ResourceArg::new(Collection::INSTANCES, name).with_scope(Some(zone));
    resolve(&resolver_context, &arg)
}

#[when("I resolve the instance \"{name}\"")]
fn resolve_bare(
    resolver_context: ResolverContext,
    name: String,
) -> Result<ResolutionOutcome, StepError> {
    let arg = ResourceArg::new(Collection::INSTANCES, name);
    resolve(&resolver_context, &arg)
}

#[then("the reference is \"{path}\"")]
fn reference_is(outcome: &ResolutionOutcome, path: String) -> Result<(), StepError> {
    match &outcome.0 {
        Ok(reference) if reference.to_path() == path => Ok(()),
        Ok(reference) => Err(StepError::Assertion(format!(
            "expected {path}, resolved {}",
            reference.to_path()
        ))),
        Err(err) => Err(StepError::Assertion(format!("resolution failed: {err}"))),
    }
}

#[then("no API request was made")]
fn no_requests(resolver_context: &ResolverContext) -> Result<(), StepError> {
    let requests = resolver_context.api.requests();
    if requests.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("unexpected requests: {requests:?}")))
    }
}

#[then("the operator was not asked anything")]
fn nothing_asked(resolver_context: &ResolverContext) -> Result<(), StepError> {
    let menus = resolver_context.console.menus();
    if menus.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("unexpected menus: {menus:?}")))
    }
}

#[then("the operator was offered \"{options}\"")]
fn operator_offered(resolver_context: &ResolverContext, options: String) -> Result<(), StepError> {
    let expected: Vec<String> = split_list(&options).into_iter().map(str::to_owned).collect();
    let menus = resolver_context.console.menus();
    if menus.first() == Some(&expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected menu {expected:?}, got {menus:?}"
        )))
    }
}

#[then("the operator saw \"{line}\"")]
fn operator_saw(resolver_context: &ResolverContext, line: String) -> Result<(), StepError> {
    let events = resolver_context.console.events();
    if events.contains(&ConsoleEvent::Status(line.clone())) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "status [{line}] missing from {events:?}"
        )))
    }
}

#[then("resolution fails mentioning \"{text}\"")]
fn resolution_fails(outcome: &ResolutionOutcome, text: String) -> Result<(), StepError> {
    match &outcome.0 {
        Err(err) if err.to_string().contains(&text) => Ok(()),
        Err(err) => Err(StepError::Assertion(format!(
            "error [{err}] does not mention [{text}]"
        ))),
        Ok(reference) => Err(StepError::Assertion(format!(
            "expected failure, resolved {reference}"
        ))),
    }
}
