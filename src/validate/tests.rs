//! Unit tests for the validator and shared rule helpers.

use super::*;
use crate::options::{ChoiceSet, CommandSchema, OptionSpec, RawArgs};
use rstest::rstest;

fn schema() -> CommandSchema {
    CommandSchema::new()
        .option(OptionSpec::text("network-interface"))
        .option(OptionSpec::text("address"))
        .option(OptionSpec::text("network"))
        .option(OptionSpec::text("subnet"))
        .option(OptionSpec::switch("no-service-account"))
        .option(OptionSpec::switch("no-scopes"))
        .option(OptionSpec::text("mode"))
}

fn parse(raw: &RawArgs) -> ParsedOptions {
    schema().parse(raw).expect("options should parse")
}

fn nic_rule(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    conflicts_with(options, "network-interface", &["address", "network", "subnet"])
}

fn account_rule(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    require_companion(options, "no-service-account", "no-scopes")
}

fn mode_rule(options: &ParsedOptions, context: &RuleContext) -> Result<(), ArgumentError> {
    let mode = options.text("mode").unwrap_or("ro");
    require_member("mode", None, mode, &ChoiceSet::new(&["ro", "rw"]))?;
    single_target_only(context, mode == "rw", "mode", "rw mode needs a single target")
}

fn validator() -> Validator {
    Validator::new([
        ValidationRule::new("nic", nic_rule),
        ValidationRule::new("account", account_rule),
        ValidationRule::new("mode", mode_rule),
    ])
}

#[rstest]
fn structural_conflict_names_every_flag_found() {
    let raw = RawArgs::new()
        .value("network-interface", Some("network=default"))
        .value("subnet", Some("s1"))
        .value("address", Some("1.2.3.4"));
    let err = validator()
        .check(&parse(&raw), &RuleContext::new(1))
        .expect_err("conflict");
    assert_eq!(
        err,
        ArgumentError::conflicting(["network-interface", "address", "subnet"])
    );
}

#[rstest]
fn mutual_requirement_names_missing_companion() {
    let raw = RawArgs::new().switch("no-service-account", true);
    let err = validator()
        .check(&parse(&raw), &RuleContext::new(1))
        .expect_err("missing companion");
    assert!(matches!(err, ArgumentError::Required { ref flag, .. } if flag == "--no-scopes"));
}

#[rstest]
#[case(1, true)]
#[case(2, false)]
fn cardinality_depends_on_target_count(#[case] targets: usize, #[case] accepted: bool) {
    let raw = RawArgs::new().value("mode", Some("rw"));
    let result = validator().check(&parse(&raw), &RuleContext::new(targets));
    assert_eq!(result.is_ok(), accepted);
}

#[rstest]
fn membership_failure_lists_allowed_set() {
    let raw = RawArgs::new().value("mode", Some("rx"));
    let err = validator()
        .check(&parse(&raw), &RuleContext::new(1))
        .expect_err("bad mode");
    assert_eq!(
        err.to_string(),
        "invalid value for [--mode]: value must be one of [ro, rw], not [rx]"
    );
}

#[rstest]
fn fail_fast_reports_first_violation_only() {
    let raw = RawArgs::new()
        .value("network-interface", Some("network=default"))
        .value("network", Some("default"))
        .switch("no-service-account", true);
    let violations = validator()
        .validate(&parse(&raw), &RuleContext::new(1), Policy::FailFast)
        .expect_err("violations");
    assert_eq!(violations.errors.len(), 1);
    assert!(matches!(
        violations.first(),
        Some(ArgumentError::Conflicting { .. })
    ));
}

#[rstest]
fn collect_all_reports_one_violation_per_rule() {
    let raw = RawArgs::new()
        .value("network-interface", Some("network=default"))
        .value("network", Some("default"))
        .switch("no-service-account", true)
        .value("mode", Some("rw"));
    let violations = validator()
        .validate(&parse(&raw), &RuleContext::new(3), Policy::CollectAll)
        .expect_err("violations");
    assert_eq!(violations.errors.len(), 3);
}

#[rstest]
fn forbid_when_reports_first_specified_flag() {
    let raw = RawArgs::new().value("network", Some("default"));
    let options = parse(&raw);
    let err = forbid_when(&options, true, &["subnet", "network"], "not allowed here")
        .expect_err("forbidden");
    assert_eq!(err, ArgumentError::invalid("network", "not allowed here"));
    assert!(forbid_when(&options, false, &["network"], "unused").is_ok());
}

#[rstest]
fn clean_options_pass() {
    let raw = RawArgs::new()
        .switch("no-service-account", true)
        .switch("no-scopes", true);
    assert!(
        validator()
            .validate(&parse(&raw), &RuleContext::new(2), Policy::default())
            .is_ok()
    );
}
