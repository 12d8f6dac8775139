//! Building blocks shared by command rule sets.

use crate::options::{ArgumentError, ChoiceSet, ParsedOptions, flag_name};

use super::RuleContext;

/// Checks that `value` (already normalised) belongs to `choices`.
///
/// `key` names the dictionary key when the value came from a composite flag.
///
/// # Errors
///
/// Returns [`ArgumentError::Invalid`] naming the flag, the key, the value and
/// the allowed set.
pub fn require_member(
    option: &str,
    key: Option<&str>,
    value: &str,
    choices: &ChoiceSet,
) -> Result<(), ArgumentError> {
    if choices.contains(value) {
        return Ok(());
    }
    let subject = key.map_or_else(
        || String::from("value"),
        |name| format!("value for [{name}]"),
    );
    Err(ArgumentError::invalid(
        option,
        format!(
            "{subject} must be one of {}, not [{value}]",
            choices.describe()
        ),
    ))
}

/// Fails when the composite `option` is set together with any of
/// `standalone`, naming the composite flag and every standalone flag found.
///
/// # Errors
///
/// Returns [`ArgumentError::Conflicting`].
pub fn conflicts_with(
    options: &ParsedOptions,
    option: &str,
    standalone: &[&str],
) -> Result<(), ArgumentError> {
    if !options.is_set(option) {
        return Ok(());
    }
    let found: Vec<&str> = standalone
        .iter()
        .copied()
        .filter(|other| options.is_set(other))
        .collect();
    if found.is_empty() {
        return Ok(());
    }
    Err(ArgumentError::conflicting(
        std::iter::once(option).chain(found),
    ))
}

/// Fails when `option` is set but `companion` is not.
///
/// # Errors
///
/// Returns [`ArgumentError::Required`] naming `companion`.
pub fn require_companion(
    options: &ParsedOptions,
    option: &str,
    companion: &str,
) -> Result<(), ArgumentError> {
    if options.is_set(option) && !options.is_set(companion) {
        return Err(ArgumentError::required(
            companion,
            format!("required when [{}] is specified", flag_name(option)),
        ));
    }
    Ok(())
}

/// Fails when `condition` holds and any of `forbidden` is specified.
///
/// # Errors
///
/// Returns [`ArgumentError::Invalid`] on the first forbidden flag found, with
/// `reason` as the message.
pub fn forbid_when(
    options: &ParsedOptions,
    condition: bool,
    forbidden: &[&str],
    reason: &str,
) -> Result<(), ArgumentError> {
    if !condition {
        return Ok(());
    }
    forbidden
        .iter()
        .find(|option| options.is_specified(option))
        .map_or(Ok(()), |option| Err(ArgumentError::invalid(option, reason)))
}

/// Fails when a per-resource attribute is used while targeting several
/// resources.
///
/// # Errors
///
/// Returns [`ArgumentError::Invalid`] for `option` carrying `message`.
pub fn single_target_only(
    context: &RuleContext,
    present: bool,
    option: &str,
    message: impl Into<String>,
) -> Result<(), ArgumentError> {
    if present && context.target_count() > 1 {
        return Err(ArgumentError::invalid(option, message));
    }
    Ok(())
}
