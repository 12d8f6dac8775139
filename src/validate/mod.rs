//! Cross-flag validation over fully parsed options.
//!
//! Each [`ValidationRule`] is a named pure function over [`ParsedOptions`] and
//! a [`RuleContext`]. A [`Validator`] runs its rules in declaration order. The
//! default policy reports only the first violation; [`Policy::CollectAll`]
//! runs every rule and reports one violation per failing rule.

mod helpers;

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::options::{ArgumentError, ParsedOptions};

pub use helpers::{
    conflicts_with, forbid_when, require_companion, require_member, single_target_only,
};

/// Facts about the invocation that rules may depend on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RuleContext {
    target_count: usize,
}

impl RuleContext {
    /// Context for a command addressing `target_count` resources.
    #[must_use]
    pub const fn new(target_count: usize) -> Self {
        Self { target_count }
    }

    /// Number of resources the command targets.
    #[must_use]
    pub const fn target_count(&self) -> usize {
        self.target_count
    }
}

/// Signature shared by every rule body.
pub type RuleCheck = fn(&ParsedOptions, &RuleContext) -> Result<(), ArgumentError>;

/// Named validation predicate.
#[derive(Clone, Copy)]
pub struct ValidationRule {
    name: &'static str,
    check: RuleCheck,
}

impl ValidationRule {
    /// Declares a rule.
    #[must_use]
    pub const fn new(name: &'static str, check: RuleCheck) -> Self {
        Self { name, check }
    }

    /// Returns the rule name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluates the rule.
    ///
    /// # Errors
    ///
    /// Returns the first violation the rule detects.
    pub fn evaluate(&self, options: &ParsedOptions, context: &RuleContext) -> Result<(), ArgumentError> {
        (self.check)(options, context)
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Reporting policy for a validation pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Policy {
    /// Stop at the first failing rule.
    #[default]
    FailFast,
    /// Evaluate every rule and report each failure.
    CollectAll,
}

/// One or more rule violations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{}", render(.errors))]
pub struct Violations {
    /// Violations in rule order.
    pub errors: Vec<ArgumentError>,
}

fn render(errors: &[ArgumentError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl Violations {
    /// Returns the first violation.
    #[must_use]
    pub fn first(&self) -> Option<&ArgumentError> {
        self.errors.first()
    }

    /// Consumes the set and returns the first violation.
    #[must_use]
    pub fn into_first(self) -> Option<ArgumentError> {
        self.errors.into_iter().next()
    }
}

/// Ordered collection of rules for one command.
#[derive(Clone, Debug, Default)]
pub struct Validator {
    rules: Vec<ValidationRule>,
}

impl Validator {
    /// Creates a validator running `rules` in order.
    #[must_use]
    pub fn new(rules: impl IntoIterator<Item = ValidationRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Returns the rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    /// Runs the rules under `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`Violations`] holding the first violation under
    /// [`Policy::FailFast`], or every violation under [`Policy::CollectAll`].
    pub fn validate(
        &self,
        options: &ParsedOptions,
        context: &RuleContext,
        policy: Policy,
    ) -> Result<(), Violations> {
        let mut errors = Vec::new();
        for rule in &self.rules {
            if let Err(err) = rule.evaluate(options, context) {
                debug!(rule = rule.name, error = %err, "validation rule failed");
                errors.push(err);
                if policy == Policy::FailFast {
                    break;
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Violations { errors })
        }
    }

    /// Runs the rules and returns the first violation.
    ///
    /// # Errors
    ///
    /// Returns the first [`ArgumentError`] raised by a rule.
    pub fn check(&self, options: &ParsedOptions, context: &RuleContext) -> Result<(), ArgumentError> {
        self.rules
            .iter()
            .try_for_each(|rule| rule.evaluate(options, context))
    }
}

#[cfg(test)]
mod tests;
