//! Declarative option schemas and the raw argument list they parse.

use std::collections::BTreeSet;

use super::error::ArgumentError;
use super::parsers::{ArgList, BinarySize, Case, ChoiceSet, DictSpec};
use super::values::{OptionValue, ParsedOptions};

/// Value parser attached to an option.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OptionKind {
    /// Boolean switch. `--no-<flag>` spellings arrive as an explicit `false`.
    Switch,
    /// Free text.
    Text,
    /// Signed integer.
    Integer,
    /// Size with a unit suffix.
    Size(BinarySize),
    /// Delimiter-separated list.
    List(ArgList),
    /// Enumeration checked at parse time.
    Choice(ChoiceSet),
    /// Text with case normalisation; membership is left to a validation rule.
    Normalized(Case),
    /// `key=value` dictionary.
    Dict(DictSpec),
}

impl OptionKind {
    fn parse(self, option: &str, raw: Option<&str>) -> Result<OptionValue, ArgumentError> {
        let malformed = |message: String| ArgumentError::malformed(option, message);
        let Some(text) = raw else {
            return match self {
                Self::Switch => Ok(OptionValue::Bool(true)),
                _ => Err(malformed(String::from("expected one argument"))),
            };
        };
        match self {
            Self::Switch => match text.to_ascii_lowercase().as_str() {
                "true" => Ok(OptionValue::Bool(true)),
                "false" => Ok(OptionValue::Bool(false)),
                _ => Err(malformed(format!("expected true or false; received: {text}"))),
            },
            Self::Text => Ok(OptionValue::Text(text.to_owned())),
            Self::Integer => text
                .trim()
                .parse()
                .map(OptionValue::Integer)
                .map_err(|_| malformed(format!("expected an integer; received: {text}"))),
            Self::Size(parser) => parser.parse(text).map(OptionValue::Size).map_err(malformed),
            Self::List(parser) => parser.parse(text).map(OptionValue::List).map_err(malformed),
            Self::Choice(choices) => choices
                .parse(text)
                .map(OptionValue::Text)
                .map_err(malformed),
            Self::Normalized(case) => Ok(OptionValue::Text(case.apply(text))),
            Self::Dict(spec) => spec.parse(text).map(OptionValue::Dict).map_err(malformed),
        }
    }
}

/// Declaration of one recognised option.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OptionSpec {
    name: &'static str,
    kind: OptionKind,
    default: Option<&'static str>,
    required: bool,
    repeated: bool,
    group: Option<&'static str>,
}

impl OptionSpec {
    /// Declares an optional, single-valued option.
    #[must_use]
    pub const fn new(name: &'static str, kind: OptionKind) -> Self {
        Self {
            name,
            kind,
            default: None,
            required: false,
            repeated: false,
            group: None,
        }
    }

    /// Declares a boolean switch.
    #[must_use]
    pub const fn switch(name: &'static str) -> Self {
        Self::new(name, OptionKind::Switch)
    }

    /// Declares a free-text option.
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self::new(name, OptionKind::Text)
    }

    /// Raw default run through the option's parser when the flag is absent.
    #[must_use]
    pub const fn default_value(mut self, raw: &'static str) -> Self {
        self.default = Some(raw);
        self
    }

    /// Marks the option as mandatory.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Collects every occurrence instead of keeping the last.
    #[must_use]
    pub const fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Places the option in the mutually exclusive group `id`.
    #[must_use]
    pub const fn group(mut self, id: &'static str) -> Self {
        self.group = Some(id);
        self
    }

    /// Returns the option name without its `--` prefix.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the option's parser.
    #[must_use]
    pub const fn kind(&self) -> OptionKind {
        self.kind
    }
}

/// Ordered raw occurrences handed from the command-line surface to a schema.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawArgs {
    occurrences: Vec<(String, Option<String>)>,
}

impl RawArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence.
    pub fn push(&mut self, option: &str, value: Option<String>) {
        self.occurrences.push((option.to_owned(), value));
    }

    /// Records `value` when present.
    #[must_use]
    pub fn value(mut self, option: &str, value: Option<impl Into<String>>) -> Self {
        if let Some(text) = value {
            self.push(option, Some(text.into()));
        }
        self
    }

    /// Records one occurrence per element.
    #[must_use]
    pub fn values<I, S>(mut self, option: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for text in values {
            self.push(option, Some(text.into()));
        }
        self
    }

    /// Records a switch when it was given.
    #[must_use]
    pub fn switch(mut self, option: &str, given: bool) -> Self {
        if given {
            self.push(option, None);
        }
        self
    }

    /// Records a switch with a `--no-` spelling. The negative form wins when
    /// both are given.
    #[must_use]
    pub fn negatable(mut self, option: &str, positive: bool, negative: bool) -> Self {
        if negative {
            self.push(option, Some(String::from("false")));
        } else if positive {
            self.push(option, None);
        }
        self
    }

    /// Iterates over occurrences in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.occurrences
            .iter()
            .map(|(option, value)| (option.as_str(), value.as_deref()))
    }

    /// Returns `true` when `option` occurs at least once.
    #[must_use]
    pub fn contains(&self, option: &str) -> bool {
        self.occurrences.iter().any(|(name, _)| name == option)
    }
}

/// Ordered set of option declarations for a single command.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandSchema {
    options: Vec<OptionSpec>,
    required_together: Vec<&'static [&'static str]>,
}

impl CommandSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one option.
    #[must_use]
    pub fn option(mut self, spec: OptionSpec) -> Self {
        self.options.push(spec);
        self
    }

    /// Appends every option in `specs`.
    #[must_use]
    pub fn options(mut self, specs: impl IntoIterator<Item = OptionSpec>) -> Self {
        self.options.extend(specs);
        self
    }

    /// Declares options that must be given together or not at all.
    #[must_use]
    pub fn require_together(mut self, members: &'static [&'static str]) -> Self {
        self.required_together.push(members);
        self
    }

    /// Returns the declared options in order.
    #[must_use]
    pub fn specs(&self) -> &[OptionSpec] {
        &self.options
    }

    fn spec(&self, option: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|spec| spec.name == option)
    }

    /// Parses `raw` into typed values.
    ///
    /// Checks run in this order: unknown flags, exclusive groups, individual
    /// values, required options, then required-together groups.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Malformed`] for unknown flags or values that
    /// fail their parser, [`ArgumentError::Conflicting`] when two flags of an
    /// exclusive group are set, and [`ArgumentError::Required`] for missing
    /// required options or incomplete required-together groups.
    pub fn parse(&self, raw: &RawArgs) -> Result<ParsedOptions, ArgumentError> {
        if let Some((unknown, _)) = raw.iter().find(|(option, _)| self.spec(option).is_none()) {
            return Err(ArgumentError::malformed(unknown, "unrecognized argument"));
        }
        self.check_exclusive_groups(raw)?;

        let mut parsed = ParsedOptions::default();
        for spec in &self.options {
            let given: Vec<Option<&str>> = raw
                .iter()
                .filter(|(option, _)| *option == spec.name)
                .map(|(_, value)| value)
                .collect();
            if spec.repeated && !given.is_empty() {
                let values = given
                    .into_iter()
                    .map(|value| spec.kind.parse(spec.name, value))
                    .collect::<Result<Vec<_>, _>>()?;
                parsed.insert(spec.name, OptionValue::Many(values), true);
            } else if let Some(last) = given.last() {
                parsed.insert(spec.name, spec.kind.parse(spec.name, *last)?, true);
            } else if let Some(default) = spec.default {
                parsed.insert(spec.name, spec.kind.parse(spec.name, Some(default))?, false);
            } else if spec.required {
                return Err(ArgumentError::required(spec.name, "must be specified"));
            }
        }

        for members in &self.required_together {
            let given: Vec<&str> = members
                .iter()
                .copied()
                .filter(|member| parsed.is_specified(member))
                .collect();
            if given.is_empty() {
                continue;
            }
            if let Some(missing) = members.iter().find(|member| !parsed.is_specified(member)) {
                let companions = given
                    .iter()
                    .map(|member| super::error::flag_name(member))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(ArgumentError::required(
                    missing,
                    format!("must be specified together with [{companions}]"),
                ));
            }
        }
        Ok(parsed)
    }

    fn check_exclusive_groups(&self, raw: &RawArgs) -> Result<(), ArgumentError> {
        let groups: BTreeSet<&str> = self.options.iter().filter_map(|spec| spec.group).collect();
        let mut conflicts: Vec<(usize, [&str; 2])> = Vec::new();
        for group in groups {
            let mut set = self
                .options
                .iter()
                .enumerate()
                .filter(|(_, spec)| spec.group == Some(group) && raw.contains(spec.name));
            if let (Some((position, first)), Some((_, second))) = (set.next(), set.next()) {
                conflicts.push((position, [first.name, second.name]));
            }
        }
        conflicts
            .into_iter()
            .min_by_key(|(position, _)| *position)
            .map_or(Ok(()), |(_, pair)| Err(ArgumentError::conflicting(pair)))
    }
}
