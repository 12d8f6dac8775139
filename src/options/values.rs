//! Typed option values produced by a schema.

use std::collections::BTreeMap;

use super::parsers::{ByteSize, DictValue};

/// Parsed value of one option.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OptionValue {
    /// Switch state.
    Bool(bool),
    /// Text or enumeration value.
    Text(String),
    /// Integer.
    Integer(i64),
    /// Size.
    Size(ByteSize),
    /// List elements.
    List(Vec<String>),
    /// Dictionary entries.
    Dict(DictValue),
    /// Every occurrence of a repeatable option, in input order.
    Many(Vec<OptionValue>),
}

impl OptionValue {
    fn each(&self) -> impl Iterator<Item = &Self> {
        let items: &[Self] = match self {
            Self::Many(values) => values,
            other => std::slice::from_ref(other),
        };
        items.iter()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Entry {
    value: OptionValue,
    specified: bool,
}

/// Result of parsing one invocation's arguments.
///
/// Absent options have no entry at all, so `None` is distinct from an
/// explicitly falsy value. Defaults are present but not *specified*.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedOptions {
    entries: BTreeMap<&'static str, Entry>,
}

impl ParsedOptions {
    pub(crate) fn insert(&mut self, option: &'static str, value: OptionValue, specified: bool) {
        self.entries.insert(option, Entry { value, specified });
    }

    /// Returns the value of `option`, explicit or defaulted.
    #[must_use]
    pub fn get(&self, option: &str) -> Option<&OptionValue> {
        self.entries.get(option).map(|entry| &entry.value)
    }

    /// Returns `true` when `option` was given on the command line.
    #[must_use]
    pub fn is_specified(&self, option: &str) -> bool {
        self.entries.get(option).is_some_and(|entry| entry.specified)
    }

    /// Returns `true` when `option` was given and is not an explicit `false`.
    #[must_use]
    pub fn is_set(&self, option: &str) -> bool {
        self.is_specified(option) && self.get(option) != Some(&OptionValue::Bool(false))
    }

    /// Returns a single text value.
    #[must_use]
    pub fn text(&self, option: &str) -> Option<&str> {
        match self.get(option) {
            Some(OptionValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns every text value of a repeatable or single option.
    #[must_use]
    pub fn texts(&self, option: &str) -> Vec<&str> {
        self.get(option)
            .into_iter()
            .flat_map(OptionValue::each)
            .filter_map(|value| match value {
                OptionValue::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Returns a switch state.
    #[must_use]
    pub fn switch(&self, option: &str) -> Option<bool> {
        match self.get(option) {
            Some(OptionValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns a switch state, treating an absent switch as `false`.
    #[must_use]
    pub fn flag(&self, option: &str) -> bool {
        self.switch(option).unwrap_or(false)
    }

    /// Returns an integer value.
    #[must_use]
    pub fn integer(&self, option: &str) -> Option<i64> {
        match self.get(option) {
            Some(OptionValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns a size value.
    #[must_use]
    pub fn size(&self, option: &str) -> Option<ByteSize> {
        match self.get(option) {
            Some(OptionValue::Size(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns a list value.
    #[must_use]
    pub fn list(&self, option: &str) -> Option<&[String]> {
        match self.get(option) {
            Some(OptionValue::List(values)) => Some(values),
            _ => None,
        }
    }

    /// Returns every dictionary given for `option`, in input order.
    #[must_use]
    pub fn dicts(&self, option: &str) -> Vec<&DictValue> {
        self.get(option)
            .into_iter()
            .flat_map(OptionValue::each)
            .filter_map(|value| match value {
                OptionValue::Dict(dict) => Some(dict),
                _ => None,
            })
            .collect()
    }

    /// Returns the first of `options` that is set, in the order given.
    #[must_use]
    pub fn first_set<'a>(&self, options: &[&'a str]) -> Option<&'a str> {
        options.iter().copied().find(|option| self.is_set(option))
    }
}
