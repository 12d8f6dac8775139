//! Errors raised while parsing and validating command-line options.

use thiserror::Error;

/// Classified failure of a flag value or flag combination.
///
/// Every variant names the offending flag(s) using their command-line
/// spelling (for example `--disk`), so the message can be shown to the
/// operator verbatim.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ArgumentError {
    /// A flag value failed its parser.
    #[error("argument {flag}: {message}")]
    Malformed {
        /// Flag whose value was rejected.
        flag: String,
        /// Expected shape or reason for the rejection.
        message: String,
    },
    /// Two or more flags that may not be combined were set together.
    #[error("arguments not allowed simultaneously: {}", .flags.join(", "))]
    Conflicting {
        /// Every conflicting flag that was found, composite flag first.
        flags: Vec<String>,
    },
    /// A flag required by another flag (or by the command) is missing.
    #[error("missing required argument [{flag}]: {message}")]
    Required {
        /// Flag that must be supplied.
        flag: String,
        /// Why the flag is required.
        message: String,
    },
    /// A value is well-formed but fails a membership or range rule.
    #[error("invalid value for [{flag}]: {message}")]
    Invalid {
        /// Flag whose value was rejected.
        flag: String,
        /// Description of the violated rule.
        message: String,
    },
}

impl ArgumentError {
    /// Builds a [`ArgumentError::Malformed`] for the named option.
    #[must_use]
    pub fn malformed(option: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            flag: flag_name(option),
            message: message.into(),
        }
    }

    /// Builds a [`ArgumentError::Conflicting`] naming every option given.
    #[must_use]
    pub fn conflicting<'a>(options: impl IntoIterator<Item = &'a str>) -> Self {
        Self::Conflicting {
            flags: options.into_iter().map(flag_name).collect(),
        }
    }

    /// Builds a [`ArgumentError::Required`] for the named option.
    #[must_use]
    pub fn required(option: &str, message: impl Into<String>) -> Self {
        Self::Required {
            flag: flag_name(option),
            message: message.into(),
        }
    }

    /// Builds a [`ArgumentError::Invalid`] for the named option.
    #[must_use]
    pub fn invalid(option: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            flag: flag_name(option),
            message: message.into(),
        }
    }

    /// Returns the flag the error is attributed to. Conflicts report the first
    /// flag of the set.
    #[must_use]
    pub fn flag(&self) -> &str {
        match self {
            Self::Malformed { flag, .. }
            | Self::Required { flag, .. }
            | Self::Invalid { flag, .. } => flag,
            Self::Conflicting { flags } => flags.first().map_or("", String::as_str),
        }
    }
}

/// Renders an option name with its `--` prefix. Names already carrying a
/// prefix, or positional names in upper case, are returned unchanged.
#[must_use]
pub fn flag_name(option: &str) -> String {
    if option.starts_with('-') || option.chars().all(|ch| !ch.is_ascii_lowercase()) {
        option.to_owned()
    } else {
        format!("--{option}")
    }
}
