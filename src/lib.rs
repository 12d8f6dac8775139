//! Core library for the nimbus cloud command-line tool.
//!
//! Commands declare their flags as option schemas and their cross-flag
//! constraints as validation rules. The executor parses and validates an
//! invocation before any network traffic, resolves resource names into fully
//! qualified references (asking the operator when a name is ambiguous) and
//! then hands the references to the command, which talks to the remote API
//! through the [`api::ComputeApi`] seam.

pub mod api;
pub mod commands;
pub mod config;
pub mod console;
pub mod executor;
pub mod logging;
pub mod options;
pub mod resource;
pub mod test_support;
pub mod validate;

pub use api::{ApiRequest, ComputeApi, ProcessApi, RemoteError, RequestKind};
pub use config::{ConfigError, Properties};
pub use console::{Console, ConsoleError, TerminalConsole};
pub use executor::{Command, CommandError, Context, Executor};
pub use options::{ArgumentError, CommandSchema, ParsedOptions, RawArgs};
pub use resource::{Collection, ResourceArg, ResourceReference, Scope, ScopeKind};
pub use validate::{Policy, ValidationRule, Validator, Violations};
