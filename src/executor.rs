//! Command execution pipeline.
//!
//! [`Executor::run`] sequences one invocation: parse the raw arguments against
//! the command's schema, validate flag relationships, resolve every target
//! resource, then hand the resolved references to the command. Parse and
//! validation failures abort before any API call. Later failures may follow
//! completed calls; commands are not transactional.

use std::future::Future;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ApiRequest, ComputeApi, RemoteError};
use crate::config::{ConfigError, Properties};
use crate::console::{Console, ConsoleError};
use crate::options::{ArgumentError, CommandSchema, ParsedOptions, RawArgs};
use crate::resource::{ResolutionError, ResourceArg, ResourceReference, Resolver};
use crate::validate::{Policy, RuleContext, ValidationRule, Validator, Violations};

/// Errors surfaced to the operator by a command invocation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum CommandError {
    /// A flag failed to parse or a rule was violated.
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    /// Several rules were violated (collect-all validation).
    #[error(transparent)]
    Validation(#[from] Violations),
    /// A resource reference could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// One or more API requests failed.
    #[error("{heading}{}", render_remote(.errors))]
    Remote {
        /// Summary line.
        heading: String,
        /// Every underlying failure, in request order.
        errors: Vec<RemoteError>,
    },
    /// The operator declined a confirmation.
    #[error("{0}")]
    Aborted(String),
    /// Console interaction failed.
    #[error(transparent)]
    Console(#[from] ConsoleError),
    /// Configuration is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(String),
    /// A wait exceeded its deadline.
    #[error("timed out after {seconds}s waiting for {what}")]
    Timeout {
        /// What was being awaited.
        what: String,
        /// Deadline in seconds.
        seconds: u64,
    },
}

fn render_remote(errors: &[RemoteError]) -> String {
    errors.iter().map(|err| format!("\n - {err}")).collect()
}

impl CommandError {
    /// Wraps remote failures under `heading`.
    #[must_use]
    pub fn remote(heading: impl Into<String>, errors: Vec<RemoteError>) -> Self {
        Self::Remote {
            heading: heading.into(),
            errors,
        }
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<RemoteError> for CommandError {
    fn from(err: RemoteError) -> Self {
        Self::remote("Could not fetch resource:", vec![err])
    }
}

/// Collaborators available to a command while it executes.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    /// Operator properties.
    pub properties: &'a Properties,
    /// Remote API.
    pub api: &'a dyn ComputeApi,
    /// Operator console.
    pub console: &'a dyn Console,
}

impl<'a> Context<'a> {
    /// Bundles the collaborators.
    #[must_use]
    pub const fn new(
        properties: &'a Properties,
        api: &'a dyn ComputeApi,
        console: &'a dyn Console,
    ) -> Self {
        Self {
            properties,
            api,
            console,
        }
    }

    /// Returns the configured project.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Config`] when no project is configured.
    pub fn project(&self) -> Result<&'a str, CommandError> {
        Ok(self.properties.require_project()?)
    }

    /// Builds a resolver over these collaborators.
    #[must_use]
    pub const fn resolver(&self) -> Resolver<'a> {
        Resolver::new(self.api, self.console, self.properties)
    }

    /// Sends `requests` in order and collects every response. Failures do not
    /// stop later requests; they are reported together afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Remote`] listing every failed request.
    pub async fn call_all(
        &self,
        heading: &str,
        requests: Vec<ApiRequest>,
    ) -> Result<Vec<Value>, CommandError> {
        let mut responses = Vec::with_capacity(requests.len());
        let mut errors = Vec::new();
        for request in requests {
            debug!(resource = %request.resource, kind = request.kind.as_str(), "sending request");
            match self.api.call(request).await {
                Ok(value) => responses.push(value),
                Err(err) => errors.push(err),
            }
        }
        if errors.is_empty() {
            Ok(responses)
        } else {
            Err(CommandError::remote(heading, errors))
        }
    }
}

/// A command built from declared options, rules and targets.
pub trait Command {
    /// Options the command recognises.
    fn schema(&self) -> CommandSchema;

    /// Cross-flag rules, evaluated in order.
    fn rules(&self) -> Vec<ValidationRule> {
        Vec::new()
    }

    /// Resources addressed by the invocation.
    fn targets(&self, options: &ParsedOptions) -> Vec<ResourceArg>;

    /// Performs the command against the resolved targets.
    fn execute<'a>(
        &'a self,
        context: &'a Context<'a>,
        options: &'a ParsedOptions,
        targets: Vec<ResourceReference>,
    ) -> impl Future<Output = Result<Value, CommandError>> + 'a;
}

/// Runs commands against a fixed set of collaborators.
pub struct Executor<'a> {
    context: Context<'a>,
    policy: Policy,
}

impl<'a> Executor<'a> {
    /// Creates an executor using fail-fast validation.
    #[must_use]
    pub const fn new(context: Context<'a>) -> Self {
        Self {
            context,
            policy: Policy::FailFast,
        }
    }

    /// Overrides the validation reporting policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Parses and validates `raw` for `command` without any API call.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Argument`] or [`CommandError::Validation`].
    pub fn prepare<C: Command>(
        &self,
        command: &C,
        raw: &RawArgs,
    ) -> Result<(ParsedOptions, Vec<ResourceArg>), CommandError> {
        let options = command.schema().parse(raw)?;
        let targets = command.targets(&options);
        let rule_context = RuleContext::new(targets.len());
        let validator = Validator::new(command.rules());
        match self.policy {
            Policy::FailFast => validator.check(&options, &rule_context)?,
            Policy::CollectAll => validator.validate(&options, &rule_context, Policy::CollectAll)?,
        }
        Ok((options, targets))
    }

    /// Runs one invocation end to end.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] from whichever stage failed.
    pub async fn run<C: Command>(&self, command: &C, raw: &RawArgs) -> Result<Value, CommandError> {
        let (options, targets) = self.prepare(command, raw)?;
        let references = self.context.resolver().resolve_all(&targets).await?;
        info!(targets = references.len(), "arguments validated and resolved");
        command.execute(&self.context, &options, references).await
    }
}
