//! Name-to-reference resolution with interactive scope disambiguation.
//!
//! A bare name with no scope is looked up through an aggregated listing. One
//! matching scope resolves directly. Several matches are offered to the
//! operator and never auto-picked. No match, or a failed lookup, falls back
//! to offering every scope of the collection's kind; the lookup error itself
//! is only logged.

use thiserror::Error;
use tracing::debug;

use super::{Collection, ReferenceError, ResourceReference, Scope, ScopeKind};
use crate::api::{ComputeApi, RemoteError};
use crate::config::{ConfigError, Properties};
use crate::console::{Console, ConsoleError};

/// A resource named on the command line, before resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceArg {
    collection: Collection,
    name: String,
    scope: Option<String>,
}

impl ResourceArg {
    /// A resource of `collection` named `name` (bare name, path or URL).
    #[must_use]
    pub fn new(collection: Collection, name: impl Into<String>) -> Self {
        Self {
            collection,
            name: name.into(),
            scope: None,
        }
    }

    /// Attaches the explicit scope flag value (`--zone`/`--region`), if any.
    #[must_use]
    pub fn with_scope(mut self, scope: Option<impl Into<String>>) -> Self {
        self.scope = scope.map(Into::into);
        self
    }

    /// Collection the resource belongs to.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// Name as given.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Position of a reference in the resolution state machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolutionState {
    /// Name known, scope unknown.
    Unscoped,
    /// Candidate scope lookup pending.
    Resolving,
    /// Scope determined.
    Resolved(ResourceReference),
    /// Several scopes hold the name; the operator must choose.
    Ambiguous {
        /// Every candidate scope, sorted.
        candidates: Vec<Scope>,
    },
    /// No scope holds the name.
    NotFound,
    /// The candidate lookup failed.
    QueryFailed {
        /// Error reported by the API.
        error: RemoteError,
    },
}

/// Terminal resolution failures.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResolutionError {
    /// The project property is missing.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A qualified name could not be parsed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    /// A choice was needed but prompting is disabled.
    #[error(
        "unable to prompt for the {kind} of {singular} [{name}]; specify --{kind} \
         (candidates: {})",
        .candidates.join(", ")
    )]
    PromptDisabled {
        /// Scope noun (`zone`, `region`).
        kind: &'static str,
        /// Collection noun.
        singular: &'static str,
        /// Resource name.
        name: String,
        /// Scopes that were on offer.
        candidates: Vec<String>,
    },
    /// The operator cancelled the prompt.
    #[error("no {kind} selected for {singular} [{name}]; aborted by user")]
    Aborted {
        /// Scope noun.
        kind: &'static str,
        /// Collection noun.
        singular: &'static str,
        /// Resource name.
        name: String,
    },
    /// The fallback scope listing failed.
    #[error("unable to list {kind}s: {source}")]
    ScopeListing {
        /// Scope noun.
        kind: &'static str,
        /// Error reported by the API.
        source: RemoteError,
    },
    /// The fallback scope listing was empty.
    #[error("no {kind}s are available in project [{project}]")]
    NoScopes {
        /// Scope noun.
        kind: &'static str,
        /// Project that was listed.
        project: String,
    },
    /// The console failed while prompting.
    #[error(transparent)]
    Console(#[from] ConsoleError),
}

fn article(noun: &str) -> &'static str {
    if noun.starts_with(['a', 'e', 'i', 'o', 'u']) {
        "an"
    } else {
        "a"
    }
}

/// Resolves [`ResourceArg`]s into [`ResourceReference`]s.
pub struct Resolver<'a> {
    api: &'a dyn ComputeApi,
    console: &'a dyn Console,
    properties: &'a Properties,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over the given collaborators.
    #[must_use]
    pub const fn new(
        api: &'a dyn ComputeApi,
        console: &'a dyn Console,
        properties: &'a Properties,
    ) -> Self {
        Self {
            api,
            console,
            properties,
        }
    }

    /// Determines the starting state for `arg`.
    ///
    /// Qualified paths, global collections, explicit scope flags and the
    /// configured default scope all resolve without a query.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] when a qualified name does not parse or no
    /// project is configured.
    pub fn classify(&self, arg: &ResourceArg) -> Result<ResolutionState, ResolutionError> {
        if ResourceReference::is_qualified(&arg.name) {
            let reference = ResourceReference::parse_in(&arg.name, arg.collection)?;
            return Ok(ResolutionState::Resolved(reference));
        }
        let project = self.properties.require_project()?;
        let kind = arg.collection.scope();
        let known_scope = match kind {
            ScopeKind::Global => Some(Scope::Global),
            _ => arg
                .scope
                .as_deref()
                .or_else(|| self.properties.default_scope(kind))
                .map(|name| Scope::of_kind(kind, name)),
        };
        Ok(known_scope.map_or(ResolutionState::Unscoped, |scope| {
            ResolutionState::Resolved(ResourceReference::new(
                project,
                arg.collection,
                &arg.name,
                scope,
            ))
        }))
    }

    /// Performs one transition from `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] when the fallback listing fails or is
    /// empty, prompting is disabled, or the operator aborts.
    pub async fn advance(
        &self,
        arg: &ResourceArg,
        state: ResolutionState,
    ) -> Result<ResolutionState, ResolutionError> {
        self.step(arg, &[arg.name.as_str()], state).await
    }

    /// Drives `arg` to a fully qualified reference.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] as described on [`Resolver::advance`].
    pub async fn resolve(&self, arg: &ResourceArg) -> Result<ResourceReference, ResolutionError> {
        let state = self.classify(arg)?;
        self.drive(arg, &[arg.name.as_str()], state).await
    }

    /// Resolves every argument, keeping their order.
    ///
    /// Unscoped names of the same collection share one candidate lookup and
    /// one prompt; the scope found for the first of them applies to all.
    ///
    /// # Errors
    ///
    /// Returns the first [`ResolutionError`].
    pub async fn resolve_all(
        &self,
        args: &[ResourceArg],
    ) -> Result<Vec<ResourceReference>, ResolutionError> {
        let mut slots: Vec<Option<ResourceReference>> = Vec::with_capacity(args.len());
        let mut unscoped: Vec<(Collection, usize)> = Vec::new();
        for (index, arg) in args.iter().enumerate() {
            match self.classify(arg)? {
                ResolutionState::Resolved(reference) => slots.push(Some(reference)),
                _ => {
                    slots.push(None);
                    unscoped.push((arg.collection, index));
                }
            }
        }

        let mut collections: Vec<Collection> = Vec::new();
        for (collection, _) in &unscoped {
            if !collections.contains(collection) {
                collections.push(*collection);
            }
        }
        for collection in collections {
            let members: Vec<usize> = unscoped
                .iter()
                .filter(|(candidate, _)| *candidate == collection)
                .map(|(_, index)| *index)
                .collect();
            let group: Vec<&ResourceArg> = members
                .iter()
                .filter_map(|&index| args.get(index))
                .collect();
            let Some(lead) = group.first() else {
                continue;
            };
            let names: Vec<&str> = group.iter().map(|arg| arg.name.as_str()).collect();
            let scope = self
                .drive(lead, &names, ResolutionState::Unscoped)
                .await?
                .scope()
                .clone();
            let project = self.properties.require_project()?;
            for (index, arg) in members.iter().zip(&group) {
                if let Some(slot) = slots.get_mut(*index) {
                    *slot = Some(ResourceReference::new(
                        project,
                        arg.collection,
                        &arg.name,
                        scope.clone(),
                    ));
                }
            }
        }
        Ok(slots.into_iter().flatten().collect())
    }

    async fn drive(
        &self,
        lead: &ResourceArg,
        names: &[&str],
        initial: ResolutionState,
    ) -> Result<ResourceReference, ResolutionError> {
        let mut state = initial;
        loop {
            if let ResolutionState::Resolved(reference) = state {
                return Ok(reference);
            }
            state = self.step(lead, names, state).await?;
        }
    }

    /// One transition for the names sharing `lead`'s collection. The lookup
    /// uses `lead`; messages and the prompt list every name.
    async fn step(
        &self,
        lead: &ResourceArg,
        names: &[&str],
        state: ResolutionState,
    ) -> Result<ResolutionState, ResolutionError> {
        let project = self.properties.require_project()?;
        let kind = lead.collection.scope();
        let singular = lead.collection.singular();
        let next = match state {
            ResolutionState::Unscoped => ResolutionState::Resolving,
            ResolutionState::Resolving => {
                match self.api.find_scopes(project, lead.collection, &lead.name).await {
                    Ok(candidates) if candidates.len() > 1 => {
                        ResolutionState::Ambiguous { candidates }
                    }
                    Ok(mut candidates) => candidates.pop().map_or(ResolutionState::NotFound, |only| {
                        ResolutionState::Resolved(ResourceReference::new(
                            project,
                            lead.collection,
                            &lead.name,
                            only,
                        ))
                    }),
                    Err(error) => ResolutionState::QueryFailed { error },
                }
            }
            ResolutionState::Ambiguous { candidates } => {
                let options: Vec<String> = candidates
                    .iter()
                    .filter_map(Scope::name)
                    .map(str::to_owned)
                    .collect();
                self.prompt(lead, names, options)?
            }
            ResolutionState::NotFound => {
                self.console.status(&format!(
                    "Unable to find {} {singular} with name [{}].",
                    article(singular),
                    lead.name
                ))?;
                self.fall_back(lead, names, project).await?
            }
            ResolutionState::QueryFailed { error } => {
                debug!(%error, name = %lead.name, "candidate scope lookup failed");
                self.console.status(&format!(
                    "Error fetching possible {}s for {singular}: [{}].",
                    kind.noun(),
                    names.join(", ")
                ))?;
                self.fall_back(lead, names, project).await?
            }
            resolved @ ResolutionState::Resolved(_) => resolved,
        };
        debug!(name = %lead.name, state = ?next, "resolution advanced");
        Ok(next)
    }

    async fn fall_back(
        &self,
        lead: &ResourceArg,
        names: &[&str],
        project: &str,
    ) -> Result<ResolutionState, ResolutionError> {
        let kind = lead.collection.scope();
        let scopes = self
            .api
            .list_scopes(project, kind)
            .await
            .map_err(|source| ResolutionError::ScopeListing {
                kind: kind.noun(),
                source,
            })?;
        if scopes.is_empty() {
            return Err(ResolutionError::NoScopes {
                kind: kind.noun(),
                project: project.to_owned(),
            });
        }
        self.prompt(lead, names, scopes)
    }

    fn prompt(
        &self,
        lead: &ResourceArg,
        names: &[&str],
        options: Vec<String>,
    ) -> Result<ResolutionState, ResolutionError> {
        let kind = lead.collection.scope();
        let singular = lead.collection.singular();
        if !self.console.can_prompt() {
            return Err(ResolutionError::PromptDisabled {
                kind: kind.noun(),
                singular,
                name: names.join(", "),
                candidates: options,
            });
        }
        let noun = if names.len() > 1 {
            lead.collection.name()
        } else {
            singular
        };
        let listed: Vec<String> = names.iter().map(|name| format!(" - [{name}]")).collect();
        let message = format!(
            "For the following {noun}:\n{}\nchoose a {}:",
            listed.join("\n"),
            kind.noun()
        );
        let chosen = self
            .console
            .choose(&message, &options)?
            .and_then(|index| options.get(index))
            .ok_or_else(|| ResolutionError::Aborted {
                kind: kind.noun(),
                singular,
                name: names.join(", "),
            })?;
        let project = self.properties.require_project()?;
        Ok(ResolutionState::Resolved(ResourceReference::new(
            project,
            lead.collection,
            &lead.name,
            Scope::of_kind(kind, chosen.as_str()),
        )))
    }
}
