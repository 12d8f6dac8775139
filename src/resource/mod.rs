//! Resource references and the scope resolver.
//!
//! A [`ResourceReference`] is the fully qualified identity of a remote object:
//! project, [`Collection`], name and [`Scope`]. References render to and parse
//! from the `projects/{project}/{scope}/{collection}/{name}` path form.

mod resolver;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub use resolver::{ResolutionError, ResolutionState, ResourceArg, Resolver};

/// Namespace kind a collection lives in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Per-zone resources.
    Zone,
    /// Per-region resources.
    Region,
    /// Project-wide resources.
    Global,
}

impl ScopeKind {
    /// Path segment used for scopes of this kind (`zones`, `regions`).
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::Zone => "zones",
            Self::Region => "regions",
            Self::Global => "global",
        }
    }

    /// Singular noun used in operator messages.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Zone => "zone",
            Self::Region => "region",
            Self::Global => "global",
        }
    }
}

/// Zone, region or global namespace of a resource.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Scope {
    /// A named zone such as `us-central1-a`.
    Zone(String),
    /// A named region such as `us-central1`.
    Region(String),
    /// The project-wide namespace.
    Global,
}

impl Scope {
    /// Builds a scope of `kind` named `name`. The name is ignored for
    /// [`ScopeKind::Global`].
    #[must_use]
    pub fn of_kind(kind: ScopeKind, name: impl Into<String>) -> Self {
        match kind {
            ScopeKind::Zone => Self::Zone(name.into()),
            ScopeKind::Region => Self::Region(name.into()),
            ScopeKind::Global => Self::Global,
        }
    }

    /// Returns the kind of this scope.
    #[must_use]
    pub const fn kind(&self) -> ScopeKind {
        match self {
            Self::Zone(_) => ScopeKind::Zone,
            Self::Region(_) => ScopeKind::Region,
            Self::Global => ScopeKind::Global,
        }
    }

    /// Returns the scope name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Zone(name) | Self::Region(name) => Some(name),
            Self::Global => None,
        }
    }

    /// Returns the region containing this scope. A zone's region is its name
    /// without the trailing `-<letter>` suffix.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        match self {
            Self::Zone(zone) => zone.rsplit_once('-').map(|(region, _)| region),
            Self::Region(region) => Some(region),
            Self::Global => None,
        }
    }

    fn path_segment(&self) -> String {
        match self {
            Self::Zone(name) => format!("zones/{name}"),
            Self::Region(name) => format!("regions/{name}"),
            Self::Global => String::from("global"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_segment())
    }
}

/// Static descriptor of a resource collection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Collection {
    api: &'static str,
    name: &'static str,
    singular: &'static str,
    scope: ScopeKind,
}

impl Collection {
    /// Compute instances (zonal).
    pub const INSTANCES: Self = Self::new("compute", "instances", "instance", ScopeKind::Zone);
    /// Compute disks (zonal).
    pub const DISKS: Self = Self::new("compute", "disks", "disk", ScopeKind::Zone);
    /// Cloud routers (regional).
    pub const ROUTERS: Self = Self::new("compute", "routers", "router", ScopeKind::Region);
    /// Static addresses (regional).
    pub const ADDRESSES: Self = Self::new("compute", "addresses", "address", ScopeKind::Region);
    /// VPC networks (global).
    pub const NETWORKS: Self = Self::new("compute", "networks", "network", ScopeKind::Global);
    /// Boot images (global).
    pub const IMAGES: Self = Self::new("compute", "images", "image", ScopeKind::Global);
    /// Data-processing jobs (regional).
    pub const JOBS: Self = Self::new("dataproc", "jobs", "job", ScopeKind::Region);

    const ALL: [Self; 7] = [
        Self::INSTANCES,
        Self::DISKS,
        Self::ROUTERS,
        Self::ADDRESSES,
        Self::NETWORKS,
        Self::IMAGES,
        Self::JOBS,
    ];

    /// Declares a collection.
    #[must_use]
    pub const fn new(
        api: &'static str,
        name: &'static str,
        singular: &'static str,
        scope: ScopeKind,
    ) -> Self {
        Self {
            api,
            name,
            singular,
            scope,
        }
    }

    /// API family the collection belongs to (`compute`, `dataproc`).
    #[must_use]
    pub const fn api(&self) -> &'static str {
        self.api
    }

    /// Plural collection name used in paths.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Singular noun used in operator messages.
    #[must_use]
    pub const fn singular(&self) -> &'static str {
        self.singular
    }

    /// Scope kind of resources in this collection.
    #[must_use]
    pub const fn scope(&self) -> ScopeKind {
        self.scope
    }

    fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|collection| collection.name == name)
    }
}

/// Errors raised while parsing a resource path.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ReferenceError {
    /// The text is not a `projects/...` path.
    #[error("could not parse resource [{path}]: {reason}")]
    Unparseable {
        /// Text that was given.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
    /// The path names a different collection than expected.
    #[error("resource [{path}] is not in collection [{expected}]")]
    WrongCollection {
        /// Text that was given.
        path: String,
        /// Collection the caller asked for.
        expected: &'static str,
    },
}

/// Fully qualified identity of a remote resource.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceReference {
    project: String,
    collection: Collection,
    name: String,
    scope: Scope,
}

impl ResourceReference {
    /// Builds a reference. Global collections always carry [`Scope::Global`].
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        collection: Collection,
        name: impl Into<String>,
        scope: Scope,
    ) -> Self {
        let resolved_scope = if collection.scope == ScopeKind::Global {
            Scope::Global
        } else {
            scope
        };
        Self {
            project: project.into(),
            collection,
            name: name.into(),
            scope: resolved_scope,
        }
    }

    /// Owning project.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Collection descriptor.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource scope.
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Path of the collection containing this resource.
    #[must_use]
    pub fn collection_path(&self) -> String {
        format!(
            "projects/{}/{}/{}",
            self.project,
            self.scope.path_segment(),
            self.collection.name
        )
    }

    /// Renders `projects/{project}/{scope}/{collection}/{name}`.
    #[must_use]
    pub fn to_path(&self) -> String {
        format!("{}/{}", self.collection_path(), self.name)
    }

    /// Returns `true` when `text` looks like a qualified path or URL rather
    /// than a bare name.
    #[must_use]
    pub fn is_qualified(text: &str) -> bool {
        text.contains('/')
    }

    /// Parses a `projects/...` path or a URL containing one.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Unparseable`] when the text has the wrong
    /// shape or names an unknown collection.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        let unparseable = |reason: &str| ReferenceError::Unparseable {
            path: text.to_owned(),
            reason: reason.to_owned(),
        };
        let path = text
            .find("projects/")
            .and_then(|start| text.get(start..))
            .ok_or_else(|| unparseable("expected a path starting with projects/"))?;
        let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
        let (project, scope, collection_name, name) = match segments.as_slice() {
            ["projects", project, "global", collection, name] => {
                (*project, Scope::Global, *collection, *name)
            }
            ["projects", project, "zones", zone, collection, name] => {
                (*project, Scope::Zone((*zone).to_owned()), *collection, *name)
            }
            ["projects", project, "regions", region, collection, name] => (
                *project,
                Scope::Region((*region).to_owned()),
                *collection,
                *name,
            ),
            _ => return Err(unparseable("expected projects/P/(zones|regions)/S/C/N or projects/P/global/C/N")),
        };
        let collection =
            Collection::lookup(collection_name).ok_or_else(|| unparseable("unknown collection"))?;
        if collection.scope != scope.kind() {
            return Err(unparseable("scope does not match the collection"));
        }
        if [project, name].iter().any(|part| part.is_empty()) {
            return Err(unparseable("empty path segment"));
        }
        Ok(Self::new(project, collection, name, scope))
    }

    /// Parses `text` and checks that it belongs to `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] when parsing fails or the collection
    /// differs.
    pub fn parse_in(text: &str, expected: Collection) -> Result<Self, ReferenceError> {
        let reference = Self::parse(text)?;
        if reference.collection != expected {
            return Err(ReferenceError::WrongCollection {
                path: text.to_owned(),
                expected: expected.name,
            });
        }
        Ok(reference)
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

impl Serialize for ResourceReference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_path())
    }
}

#[cfg(test)]
mod tests;
