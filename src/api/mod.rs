//! Remote resource-management API seam.
//!
//! Commands and the resolver talk to the provider through [`ComputeApi`], a
//! single `call` taking a request kind, a resource path and JSON parameters.
//! [`ProcessApi`] drives an external helper binary; tests use
//! [`crate::test_support::ScriptedApi`].

mod process;

use std::future::Future;
use std::pin::Pin;

use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::resource::{Collection, ResourceReference, Scope, ScopeKind};

pub use process::{DEFAULT_API_BIN, ProcessApi};

/// Operation requested from the API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestKind {
    /// Fetch one resource.
    Get,
    /// List a collection.
    List,
    /// List a collection across every scope.
    AggregatedList,
    /// Create a resource.
    Insert,
    /// Delete a resource.
    Delete,
    /// Update selected fields of a resource.
    Patch,
}

impl RequestKind {
    /// Wire name passed to the API helper.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::List => "list",
            Self::AggregatedList => "aggregated-list",
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Patch => "patch",
        }
    }

    /// Returns `true` for operations that change remote state.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Insert | Self::Delete | Self::Patch)
    }
}

/// One outbound API request.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// Operation to perform.
    pub kind: RequestKind,
    /// Resource or collection path.
    pub resource: String,
    /// Request parameters or body.
    pub params: Value,
    /// Idempotency token attached to mutations.
    pub request_id: Option<Uuid>,
}

impl ApiRequest {
    fn new(kind: RequestKind, resource: String, params: Value) -> Self {
        let request_id = kind.is_mutation().then(Uuid::new_v4);
        Self {
            kind,
            resource,
            params,
            request_id,
        }
    }

    /// Fetches `reference`.
    #[must_use]
    pub fn get(reference: &ResourceReference) -> Self {
        Self::new(RequestKind::Get, reference.to_path(), Value::Null)
    }

    /// Lists the collection at `path`, optionally filtered.
    #[must_use]
    pub fn list(path: impl Into<String>, filter: Option<&str>) -> Self {
        let params = filter.map_or(Value::Null, |text| json!({ "filter": text }));
        Self::new(RequestKind::List, path.into(), params)
    }

    /// Lists `collection` across every scope of `project`, filtered by name.
    #[must_use]
    pub fn aggregated_list(project: &str, collection: Collection, name: &str) -> Self {
        Self::new(
            RequestKind::AggregatedList,
            format!("projects/{project}/aggregated/{}", collection.name()),
            json!({ "filter": format!("name eq {name}") }),
        )
    }

    /// Creates the resource described by `body` under `reference`'s collection.
    #[must_use]
    pub fn insert(reference: &ResourceReference, body: Value) -> Self {
        Self::new(RequestKind::Insert, reference.collection_path(), body)
    }

    /// Deletes `reference`.
    #[must_use]
    pub fn delete(reference: &ResourceReference) -> Self {
        Self::new(RequestKind::Delete, reference.to_path(), Value::Null)
    }

    /// Patches `reference` with `params`.
    #[must_use]
    pub fn patch(reference: &ResourceReference, params: Value) -> Self {
        Self::new(RequestKind::Patch, reference.to_path(), params)
    }
}

/// Errors reported by the API collaborator.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RemoteError {
    /// The API helper could not be started.
    #[error("failed to spawn `{program}`: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// OS error text.
        message: String,
    },
    /// The service rejected the request.
    #[error("HTTPError {code}: {message}")]
    Status {
        /// HTTP-style status code.
        code: u16,
        /// Service-provided message.
        message: String,
    },
    /// The response could not be decoded.
    #[error("unreadable response for [{resource}]: {message}")]
    Decode {
        /// Resource the request addressed.
        resource: String,
        /// Decoder error text.
        message: String,
    },
}

impl RemoteError {
    /// Returns `true` when the service reported that the resource is absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { code: 404, .. })
    }
}

/// Future returned by API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Remote resource-management API.
pub trait ComputeApi: Sync {
    /// Performs one request and returns the decoded response body.
    fn call(&self, request: ApiRequest) -> ApiFuture<'_, Value>;

    /// Returns every scope holding a `collection` resource called `name`.
    fn find_scopes<'a>(
        &'a self,
        project: &'a str,
        collection: Collection,
        name: &'a str,
    ) -> ApiFuture<'a, Vec<Scope>> {
        Box::pin(async move {
            let request = ApiRequest::aggregated_list(project, collection, name);
            let resource = request.resource.clone();
            let response = self.call(request).await?;
            let kind = collection.scope();
            let mut scopes: Vec<Scope> = items(&response, &resource)?
                .iter()
                .filter(|item| item.get("name").and_then(Value::as_str) == Some(name))
                .filter_map(|item| item.get(kind.noun()).and_then(Value::as_str))
                .map(|scope| Scope::of_kind(kind, last_segment(scope)))
                .collect();
            scopes.sort();
            scopes.dedup();
            Ok(scopes)
        })
    }

    /// Returns the names of every scope of `kind` in `project`.
    fn list_scopes<'a>(&'a self, project: &'a str, kind: ScopeKind) -> ApiFuture<'a, Vec<String>> {
        Box::pin(async move {
            let request = ApiRequest::list(format!("projects/{project}/{}", kind.segment()), None);
            let resource = request.resource.clone();
            let response = self.call(request).await?;
            Ok(items(&response, &resource)?
                .iter()
                .filter_map(|item| item.get("name").and_then(Value::as_str))
                .map(str::to_owned)
                .collect())
        })
    }
}

/// Returns the `items` array of a list response. A missing array is empty.
///
/// # Errors
///
/// Returns [`RemoteError::Decode`] when `items` is present but not an array.
pub fn items<'v>(response: &'v Value, resource: &str) -> Result<&'v [Value], RemoteError> {
    match response.get("items") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(values)) => Ok(values),
        Some(_) => Err(RemoteError::Decode {
            resource: resource.to_owned(),
            message: String::from("`items` is not an array"),
        }),
    }
}

fn last_segment(text: &str) -> &str {
    text.rsplit('/').next().unwrap_or(text)
}

#[cfg(test)]
mod tests;
