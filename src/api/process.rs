//! [`ComputeApi`] implementation that shells out to an API helper binary.
//!
//! Each request runs `<bin> <kind> <resource> --params <json>` (plus
//! `--request-id <uuid>` for mutations). A zero exit status yields the JSON
//! document on stdout. A failure is read from stderr, either as a
//! `{"code": ..., "message": ...}` document or as plain text.

use std::ffi::OsString;

use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::{ApiFuture, ApiRequest, ComputeApi, RemoteError};

/// Helper binary used when no override is configured.
pub const DEFAULT_API_BIN: &str = "nimbus-api";

/// API client backed by an external helper process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessApi {
    program: String,
}

#[derive(Debug, Deserialize)]
struct ErrorDocument {
    code: u16,
    message: String,
}

impl ProcessApi {
    /// Creates a client invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the helper program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn build_args(request: &ApiRequest) -> Vec<OsString> {
        let mut args = vec![
            OsString::from(request.kind.as_str()),
            OsString::from(&request.resource),
            OsString::from("--params"),
            OsString::from(request.params.to_string()),
        ];
        if let Some(id) = request.request_id {
            args.push(OsString::from("--request-id"));
            args.push(OsString::from(id.to_string()));
        }
        args
    }

    fn decode_failure(code: Option<i32>, stderr: &str) -> RemoteError {
        serde_json::from_str::<ErrorDocument>(stderr.trim()).map_or_else(
            |_| {
                let status_text = code.map_or_else(|| String::from("unknown"), |value| value.to_string());
                let detail = stderr.trim();
                RemoteError::Status {
                    code: 500,
                    message: if detail.is_empty() {
                        format!("API helper exited with status {status_text}")
                    } else {
                        detail.to_owned()
                    },
                }
            },
            |document| RemoteError::Status {
                code: document.code,
                message: document.message,
            },
        )
    }
}

impl Default for ProcessApi {
    fn default() -> Self {
        Self::new(DEFAULT_API_BIN)
    }
}

impl ComputeApi for ProcessApi {
    fn call(&self, request: ApiRequest) -> ApiFuture<'_, Value> {
        Box::pin(async move {
            let args = Self::build_args(&request);
            debug!(
                program = %self.program,
                kind = request.kind.as_str(),
                resource = %request.resource,
                "calling API helper"
            );
            let output = Command::new(&self.program)
                .args(&args)
                .output()
                .await
                .map_err(|err| RemoteError::Spawn {
                    program: self.program.clone(),
                    message: err.to_string(),
                })?;
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(Self::decode_failure(output.status.code(), &stderr));
            }
            if stdout.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&stdout).map_err(|err| RemoteError::Decode {
                resource: request.resource.clone(),
                message: err.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the process-backed API client.

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn mutations_carry_request_id() {
        let reference = crate::resource::ResourceReference::new(
            "p",
            crate::resource::Collection::INSTANCES,
            "vm",
            crate::resource::Scope::Zone(String::from("us-central1-a")),
        );
        let args = ProcessApi::build_args(&ApiRequest::delete(&reference));
        let rendered: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rendered.get(..4),
            Some(
                &[
                    String::from("delete"),
                    String::from("projects/p/zones/us-central1-a/instances/vm"),
                    String::from("--params"),
                    String::from("null"),
                ][..]
            )
        );
        assert_eq!(rendered.get(4).map(String::as_str), Some("--request-id"));
    }

    #[rstest]
    fn reads_do_not_carry_request_id() {
        let args = ProcessApi::build_args(&ApiRequest::list("projects/p/zones", None));
        assert_eq!(args.len(), 4);
    }

    #[rstest]
    #[case(r#"{"code":404,"message":"not found"}"#, 404, "not found")]
    #[case("permission denied\n", 500, "permission denied")]
    #[case("", 500, "API helper exited with status 3")]
    fn failures_decode_from_stderr(
        #[case] stderr: &str,
        #[case] code: u16,
        #[case] message: &str,
    ) {
        let err = ProcessApi::decode_failure(Some(3), stderr);
        assert_eq!(
            err,
            RemoteError::Status {
                code,
                message: message.to_owned()
            }
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let api = ProcessApi::new("nimbus-api-does-not-exist");
        let err = api
            .call(ApiRequest::list("projects/p/zones", Some("name eq x")))
            .await
            .expect_err("spawn should fail");
        assert!(matches!(err, RemoteError::Spawn { .. }));
    }
}
