//! `firebase test android models list`.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiRequest, RemoteError};
use crate::executor::{Command, CommandError, Context};
use crate::options::{CommandSchema, ParsedOptions};
use crate::resource::{ResourceArg, ResourceReference};

/// Catalogue path for Android devices.
pub const ANDROID_CATALOG: &str = "testEnvironmentCatalog/ANDROID";

/// One device model offered for testing.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AndroidModel {
    /// Model identifier.
    pub id: String,
    /// Manufacturer.
    #[serde(default)]
    pub manufacturer: String,
    /// Marketing name.
    #[serde(default)]
    pub name: String,
    /// `VIRTUAL` or `PHYSICAL`.
    #[serde(default)]
    pub form: String,
    /// Screen height in pixels.
    #[serde(default)]
    pub screen_y: u32,
    /// Screen width in pixels.
    #[serde(default)]
    pub screen_x: u32,
    /// OS versions this model runs.
    #[serde(default)]
    pub supported_version_ids: Vec<String>,
    /// Catalogue tags such as `default` or `deprecated`.
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Catalog {
    #[serde(default)]
    android_device_catalog: AndroidCatalog,
}

#[derive(Debug, Default, Deserialize)]
struct AndroidCatalog {
    #[serde(default)]
    models: Vec<AndroidModel>,
}

/// Returns the models of a catalogue response that still support at least
/// one OS version.
///
/// # Errors
///
/// Returns [`RemoteError::Decode`] when the response is not a catalogue.
pub fn supported_models(response: Value) -> Result<Vec<AndroidModel>, RemoteError> {
    let catalog: Catalog =
        serde_json::from_value(response).map_err(|err| RemoteError::Decode {
            resource: ANDROID_CATALOG.to_owned(),
            message: err.to_string(),
        })?;
    let models = catalog.android_device_catalog.models;
    let total = models.len();
    let supported: Vec<AndroidModel> = models
        .into_iter()
        .filter(|model| !model.supported_version_ids.is_empty())
        .collect();
    debug!(total, kept = supported.len(), "filtered obsolete models");
    Ok(supported)
}

/// `firebase test android models list`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListModels;

impl Command for ListModels {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new()
    }

    fn targets(&self, _: &ParsedOptions) -> Vec<ResourceArg> {
        Vec::new()
    }

    fn execute<'a>(
        &'a self,
        context: &'a Context<'a>,
        _: &'a ParsedOptions,
        _: Vec<ResourceReference>,
    ) -> impl Future<Output = Result<Value, CommandError>> + 'a {
        async move {
            let response = context
                .api
                .call(ApiRequest::list(ANDROID_CATALOG, None))
                .await?;
            Ok(serde_json::to_value(supported_models(response)?)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Properties;
    use crate::executor::Executor;
    use crate::options::RawArgs;
    use crate::test_support::{ScriptedApi, ScriptedConsole};
    use rstest::rstest;
    use serde_json::json;

    fn catalog() -> Value {
        json!({
            "androidDeviceCatalog": {
                "models": [
                    {
                        "id": "Nexus5",
                        "manufacturer": "LGE",
                        "name": "Nexus 5",
                        "form": "PHYSICAL",
                        "screenX": 1080,
                        "screenY": 1920,
                        "supportedVersionIds": ["21", "22"],
                        "tags": ["default"],
                    },
                    { "id": "Retired", "supportedVersionIds": [] },
                    { "id": "Unversioned" },
                ],
            },
        })
    }

    #[rstest]
    fn obsolete_models_are_dropped() {
        let models = supported_models(catalog()).expect("catalog decodes");
        let ids: Vec<&str> = models.iter().map(|model| model.id.as_str()).collect();
        assert_eq!(ids, vec!["Nexus5"]);
    }

    #[rstest]
    fn malformed_catalog_is_a_decode_error() {
        let err = supported_models(json!({ "androidDeviceCatalog": { "models": 3 } }))
            .expect_err("not a catalog");
        assert!(matches!(err, RemoteError::Decode { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn lists_the_android_catalog() {
        let api = ScriptedApi::new();
        let console = ScriptedConsole::new();
        let properties = Properties::for_project("p");
        api.push_ok(catalog());
        let output = Executor::new(Context::new(&properties, &api, &console))
            .run(&ListModels, &RawArgs::new())
            .await
            .expect("listed");
        assert_eq!(output[0]["screenY"], 1920);
        assert_eq!(output.as_array().map(Vec::len), Some(1));
        let requests = api.requests();
        assert_eq!(
            requests.first().map(|request| request.resource.as_str()),
            Some(ANDROID_CATALOG)
        );
    }
}
