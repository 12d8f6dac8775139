//! Configuration properties loaded via `ortho-config`.
//!
//! Properties are read once at startup, merged from defaults, `nimbus.toml`
//! discovery and `NIMBUS_*` environment variables, then overridden by the
//! global command-line flags. The resulting value is passed explicitly to the
//! resolver and to every command.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::api::DEFAULT_API_BIN;
use crate::resource::ScopeKind;

/// Operator properties consulted when a flag is omitted.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "NIMBUS",
    discovery(
        app_name = "nimbus",
        env_var = "NIMBUS_CONFIG_PATH",
        config_file_name = "nimbus.toml",
        dotfile_name = ".nimbus.toml",
        project_file_name = "nimbus.toml"
    )
)]
pub struct Properties {
    /// Project that owns every addressed resource.
    pub project: Option<String>,
    /// Zone used when a zonal resource is named without one.
    pub zone: Option<String>,
    /// Region used when a regional resource is named without one.
    pub region: Option<String>,
    /// Answer every prompt with its default (or refuse) instead of asking.
    #[ortho_config(default = false)]
    pub disable_prompts: bool,
    /// Helper binary that performs API calls.
    #[ortho_config(default = DEFAULT_API_BIN.to_owned())]
    pub api_bin: String,
}

/// Metadata for a property, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
    flag: Option<&'static str>,
}

impl FieldMetadata {
    const PROJECT: Self = Self::new("project", "NIMBUS_PROJECT", "project", Some("--project"));
    const API_BIN: Self = Self::new("API helper binary", "NIMBUS_API_BIN", "api_bin", None);

    const fn new(
        description: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
        flag: Option<&'static str>,
    ) -> Self {
        Self {
            description,
            env_var,
            toml_key,
            flag,
        }
    }

    fn missing(&self) -> ConfigError {
        let flag_hint = self
            .flag
            .map_or_else(String::new, |flag| format!("pass {flag}, "));
        ConfigError::MissingField(format!(
            "missing {}: {flag_hint}set {} or add {} to nimbus.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

impl Properties {
    /// Properties for `project` with no default scopes and prompts enabled.
    #[must_use]
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            zone: None,
            region: None,
            disable_prompts: false,
            api_bin: DEFAULT_API_BIN.to_owned(),
        }
    }

    /// Loads properties without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("nimbus")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies the global command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, project: Option<String>, quiet: bool) -> Self {
        if let Some(value) = project {
            self.project = Some(value);
        }
        self.disable_prompts |= quiet;
        self
    }

    /// Returns the configured project.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] naming the flag, environment
    /// variable and TOML key when no project is configured.
    pub fn require_project(&self) -> Result<&str, ConfigError> {
        non_blank(self.project.as_deref()).ok_or_else(|| FieldMetadata::PROJECT.missing())
    }

    /// Returns the configured default scope name for `kind`.
    #[must_use]
    pub fn default_scope(&self, kind: ScopeKind) -> Option<&str> {
        match kind {
            ScopeKind::Zone => non_blank(self.zone.as_deref()),
            ScopeKind::Region => non_blank(self.region.as_deref()),
            ScopeKind::Global => None,
        }
    }

    /// Performs semantic validation on the loaded properties.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the API helper is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if non_blank(Some(&self.api_bin)).is_none() {
            return Err(FieldMetadata::API_BIN.missing());
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required property is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
