//! Tests for property loading, overrides and validation.

use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use nimbus::config::{ConfigError, Properties};
use nimbus::resource::ScopeKind;
use nimbus::test_support::EnvGuard;
use rstest::*;
use tempfile::TempDir;

const CLEARED: [&str; 6] = [
    "NIMBUS_PROJECT",
    "NIMBUS_ZONE",
    "NIMBUS_REGION",
    "NIMBUS_DISABLE_PROMPTS",
    "NIMBUS_API_BIN",
    "NIMBUS_CONFIG_PATH",
];

fn without_nimbus_env<'a>(overrides: &[(&'a str, Option<&'a str>)]) -> Vec<(&'a str, Option<&'a str>)> {
    CLEARED
        .iter()
        .filter(|key| !overrides.iter().any(|(name, _)| name == *key))
        .map(|key| (*key, None))
        .chain(overrides.iter().copied())
        .collect()
}

#[test]
fn missing_project_error_is_actionable() {
    let properties = Properties {
        project: None,
        ..Properties::for_project("p")
    };
    let error = properties.require_project().expect_err("project is required");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error");
    };
    for hint in ["--project", "NIMBUS_PROJECT", "nimbus.toml", "project"] {
        assert!(message.contains(hint), "error should mention {hint}: {message}");
    }
}

#[test]
fn blank_project_counts_as_missing() {
    let properties = Properties::for_project("   ");
    assert!(properties.require_project().is_err());
}

#[test]
fn blank_api_helper_fails_validation() {
    let properties = Properties {
        api_bin: String::new(),
        ..Properties::for_project("p")
    };
    let message = properties
        .validate()
        .expect_err("helper is required")
        .to_string();
    assert!(message.contains("NIMBUS_API_BIN"), "{message}");
    assert!(message.contains("api_bin"), "{message}");
}

#[rstest]
#[case(ScopeKind::Zone, Some("europe-west1-b"))]
#[case(ScopeKind::Region, Some("europe-west1"))]
#[case(ScopeKind::Global, None)]
fn default_scope_follows_the_kind(#[case] kind: ScopeKind, #[case] expected: Option<&str>) {
    let properties = Properties {
        zone: Some(String::from("europe-west1-b")),
        region: Some(String::from("europe-west1")),
        ..Properties::for_project("p")
    };
    assert_eq!(properties.default_scope(kind), expected);
}

#[test]
fn command_line_overrides_win() {
    let properties =
        Properties::for_project("from-file").with_overrides(Some(String::from("from-flag")), true);
    assert_eq!(properties.require_project().ok(), Some("from-flag"));
    assert!(properties.disable_prompts);

    let untouched = Properties::for_project("from-file").with_overrides(None, false);
    assert_eq!(untouched.require_project().ok(), Some("from-file"));
    assert!(!untouched.disable_prompts);
}

#[tokio::test]
async fn environment_supplies_properties() {
    let vars = without_nimbus_env(&[
        ("NIMBUS_PROJECT", Some("env-project")),
        ("NIMBUS_ZONE", Some("us-east1-b")),
        ("NIMBUS_API_BIN", Some("/opt/helper")),
    ]);
    let _guard = EnvGuard::set_vars(&vars).await;

    let properties = Properties::load_without_cli_args()
        .unwrap_or_else(|err| panic!("properties should load: {err}"));
    assert_eq!(properties.project.as_deref(), Some("env-project"));
    assert_eq!(properties.default_scope(ScopeKind::Zone), Some("us-east1-b"));
    assert_eq!(properties.api_bin, "/opt/helper");
    assert!(!properties.disable_prompts);
}

#[tokio::test]
async fn configuration_file_is_discovered_from_env_path() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
    Dir::open_ambient_dir(&root, ambient_authority())
        .unwrap_or_else(|err| panic!("open temp dir: {err}"))
        .write(
            "nimbus.toml",
            "project = \"file-project\"\nregion = \"asia-east1\"\n",
        )
        .unwrap_or_else(|err| panic!("write config: {err}"));
    let config_path = root.join("nimbus.toml");
    let vars = without_nimbus_env(&[("NIMBUS_CONFIG_PATH", Some(config_path.as_str()))]);
    let _guard = EnvGuard::set_vars(&vars).await;

    let properties = Properties::load_without_cli_args()
        .unwrap_or_else(|err| panic!("properties should load: {err}"));
    assert_eq!(properties.project.as_deref(), Some("file-project"));
    assert_eq!(properties.default_scope(ScopeKind::Region), Some("asia-east1"));
    assert_eq!(properties.api_bin, nimbus::api::DEFAULT_API_BIN);
}
