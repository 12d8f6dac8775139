//! Container declaration metadata for `instances create-with-container`.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde_json::{Map, Value, json};

use crate::options::{ArgumentError, DictScalar, ParsedOptions};

use super::request::{Metadata, MetadataItem};

/// Metadata key carrying the container declaration.
pub const DECLARATION_KEY: &str = "gce-container-declaration";
const LOGGING_KEY: &str = "google-logging-enabled";

/// Reads a docker-style env file relative to the working directory.
///
/// # Errors
///
/// Returns [`ArgumentError::Invalid`] for `--container-env-file` when the file
/// cannot be read or a line is not `KEY=VALUE`.
pub fn read_env_file(path: &Utf8Path) -> Result<Vec<(String, String)>, ArgumentError> {
    let unreadable = |message: String| {
        ArgumentError::invalid(
            "container-env-file",
            format!("unable to read [{path}]: {message}"),
        )
    };
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| unreadable(String::from("path is missing a filename")))?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| unreadable(err.to_string()))?;
    let contents = dir
        .read_to_string(file_name)
        .map_err(|err| unreadable(err.to_string()))?;
    parse_env_file(path.as_str(), &contents)
}

/// Parses env file contents: blank lines and `#` comments are skipped.
///
/// # Errors
///
/// Returns [`ArgumentError::Invalid`] naming the first line without `=`.
pub fn parse_env_file(path: &str, contents: &str) -> Result<Vec<(String, String)>, ArgumentError> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.split_once('=')
                .map(|(key, value)| (key.trim().to_owned(), value.to_owned()))
                .ok_or_else(|| {
                    ArgumentError::invalid(
                        "container-env-file",
                        format!("Syntax error in [{path}]: expected KEY=VALUE, got [{line}]"),
                    )
                })
        })
        .collect()
}

/// Merges file entries with `--container-env`; flag values win.
fn merged_env(options: &ParsedOptions, from_file: &[(String, String)]) -> Vec<(String, String)> {
    let mut env = from_file.to_vec();
    for dict in options.dicts("container-env") {
        for (key, scalar) in dict.iter() {
            let value = match scalar {
                DictScalar::Text(text) => text.clone(),
                _ => String::new(),
            };
            if let Some(slot) = env.iter_mut().find(|(name, _)| name == key) {
                slot.1 = value;
            } else {
                env.push((key.to_owned(), value));
            }
        }
    }
    env
}

fn restart_policy(policy: &str) -> &'static str {
    match policy {
        "never" => "Never",
        "on-failure" => "OnFailure",
        _ => "Always",
    }
}

/// Builds the pod-style declaration for one instance's container.
#[must_use]
pub fn declaration(
    options: &ParsedOptions,
    instance_name: &str,
    env_file: &[(String, String)],
) -> Value {
    let mut container = Map::new();
    container.insert(String::from("name"), json!(instance_name));
    container.insert(
        String::from("image"),
        json!(options.text("container-image").unwrap_or_default()),
    );
    if let Some(command) = options.text("container-command") {
        container.insert(String::from("command"), json!([command]));
    }
    let args = options.texts("container-arg");
    if !args.is_empty() {
        container.insert(String::from("args"), json!(args));
    }
    if options.flag("container-privileged") {
        container.insert(
            String::from("securityContext"),
            json!({ "privileged": true }),
        );
    }
    let env: Vec<Value> = merged_env(options, env_file)
        .into_iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();
    if !env.is_empty() {
        container.insert(String::from("env"), Value::Array(env));
    }

    let mut mounts = Vec::new();
    let mut volumes = Vec::new();
    for (position, mount) in options
        .dicts("container-mount-host-path")
        .into_iter()
        .enumerate()
    {
        let name = format!("host-path-{position}");
        mounts.push(json!({
            "name": name,
            "mountPath": mount.text("mount-path").unwrap_or_default(),
            "readOnly": mount.text("mode") == Some("ro"),
        }));
        volumes.push(json!({
            "name": name,
            "hostPath": { "path": mount.text("host-path").unwrap_or_default() },
        }));
    }
    for (position, mount) in options
        .dicts("container-mount-tmpfs")
        .into_iter()
        .enumerate()
    {
        let name = format!("tmpfs-{position}");
        mounts.push(json!({
            "name": name,
            "mountPath": mount.text("mount-path").unwrap_or_default(),
        }));
        volumes.push(json!({ "name": name, "emptyDir": { "medium": "Memory" } }));
    }
    if !mounts.is_empty() {
        container.insert(String::from("volumeMounts"), Value::Array(mounts));
    }
    container.insert(String::from("stdin"), json!(options.flag("container-stdin")));
    container.insert(String::from("tty"), json!(options.flag("container-tty")));

    json!({
        "spec": {
            "containers": [Value::Object(container)],
            "volumes": volumes,
            "restartPolicy": restart_policy(
                options.text("container-restart-policy").unwrap_or("always")
            ),
        }
    })
}

/// Wraps a declaration into instance metadata.
pub(crate) fn metadata(declaration: &Value) -> Metadata {
    Metadata {
        items: vec![
            MetadataItem {
                key: String::from(DECLARATION_KEY),
                value: declaration.to_string(),
            },
            MetadataItem {
                key: String::from(LOGGING_KEY),
                value: String::from("true"),
            },
        ],
    }
}
