//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};

use serde_json::{Value, json};
use tokio::sync::{Mutex, MutexGuard};

use crate::api::{ApiFuture, ApiRequest, ComputeApi, RemoteError, RequestKind};
use crate::console::{Console, ConsoleError};

fn lock<T>(mutex: &StdMutex<T>) -> StdMutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct ApiScript {
    responses: VecDeque<Result<Value, RemoteError>>,
    requests: Vec<ApiRequest>,
}

/// Scripted API that returns pre-seeded responses in FIFO order.
///
/// Every request is recorded so tests can assert on what was sent and in
/// which order. Clones share the same script.
#[derive(Clone, Debug, Default)]
pub struct ScriptedApi {
    script: Arc<StdMutex<ApiScript>>,
}

impl ScriptedApi {
    /// Creates an API with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response body.
    pub fn push_ok(&self, body: Value) {
        lock(&self.script).responses.push_back(Ok(body));
    }

    /// Queues a failure.
    pub fn push_err(&self, error: RemoteError) {
        lock(&self.script).responses.push_back(Err(error));
    }

    /// Queues a 404 failure.
    pub fn push_not_found(&self, message: &str) {
        self.push_err(RemoteError::Status {
            code: 404,
            message: message.to_owned(),
        });
    }

    /// Returns a snapshot of every request made so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.script).requests.clone()
    }

    /// Returns the kinds of every request made so far.
    #[must_use]
    pub fn request_kinds(&self) -> Vec<RequestKind> {
        lock(&self.script)
            .requests
            .iter()
            .map(|request| request.kind)
            .collect()
    }

    /// Returns the number of responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.script).responses.len()
    }
}

impl ComputeApi for ScriptedApi {
    fn call(&self, request: ApiRequest) -> ApiFuture<'_, Value> {
        let mut script = lock(&self.script);
        script.requests.push(request);
        let response = script.responses.pop_front().unwrap_or_else(|| {
            Err(RemoteError::Status {
                code: 500,
                message: String::from("no scripted response available"),
            })
        });
        Box::pin(async move { response })
    }
}

/// Interaction recorded by [`ScriptedConsole`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConsoleEvent {
    /// A menu was shown.
    Choose {
        /// Prompt text.
        message: String,
        /// Options in display order.
        options: Vec<String>,
    },
    /// A yes/no question was asked.
    Confirm {
        /// Question text.
        message: String,
    },
    /// A status line was written.
    Status(String),
}

#[derive(Debug, Default)]
struct ConsoleScript {
    interactive: bool,
    choices: VecDeque<Option<usize>>,
    confirmations: VecDeque<bool>,
    events: Vec<ConsoleEvent>,
}

/// Console double answering prompts from a script.
///
/// Unscripted menus are cancelled and unscripted confirmations take their
/// default. Clones share the same script.
#[derive(Clone, Debug)]
pub struct ScriptedConsole {
    script: Arc<StdMutex<ConsoleScript>>,
}

impl Default for ScriptedConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedConsole {
    /// Creates an interactive console.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(StdMutex::new(ConsoleScript {
                interactive: true,
                ..ConsoleScript::default()
            })),
        }
    }

    /// Creates a console that refuses to prompt, as under `--quiet`.
    #[must_use]
    pub fn non_interactive() -> Self {
        Self {
            script: Arc::new(StdMutex::new(ConsoleScript::default())),
        }
    }

    /// Queues a menu answer; `None` cancels.
    pub fn push_choice(&self, choice: Option<usize>) {
        lock(&self.script).choices.push_back(choice);
    }

    /// Queues a confirmation answer.
    pub fn push_confirmation(&self, answer: bool) {
        lock(&self.script).confirmations.push_back(answer);
    }

    /// Returns every recorded interaction.
    #[must_use]
    pub fn events(&self) -> Vec<ConsoleEvent> {
        lock(&self.script).events.clone()
    }

    /// Returns the options of every menu shown.
    #[must_use]
    pub fn menus(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ConsoleEvent::Choose { options, .. } => Some(options),
                _ => None,
            })
            .collect()
    }

    /// Returns every status line written.
    #[must_use]
    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ConsoleEvent::Status(line) => Some(line),
                _ => None,
            })
            .collect()
    }
}

impl Console for ScriptedConsole {
    fn can_prompt(&self) -> bool {
        lock(&self.script).interactive
    }

    fn choose(&self, message: &str, options: &[String]) -> Result<Option<usize>, ConsoleError> {
        let mut script = lock(&self.script);
        script.events.push(ConsoleEvent::Choose {
            message: message.to_owned(),
            options: options.to_vec(),
        });
        Ok(script.choices.pop_front().flatten())
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool, ConsoleError> {
        let mut script = lock(&self.script);
        if !script.interactive {
            return Ok(default);
        }
        script.events.push(ConsoleEvent::Confirm {
            message: message.to_owned(),
        });
        Ok(script.confirmations.pop_front().unwrap_or(default))
    }

    fn status(&self, line: &str) -> Result<(), ConsoleError> {
        lock(&self.script)
            .events
            .push(ConsoleEvent::Status(line.to_owned()));
        Ok(())
    }
}

/// Builds an aggregated-list body listing `(name, scope)` pairs under
/// `scope_key` (`zone` or `region`), with scopes rendered as URLs.
#[must_use]
pub fn json_aggregated(scope_key: &str, items: &[(&str, &str)]) -> Value {
    let plural = if scope_key == "zone" { "zones" } else { "regions" };
    let entries: Vec<Value> = items
        .iter()
        .map(|(name, scope)| {
            let mut entry = serde_json::Map::new();
            entry.insert(String::from("name"), json!(name));
            entry.insert(
                scope_key.to_owned(),
                json!(format!("https://api.example.test/projects/p/{plural}/{scope}")),
            );
            Value::Object(entry)
        })
        .collect();
    json!({ "items": entries })
}

/// Builds a list body naming each scope.
#[must_use]
pub fn json_scopes(names: &[&str]) -> Value {
    let entries: Vec<Value> = names.iter().map(|name| json!({ "name": name })).collect();
    json!({ "items": entries })
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets (`Some`) or removes (`None`) environment variables while holding
    /// a global mutex.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(text) => env::set_var(key, text),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
