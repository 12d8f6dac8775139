//! Binary entry point for the nimbus CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use nimbus::api::ProcessApi;
use nimbus::config::{ConfigError, Properties};
use nimbus::console::TerminalConsole;
use nimbus::executor::{CommandError, Context, Executor};
use nimbus::logging;

mod cli;
mod dispatch;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.verbosity);
    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            write_error(io::stderr(), &err);
            1
        }
    };
    process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let properties = Properties::load_without_cli_args()?.with_overrides(cli.project, cli.quiet);
    properties.validate()?;
    debug!(api_bin = %properties.api_bin, "loaded properties");

    let api = ProcessApi::new(properties.api_bin.clone());
    let console = TerminalConsole::new(properties.disable_prompts);
    let executor = Executor::new(Context::new(&properties, &api, &console));
    let output = dispatch::dispatch(&executor, cli.group).await?;
    write_output(io::stdout(), &output)
}

fn write_output(mut target: impl Write, output: &Value) -> Result<(), CliError> {
    if output.is_null() {
        return Ok(());
    }
    let rendered = serde_json::to_string_pretty(output)?;
    writeln!(target, "{rendered}").ok();
    Ok(())
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "ERROR: {err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus::options::ArgumentError;
    use serde_json::json;

    #[test]
    fn write_error_prefixes_the_message() {
        let mut buf = Vec::new();
        let err = CliError::Command(CommandError::Argument(ArgumentError::required(
            "container-image",
            "required",
        )));
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(rendered.starts_with("ERROR: "), "rendered: {rendered}");
        assert!(rendered.contains("--container-image"), "rendered: {rendered}");
    }

    #[test]
    fn null_output_prints_nothing() {
        let mut buf = Vec::new();
        write_output(&mut buf, &Value::Null).expect("rendered");
        assert!(buf.is_empty());
    }

    #[test]
    fn output_is_pretty_json() {
        let mut buf = Vec::new();
        write_output(&mut buf, &json!({ "name": "vm-1" })).expect("rendered");
        let rendered = String::from_utf8(buf).expect("utf8");
        assert_eq!(rendered, "{\n  \"name\": \"vm-1\"\n}\n");
    }
}
