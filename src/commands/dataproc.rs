//! `dataproc jobs` commands.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::api::ApiRequest;
use crate::executor::{Command, CommandError, Context};
use crate::options::{CommandSchema, OptionSpec, ParsedOptions};
use crate::resource::{Collection, ResourceArg, ResourceReference};

use super::{single_name, target_names};

/// Region used when `--region` is not given.
pub const DEFAULT_REGION: &str = "global";
/// Pause between existence checks while waiting for a deletion.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Longest wait for a deleted job to disappear.
pub const DELETION_TIMEOUT: Duration = Duration::from_secs(60);

/// `dataproc jobs delete`: removes the record of an inactive job and waits
/// until the service stops returning it.
#[derive(Clone, Copy, Debug)]
pub struct DeleteJob {
    /// Pause between polls.
    pub interval: Duration,
    /// Deadline for the job to disappear.
    pub timeout: Duration,
}

impl Default for DeleteJob {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            timeout: DELETION_TIMEOUT,
        }
    }
}

impl DeleteJob {
    async fn wait_for_deletion(
        &self,
        context: &Context<'_>,
        job: &ResourceReference,
    ) -> Result<(), CommandError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match context.api.call(ApiRequest::get(job)).await {
                Err(err) if err.is_not_found() => return Ok(()),
                Err(err) => return Err(err.into()),
                Ok(_) => debug!(job = %job, "job still present"),
            }
            if Instant::now() >= deadline {
                return Err(CommandError::Timeout {
                    what: format!("deletion of [{}]", job.name()),
                    seconds: self.timeout.as_secs(),
                });
            }
            sleep(self.interval).await;
        }
    }
}

impl Command for DeleteJob {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new()
            .option(single_name())
            .option(OptionSpec::text("region").default_value(DEFAULT_REGION))
    }

    fn targets(&self, options: &ParsedOptions) -> Vec<ResourceArg> {
        target_names(options)
            .into_iter()
            .map(|id| ResourceArg::new(Collection::JOBS, id).with_scope(options.text("region")))
            .collect()
    }

    fn execute<'a>(
        &'a self,
        context: &'a Context<'a>,
        _: &'a ParsedOptions,
        targets: Vec<ResourceReference>,
    ) -> impl Future<Output = Result<Value, CommandError>> + 'a {
        async move {
            let Some(job) = targets.first() else {
                return Ok(Value::Null);
            };
            let prompt = format!("The job '{}' will be deleted.", job.name());
            if !context.console.confirm(&prompt, true)? {
                return Err(CommandError::Aborted(String::from("Deletion aborted by user.")));
            }
            let responses = context
                .call_all("Could not delete job:", vec![ApiRequest::delete(job)])
                .await?;
            info!(job = %job, "waiting for job deletion");
            self.wait_for_deletion(context, job).await?;
            context
                .console
                .status(&format!("Deleted [{}].", job.to_path()))?;
            Ok(responses.into_iter().next().unwrap_or(Value::Null))
        }
    }
}
