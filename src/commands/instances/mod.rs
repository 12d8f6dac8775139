//! `compute instances` commands.

pub mod container;
pub mod flags;
mod request;

use std::future::Future;
use std::net::IpAddr;

use camino::Utf8Path;
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiRequest, RemoteError};
use crate::executor::{Command, CommandError, Context};
use crate::options::{CommandSchema, OptionSpec, ParsedOptions};
use crate::resource::{Collection, ResourceArg, ResourceReference, Scope};
use crate::validate::ValidationRule;

use super::{names, single_name, target_names};
use request::{ImageDefault, InterfaceSpec, NetworkInterface};

pub use request::{CONTAINER_OPTIMIZED, DEBIAN, SCOPE_PREFIX, expand_scope};

fn instance_targets(options: &ParsedOptions) -> Vec<ResourceArg> {
    target_names(options)
        .into_iter()
        .map(|name| ResourceArg::new(Collection::INSTANCES, name).with_scope(options.text("zone")))
        .collect()
}

/// Looks up the external address for an interface. IP literals pass through;
/// names are read from the address resource in the instance's region.
async fn nat_ip(
    context: &Context<'_>,
    spec: &InterfaceSpec,
    instance: &ResourceReference,
) -> Result<Option<String>, CommandError> {
    let Some(address) = spec.address.as_deref() else {
        return Ok(None);
    };
    if address.parse::<IpAddr>().is_ok() {
        return Ok(Some(address.to_owned()));
    }
    let reference = if ResourceReference::is_qualified(address) {
        ResourceReference::parse_in(address, Collection::ADDRESSES)
            .map_err(|err| CommandError::Resolution(err.into()))?
    } else {
        let region = instance.scope().region().unwrap_or_default();
        ResourceReference::new(
            instance.project(),
            Collection::ADDRESSES,
            address,
            Scope::Region(region.to_owned()),
        )
    };
    debug!(address = %reference, "looking up reserved address");
    let response = context.api.call(ApiRequest::get(&reference)).await?;
    response
        .get("address")
        .and_then(Value::as_str)
        .map(|ip| Some(ip.to_owned()))
        .ok_or_else(|| {
            CommandError::from(RemoteError::Decode {
                resource: reference.to_path(),
                message: String::from("address resource has no [address] field"),
            })
        })
}

async fn network_interfaces(
    context: &Context<'_>,
    options: &ParsedOptions,
    instance: &ResourceReference,
) -> Result<Vec<NetworkInterface>, CommandError> {
    let mut interfaces = Vec::new();
    for spec in request::interface_specs(options) {
        let ip = nat_ip(context, &spec, instance).await?;
        interfaces.push(request::network_interface(&spec, options, instance, ip));
    }
    Ok(interfaces)
}

async fn insert_instances(
    context: &Context<'_>,
    options: &ParsedOptions,
    targets: &[ResourceReference],
    fallback: ImageDefault,
    env_file: Option<&[(String, String)]>,
) -> Result<Value, CommandError> {
    let mut requests = Vec::with_capacity(targets.len());
    for reference in targets {
        let interfaces = network_interfaces(context, options, reference).await?;
        let metadata = env_file.map(|entries| {
            container::metadata(&container::declaration(options, reference.name(), entries))
        });
        let body = request::instance(options, reference, fallback, interfaces, metadata);
        requests.push(ApiRequest::insert(reference, serde_json::to_value(&body)?));
    }
    let responses = context
        .call_all("Could not fetch resource:", requests)
        .await?;
    Ok(Value::Array(responses))
}

/// `compute instances create`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Create;

impl Command for Create {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new()
            .options(flags::create_options())
            .require_together(flags::CUSTOM_MACHINE_TYPE)
    }

    fn rules(&self) -> Vec<ValidationRule> {
        flags::create_rules()
    }

    fn targets(&self, options: &ParsedOptions) -> Vec<ResourceArg> {
        instance_targets(options)
    }

    fn execute<'a>(
        &'a self,
        context: &'a Context<'a>,
        options: &'a ParsedOptions,
        targets: Vec<ResourceReference>,
    ) -> impl Future<Output = Result<Value, CommandError>> + 'a {
        async move { insert_instances(context, options, &targets, DEBIAN, None).await }
    }
}

/// `compute instances create-with-container`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CreateWithContainer;

impl Command for CreateWithContainer {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new()
            .options(flags::create_options())
            .options(flags::container_options())
            .require_together(flags::CUSTOM_MACHINE_TYPE)
    }

    fn rules(&self) -> Vec<ValidationRule> {
        flags::container_rules()
    }

    fn targets(&self, options: &ParsedOptions) -> Vec<ResourceArg> {
        instance_targets(options)
    }

    fn execute<'a>(
        &'a self,
        context: &'a Context<'a>,
        options: &'a ParsedOptions,
        targets: Vec<ResourceReference>,
    ) -> impl Future<Output = Result<Value, CommandError>> + 'a {
        async move {
            let env_file = options
                .text("container-env-file")
                .map(|path| container::read_env_file(Utf8Path::new(path)))
                .transpose()?
                .unwrap_or_default();
            insert_instances(
                context,
                options,
                &targets,
                CONTAINER_OPTIMIZED,
                Some(env_file.as_slice()),
            )
            .await
        }
    }
}

/// `compute instances describe`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Describe;

impl Command for Describe {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new()
            .option(single_name())
            .option(OptionSpec::text("zone"))
    }

    fn targets(&self, options: &ParsedOptions) -> Vec<ResourceArg> {
        instance_targets(options)
    }

    fn execute<'a>(
        &'a self,
        context: &'a Context<'a>,
        _: &'a ParsedOptions,
        targets: Vec<ResourceReference>,
    ) -> impl Future<Output = Result<Value, CommandError>> + 'a {
        async move {
            let requests = targets.iter().map(ApiRequest::get).collect();
            let responses = context.call_all("Could not fetch resource:", requests).await?;
            Ok(responses.into_iter().next().unwrap_or(Value::Null))
        }
    }
}

/// `compute instances delete`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Delete;

fn deletion_prompt(targets: &[ResourceReference]) -> String {
    let listing: String = targets
        .iter()
        .map(|target| {
            let zone = target.scope().name().unwrap_or_default();
            format!("\n - [{}] in [{zone}]", target.name())
        })
        .collect();
    format!("The following instances will be deleted:{listing}")
}

impl Command for Delete {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new()
            .option(names())
            .option(OptionSpec::text("zone"))
    }

    fn targets(&self, options: &ParsedOptions) -> Vec<ResourceArg> {
        instance_targets(options)
    }

    fn execute<'a>(
        &'a self,
        context: &'a Context<'a>,
        _: &'a ParsedOptions,
        targets: Vec<ResourceReference>,
    ) -> impl Future<Output = Result<Value, CommandError>> + 'a {
        async move {
            if !context.console.confirm(&deletion_prompt(&targets), true)? {
                return Err(CommandError::Aborted(String::from("Deletion aborted by user.")));
            }
            let requests = targets.iter().map(ApiRequest::delete).collect();
            let responses = context.call_all("Could not fetch resource:", requests).await?;
            for target in &targets {
                context
                    .console
                    .status(&format!("Deleted [{}].", target.to_path()))?;
            }
            Ok(Value::Array(responses))
        }
    }
}

#[cfg(test)]
mod tests;
