//! Routes parsed command lines to library commands.
//!
//! Clap only captures flag text. Each arm rebuilds the invocation as
//! [`RawArgs`] so the command's own schema does the typing and validation.
//! Flags are pushed in declaration order rather than command-line order;
//! clap has already grouped each flag's occurrences, so nothing depends on it.

use serde_json::Value;

use nimbus::commands::dataproc::DeleteJob;
use nimbus::commands::firebase::ListModels;
use nimbus::commands::instances::{Create, CreateWithContainer, Delete, Describe};
use nimbus::commands::routers::Update;
use nimbus::commands::NAME;
use nimbus::executor::{CommandError, Executor};
use nimbus::options::RawArgs;

use crate::cli::{
    Android, Compute, ContainerArgs, CreateArgs, Dataproc, Firebase, FirebaseTest, Group,
    Instances, Jobs, Models, RouterUpdateArgs, Routers,
};

/// Runs the command selected by `group`.
pub(crate) async fn dispatch(executor: &Executor<'_>, group: Group) -> Result<Value, CommandError> {
    match group {
        Group::Compute(Compute::Instances(command)) => match command {
            Instances::Create(args) => executor.run(&Create, &create_args(args)).await,
            Instances::CreateWithContainer(args) => {
                let raw = container_args(create_args(args.create), args.container);
                executor.run(&CreateWithContainer, &raw).await
            }
            Instances::Describe(args) => {
                let raw = RawArgs::new()
                    .values(NAME, [args.name])
                    .value("zone", args.zone);
                executor.run(&Describe, &raw).await
            }
            Instances::Delete(args) => {
                let raw = RawArgs::new()
                    .values(NAME, args.names)
                    .value("zone", args.zone);
                executor.run(&Delete, &raw).await
            }
        },
        Group::Compute(Compute::Routers(Routers::Update(args))) => {
            executor.run(&Update, &router_args(args)).await
        }
        Group::Dataproc(Dataproc::Jobs(Jobs::Delete(args))) => {
            let raw = RawArgs::new()
                .values(NAME, [args.id])
                .value("region", args.region);
            executor.run(&DeleteJob::default(), &raw).await
        }
        Group::Firebase(Firebase::Test(FirebaseTest::Android(Android::Models(Models::List)))) => {
            executor.run(&ListModels, &RawArgs::new()).await
        }
    }
}

fn create_args(args: CreateArgs) -> RawArgs {
    RawArgs::new()
        .values(NAME, args.names)
        .value("zone", args.zone)
        .value("description", args.description)
        .value("image", args.image)
        .value("image-family", args.image_family)
        .value("image-project", args.image_project)
        .value("boot-disk-device-name", args.boot_disk_device_name)
        .value("boot-disk-size", args.boot_disk_size)
        .value("boot-disk-type", args.boot_disk_type)
        .negatable(
            "boot-disk-auto-delete",
            args.boot_disk_auto_delete,
            args.no_boot_disk_auto_delete,
        )
        .value("boot-disk-kms-key", args.boot_disk_kms_key)
        .value("boot-disk-kms-project", args.boot_disk_kms_project)
        .value("boot-disk-kms-location", args.boot_disk_kms_location)
        .value("boot-disk-kms-keyring", args.boot_disk_kms_keyring)
        .values("disk", args.disk)
        .values("create-disk", args.create_disk)
        .values("local-ssd", args.local_ssd)
        .value("machine-type", args.machine_type)
        .value("custom-cpu", args.custom_cpu)
        .value("custom-memory", args.custom_memory)
        .switch("custom-extensions", args.custom_extensions)
        .value("min-cpu-platform", args.min_cpu_platform)
        .value("accelerator", args.accelerator)
        .switch("can-ip-forward", args.can_ip_forward)
        .switch("deletion-protection", args.deletion_protection)
        .switch("preemptible", args.preemptible)
        .value("maintenance-policy", args.maintenance_policy)
        .negatable(
            "restart-on-failure",
            args.restart_on_failure,
            args.no_restart_on_failure,
        )
        .value("network", args.network)
        .value("subnet", args.subnet)
        .value("private-network-ip", args.private_network_ip)
        .value("address", args.address)
        .switch("no-address", args.no_address)
        .value("network-tier", args.network_tier)
        .values("network-interface", args.network_interface)
        .switch("public-dns", args.public_dns)
        .switch("no-public-dns", args.no_public_dns)
        .switch("public-ptr", args.public_ptr)
        .switch("no-public-ptr", args.no_public_ptr)
        .value("public-ptr-domain", args.public_ptr_domain)
        .switch("no-public-ptr-domain", args.no_public_ptr_domain)
        .value("service-account", args.service_account)
        .switch("no-service-account", args.no_service_account)
        .value("scopes", args.scopes)
        .switch("no-scopes", args.no_scopes)
        .value("tags", args.tags)
}

fn container_args(raw: RawArgs, args: ContainerArgs) -> RawArgs {
    raw.value("container-image", args.container_image)
        .value("container-command", args.container_command)
        .values("container-arg", args.container_arg)
        .switch("container-privileged", args.container_privileged)
        .values("container-mount-host-path", args.container_mount_host_path)
        .values("container-mount-tmpfs", args.container_mount_tmpfs)
        .values("container-env", args.container_env)
        .value("container-env-file", args.container_env_file)
        .switch("container-stdin", args.container_stdin)
        .switch("container-tty", args.container_tty)
        .value("container-restart-policy", args.container_restart_policy)
}

fn router_args(args: RouterUpdateArgs) -> RawArgs {
    RawArgs::new()
        .values(NAME, [args.name])
        .value("region", args.region)
        .value("advertisement-mode", args.advertisement_mode)
        .value("set-advertisement-groups", args.set_advertisement_groups)
        .value("set-advertisement-ranges", args.set_advertisement_ranges)
        .value("add-advertisement-groups", args.add_advertisement_groups)
        .value("remove-advertisement-groups", args.remove_advertisement_groups)
        .value("add-advertisement-ranges", args.add_advertisement_ranges)
        .value("remove-advertisement-ranges", args.remove_advertisement_ranges)
}

#[cfg(test)]
mod tests {
    //! Unit tests for flag forwarding.

    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap_or_else(|err| panic!("parse failed: {err}"))
    }

    fn occurrences(raw: &RawArgs) -> Vec<(String, Option<String>)> {
        raw.iter()
            .map(|(option, value)| (option.to_owned(), value.map(str::to_owned)))
            .collect()
    }

    #[test]
    fn negative_switch_forwards_false() {
        let cli = parse(&[
            "nimbus",
            "compute",
            "instances",
            "create",
            "vm-1",
            "--no-boot-disk-auto-delete",
        ]);
        let Group::Compute(Compute::Instances(Instances::Create(args))) = cli.group else {
            panic!("unexpected command tree");
        };
        let raw = create_args(args);
        assert!(occurrences(&raw).contains(&(
            String::from("boot-disk-auto-delete"),
            Some(String::from("false"))
        )));
        assert!(!raw.contains("restart-on-failure"));
    }

    #[test]
    fn repeated_flags_keep_their_order() {
        let cli = parse(&[
            "nimbus",
            "compute",
            "instances",
            "create-with-container",
            "vm-1",
            "--container-image=app",
            "--container-arg=a",
            "--container-arg=b",
        ]);
        let Group::Compute(Compute::Instances(Instances::CreateWithContainer(args))) = cli.group
        else {
            panic!("unexpected command tree");
        };
        let raw = container_args(create_args(args.create), args.container);
        let forwarded: Vec<_> = raw
            .iter()
            .filter(|(option, _)| *option == "container-arg")
            .filter_map(|(_, value)| value)
            .collect();
        assert_eq!(forwarded, vec!["a", "b"]);
    }

    #[test]
    fn command_line_order_does_not_change_forwarded_flags() {
        let forwarded = |args: &[&str]| {
            let Group::Compute(Compute::Instances(Instances::Create(create))) = parse(args).group
            else {
                panic!("unexpected command tree");
            };
            occurrences(&create_args(create))
        };
        let zone_first = forwarded(&[
            "nimbus", "compute", "instances", "create", "vm-1", "--zone", "z", "--tags", "a,b",
            "--disk", "name=d1", "--disk", "name=d2",
        ]);
        let disks_first = forwarded(&[
            "nimbus", "compute", "instances", "create", "vm-1", "--disk", "name=d1", "--tags",
            "a,b", "--disk", "name=d2", "--zone", "z",
        ]);
        assert_eq!(zone_first, disks_first);
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = parse(&[
            "nimbus",
            "firebase",
            "test",
            "android",
            "models",
            "list",
            "--project",
            "p",
            "-q",
            "--verbosity",
            "debug",
        ]);
        assert_eq!(cli.project.as_deref(), Some("p"));
        assert!(cli.quiet);
        assert_eq!(cli.verbosity, "debug");
    }
}
