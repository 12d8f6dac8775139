//! Command-line interface definitions for the `nimbus` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page. Flags
//! are captured as raw text here; typing and cross-flag validation happen in
//! the library's option schemas.

use clap::{Args, Parser, Subcommand};

/// Levels accepted by `--verbosity`.
pub(crate) const VERBOSITY_LEVELS: [&str; 6] =
    ["debug", "info", "warning", "error", "critical", "none"];

/// Top-level CLI for the `nimbus` binary.
#[derive(Debug, Parser)]
#[command(
    name = "nimbus",
    about = "Manage cloud compute, data processing and device testing resources",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Project that owns the addressed resources.
    #[arg(long, global = true, value_name = "PROJECT")]
    pub(crate) project: Option<String>,
    /// Disable interactive prompts and accept defaults.
    #[arg(short, long, global = true)]
    pub(crate) quiet: bool,
    /// Log verbosity.
    #[arg(
        long,
        global = true,
        default_value = "warning",
        value_parser = VERBOSITY_LEVELS
    )]
    pub(crate) verbosity: String,
    /// Command group.
    #[command(subcommand)]
    pub(crate) group: Group,
}

/// Top-level command groups.
#[derive(Debug, Subcommand)]
pub(crate) enum Group {
    /// Compute Engine resources.
    #[command(subcommand)]
    Compute(Compute),
    /// Dataproc resources.
    #[command(subcommand)]
    Dataproc(Dataproc),
    /// Firebase Test Lab catalogue.
    #[command(subcommand)]
    Firebase(Firebase),
}

/// `compute` resource groups.
#[derive(Debug, Subcommand)]
pub(crate) enum Compute {
    /// Virtual machine instances.
    #[command(subcommand)]
    Instances(Instances),
    /// Cloud routers.
    #[command(subcommand)]
    Routers(Routers),
}

/// `compute instances` commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Instances {
    /// Create virtual machine instances.
    Create(CreateArgs),
    /// Create instances running a container on a container-optimised image.
    CreateWithContainer(CreateWithContainerArgs),
    /// Describe one instance.
    Describe(DescribeArgs),
    /// Delete instances.
    Delete(DeleteArgs),
}

/// `compute routers` commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Routers {
    /// Update a router's BGP advertisements.
    Update(RouterUpdateArgs),
}

/// `dataproc` resource groups.
#[derive(Debug, Subcommand)]
pub(crate) enum Dataproc {
    /// Dataproc jobs.
    #[command(subcommand)]
    Jobs(Jobs),
}

/// `dataproc jobs` commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Jobs {
    /// Delete the record of an inactive job.
    Delete(JobDeleteArgs),
}

/// `firebase` command groups.
#[derive(Debug, Subcommand)]
pub(crate) enum Firebase {
    /// Test Lab.
    #[command(subcommand)]
    Test(FirebaseTest),
}

/// `firebase test` platforms.
#[derive(Debug, Subcommand)]
pub(crate) enum FirebaseTest {
    /// Android devices.
    #[command(subcommand)]
    Android(Android),
}

/// `firebase test android` catalogues.
#[derive(Debug, Subcommand)]
pub(crate) enum Android {
    /// Device models.
    #[command(subcommand)]
    Models(Models),
}

/// `firebase test android models` commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Models {
    /// List models that support at least one OS version.
    List,
}

/// Arguments for `compute instances create`.
#[derive(Debug, Args)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each switch mirrors one command-line flag"
)]
pub(crate) struct CreateArgs {
    /// Names of the instances to create.
    #[arg(required = true, value_name = "NAME")]
    pub(crate) names: Vec<String>,
    /// Zone of the instances.
    #[arg(long)]
    pub(crate) zone: Option<String>,
    /// Free-form description.
    #[arg(long)]
    pub(crate) description: Option<String>,
    /// Boot image name or path.
    #[arg(long)]
    pub(crate) image: Option<String>,
    /// Boot image family.
    #[arg(long)]
    pub(crate) image_family: Option<String>,
    /// Project holding the boot image.
    #[arg(long)]
    pub(crate) image_project: Option<String>,
    /// Device name of the boot disk.
    #[arg(long)]
    pub(crate) boot_disk_device_name: Option<String>,
    /// Size of the boot disk, such as `20GB`.
    #[arg(long)]
    pub(crate) boot_disk_size: Option<String>,
    /// Disk type of the boot disk.
    #[arg(long)]
    pub(crate) boot_disk_type: Option<String>,
    /// Delete the boot disk with the instance (default).
    #[arg(long)]
    pub(crate) boot_disk_auto_delete: bool,
    /// Keep the boot disk when the instance is deleted.
    #[arg(long)]
    pub(crate) no_boot_disk_auto_delete: bool,
    /// KMS key protecting the boot disk.
    #[arg(long)]
    pub(crate) boot_disk_kms_key: Option<String>,
    /// Project of the KMS key.
    #[arg(long)]
    pub(crate) boot_disk_kms_project: Option<String>,
    /// Location of the KMS key.
    #[arg(long)]
    pub(crate) boot_disk_kms_location: Option<String>,
    /// Key ring of the KMS key.
    #[arg(long)]
    pub(crate) boot_disk_kms_keyring: Option<String>,
    /// Attach an existing disk: `name=NAME[,mode=rw|ro][,boot=yes|no][,device-name=..][,auto-delete=yes|no]`.
    #[arg(long)]
    pub(crate) disk: Vec<String>,
    /// Create and attach a disk: `[name=..][,size=..][,type=..][,image=..|image-family=..]`.
    #[arg(long)]
    pub(crate) create_disk: Vec<String>,
    /// Attach a local SSD: `[interface=NVME|SCSI][,size=375GB]`.
    #[arg(long)]
    pub(crate) local_ssd: Vec<String>,
    /// Machine type.
    #[arg(long)]
    pub(crate) machine_type: Option<String>,
    /// Number of CPUs of a custom machine type.
    #[arg(long)]
    pub(crate) custom_cpu: Option<String>,
    /// Memory of a custom machine type, such as `5GB`.
    #[arg(long)]
    pub(crate) custom_memory: Option<String>,
    /// Use extended memory for the custom machine type.
    #[arg(long)]
    pub(crate) custom_extensions: bool,
    /// Minimum CPU platform.
    #[arg(long)]
    pub(crate) min_cpu_platform: Option<String>,
    /// Attach accelerators: `type=TYPE[,count=N]`.
    #[arg(long)]
    pub(crate) accelerator: Option<String>,
    /// Allow the instance to forward packets.
    #[arg(long)]
    pub(crate) can_ip_forward: bool,
    /// Protect the instance from deletion.
    #[arg(long)]
    pub(crate) deletion_protection: bool,
    /// Create preemptible instances.
    #[arg(long)]
    pub(crate) preemptible: bool,
    /// Host maintenance behaviour: `MIGRATE` or `TERMINATE`.
    #[arg(long)]
    pub(crate) maintenance_policy: Option<String>,
    /// Restart the instance after a crash (default).
    #[arg(long)]
    pub(crate) restart_on_failure: bool,
    /// Do not restart the instance after a crash.
    #[arg(long)]
    pub(crate) no_restart_on_failure: bool,
    /// Network of the default interface.
    #[arg(long)]
    pub(crate) network: Option<String>,
    /// Subnetwork of the default interface.
    #[arg(long)]
    pub(crate) subnet: Option<String>,
    /// Internal IP of the default interface.
    #[arg(long)]
    pub(crate) private_network_ip: Option<String>,
    /// External address name or IP.
    #[arg(long)]
    pub(crate) address: Option<String>,
    /// Do not assign an external address.
    #[arg(long)]
    pub(crate) no_address: bool,
    /// Network tier of the external address.
    #[arg(long)]
    pub(crate) network_tier: Option<String>,
    /// Add a network interface: `[network=..][,subnet=..][,address=..|no-address][,private-network-ip=..][,network-tier=..][,aliases=..]`.
    #[arg(long)]
    pub(crate) network_interface: Vec<String>,
    /// Register a public DNS name for the external address.
    #[arg(long)]
    pub(crate) public_dns: bool,
    /// Do not register a public DNS name.
    #[arg(long)]
    pub(crate) no_public_dns: bool,
    /// Create a public PTR record.
    #[arg(long)]
    pub(crate) public_ptr: bool,
    /// Do not create a public PTR record.
    #[arg(long)]
    pub(crate) no_public_ptr: bool,
    /// Domain of the public PTR record.
    #[arg(long)]
    pub(crate) public_ptr_domain: Option<String>,
    /// Use the default PTR domain.
    #[arg(long)]
    pub(crate) no_public_ptr_domain: bool,
    /// Service account the instance runs as.
    #[arg(long)]
    pub(crate) service_account: Option<String>,
    /// Run without a service account.
    #[arg(long)]
    pub(crate) no_service_account: bool,
    /// Comma-separated access scopes or aliases.
    #[arg(long)]
    pub(crate) scopes: Option<String>,
    /// Grant no access scopes.
    #[arg(long)]
    pub(crate) no_scopes: bool,
    /// Comma-separated network tags.
    #[arg(long)]
    pub(crate) tags: Option<String>,
}

/// Arguments for `compute instances create-with-container`.
#[derive(Debug, Args)]
pub(crate) struct CreateWithContainerArgs {
    /// Instance flags.
    #[command(flatten)]
    pub(crate) create: CreateArgs,
    /// Container flags.
    #[command(flatten)]
    pub(crate) container: ContainerArgs,
}

/// Container flags for `compute instances create-with-container`.
#[derive(Debug, Args)]
pub(crate) struct ContainerArgs {
    /// Container image to run.
    #[arg(long)]
    pub(crate) container_image: Option<String>,
    /// Entry point overriding the image's.
    #[arg(long)]
    pub(crate) container_command: Option<String>,
    /// Argument passed to the entry point; repeat for several.
    #[arg(long)]
    pub(crate) container_arg: Vec<String>,
    /// Run the container privileged.
    #[arg(long)]
    pub(crate) container_privileged: bool,
    /// Mount a host path: `host-path=..,mount-path=..[,mode=rw|ro]`.
    #[arg(long)]
    pub(crate) container_mount_host_path: Vec<String>,
    /// Mount a memory-backed volume: `mount-path=..`.
    #[arg(long)]
    pub(crate) container_mount_tmpfs: Vec<String>,
    /// Environment variables: `KEY=VALUE[,KEY=VALUE..]`.
    #[arg(long)]
    pub(crate) container_env: Vec<String>,
    /// Docker-style file of environment variables.
    #[arg(long)]
    pub(crate) container_env_file: Option<String>,
    /// Keep the container's stdin open.
    #[arg(long)]
    pub(crate) container_stdin: bool,
    /// Allocate a terminal for the container.
    #[arg(long)]
    pub(crate) container_tty: bool,
    /// Restart policy: `never`, `on-failure` or `always`.
    #[arg(long)]
    pub(crate) container_restart_policy: Option<String>,
}

/// Arguments for `compute instances describe`.
#[derive(Debug, Args)]
pub(crate) struct DescribeArgs {
    /// Name of the instance.
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
    /// Zone of the instance.
    #[arg(long)]
    pub(crate) zone: Option<String>,
}

/// Arguments for `compute instances delete`.
#[derive(Debug, Args)]
pub(crate) struct DeleteArgs {
    /// Names of the instances to delete.
    #[arg(required = true, value_name = "NAME")]
    pub(crate) names: Vec<String>,
    /// Zone of the instances.
    #[arg(long)]
    pub(crate) zone: Option<String>,
}

/// Arguments for `compute routers update`.
#[derive(Debug, Args)]
pub(crate) struct RouterUpdateArgs {
    /// Name of the router.
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
    /// Region of the router.
    #[arg(long)]
    pub(crate) region: Option<String>,
    /// Advertisement mode: `DEFAULT` or `CUSTOM`.
    #[arg(long)]
    pub(crate) advertisement_mode: Option<String>,
    /// Replace the advertised groups.
    #[arg(long)]
    pub(crate) set_advertisement_groups: Option<String>,
    /// Replace the advertised ranges: `CIDR[=DESCRIPTION][,..]`.
    #[arg(long)]
    pub(crate) set_advertisement_ranges: Option<String>,
    /// Append advertised groups.
    #[arg(long)]
    pub(crate) add_advertisement_groups: Option<String>,
    /// Remove advertised groups.
    #[arg(long)]
    pub(crate) remove_advertisement_groups: Option<String>,
    /// Append advertised ranges: `CIDR[=DESCRIPTION][,..]`.
    #[arg(long)]
    pub(crate) add_advertisement_ranges: Option<String>,
    /// Remove advertised ranges by CIDR.
    #[arg(long)]
    pub(crate) remove_advertisement_ranges: Option<String>,
}

/// Arguments for `dataproc jobs delete`.
#[derive(Debug, Args)]
pub(crate) struct JobDeleteArgs {
    /// ID of the job to delete.
    #[arg(value_name = "JOB_ID")]
    pub(crate) id: String,
    /// Dataproc region of the job.
    #[arg(long)]
    pub(crate) region: Option<String>,
}
