//! Instance insert bodies assembled from validated options.

use serde::Serialize;

use crate::options::{ByteSize, DictValue, ParsedOptions};
use crate::resource::ResourceReference;

/// Prefix of fully qualified service account scopes.
pub const SCOPE_PREFIX: &str = "https://www.googleapis.com/auth/";

const DEFAULT_SCOPES: [&str; 7] = [
    "devstorage.read_only",
    "logging.write",
    "monitoring.write",
    "pubsub",
    "service.management.readonly",
    "servicecontrol",
    "trace.append",
];

const SCOPE_ALIASES: &[(&str, &str)] = &[
    ("bigquery", "bigquery"),
    ("cloud-platform", "cloud-platform"),
    ("compute-ro", "compute.readonly"),
    ("compute-rw", "compute"),
    ("datastore", "datastore"),
    ("logging-write", "logging.write"),
    ("monitoring", "monitoring"),
    ("monitoring-write", "monitoring.write"),
    ("pubsub", "pubsub"),
    ("service-control", "servicecontrol"),
    ("service-management", "service.management.readonly"),
    ("sql-admin", "sqlservice.admin"),
    ("storage-full", "devstorage.full_control"),
    ("storage-ro", "devstorage.read_only"),
    ("storage-rw", "devstorage.read_write"),
    ("taskqueue", "taskqueue"),
    ("trace", "trace.append"),
    ("userinfo-email", "userinfo.email"),
];

/// Image used for the boot disk when no image flag is given.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ImageDefault {
    /// Image family.
    pub family: &'static str,
    /// Project publishing the family.
    pub project: &'static str,
}

/// General-purpose default image.
pub const DEBIAN: ImageDefault = ImageDefault {
    family: "debian-9",
    project: "debian-cloud",
};

/// Container-optimised default image.
pub const CONTAINER_OPTIMIZED: ImageDefault = ImageDefault {
    family: "cos-stable",
    project: "cos-cloud",
};

const DEFAULT_MACHINE_TYPE: &str = "n1-standard-1";
const DEFAULT_NETWORK: &str = "default";

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Instance {
    pub(crate) name: String,
    pub(crate) machine_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) min_cpu_platform: Option<String>,
    pub(crate) can_ip_forward: bool,
    pub(crate) deletion_protection: bool,
    pub(crate) disks: Vec<AttachedDisk>,
    pub(crate) network_interfaces: Vec<NetworkInterface>,
    pub(crate) service_accounts: Vec<ServiceAccount>,
    pub(crate) scheduling: Scheduling,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) guest_accelerators: Vec<Accelerator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) metadata: Option<Metadata>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttachedDisk {
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
    pub(crate) boot: bool,
    pub(crate) auto_delete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) initialize_params: Option<InitializeParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) disk_encryption_key: Option<EncryptionKey>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) disk_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) source_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) disk_size_gb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) disk_type: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EncryptionKey {
    pub(crate) kms_key_name: String,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NetworkInterface {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) subnetwork: Option<String>,
    #[serde(rename = "networkIP", skip_serializing_if = "Option::is_none")]
    pub(crate) network_ip: Option<String>,
    pub(crate) access_configs: Vec<AccessConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) alias_ip_ranges: Vec<AliasIpRange>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccessConfig {
    pub(crate) name: &'static str,
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
    #[serde(rename = "natIP", skip_serializing_if = "Option::is_none")]
    pub(crate) nat_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) network_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) set_public_dns: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) set_public_ptr: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) public_ptr_domain_name: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AliasIpRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) subnetwork_range_name: Option<String>,
    pub(crate) ip_cidr_range: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct ServiceAccount {
    pub(crate) email: String,
    pub(crate) scopes: Vec<String>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Scheduling {
    pub(crate) automatic_restart: bool,
    pub(crate) on_host_maintenance: String,
    pub(crate) preemptible: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Accelerator {
    pub(crate) accelerator_type: String,
    pub(crate) accelerator_count: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct Tags {
    pub(crate) items: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct Metadata {
    pub(crate) items: Vec<MetadataItem>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct MetadataItem {
    pub(crate) key: String,
    pub(crate) value: String,
}

/// Address requested for one network interface, before name lookup.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct InterfaceSpec {
    pub(crate) network: Option<String>,
    pub(crate) subnet: Option<String>,
    pub(crate) private_ip: Option<String>,
    pub(crate) no_address: bool,
    pub(crate) address: Option<String>,
    pub(crate) network_tier: Option<String>,
    pub(crate) aliases: Option<String>,
    pub(crate) primary: bool,
}

/// Zone-scoped path for a sub-resource of the instance's zone.
fn zonal(instance: &ResourceReference, collection: &str, name: &str) -> String {
    if ResourceReference::is_qualified(name) {
        return name.to_owned();
    }
    let zone = instance.scope().name().unwrap_or_default();
    format!(
        "projects/{}/zones/{zone}/{collection}/{name}",
        instance.project()
    )
}

fn yes(dict: &DictValue, key: &str, default: bool) -> bool {
    dict.text(key).map_or(default, |value| value == "yes")
}

fn access_mode(dict: &DictValue) -> &'static str {
    if dict.text("mode") == Some("ro") {
        "READ_ONLY"
    } else {
        "READ_WRITE"
    }
}

fn size_gb(size: Option<ByteSize>) -> Option<String> {
    size.map(|bytes| bytes.whole_gb().to_string())
}

/// Resolves `--image`/`--image-family` into an image path.
pub(crate) fn image_source(
    image: Option<&str>,
    family: Option<&str>,
    image_project: Option<&str>,
    project: &str,
    fallback: ImageDefault,
) -> String {
    if let Some(path) = image.or(family).filter(|name| ResourceReference::is_qualified(name)) {
        return path.to_owned();
    }
    let owner = image_project.unwrap_or(project);
    match (image, family) {
        (Some(name), _) => format!("projects/{owner}/global/images/{name}"),
        (None, Some(name)) => format!("projects/{owner}/global/images/family/{name}"),
        (None, None) => format!(
            "projects/{}/global/images/family/{}",
            image_project.unwrap_or(fallback.project),
            fallback.family
        ),
    }
}

fn kms_key_name(
    key: Option<&str>,
    key_project: Option<&str>,
    location: Option<&str>,
    keyring: Option<&str>,
    project: &str,
) -> Option<EncryptionKey> {
    let name = key?;
    let kms_key_name = if name.starts_with("projects/") {
        name.to_owned()
    } else {
        format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{name}",
            key_project.unwrap_or(project),
            location.unwrap_or_default(),
            keyring.unwrap_or_default()
        )
    };
    Some(EncryptionKey { kms_key_name })
}

fn boot_disk(
    options: &ParsedOptions,
    instance: &ResourceReference,
    fallback: ImageDefault,
) -> AttachedDisk {
    let project = instance.project();
    let source_image = image_source(
        options.text("image"),
        options.text("image-family"),
        options.text("image-project"),
        project,
        fallback,
    );
    AttachedDisk {
        kind: "PERSISTENT",
        boot: true,
        auto_delete: options.switch("boot-disk-auto-delete").unwrap_or(true),
        mode: Some("READ_WRITE"),
        device_name: options.text("boot-disk-device-name").map(str::to_owned),
        initialize_params: Some(InitializeParams {
            source_image: Some(source_image),
            disk_size_gb: size_gb(options.size("boot-disk-size")),
            disk_type: options
                .text("boot-disk-type")
                .map(|kind| zonal(instance, "diskTypes", kind)),
            ..InitializeParams::default()
        }),
        disk_encryption_key: kms_key_name(
            options.text("boot-disk-kms-key"),
            options.text("boot-disk-kms-project"),
            options.text("boot-disk-kms-location"),
            options.text("boot-disk-kms-keyring"),
            project,
        ),
        ..AttachedDisk::default()
    }
}

fn existing_disk(dict: &DictValue, instance: &ResourceReference) -> AttachedDisk {
    AttachedDisk {
        kind: "PERSISTENT",
        boot: yes(dict, "boot", false),
        auto_delete: yes(dict, "auto-delete", false),
        mode: Some(access_mode(dict)),
        device_name: dict.text("device-name").map(str::to_owned),
        source: Some(zonal(instance, "disks", dict.text("name").unwrap_or_default())),
        ..AttachedDisk::default()
    }
}

fn created_disk(dict: &DictValue, instance: &ResourceReference) -> AttachedDisk {
    let project = instance.project();
    let source_image = (dict.has("image") || dict.has("image-family")).then(|| {
        image_source(
            dict.text("image"),
            dict.text("image-family"),
            dict.text("image-project"),
            project,
            DEBIAN,
        )
    });
    AttachedDisk {
        kind: "PERSISTENT",
        boot: false,
        auto_delete: yes(dict, "auto-delete", true),
        mode: Some(access_mode(dict)),
        device_name: dict.text("device-name").map(str::to_owned),
        initialize_params: Some(InitializeParams {
            disk_name: dict.text("name").map(str::to_owned),
            source_image,
            disk_size_gb: size_gb(dict.size("size")),
            disk_type: dict.text("type").map(|kind| zonal(instance, "diskTypes", kind)),
        }),
        disk_encryption_key: kms_key_name(
            dict.text("kms-key"),
            dict.text("kms-project"),
            dict.text("kms-location"),
            dict.text("kms-keyring"),
            project,
        ),
        ..AttachedDisk::default()
    }
}

fn local_ssd(dict: &DictValue, instance: &ResourceReference) -> AttachedDisk {
    AttachedDisk {
        kind: "SCRATCH",
        boot: false,
        auto_delete: true,
        interface: Some(dict.text("interface").unwrap_or("SCSI").to_owned()),
        device_name: dict.text("device-name").map(str::to_owned),
        initialize_params: Some(InitializeParams {
            disk_type: Some(zonal(instance, "diskTypes", "local-ssd")),
            disk_size_gb: size_gb(dict.size("size")),
            ..InitializeParams::default()
        }),
        ..AttachedDisk::default()
    }
}

/// Every disk of the instance, boot disk first.
pub(crate) fn disks(
    options: &ParsedOptions,
    instance: &ResourceReference,
    fallback: ImageDefault,
) -> Vec<AttachedDisk> {
    let attached: Vec<AttachedDisk> = options
        .dicts("disk")
        .into_iter()
        .map(|dict| existing_disk(dict, instance))
        .collect();
    let mut disks = Vec::new();
    if !attached.iter().any(|disk| disk.boot) {
        disks.push(boot_disk(options, instance, fallback));
    }
    disks.extend(attached);
    disks.extend(
        options
            .dicts("create-disk")
            .into_iter()
            .map(|dict| created_disk(dict, instance)),
    );
    disks.extend(
        options
            .dicts("local-ssd")
            .into_iter()
            .map(|dict| local_ssd(dict, instance)),
    );
    disks
}

/// Interface specs from `--network-interface`, or one built from the
/// single-interface flags.
pub(crate) fn interface_specs(options: &ParsedOptions) -> Vec<InterfaceSpec> {
    let composite = options.dicts("network-interface");
    if composite.is_empty() {
        return vec![InterfaceSpec {
            network: options.text("network").map(str::to_owned),
            subnet: options.text("subnet").map(str::to_owned),
            private_ip: options.text("private-network-ip").map(str::to_owned),
            no_address: options.is_set("no-address"),
            address: options.text("address").map(str::to_owned),
            network_tier: options.text("network-tier").map(str::to_owned),
            aliases: None,
            primary: true,
        }];
    }
    composite
        .into_iter()
        .enumerate()
        .map(|(position, nic)| InterfaceSpec {
            network: nic.text("network").map(str::to_owned),
            subnet: nic.text("subnet").map(str::to_owned),
            private_ip: nic.text("private-network-ip").map(str::to_owned),
            no_address: nic.has("no-address"),
            address: nic.text("address").map(str::to_owned),
            network_tier: nic.text("network-tier").map(str::to_owned),
            aliases: nic.text("aliases").map(str::to_owned),
            primary: position == 0,
        })
        .collect()
}

fn alias_ranges(aliases: Option<&str>) -> Vec<AliasIpRange> {
    aliases
        .unwrap_or_default()
        .split(';')
        .filter(|alias| !alias.is_empty())
        .map(|alias| match alias.split_once(':') {
            Some((range, cidr)) => AliasIpRange {
                subnetwork_range_name: Some(range.to_owned()),
                ip_cidr_range: cidr.to_owned(),
            },
            None => AliasIpRange {
                subnetwork_range_name: None,
                ip_cidr_range: alias.to_owned(),
            },
        })
        .collect()
}

/// Builds one interface; `nat_ip` is the looked-up external address.
pub(crate) fn network_interface(
    spec: &InterfaceSpec,
    options: &ParsedOptions,
    instance: &ResourceReference,
    nat_ip: Option<String>,
) -> NetworkInterface {
    let project = instance.project();
    let region = instance.scope().region().unwrap_or_default();
    let network = match (&spec.network, &spec.subnet) {
        (Some(name), _) => Some(name.as_str()),
        (None, Some(_)) => None,
        (None, None) => Some(DEFAULT_NETWORK),
    };
    let access_configs = if spec.no_address {
        Vec::new()
    } else {
        let dns = spec.primary.then(|| public_toggle(options, "public-dns")).flatten();
        let ptr = spec.primary.then(|| public_toggle(options, "public-ptr")).flatten();
        vec![AccessConfig {
            name: "external-nat",
            kind: "ONE_TO_ONE_NAT",
            nat_ip,
            network_tier: spec.network_tier.clone(),
            set_public_dns: dns,
            set_public_ptr: ptr,
            public_ptr_domain_name: spec
                .primary
                .then(|| options.text("public-ptr-domain").map(str::to_owned))
                .flatten(),
        }]
    };
    NetworkInterface {
        network: network.map(|name| {
            if ResourceReference::is_qualified(name) {
                name.to_owned()
            } else {
                format!("projects/{project}/global/networks/{name}")
            }
        }),
        subnetwork: spec.subnet.as_deref().map(|name| {
            if ResourceReference::is_qualified(name) {
                name.to_owned()
            } else {
                format!("projects/{project}/regions/{region}/subnetworks/{name}")
            }
        }),
        network_ip: spec.private_ip.clone(),
        access_configs,
        alias_ip_ranges: alias_ranges(spec.aliases.as_deref()),
    }
}

fn public_toggle(options: &ParsedOptions, option: &str) -> Option<bool> {
    if options.is_set(option) {
        Some(true)
    } else if options.is_set(&format!("no-{option}")) {
        Some(false)
    } else {
        None
    }
}

/// Expands scope aliases into full scope URIs.
#[must_use]
pub fn expand_scope(scope: &str) -> Vec<String> {
    if scope == "default" {
        return DEFAULT_SCOPES
            .iter()
            .map(|suffix| format!("{SCOPE_PREFIX}{suffix}"))
            .collect();
    }
    let full = SCOPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == scope)
        .map_or_else(
            || scope.to_owned(),
            |(_, suffix)| format!("{SCOPE_PREFIX}{suffix}"),
        );
    vec![full]
}

pub(crate) fn service_accounts(options: &ParsedOptions) -> Vec<ServiceAccount> {
    if options.is_set("no-service-account") {
        return Vec::new();
    }
    let mut scopes: Vec<String> = if options.is_set("no-scopes") {
        Vec::new()
    } else {
        options.list("scopes").map_or_else(
            || expand_scope("default"),
            |given| given.iter().flat_map(|scope| expand_scope(scope)).collect(),
        )
    };
    scopes.sort();
    scopes.dedup();
    vec![ServiceAccount {
        email: options.text("service-account").unwrap_or("default").to_owned(),
        scopes,
    }]
}

pub(crate) fn scheduling(options: &ParsedOptions) -> Scheduling {
    let preemptible = options.flag("preemptible");
    let on_host_maintenance = options.text("maintenance-policy").map_or_else(
        || String::from(if preemptible { "TERMINATE" } else { "MIGRATE" }),
        str::to_owned,
    );
    Scheduling {
        automatic_restart: !preemptible && options.switch("restart-on-failure").unwrap_or(true),
        on_host_maintenance,
        preemptible,
    }
}

/// Machine type path, composing a custom type from CPU and memory.
pub(crate) fn machine_type(options: &ParsedOptions, instance: &ResourceReference) -> String {
    let name = match (options.integer("custom-cpu"), options.size("custom-memory")) {
        (Some(cpus), Some(memory)) => {
            let suffix = if options.flag("custom-extensions") { "-ext" } else { "" };
            format!("custom-{cpus}-{}{suffix}", memory.whole_mb())
        }
        _ => options
            .text("machine-type")
            .unwrap_or(DEFAULT_MACHINE_TYPE)
            .to_owned(),
    };
    zonal(instance, "machineTypes", &name)
}

pub(crate) fn accelerators(options: &ParsedOptions, instance: &ResourceReference) -> Vec<Accelerator> {
    options
        .dicts("accelerator")
        .into_iter()
        .filter_map(|dict| {
            dict.text("type").map(|kind| Accelerator {
                accelerator_type: zonal(instance, "acceleratorTypes", kind),
                accelerator_count: dict.integer("count").unwrap_or(1),
            })
        })
        .collect()
}

/// Assembles the insert body for one instance.
pub(crate) fn instance(
    options: &ParsedOptions,
    reference: &ResourceReference,
    fallback: ImageDefault,
    network_interfaces: Vec<NetworkInterface>,
    metadata: Option<Metadata>,
) -> Instance {
    Instance {
        name: reference.name().to_owned(),
        machine_type: machine_type(options, reference),
        description: options.text("description").map(str::to_owned),
        min_cpu_platform: options.text("min-cpu-platform").map(str::to_owned),
        can_ip_forward: options.flag("can-ip-forward"),
        deletion_protection: options.flag("deletion-protection"),
        disks: disks(options, reference, fallback),
        network_interfaces,
        service_accounts: service_accounts(options),
        scheduling: scheduling(options),
        guest_accelerators: accelerators(options, reference),
        tags: options.list("tags").map(|items| Tags {
            items: items.to_vec(),
        }),
        metadata,
    }
}
