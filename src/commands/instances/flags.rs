//! Flag declarations and cross-flag rules for instance creation.

use crate::options::{
    ArgList, ArgumentError, BinarySize, ByteSize, Case, ChoiceSet, DictKey, DictSpec, DictValue,
    KeyParser, OptionKind, OptionSpec, ParsedOptions, SizeUnit, flag_name,
};
use crate::validate::{
    RuleContext, ValidationRule, conflicts_with, require_member, single_target_only,
};

use super::super::names;

/// Values accepted by `mode` keys.
pub const DISK_MODES: ChoiceSet = ChoiceSet::new(&["rw", "ro"]);
/// Values accepted by yes/no keys.
pub const YES_NO: ChoiceSet = ChoiceSet::new(&["yes", "no"]);
/// Local SSD interfaces.
pub const SSD_INTERFACES: ChoiceSet = ChoiceSet::new(&["NVME", "SCSI"]);
/// Network service tiers.
pub const NETWORK_TIERS: ChoiceSet = ChoiceSet::new(&["PREMIUM", "STANDARD"]);
/// Host maintenance behaviours.
pub const MAINTENANCE_POLICIES: ChoiceSet =
    ChoiceSet::new(&["MIGRATE", "TERMINATE"]).normalized(Case::Upper);
/// Container restart policies.
pub const RESTART_POLICIES: ChoiceSet =
    ChoiceSet::new(&["never", "on-failure", "always"]).normalized(Case::Lower);

const BOOT_DISK_SIZE: BinarySize = BinarySize::new().lower_bound(ByteSize::from_gb(10));
const LOCAL_SSD_SIZE: BinarySize = BinarySize::new()
    .lower_bound(ByteSize::from_gb(375))
    .granularity(ByteSize::from_gb(375));
const CUSTOM_MEMORY: BinarySize = BinarySize::new().default_unit(SizeUnit::Giga);
const CUSTOM_MEMORY_STEP: ByteSize = ByteSize::from_bytes(256 * 1024 * 1024);

const DISK_KEYS: &[DictKey] = &[
    DictKey::text("name"),
    DictKey::text("mode"),
    DictKey::text("boot"),
    DictKey::text("device-name"),
    DictKey::text("auto-delete"),
];

const CREATE_DISK_KEYS: &[DictKey] = &[
    DictKey::text("name"),
    DictKey::text("mode"),
    DictKey::text("image"),
    DictKey::text("image-family"),
    DictKey::text("image-project"),
    DictKey::new("size", KeyParser::Size(BOOT_DISK_SIZE)),
    DictKey::text("type"),
    DictKey::text("device-name"),
    DictKey::text("auto-delete"),
    DictKey::text("kms-key"),
    DictKey::text("kms-project"),
    DictKey::text("kms-location"),
    DictKey::text("kms-keyring"),
];

const LOCAL_SSD_KEYS: &[DictKey] = &[
    DictKey::text("device-name"),
    DictKey::new("interface", KeyParser::Normalized(Case::Upper)),
    DictKey::new("size", KeyParser::Size(LOCAL_SSD_SIZE)),
];

const NETWORK_INTERFACE_KEYS: &[DictKey] = &[
    DictKey::text("address"),
    DictKey::text("network"),
    DictKey::new("no-address", KeyParser::Presence),
    DictKey::text("subnet"),
    DictKey::text("private-network-ip"),
    DictKey::new("network-tier", KeyParser::Normalized(Case::Upper)),
    DictKey::text("aliases"),
];

const ACCELERATOR_KEYS: &[DictKey] = &[
    DictKey::text("type"),
    DictKey::new("count", KeyParser::Integer),
];

const HOST_PATH_MOUNT_KEYS: &[DictKey] = &[
    DictKey::text("host-path").required(),
    DictKey::text("mount-path").required(),
    DictKey::new("mode", KeyParser::Choice(DISK_MODES)),
];

const TMPFS_MOUNT_KEYS: &[DictKey] = &[DictKey::text("mount-path").required()];

const BOOT_DISK_FLAGS: [&str; 7] = [
    "boot-disk-device-name",
    "boot-disk-type",
    "boot-disk-size",
    "boot-disk-kms-key",
    "boot-disk-kms-project",
    "boot-disk-kms-location",
    "boot-disk-kms-keyring",
];

const fn dict(keys: &'static [DictKey]) -> OptionKind {
    OptionKind::Dict(DictSpec::new(keys))
}

/// Options shared by `instances create` and `instances create-with-container`.
#[must_use]
pub fn create_options() -> Vec<OptionSpec> {
    vec![
        names(),
        OptionSpec::text("zone"),
        OptionSpec::text("description"),
        // image selection
        OptionSpec::text("image").group("image"),
        OptionSpec::text("image-family").group("image"),
        OptionSpec::text("image-project"),
        // boot disk
        OptionSpec::text("boot-disk-device-name"),
        OptionSpec::new("boot-disk-size", OptionKind::Size(BOOT_DISK_SIZE)),
        OptionSpec::text("boot-disk-type"),
        OptionSpec::switch("boot-disk-auto-delete").default_value("true"),
        OptionSpec::text("boot-disk-kms-key"),
        OptionSpec::text("boot-disk-kms-project"),
        OptionSpec::text("boot-disk-kms-location"),
        OptionSpec::text("boot-disk-kms-keyring"),
        // additional disks
        OptionSpec::new("disk", dict(DISK_KEYS)).repeated(),
        OptionSpec::new("create-disk", dict(CREATE_DISK_KEYS)).repeated(),
        OptionSpec::new("local-ssd", dict(LOCAL_SSD_KEYS)).repeated(),
        // machine shape
        OptionSpec::text("machine-type"),
        OptionSpec::new("custom-cpu", OptionKind::Integer),
        OptionSpec::new("custom-memory", OptionKind::Size(CUSTOM_MEMORY)),
        OptionSpec::switch("custom-extensions"),
        OptionSpec::text("min-cpu-platform"),
        OptionSpec::new("accelerator", dict(ACCELERATOR_KEYS)),
        OptionSpec::switch("can-ip-forward"),
        OptionSpec::switch("deletion-protection"),
        // scheduling
        OptionSpec::switch("preemptible"),
        OptionSpec::new("maintenance-policy", OptionKind::Choice(MAINTENANCE_POLICIES)),
        OptionSpec::switch("restart-on-failure").default_value("true"),
        // networking
        OptionSpec::text("network"),
        OptionSpec::text("subnet"),
        OptionSpec::text("private-network-ip"),
        OptionSpec::text("address").group("address"),
        OptionSpec::switch("no-address").group("address"),
        OptionSpec::new("network-tier", OptionKind::Normalized(Case::Upper)),
        OptionSpec::new("network-interface", dict(NETWORK_INTERFACE_KEYS)).repeated(),
        OptionSpec::switch("public-dns").group("public-dns"),
        OptionSpec::switch("no-public-dns").group("public-dns"),
        OptionSpec::switch("public-ptr").group("public-ptr"),
        OptionSpec::switch("no-public-ptr").group("public-ptr"),
        OptionSpec::text("public-ptr-domain").group("public-ptr-domain"),
        OptionSpec::switch("no-public-ptr-domain").group("public-ptr-domain"),
        // identity
        OptionSpec::text("service-account").group("service-account"),
        OptionSpec::switch("no-service-account").group("service-account"),
        OptionSpec::new("scopes", OptionKind::List(ArgList::new())).group("scopes"),
        OptionSpec::switch("no-scopes").group("scopes"),
        OptionSpec::new("tags", OptionKind::List(ArgList::new().min_length(1))),
    ]
}

/// Options added by `instances create-with-container`.
#[must_use]
pub fn container_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::text("container-image"),
        OptionSpec::text("container-command"),
        OptionSpec::text("container-arg").repeated(),
        OptionSpec::switch("container-privileged"),
        OptionSpec::new("container-mount-host-path", dict(HOST_PATH_MOUNT_KEYS)).repeated(),
        OptionSpec::new("container-mount-tmpfs", dict(TMPFS_MOUNT_KEYS)).repeated(),
        OptionSpec::new("container-env", OptionKind::Dict(DictSpec::open())).repeated(),
        OptionSpec::text("container-env-file"),
        OptionSpec::switch("container-stdin"),
        OptionSpec::switch("container-tty"),
        OptionSpec::new("container-restart-policy", OptionKind::Choice(RESTART_POLICIES))
            .default_value("always"),
    ]
}

/// Options that must be given together.
pub const CUSTOM_MACHINE_TYPE: &[&str] = &["custom-cpu", "custom-memory"];

/// Rules for `instances create`, in evaluation order.
#[must_use]
pub fn create_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new("disk", disk_common),
        ValidationRule::new("disk-access-mode", disk_access_mode),
        ValidationRule::new("boot-disk", boot_disk),
        ValidationRule::new("create-disk", create_disk),
        ValidationRule::new("local-ssd", local_ssd),
        ValidationRule::new("network-interface", network_interface),
        ValidationRule::new("address-cardinality", address_cardinality),
        ValidationRule::new("network-tier", network_tier),
        ValidationRule::new("public-ptr", public_ptr),
        ValidationRule::new("service-account", service_account),
        ValidationRule::new("accelerator", accelerator),
        ValidationRule::new("kms-key", kms_key),
        ValidationRule::new("machine-type", machine_type),
    ]
}

/// Rules for `instances create-with-container`.
#[must_use]
pub fn container_rules() -> Vec<ValidationRule> {
    let mut rules = vec![ValidationRule::new("container-image", container_image)];
    rules.extend(create_rules());
    rules
}

fn check_yes_no(option: &str, key: &str, dict: &DictValue) -> Result<(), ArgumentError> {
    dict.text(key)
        .map_or(Ok(()), |value| require_member(option, Some(key), value, &YES_NO))
}

fn check_mode(option: &str, dict: &DictValue) -> Result<(), ArgumentError> {
    dict.text("mode")
        .map_or(Ok(()), |value| require_member(option, Some("mode"), value, &DISK_MODES))
}

/// Every `--disk` names a disk and uses known values for its enum keys.
fn disk_common(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    for disk in options.dicts("disk") {
        if !disk.has("name") {
            return Err(ArgumentError::invalid("disk", "[name] is missing in [--disk]"));
        }
        check_mode("disk", disk)?;
        check_yes_no("disk", "boot", disk)?;
        check_yes_no("disk", "auto-delete", disk)?;
    }
    Ok(())
}

/// A disk attached with an explicit `mode=rw` goes to a single instance.
fn disk_access_mode(options: &ParsedOptions, context: &RuleContext) -> Result<(), ArgumentError> {
    for disk in options.dicts("disk") {
        let read_write = disk.text("mode") == Some("rw");
        let name = disk.text("name").unwrap_or_default();
        single_target_only(
            context,
            read_write,
            "disk",
            format!("Cannot attach disk [{name}] in read-write mode to more than one instance."),
        )?;
    }
    Ok(())
}

fn boot_disk(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    let attached = options
        .dicts("disk")
        .into_iter()
        .filter(|disk| disk.text("boot") == Some("yes"))
        .count();
    if attached > 1 {
        return Err(ArgumentError::invalid(
            "disk",
            "Each instance can have exactly one boot disk. At least two boot disks were specified through [--disk].",
        ));
    }
    if attached == 0 {
        return Ok(());
    }
    if options.first_set(&["image", "image-family"]).is_some() {
        return Err(ArgumentError::invalid(
            "disk",
            "Each instance can have exactly one boot disk. One boot disk was specified through [--disk] and another through [--image].",
        ));
    }
    let auto_delete_off = options.is_specified("boot-disk-auto-delete")
        && options.switch("boot-disk-auto-delete") == Some(false);
    let illegal = BOOT_DISK_FLAGS
        .iter()
        .copied()
        .find(|flag| options.is_specified(flag))
        .or_else(|| auto_delete_off.then_some("no-boot-disk-auto-delete"));
    illegal.map_or(Ok(()), |flag| {
        Err(ArgumentError::invalid(
            flag,
            format!(
                "[{}] can only be used when creating a new boot disk.",
                flag_name(flag)
            ),
        ))
    })
}

fn create_disk(options: &ParsedOptions, context: &RuleContext) -> Result<(), ArgumentError> {
    for disk in options.dicts("create-disk") {
        if let Some(name) = disk.text("name") {
            single_target_only(
                context,
                true,
                "create-disk",
                format!("Cannot create a disk with [name]={name} for more than one instance."),
            )?;
        }
        if disk.has("image") && disk.has("image-family") {
            return Err(ArgumentError::invalid(
                "create-disk",
                "Cannot specify [image] and [image-family] for a [--create-disk]. The fields are mutually exclusive.",
            ));
        }
        check_mode("create-disk", disk)?;
        check_yes_no("create-disk", "auto-delete", disk)?;
        let partial_key = ["kms-project", "kms-location", "kms-keyring"]
            .into_iter()
            .find(|key| disk.has(key));
        if let (Some(key), false) = (partial_key, disk.has("kms-key")) {
            return Err(ArgumentError::invalid(
                "create-disk",
                format!("[kms-key] is required when [{key}] is specified"),
            ));
        }
    }
    Ok(())
}

fn local_ssd(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    options
        .dicts("local-ssd")
        .into_iter()
        .filter_map(|ssd| ssd.text("interface"))
        .find(|interface| !SSD_INTERFACES.contains(interface))
        .map_or(Ok(()), |interface| {
            Err(ArgumentError::invalid(
                "local-ssd",
                format!(
                    "Unexpected local SSD interface: [{interface}]. Legal values are {}.",
                    SSD_INTERFACES.describe()
                ),
            ))
        })
}

/// Composite interfaces exclude the single-interface flags.
fn network_interface(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    if options
        .dicts("network-interface")
        .iter()
        .any(|nic| nic.has("address") && nic.has("no-address"))
    {
        return Err(ArgumentError::invalid(
            "network-interface",
            "specifies both address and no-address for one interface",
        ));
    }
    conflicts_with(
        options,
        "network-interface",
        &["address", "network", "private-network-ip", "subnet"],
    )
}

fn address_cardinality(options: &ParsedOptions, context: &RuleContext) -> Result<(), ArgumentError> {
    for flag in ["address", "private-network-ip"] {
        single_target_only(
            context,
            options.is_set(flag),
            flag,
            format!(
                "[{}] can only be used when creating a single instance.",
                flag_name(flag)
            ),
        )?;
    }
    Ok(())
}

fn require_tier(option: &str, tier: &str) -> Result<(), ArgumentError> {
    if NETWORK_TIERS.contains(tier) {
        Ok(())
    } else {
        Err(ArgumentError::invalid(option, format!("Invalid network tier [{tier}]")))
    }
}

fn network_tier(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    if let Some(tier) = options.text("network-tier") {
        require_tier("network-tier", tier)?;
    }
    for nic in options.dicts("network-interface") {
        if let Some(tier) = nic.text("network-tier") {
            require_tier("network-interface", tier)?;
        }
    }
    Ok(())
}

fn public_ptr(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    if options.is_set("public-ptr-domain") && options.is_set("no-public-ptr") {
        return Err(ArgumentError::conflicting(["public-ptr-domain", "no-public-ptr"]));
    }
    Ok(())
}

fn service_account(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    if options.is_set("no-service-account") && !options.is_set("no-scopes") {
        return Err(ArgumentError::required(
            "no-scopes",
            "required with argument --no-service-account",
        ));
    }
    if options
        .list("scopes")
        .unwrap_or_default()
        .iter()
        .any(String::is_empty)
    {
        return Err(ArgumentError::invalid("scopes", "Scope cannot be an empty string."));
    }
    Ok(())
}

fn accelerator(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    if options.dicts("accelerator").iter().any(|dict| !dict.has("type")) {
        return Err(ArgumentError::invalid(
            "accelerator",
            "accelerator type must be specified. e.g. --accelerator type=nvidia-tesla-k80,count=2",
        ));
    }
    Ok(())
}

/// A partial key reference needs the key name, and a short key name needs its
/// location and keyring.
fn kms_key(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    let parts = [
        "boot-disk-kms-project",
        "boot-disk-kms-location",
        "boot-disk-kms-keyring",
    ];
    let Some(key) = options.text("boot-disk-kms-key") else {
        return options.first_set(&parts).map_or(Ok(()), |part| {
            Err(ArgumentError::required(
                "boot-disk-kms-key",
                format!("required when [{}] is specified", flag_name(part)),
            ))
        });
    };
    if key.starts_with("projects/") {
        return Ok(());
    }
    ["boot-disk-kms-location", "boot-disk-kms-keyring"]
        .into_iter()
        .find(|part| !options.is_set(part))
        .map_or(Ok(()), |missing| {
            Err(ArgumentError::required(
                missing,
                "required when [--boot-disk-kms-key] is not a fully qualified key name",
            ))
        })
}

fn machine_type(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    if let (true, Some(custom)) = (
        options.is_set("machine-type"),
        options.first_set(CUSTOM_MACHINE_TYPE),
    ) {
        return Err(ArgumentError::conflicting(["machine-type", custom]));
    }
    if options.integer("custom-cpu").is_some_and(|cpus| cpus < 1) {
        return Err(ArgumentError::invalid("custom-cpu", "must be a positive integer"));
    }
    if options
        .size("custom-memory")
        .is_some_and(|memory| !memory.is_multiple_of(CUSTOM_MEMORY_STEP))
    {
        return Err(ArgumentError::invalid(
            "custom-memory",
            "Memory should be a multiple of 256MiB",
        ));
    }
    Ok(())
}

fn container_image(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    if options.is_set("container-image") {
        Ok(())
    } else {
        Err(ArgumentError::required(
            "container-image",
            "You must provide container image",
        ))
    }
}
