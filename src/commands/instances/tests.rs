//! Unit tests for instance flags, rules and request bodies.

use super::*;
use crate::api::RequestKind;
use crate::config::Properties;
use crate::executor::Executor;
use crate::options::{ArgumentError, RawArgs};
use crate::test_support::{ConsoleEvent, ScriptedApi, ScriptedConsole};
use rstest::{fixture, rstest};
use serde_json::json;

struct Harness {
    api: ScriptedApi,
    console: ScriptedConsole,
    properties: Properties,
}

impl Harness {
    fn prepare<C: Command>(&self, command: &C, raw: &RawArgs) -> Result<(), CommandError> {
        Executor::new(Context::new(&self.properties, &self.api, &self.console))
            .prepare(command, raw)
            .map(|_| ())
    }

    fn violation(&self, raw: &RawArgs) -> ArgumentError {
        match self.prepare(&Create, raw) {
            Err(CommandError::Argument(err)) => err,
            other => panic!("expected an argument error, got {other:?}"),
        }
    }

    async fn run<C: Command>(&self, command: &C, raw: &RawArgs) -> Result<Value, CommandError> {
        Executor::new(Context::new(&self.properties, &self.api, &self.console))
            .run(command, raw)
            .await
    }

    fn insert_bodies(&self) -> Vec<Value> {
        self.api
            .requests()
            .into_iter()
            .filter(|request| request.kind == RequestKind::Insert)
            .map(|request| request.params)
            .collect()
    }
}

#[fixture]
fn harness() -> Harness {
    Harness {
        api: ScriptedApi::new(),
        console: ScriptedConsole::new(),
        properties: Properties::for_project("p"),
    }
}

fn vm() -> RawArgs {
    RawArgs::new()
        .values("NAME", ["vm-1"])
        .value("zone", Some("us-central1-a"))
}

fn two_vms() -> RawArgs {
    RawArgs::new()
        .values("NAME", ["vm-1", "vm-2"])
        .value("zone", Some("us-central1-a"))
}

#[rstest]
fn two_boot_disks_are_rejected(harness: Harness) {
    let raw = vm().values("disk", ["name=d1,boot=yes", "name=d2,boot=yes"]);
    let err = harness.violation(&raw);
    assert!(err.to_string().contains("At least two boot disks"), "{err}");
}

#[rstest]
fn boot_disk_plus_image_is_rejected(harness: Harness) {
    let raw = vm()
        .values("disk", ["name=d1,boot=yes"])
        .value("image-family", Some("debian-9"));
    let err = harness.violation(&raw);
    assert!(err.to_string().contains("another through [--image]"), "{err}");
}

#[rstest]
#[case("boot-disk-size", Some("20GB"), "--boot-disk-size")]
#[case("boot-disk-device-name", Some("root"), "--boot-disk-device-name")]
#[case("boot-disk-auto-delete", Some("false"), "--no-boot-disk-auto-delete")]
fn boot_disk_flags_need_a_new_boot_disk(
    harness: Harness,
    #[case] option: &str,
    #[case] value: Option<&str>,
    #[case] flag: &str,
) {
    let raw = vm().values("disk", ["name=d1,boot=yes,mode=ro"]).value(option, value);
    let err = harness.violation(&raw);
    assert_eq!(err.flag(), flag);
    assert!(err.to_string().contains("can only be used when creating a new boot disk"));
}

#[rstest]
fn read_write_disk_needs_a_single_target(harness: Harness) {
    let err = harness.violation(&two_vms().values("disk", ["name=shared,mode=rw"]));
    assert!(err.to_string().contains(
        "Cannot attach disk [shared] in read-write mode to more than one instance."
    ));
    assert!(
        harness
            .prepare(&Create, &vm().values("disk", ["name=shared,mode=rw"]))
            .is_ok()
    );
}

#[rstest]
#[case("name=shared")]
#[case("name=shared,mode=ro")]
fn disk_without_explicit_read_write_attaches_to_many(harness: Harness, #[case] disk: &str) {
    assert!(harness.prepare(&Create, &two_vms().values("disk", [disk])).is_ok());
}

#[rstest]
#[case("mode=rw", "[name] is missing in [--disk]")]
#[case("name=d1,mode=rx", "value for [mode] must be one of [rw, ro], not [rx]")]
#[case("name=d1,boot=maybe", "value for [boot] must be one of [yes, no], not [maybe]")]
#[case("name=d1,auto-delete=1", "value for [auto-delete] must be one of [yes, no], not [1]")]
fn disk_values_are_checked(harness: Harness, #[case] disk: &str, #[case] message: &str) {
    let err = harness.violation(&vm().values("disk", [disk]));
    assert!(err.to_string().contains(message), "{err}");
}

#[rstest]
fn named_create_disk_needs_a_single_target(harness: Harness) {
    let err = harness.violation(&two_vms().values("create-disk", ["name=data"]));
    assert!(err.to_string().contains("Cannot create a disk with [name]=data"));
}

#[rstest]
fn create_disk_image_fields_are_exclusive(harness: Harness) {
    let err =
        harness.violation(&vm().values("create-disk", ["image=img,image-family=fam,size=20GB"]));
    assert!(err.to_string().contains("The fields are mutually exclusive."));
}

#[rstest]
fn local_ssd_interface_is_checked_after_upper_casing(harness: Harness) {
    assert!(harness.prepare(&Create, &vm().values("local-ssd", ["interface=nvme"])).is_ok());
    let err = harness.violation(&vm().values("local-ssd", ["interface=ide"]));
    assert!(
        err.to_string()
            .contains("Unexpected local SSD interface: [IDE]. Legal values are [NVME, SCSI].")
    );
}

#[rstest]
fn local_ssd_size_follows_granularity(harness: Harness) {
    assert!(harness.prepare(&Create, &vm().values("local-ssd", ["size=750GB"])).is_ok());
    let err = harness.violation(&vm().values("local-ssd", ["size=500GB"]));
    assert!(matches!(err, ArgumentError::Malformed { .. }));
    assert_eq!(err.flag(), "--local-ssd");
}

#[rstest]
fn network_interface_conflicts_name_every_flag(harness: Harness) {
    let raw = vm()
        .values("network-interface", ["network=default"])
        .value("subnet", Some("s1"))
        .value("address", Some("10.0.0.2"));
    let err = harness.violation(&raw);
    assert_eq!(
        err,
        ArgumentError::conflicting(["network-interface", "address", "subnet"])
    );
}

#[rstest]
fn interface_with_address_and_no_address_is_invalid(harness: Harness) {
    let err = harness.violation(&vm().values("network-interface", ["address=1.2.3.4,no-address"]));
    assert!(matches!(err, ArgumentError::Invalid { .. }));
}

#[rstest]
fn address_needs_a_single_target(harness: Harness) {
    let err = harness.violation(&two_vms().value("private-network-ip", Some("10.0.0.5")));
    assert_eq!(err.flag(), "--private-network-ip");
}

#[rstest]
fn address_and_no_address_are_exclusive(harness: Harness) {
    let err = harness.violation(&vm().value("address", Some("1.2.3.4")).switch("no-address", true));
    assert_eq!(err, ArgumentError::conflicting(["address", "no-address"]));
}

#[rstest]
fn no_service_account_requires_no_scopes(harness: Harness) {
    let err = harness.violation(&vm().switch("no-service-account", true));
    assert_eq!(
        err,
        ArgumentError::required("no-scopes", "required with argument --no-service-account")
    );
}

#[rstest]
fn empty_scope_is_invalid(harness: Harness) {
    let err = harness.violation(&vm().value("scopes", Some("compute-ro,,storage-ro")));
    assert_eq!(
        err,
        ArgumentError::invalid("scopes", "Scope cannot be an empty string.")
    );
}

#[rstest]
fn accelerator_needs_a_type(harness: Harness) {
    let err = harness.violation(&vm().value("accelerator", Some("count=2")));
    assert!(err.to_string().contains("accelerator type must be specified"));
}

#[rstest]
fn network_tier_is_upper_cased_then_checked(harness: Harness) {
    assert!(harness.prepare(&Create, &vm().value("network-tier", Some("premium"))).is_ok());
    let err = harness.violation(&vm().value("network-tier", Some("gold")));
    assert_eq!(err, ArgumentError::invalid("network-tier", "Invalid network tier [GOLD]"));
}

#[rstest]
fn public_ptr_domain_conflicts_with_no_public_ptr(harness: Harness) {
    let raw = vm()
        .value("public-ptr-domain", Some("example.test"))
        .switch("no-public-ptr", true);
    let err = harness.violation(&raw);
    assert_eq!(
        err,
        ArgumentError::conflicting(["public-ptr-domain", "no-public-ptr"])
    );
}

#[rstest]
fn partial_kms_reference_needs_the_key(harness: Harness) {
    let err = harness.violation(&vm().value("boot-disk-kms-keyring", Some("ring")));
    assert_eq!(err.flag(), "--boot-disk-kms-key");
    let short = vm()
        .value("boot-disk-kms-key", Some("key"))
        .value("boot-disk-kms-location", Some("global"));
    assert_eq!(harness.violation(&short).flag(), "--boot-disk-kms-keyring");
}

#[rstest]
fn custom_machine_type_flags_go_together(harness: Harness) {
    let err = harness.violation(&vm().value("custom-cpu", Some("4")));
    assert!(matches!(err, ArgumentError::Required { .. }));
    assert_eq!(err.flag(), "--custom-memory");
}

#[rstest]
fn machine_type_conflicts_with_custom_shape(harness: Harness) {
    let raw = vm()
        .value("machine-type", Some("n1-standard-2"))
        .value("custom-cpu", Some("2"))
        .value("custom-memory", Some("4GB"));
    assert_eq!(
        harness.violation(&raw),
        ArgumentError::conflicting(["machine-type", "custom-cpu"])
    );
}

#[rstest]
fn container_image_is_required(harness: Harness) {
    let err = harness.prepare(&CreateWithContainer, &vm()).expect_err("no image");
    assert_eq!(
        err,
        CommandError::Argument(ArgumentError::required(
            "container-image",
            "You must provide container image"
        ))
    );
}

#[rstest]
#[tokio::test]
async fn default_instance_boots_debian_with_default_scopes(harness: Harness) {
    harness.api.push_ok(json!({ "status": "DONE" }));
    harness.run(&Create, &vm()).await.expect("created");

    let body = harness.insert_bodies().into_iter().next().expect("insert body");
    assert_eq!(body["name"], "vm-1");
    assert_eq!(
        body["machineType"],
        "projects/p/zones/us-central1-a/machineTypes/n1-standard-1"
    );
    assert_eq!(
        body["disks"][0]["initializeParams"]["sourceImage"],
        "projects/debian-cloud/global/images/family/debian-9"
    );
    assert_eq!(body["disks"][0]["boot"], true);
    assert_eq!(
        body["networkInterfaces"][0]["network"],
        "projects/p/global/networks/default"
    );
    let scopes = body["serviceAccounts"][0]["scopes"]
        .as_array()
        .expect("scopes array");
    assert_eq!(scopes.len(), 7);
    assert_eq!(body["scheduling"]["onHostMaintenance"], "MIGRATE");
}

#[rstest]
#[tokio::test]
async fn one_insert_per_instance(harness: Harness) {
    harness.api.push_ok(json!({}));
    harness.api.push_ok(json!({}));
    harness.run(&Create, &two_vms()).await.expect("created");
    let requests = harness.api.requests();
    assert_eq!(requests.len(), 2);
    assert!(
        requests
            .iter()
            .all(|request| request.resource == "projects/p/zones/us-central1-a/instances")
    );
}

#[rstest]
#[tokio::test]
async fn custom_shape_and_preemptible_scheduling(harness: Harness) {
    harness.api.push_ok(json!({}));
    let raw = vm()
        .value("custom-cpu", Some("4"))
        .value("custom-memory", Some("5GB"))
        .switch("custom-extensions", true)
        .switch("preemptible", true)
        .value("tags", Some("web,db"));
    harness.run(&Create, &raw).await.expect("created");
    let body = harness.insert_bodies().into_iter().next().expect("insert body");
    assert_eq!(
        body["machineType"],
        "projects/p/zones/us-central1-a/machineTypes/custom-4-5120-ext"
    );
    assert_eq!(body["scheduling"]["automaticRestart"], false);
    assert_eq!(body["scheduling"]["onHostMaintenance"], "TERMINATE");
    assert_eq!(body["tags"]["items"], json!(["web", "db"]));
}

#[rstest]
#[tokio::test]
async fn named_address_is_looked_up_in_the_instance_region(harness: Harness) {
    harness.api.push_ok(json!({ "address": "203.0.113.7" }));
    harness.api.push_ok(json!({}));
    harness
        .run(&Create, &vm().value("address", Some("frontend-ip")))
        .await
        .expect("created");
    let requests = harness.api.requests();
    let lookup = requests.first().expect("lookup");
    assert_eq!(lookup.kind, RequestKind::Get);
    assert_eq!(
        lookup.resource,
        "projects/p/regions/us-central1/addresses/frontend-ip"
    );
    let body = harness.insert_bodies().into_iter().next().expect("insert body");
    assert_eq!(
        body["networkInterfaces"][0]["accessConfigs"][0]["natIP"],
        "203.0.113.7"
    );
}

#[rstest]
#[tokio::test]
async fn literal_address_needs_no_lookup(harness: Harness) {
    harness.api.push_ok(json!({}));
    harness
        .run(&Create, &vm().value("address", Some("198.51.100.4")).switch("public-dns", true))
        .await
        .expect("created");
    assert_eq!(harness.api.request_kinds(), vec![RequestKind::Insert]);
    let body = harness.insert_bodies().into_iter().next().expect("insert body");
    let access = &body["networkInterfaces"][0]["accessConfigs"][0];
    assert_eq!(access["natIP"], "198.51.100.4");
    assert_eq!(access["setPublicDns"], true);
}

#[rstest]
#[tokio::test]
async fn no_address_drops_access_configs(harness: Harness) {
    harness.api.push_ok(json!({}));
    harness
        .run(&Create, &vm().switch("no-address", true).value("subnet", Some("sub-a")))
        .await
        .expect("created");
    let body = harness.insert_bodies().into_iter().next().expect("insert body");
    let nic = &body["networkInterfaces"][0];
    assert_eq!(nic["accessConfigs"], json!([]));
    assert_eq!(nic["subnetwork"], "projects/p/regions/us-central1/subnetworks/sub-a");
    assert!(nic.get("network").is_none());
}

#[rstest]
#[tokio::test]
async fn container_instance_uses_container_image_family(harness: Harness) {
    harness.api.push_ok(json!({}));
    let raw = vm()
        .value("container-image", Some("registry.example.test/app:1"))
        .values("container-env", ["A=1,B=2"])
        .value("container-restart-policy", Some("ON-FAILURE"));
    harness.run(&CreateWithContainer, &raw).await.expect("created");
    let body = harness.insert_bodies().into_iter().next().expect("insert body");
    assert_eq!(
        body["disks"][0]["initializeParams"]["sourceImage"],
        "projects/cos-cloud/global/images/family/cos-stable"
    );
    let item = &body["metadata"]["items"][0];
    assert_eq!(item["key"], container::DECLARATION_KEY);
    let declaration: Value =
        serde_json::from_str(item["value"].as_str().expect("declaration text"))
            .expect("declaration json");
    assert_eq!(declaration["spec"]["restartPolicy"], "OnFailure");
    assert_eq!(
        declaration["spec"]["containers"][0]["env"],
        json!([{ "name": "A", "value": "1" }, { "name": "B", "value": "2" }])
    );
}

#[rstest]
fn env_file_skips_comments_and_rejects_bare_words() {
    let parsed = container::parse_env_file("env.list", "# comment\n\nA=1\nB = two=2\n")
        .expect("valid env file");
    assert_eq!(
        parsed,
        vec![
            (String::from("A"), String::from("1")),
            (String::from("B"), String::from(" two=2")),
        ]
    );
    let err = container::parse_env_file("env.list", "A=1\nBROKEN\n").expect_err("syntax error");
    assert_eq!(err.flag(), "--container-env-file");
    assert!(err.to_string().contains("[BROKEN]"));
}

#[rstest]
fn env_flag_overrides_env_file() {
    let parsed = CreateWithContainer
        .schema()
        .parse(
            &vm()
                .value("container-image", Some("img"))
                .values("container-env", ["A=flag"]),
        )
        .expect("parsed");
    let from_file = vec![
        (String::from("A"), String::from("file")),
        (String::from("C"), String::from("3")),
    ];
    let declaration = container::declaration(&parsed, "vm-1", &from_file);
    assert_eq!(
        declaration["spec"]["containers"][0]["env"],
        json!([{ "name": "A", "value": "flag" }, { "name": "C", "value": "3" }])
    );
}

#[rstest]
fn env_file_is_read_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("app.env");
    std::fs::write(&path, "TOKEN=abc\n").expect("write env file");
    let utf8 = camino::Utf8PathBuf::from_path_buf(path).expect("utf8 path");
    let entries = container::read_env_file(&utf8).expect("read env file");
    assert_eq!(entries, vec![(String::from("TOKEN"), String::from("abc"))]);
}

#[rstest]
#[case("default", 7)]
#[case("compute-ro", 1)]
#[case("https://www.googleapis.com/auth/custom", 1)]
fn scopes_expand_aliases(#[case] scope: &str, #[case] count: usize) {
    let expanded = expand_scope(scope);
    assert_eq!(expanded.len(), count);
    assert!(expanded.iter().all(|full| full.starts_with(SCOPE_PREFIX)));
}

#[rstest]
#[tokio::test]
async fn declined_deletion_makes_no_call(harness: Harness) {
    harness.console.push_confirmation(false);
    let err = harness.run(&Delete, &vm()).await.expect_err("declined");
    assert_eq!(err, CommandError::Aborted(String::from("Deletion aborted by user.")));
    assert!(harness.api.requests().is_empty());
}

#[rstest]
#[tokio::test]
async fn deletion_reports_each_instance(harness: Harness) {
    harness.console.push_confirmation(true);
    harness.api.push_ok(json!({}));
    harness.api.push_ok(json!({}));
    harness.run(&Delete, &two_vms()).await.expect("deleted");
    assert_eq!(
        harness.api.request_kinds(),
        vec![RequestKind::Delete, RequestKind::Delete]
    );
    assert_eq!(
        harness.console.statuses(),
        vec![
            String::from("Deleted [projects/p/zones/us-central1-a/instances/vm-1]."),
            String::from("Deleted [projects/p/zones/us-central1-a/instances/vm-2]."),
        ]
    );
    let prompt = harness.console.events().into_iter().find_map(|event| match event {
        ConsoleEvent::Confirm { message } => Some(message),
        _ => None,
    });
    assert!(prompt.is_some_and(|text| text.contains("[vm-2] in [us-central1-a]")));
}

#[rstest]
#[tokio::test]
async fn describe_returns_the_resource(harness: Harness) {
    harness.api.push_ok(json!({ "name": "vm-1", "status": "RUNNING" }));
    let value = harness.run(&Describe, &vm()).await.expect("described");
    assert_eq!(value["status"], "RUNNING");
}
