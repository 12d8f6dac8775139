//! Unit tests for request construction and listing helpers.

use super::*;
use crate::test_support::{ScriptedApi, json_aggregated, json_scopes};
use rstest::rstest;

#[rstest]
fn only_mutations_carry_request_ids() {
    let reference = ResourceReference::new(
        "p",
        Collection::INSTANCES,
        "vm",
        Scope::Zone(String::from("us-central1-a")),
    );
    assert!(ApiRequest::get(&reference).request_id.is_none());
    assert!(ApiRequest::delete(&reference).request_id.is_some());
    let insert = ApiRequest::insert(&reference, json!({ "name": "vm" }));
    assert_eq!(insert.resource, "projects/p/zones/us-central1-a/instances");
    assert!(insert.request_id.is_some());
}

#[rstest]
fn aggregated_list_filters_on_name() {
    let request = ApiRequest::aggregated_list("p", Collection::DISKS, "d1");
    assert_eq!(request.kind, RequestKind::AggregatedList);
    assert_eq!(request.resource, "projects/p/aggregated/disks");
    assert_eq!(request.params, json!({ "filter": "name eq d1" }));
}

#[tokio::test]
async fn find_scopes_keeps_exact_matches_only() {
    let api = ScriptedApi::new();
    api.push_ok(json_aggregated(
        "zone",
        &[("vm", "us-east1-b"), ("vm-10", "us-west1-a"), ("vm", "us-central1-a")],
    ));
    let scopes = api
        .find_scopes("p", Collection::INSTANCES, "vm")
        .await
        .expect("scopes");
    assert_eq!(
        scopes,
        vec![
            Scope::Zone(String::from("us-central1-a")),
            Scope::Zone(String::from("us-east1-b"))
        ]
    );
}

#[tokio::test]
async fn list_scopes_reads_names() {
    let api = ScriptedApi::new();
    api.push_ok(json_scopes(&["us-central1", "europe-west1"]));
    let names = api.list_scopes("p", ScopeKind::Region).await.expect("names");
    assert_eq!(names, ["us-central1", "europe-west1"]);
    let request = api.requests().into_iter().next().expect("request");
    assert_eq!(request.resource, "projects/p/regions");
}

#[rstest]
fn items_rejects_non_arrays() {
    let err = items(&json!({ "items": "nope" }), "projects/p/zones").expect_err("not an array");
    assert!(matches!(err, RemoteError::Decode { .. }));
    assert!(items(&Value::Null, "x").expect("empty").is_empty());
}

#[rstest]
fn not_found_is_recognised() {
    let err = RemoteError::Status {
        code: 404,
        message: String::from("gone"),
    };
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "HTTPError 404: gone");
}
