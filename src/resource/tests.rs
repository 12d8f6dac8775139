//! Unit tests for resource references.

use super::*;
use rstest::rstest;

#[rstest]
#[case(Collection::INSTANCES, Scope::Zone(String::from("us-central1-a")), "projects/p/zones/us-central1-a/instances/vm-1")]
#[case(Collection::ROUTERS, Scope::Region(String::from("us-central1")), "projects/p/regions/us-central1/routers/vm-1")]
#[case(Collection::NETWORKS, Scope::Global, "projects/p/global/networks/vm-1")]
#[case(Collection::JOBS, Scope::Region(String::from("europe-west1")), "projects/p/regions/europe-west1/jobs/vm-1")]
fn references_render_and_parse_back(
    #[case] collection: Collection,
    #[case] scope: Scope,
    #[case] path: &str,
) {
    let reference = ResourceReference::new("p", collection, "vm-1", scope);
    assert_eq!(reference.to_path(), path);
    let parsed = ResourceReference::parse(&reference.to_path()).expect("path should parse");
    assert_eq!(parsed, reference);
}

#[rstest]
fn urls_parse_to_the_same_reference() {
    let url = "https://compute.example.test/compute/v1/projects/p/zones/us-east1-b/disks/d1";
    let parsed = ResourceReference::parse(url).expect("url should parse");
    assert_eq!(
        parsed,
        ResourceReference::new("p", Collection::DISKS, "d1", Scope::Zone(String::from("us-east1-b")))
    );
}

#[rstest]
#[case("vm-1")]
#[case("projects/p/zones/us-central1-a/widgets/w")]
#[case("projects/p/regions/us-central1/instances/vm")]
#[case("projects/p/zones/us-central1-a/instances")]
fn malformed_paths_are_rejected(#[case] text: &str) {
    let err = ResourceReference::parse(text).expect_err("should not parse");
    assert!(matches!(err, ReferenceError::Unparseable { .. }));
}

#[rstest]
fn parse_in_checks_collection() {
    let err = ResourceReference::parse_in(
        "projects/p/zones/us-central1-a/disks/d1",
        Collection::INSTANCES,
    )
    .expect_err("wrong collection");
    assert_eq!(
        err,
        ReferenceError::WrongCollection {
            path: String::from("projects/p/zones/us-central1-a/disks/d1"),
            expected: "instances",
        }
    );
}

#[rstest]
fn global_collections_ignore_scope() {
    let reference = ResourceReference::new(
        "p",
        Collection::IMAGES,
        "debian",
        Scope::Zone(String::from("us-central1-a")),
    );
    assert_eq!(reference.scope(), &Scope::Global);
}

#[rstest]
#[case(Scope::Zone(String::from("us-central1-a")), Some("us-central1"))]
#[case(Scope::Region(String::from("europe-west4")), Some("europe-west4"))]
#[case(Scope::Global, None)]
fn scope_region_is_derived(#[case] scope: Scope, #[case] region: Option<&str>) {
    assert_eq!(scope.region(), region);
}
