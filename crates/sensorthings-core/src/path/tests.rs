use super::*;
use crate::{entity::EntityId, error::ErrorKind, model::ModelRegistry, query::QueryOptions};
use proptest::prelude::*;

fn parse(path: &str) -> Result<ResourcePath, PathError> {
    PathGrammar::new(&ModelRegistry::core()).parse(path)
}

fn parse_plus(path: &str) -> Result<ResourcePath, PathError> {
    PathGrammar::new(&ModelRegistry::with_plus()).parse(path)
}

fn kind_of(path: &str) -> ErrorKind {
    parse(path).expect_err(path).kind()
}

#[test]
fn bare_collection_is_a_single_collection_segment() {
    let path = parse("Things").expect("collection path");

    assert_eq!(path.path_type(), PathType::Collection);
    assert_eq!(path.len(), 1);
    assert!(path.is_collection());
    assert_eq!(path.leaf().id(), None);
    assert_eq!(path.entity_type().entity_name, "Thing");
}

#[test]
fn navigated_collection_orders_segments_root_to_leaf() {
    let path = parse("Datastreams(12)/Observations").expect("navigated collection");

    assert_eq!(path.path_type(), PathType::Collection);
    let segments = path.segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].entity_set(), "Datastreams");
    assert_eq!(segments[0].id(), Some(&EntityId::new("12")));
    assert_eq!(segments[1].entity_set(), "Observations");
    assert_eq!(segments[1].id(), None);
    assert_eq!(path.parent().map(PathSegment::entity_set), Some("Datastreams"));
}

#[test]
fn leading_slash_is_ignored() {
    assert_eq!(
        parse("/Things(1)/Locations").expect("slash"),
        parse("Things(1)/Locations").expect("no slash"),
    );
}

#[test]
fn to_one_navigation_addresses_an_entity() {
    let path = parse("Datastreams(1)/Thing").expect("to-one nav");

    assert_eq!(path.path_type(), PathType::Entity);
    assert!(!path.is_collection());
    assert_eq!(path.entity_type().collection, "Things");
    assert_eq!(path.leaf().entity_set(), "Thing");
}

#[test]
fn deep_id_chain_resolves() {
    let path = parse("Things(1)/Datastreams(2)/Observations(3)").expect("deep chain");

    assert_eq!(path.path_type(), PathType::Entity);
    assert_eq!(path.len(), 3);
    assert_eq!(path.entity_type().entity_name, "Observation");
}

#[test]
fn property_and_value_suffixes() {
    let property = parse("Things(5)/name").expect("property");
    assert_eq!(property.path_type(), PathType::Property);
    assert_eq!(property.property(), Some("name"));
    assert_eq!(property.len(), 1);

    let value = parse("Things(5)/name/$value").expect("value");
    assert_eq!(value.path_type(), PathType::Value);
    assert_eq!(value.property(), Some("name"));

    let via_nav = parse("Datastreams(1)/Thing/name").expect("property after to-one");
    assert_eq!(via_nav.path_type(), PathType::Property);
    assert_eq!(via_nav.len(), 2);
}

#[test]
fn ref_suffix_keeps_collection_shape() {
    let collection = parse("Things(1)/Datastreams/$ref").expect("collection ref");
    assert_eq!(collection.path_type(), PathType::Reference);
    assert!(collection.is_collection());

    let entity = parse("Datastreams(1)/Sensor/$ref").expect("entity ref");
    assert_eq!(entity.path_type(), PathType::Reference);
    assert!(!entity.is_collection());
}

#[test]
fn missing_parentheses_is_a_syntax_error() {
    assert_eq!(kind_of("Things/5"), ErrorKind::InvalidPathSyntax);
    assert_eq!(kind_of("Things/Datastreams"), ErrorKind::InvalidPathSyntax);
}

#[test]
fn malformed_text_is_a_syntax_error() {
    for path in [
        "",
        "/",
        "Things(1)/",
        "Things(1)//Datastreams",
        "Things(",
        "Things()",
        "Things(1)(2)",
        "(1)",
        "Things(1)/name/$value/x",
        "Things(1)/$value",
        "Things(1)/name/$ref",
        "Things(1)/$select",
        "Things(1)/name(2)",
        "Things('a'b')",
        "$value",
    ] {
        assert_eq!(kind_of(path), ErrorKind::InvalidPathSyntax, "{path}");
    }
}

#[test]
fn singular_keyword_is_illegal_at_root() {
    let err = parse("Thing(1)").expect_err("singular root");

    assert_eq!(err.kind(), ErrorKind::InvalidPathSyntax);
    assert!(err.to_string().contains("use 'Things'"));
}

#[test]
fn illegal_hops_are_semantic_errors() {
    for path in [
        "Things(1)/Sensors",
        "Things(1)/Sensor",
        "Things(1)/result",
        "Datastreams(1)/Thing(2)",
        "Datastreams(1)/Thing/Locations",
    ] {
        assert_eq!(kind_of(path), ErrorKind::InvalidPathSemantics, "{path}");
    }
}

#[test]
fn semantic_error_names_the_failing_segment() {
    let err = parse("Things(1)/Sensors").expect_err("no such relation");

    let PathError::Semantics { segment, .. } = err else {
        panic!("expected semantic error, got {err:?}");
    };
    assert_eq!(segment, "Sensors");
}

#[test]
fn unregistered_types_are_unknown() {
    assert_eq!(kind_of("Widgets"), ErrorKind::UnknownEntityType);
    assert_eq!(kind_of("Parties(1)"), ErrorKind::UnknownEntityType);
    assert_eq!(kind_of("Datastreams(1)/Party"), ErrorKind::UnknownEntityType);
}

#[test]
fn plus_profile_extends_the_grammar() {
    let path = parse_plus("Datastreams(1)/Party").expect("plus nav");
    assert_eq!(path.entity_type().collection, "Parties");

    let path = parse_plus("Relations(4)/Subject/result").expect("renamed to-one");
    assert_eq!(path.entity_type().entity_name, "Observation");
    assert_eq!(path.path_type(), PathType::Property);
}

#[test]
fn syntax_error_reports_offset() {
    let err = parse("Things(1)/Datastreams/5").expect_err("bad char");

    let PathError::Syntax { offset, .. } = err else {
        panic!("expected syntax error, got {err:?}");
    };
    assert_eq!(offset, 22);
}

#[test]
fn quoted_ids_decode_and_reserialize() {
    let path = parse("Things('it''s')/Datastreams").expect("quoted id");

    assert_eq!(path.segments()[0].id(), Some(&EntityId::new("it's")));
    assert_eq!(path.to_string(), "Things('it''s')/Datastreams");
}

#[test]
fn display_renders_suffixes() {
    for path in [
        "Things(1)/name/$value",
        "Things(1)/Datastreams/$ref",
        "Datastreams(1)/Thing/name",
    ] {
        assert_eq!(parse(path).expect(path).to_string(), path);
    }
}

#[test]
fn select_suffix_attaches_to_collection_paths() {
    let path = parse("Things$select=name,description").expect("select suffix");

    assert_eq!(path.path_type(), PathType::Collection);
    assert_eq!(path.len(), 1);
    assert_eq!(
        path.select(),
        Some(&QueryOptions::select_fields(["description", "name"]))
    );
    assert_eq!(path.to_string(), "Things$select=description,name");

    let navigated = parse("Things(1)/Datastreams$select=name").expect("navigated select");
    assert_eq!(navigated.len(), 2);
    assert_eq!(navigated.select(), Some(&QueryOptions::select_fields(["name"])));

    assert_eq!(parse("Things").expect("bare").select(), None);
}

#[test]
fn select_suffix_needs_a_collection_leaf() {
    for path in [
        "Things(1)$select=name",
        "Things(1)/name$select=name",
        "Datastreams(1)/Thing$select=name",
        "Things(1)/Datastreams/$ref$select=name",
        "Things$select=",
        "Things$select=name&$top=1",
        "Things?$top=1",
        "Things?$select=name",
    ] {
        assert_eq!(kind_of(path), ErrorKind::InvalidPathSyntax, "{path}");
    }

    assert_eq!(kind_of("Things$select=result"), ErrorKind::InvalidPathSemantics);
}

#[test]
fn take_select_leaves_the_bare_path() {
    let mut path = parse("Observations$select=result").expect("select suffix");

    assert_eq!(path.take_select(), Some(QueryOptions::select_fields(["result"])));
    assert_eq!(path, parse("Observations").expect("bare"));
}

#[test]
fn split_query_recognizes_both_forms() {
    assert_eq!(
        PathGrammar::split_query("Things?$select=name"),
        ("Things", Some("$select=name"))
    );
    assert_eq!(
        PathGrammar::split_query("Things$select=name,id"),
        ("Things", Some("$select=name,id"))
    );
    assert_eq!(
        PathGrammar::split_query("Things('a?b')/Datastreams"),
        ("Things('a?b')/Datastreams", None)
    );
}

///
/// PROPERTIES
///

const COLLECTIONS: [&str; 8] = [
    "Things",
    "Locations",
    "HistoricalLocations",
    "Datastreams",
    "Sensors",
    "ObservedProperties",
    "Observations",
    "FeaturesOfInterest",
];

fn arb_collection() -> impl Strategy<Value = &'static str> {
    prop::sample::select(COLLECTIONS.to_vec())
}

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..100_000).prop_map(|n| n.to_string()),
        "[a-zA-Z][a-zA-Z0-9_ -]{0,11}".prop_map(|s| format!("'{s}'")),
    ]
}

proptest! {
    #[test]
    fn every_collection_parses_as_single_segment(collection in arb_collection()) {
        let path = parse(collection).expect("collection");

        prop_assert_eq!(path.path_type(), PathType::Collection);
        prop_assert_eq!(path.len(), 1);
    }

    #[test]
    fn id_qualified_paths_reserialize(collection in arb_collection(), key in arb_key()) {
        let raw = format!("{collection}({key})");
        let path = parse(&raw).expect("id path");

        prop_assert_eq!(path.path_type(), PathType::Entity);
        prop_assert_eq!(path.to_string(), raw);
    }

    #[test]
    fn navigated_paths_reserialize(key in arb_key(), inner in arb_key()) {
        let raw = format!("Things({key})/Datastreams({inner})/Observations");
        let path = parse(&raw).expect("navigated path");

        prop_assert_eq!(path.to_string(), raw);
        prop_assert_eq!(path.len(), 3);
    }
}
