use super::*;
use crate::{
    dispatch::ChangeEvent,
    entity::EntityId,
    error::{Error, ErrorKind, ErrorOrigin},
    model::ModelRegistry,
    test_support::{datastream, init_tracing, observation, thing},
};
use std::{sync::Arc, thread};

fn compile(topic: &str) -> Result<Subscription, SubscriptionError> {
    TopicCompiler::new(&ModelRegistry::core(), "v1.1").compile(topic)
}

fn compiled(topic: &str) -> Subscription {
    compile(topic).expect(topic)
}

///
/// COMPILATION
///

#[test]
fn topics_classify_in_priority_order() {
    for (topic, class) in [
        ("Things?$select=name", PatternClass::Select),
        ("Things$select=name,description", PatternClass::Select),
        ("Things(1)/Datastreams?$select=name", PatternClass::Select),
        ("Things", PatternClass::CollectionBase),
        ("Things(1)/Datastreams", PatternClass::CollectionBase),
        ("Things(1)", PatternClass::EntityDirect),
        ("Things(1)/Datastreams(2)", PatternClass::EntityViaRelation),
        ("Datastreams(1)/Thing", PatternClass::EntityViaRelation),
        ("Things(1)/name", PatternClass::Property),
        ("Datastreams(1)/Thing/name", PatternClass::Property),
    ] {
        assert_eq!(compiled(topic).class(), class, "{topic}");
    }
}

#[test]
fn version_prefix_is_stripped_but_kept_in_the_topic() {
    let subscription = compiled("v1.1/Things(5)/Datastreams");

    assert_eq!(subscription.topic(), "v1.1/Things(5)/Datastreams");
    assert_eq!(subscription.watched().entity_name, "Datastream");

    let source = subscription.source().expect("source constraint");
    assert_eq!(source.collection(), "Things");
    assert_eq!(source.source_id, EntityId::new("5"));
    assert_eq!(source.relation, "Datastreams");
}

#[test]
fn select_topics_carry_select_only_options() {
    let subscription = compiled("v1.1/Observations?$select=result,phenomenonTime");

    assert_eq!(
        subscription.options(),
        &crate::query::QueryOptions::select_fields(["phenomenonTime", "result"])
    );
    assert_eq!(compiled("Observations").options(), &crate::query::QueryOptions::new());
}

#[test]
fn unsupported_topics_are_rejected() {
    for topic in [
        "Things(1)?$select=name",
        "Things?$expand=Datastreams",
        "Things?$select=name&$top=1",
        "Things?$filter=id eq 1",
        "Things(1)/name/$value",
        "Things(1)/Datastreams/$ref",
        "Things(1)/Datastreams(2)/Observations",
        "Things(1)/Datastreams(2)/Sensor/name",
    ] {
        let err = compile(topic).expect_err(topic);
        assert_eq!(err.kind(), ErrorKind::SubscriptionRejected, "{topic}");
        assert!(matches!(err, SubscriptionError::Unsupported { .. }), "{topic}");
    }
}

#[test]
fn rejections_keep_the_underlying_cause() {
    let syntax = compile("Things/5").expect_err("syntax");
    assert_eq!(syntax.cause_kind(), ErrorKind::InvalidPathSyntax);

    let semantics = compile("Things(1)/Sensors").expect_err("semantics");
    assert_eq!(semantics.cause_kind(), ErrorKind::InvalidPathSemantics);

    let unknown = compile("Parties").expect_err("unknown");
    assert_eq!(unknown.cause_kind(), ErrorKind::UnknownEntityType);

    let select = compile("Things?$select=result").expect_err("bad select");
    assert_eq!(select.cause_kind(), ErrorKind::InvalidQueryOption);

    let err: Error = select.into();
    assert_eq!(err.kind, ErrorKind::SubscriptionRejected);
    assert_eq!(err.origin, ErrorOrigin::Subscription);
}

#[test]
fn equality_is_by_topic() {
    assert_eq!(compiled("Things(1)"), compiled("Things(1)"));
    assert_ne!(compiled("Things(1)"), compiled("v1.1/Things(1)"));
}

///
/// MATCHING
///

#[test]
fn related_collection_topic_matches_only_its_source() {
    let subscription = compiled("Things(5)/Datastreams");

    let related = ChangeEvent::created(datastream(40, "Air")).with_related("Things", [5]);
    assert_eq!(
        subscription.matches(&related).as_deref(),
        Some("Things(5)/Datastreams")
    );

    let other = ChangeEvent::created(datastream(41, "Air")).with_related("Things", [6]);
    assert_eq!(subscription.matches(&other), None);

    let unrelated = ChangeEvent::created(datastream(42, "Air"));
    assert_eq!(subscription.matches(&unrelated), None);
}

#[test]
fn watched_type_must_match() {
    let subscription = compiled("Things");

    assert!(subscription.matches(&ChangeEvent::created(thing(1, "A"))).is_some());
    assert!(subscription
        .matches(&ChangeEvent::created(datastream(1, "A")))
        .is_none());
}

#[test]
fn property_topic_fires_only_when_the_property_changes() {
    let subscription = compiled("Things(5)/name");

    let description = ChangeEvent::updated(thing(5, "A"), ["description"]);
    assert_eq!(subscription.matches(&description), None);

    let replaced = ChangeEvent::replaced(thing(5, "A"));
    assert_eq!(subscription.matches(&replaced).as_deref(), Some("Things(5)/name"));

    let renamed = ChangeEvent::updated(thing(5, "A"), ["name", "description"]);
    assert!(subscription.matches(&renamed).is_some());

    let other_thing = ChangeEvent::updated(thing(6, "A"), ["name"]);
    assert_eq!(subscription.matches(&other_thing), None);
}

#[test]
fn entity_topics_require_the_id() {
    let subscription = compiled("Things(1)/Datastreams(2)");

    let event = ChangeEvent::updated(datastream(2, "A"), ["name"]).with_related("Things", [1]);
    assert!(subscription.matches(&event).is_some());

    let wrong_id = ChangeEvent::updated(datastream(3, "A"), ["name"]).with_related("Things", [1]);
    assert!(subscription.matches(&wrong_id).is_none());

    let wrong_source =
        ChangeEvent::updated(datastream(2, "A"), ["name"]).with_related("Things", [9]);
    assert!(subscription.matches(&wrong_source).is_none());
}

#[test]
fn to_one_topic_matches_through_the_related_collection() {
    let subscription = compiled("Datastreams(10)/Thing");

    let event = ChangeEvent::updated(thing(1, "A"), ["name"]).with_related("Datastreams", [10, 11]);
    assert_eq!(subscription.matches(&event), Some("Datastreams(10)/Thing"));
}

#[test]
fn matches_keep_the_subscriber_spelling() {
    let subscription = compiled("v1.1/Observations('100')");

    let event = ChangeEvent::created(observation(100, 1.0));
    assert_eq!(
        subscription.matches(&event),
        Some("v1.1/Observations('100')")
    );
}

#[test]
fn every_class_publishes_on_the_subscribed_topic() {
    let created_thing = ChangeEvent::created(thing(7, "A"));
    let renamed_thing = ChangeEvent::updated(thing(1, "A"), ["name"]);
    let stream = ChangeEvent::created(datastream(7, "A")).with_related("Things", [5]);
    let linked_stream = ChangeEvent::updated(datastream(2, "A"), ["name"]).with_related("Things", [1]);

    for (topic, event) in [
        ("Things", &created_thing),
        ("v1.1/Things", &created_thing),
        ("Things$select=name", &created_thing),
        ("Things(1)", &renamed_thing),
        ("Things(1)/name", &renamed_thing),
        ("Things(5)/Datastreams", &stream),
        ("Things(1)/Datastreams(2)", &linked_stream),
    ] {
        assert_eq!(compiled(topic).matches(event), Some(topic), "{topic}");
    }
}

///
/// REGISTRY
///

#[test]
fn clients_share_topics() {
    init_tracing();
    let registry = SubscriptionRegistry::new();
    let alice = ClientId::from("alice");
    let bob = ClientId::from("bob");

    assert!(registry.add(alice.clone(), compiled("Things")));
    assert!(!registry.add(alice.clone(), compiled("Things")));
    assert!(registry.add(bob.clone(), compiled("Things")));
    assert!(registry.add(bob.clone(), compiled("Things(1)/Datastreams")));

    assert_eq!(registry.len(), 2);
    assert!(registry.is_watched("Thing"));
    assert!(registry.is_watched("Datastream"));
    assert!(!registry.is_watched("Observation"));

    assert!(registry.remove(&alice, "Things"));
    assert!(!registry.remove(&alice, "Things"));
    assert!(registry.is_watched("Thing"));

    assert_eq!(registry.remove_client(&bob), 2);
    assert!(registry.is_empty());
    assert!(!registry.is_watched("Thing"));
    assert!(registry.topics_of(&bob).is_empty());
}

#[test]
fn snapshots_are_stable_while_the_registry_changes() {
    let registry = SubscriptionRegistry::new();
    let client = ClientId::from("c");
    registry.add(client.clone(), compiled("Things"));

    let before = registry.snapshot();
    registry.add(client.clone(), compiled("Datastreams"));
    registry.remove(&client, "Things");

    assert_eq!(before.len(), 1);
    assert_eq!(before.watching("Thing").len(), 1);
    assert_eq!(registry.snapshot_matching("Thing").len(), 0);
    assert_eq!(registry.snapshot_matching("Datastream").len(), 1);
}

#[test]
fn concurrent_mutation_keeps_snapshots_consistent() {
    init_tracing();
    let registry = Arc::new(SubscriptionRegistry::new());
    let topics = ["Things", "Datastreams", "Things(1)/Datastreams", "Observations"];

    thread::scope(|scope| {
        for worker in 0..4 {
            let registry = Arc::clone(&registry);
            scope.spawn(move || {
                let client = ClientId::new(format!("client-{worker}"));
                for round in 0..50 {
                    let topic = topics[(worker + round) % topics.len()];
                    registry.add(client.clone(), compiled(topic));
                    if round % 3 == 0 {
                        registry.remove(&client, topic);
                    }
                }
                registry.remove_client(&client);
            });
        }

        let reader = Arc::clone(&registry);
        scope.spawn(move || {
            for _ in 0..200 {
                let snapshot = reader.snapshot();
                let mut total = 0;
                for name in ["Thing", "Datastream", "Observation"] {
                    for subscription in snapshot.watching(name) {
                        assert_eq!(subscription.watched().entity_name, name);
                    }
                    total += snapshot.watching(name).len();
                }
                assert_eq!(total, snapshot.len());
            }
        });
    });

    assert!(registry.is_empty());
}
