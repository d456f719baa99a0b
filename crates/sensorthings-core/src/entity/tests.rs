use super::*;
use crate::model::profile::{DATASTREAM, THING};
use serde_json::json;

#[test]
fn quoted_keys_are_unescaped() {
    assert_eq!(EntityId::from_key("'it''s'"), Some(EntityId::new("it's")));
    assert_eq!(EntityId::from_key("42"), Some(EntityId::new("42")));
    assert_eq!(EntityId::from_key("'open"), None);
    assert_eq!(EntityId::from_key("'a'b'"), None);
    assert_eq!(EntityId::from_key(""), None);
}

#[test]
fn keys_render_numeric_bare_and_text_quoted() {
    assert_eq!(EntityId::from(7).to_key(), "7");
    assert_eq!(EntityId::new("it's").to_key(), "'it''s'");
    assert_eq!(EntityId::new("abc").to_string(), "'abc'");
}

#[test]
fn json_id_keeps_numbers_numeric() {
    assert_eq!(EntityId::from(5).to_json(), json!(5));
    assert_eq!(EntityId::new("x-1").to_json(), json!("x-1"));
}

#[test]
fn related_entities_iterates_both_shapes() {
    let thing = Entity::new(&THING, 1);
    let one = Related::one(thing.clone());
    let none = Related::One(None);
    let many = Related::Many(vec![
        Entity::new(&DATASTREAM, 1),
        Entity::new(&DATASTREAM, 2),
    ]);

    assert_eq!(one.entities().count(), 1);
    assert_eq!(none.entities().count(), 0);
    assert_eq!(many.entities().count(), 2);
}

#[test]
fn entity_path_uses_collection_keyword() {
    let entity = Entity::new(&DATASTREAM, "ds-1").with_field("name", "temp");

    assert_eq!(entity.path(), "Datastreams('ds-1')");
    assert_eq!(entity.field("name"), Some(&json!("temp")));
}
