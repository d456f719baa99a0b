use crate::{
    entity::{Entity, EntityId},
    model::{
        EntityType,
        profile::{DATASTREAM, FEATURE_OF_INTEREST, LOCATION, OBSERVATION, SENSOR, THING},
    },
    query::QueryOptions,
    service::{EntityService, Page, Scope, ServiceError},
};
use serde_json::json;
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

pub(crate) const ROOT: &str = "http://localhost:8080/sensorthings/v1.1";

/// Install a test-writer subscriber once; later calls are no-ops.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

///
/// FIXTURES
///

pub(crate) fn thing(id: i64, name: &str) -> Entity {
    Entity::new(&THING, id)
        .with_field("name", name)
        .with_field("description", format!("{name} on the roof"))
        .with_field("properties", json!({ "owner": "ops" }))
}

pub(crate) fn location(id: i64) -> Entity {
    Entity::new(&LOCATION, id)
        .with_field("name", "Roof")
        .with_field("encodingType", "application/geo+json")
        .with_field("location", json!({ "type": "Point", "coordinates": [8.4, 49.0] }))
}

pub(crate) fn datastream(id: i64, name: &str) -> Entity {
    Entity::new(&DATASTREAM, id)
        .with_field("name", name)
        .with_field("unitOfMeasurement", json!({ "symbol": "degC" }))
}

pub(crate) fn sensor(id: i64) -> Entity {
    Entity::new(&SENSOR, id)
        .with_field("name", "PT100")
        .with_field("encodingType", "application/pdf")
}

pub(crate) fn observation(id: i64, result: f64) -> Entity {
    Entity::new(&OBSERVATION, id)
        .with_field("result", result)
        .with_field("phenomenonTime", "2026-01-01T00:00:00Z")
        .with_field("resultTime", "2026-01-01T00:00:05Z")
}

pub(crate) fn feature(id: i64) -> Entity {
    Entity::new(&FEATURE_OF_INTEREST, id).with_field("name", "Roof air")
}

///
/// MemoryService
///
/// In-memory `EntityService`. Links are stored in both directions under the
/// navigation property name used from each side.
///

type Key = (&'static str, EntityId);

#[derive(Debug, Default)]
pub(crate) struct MemoryService {
    entities: BTreeMap<Key, Entity>,
    links: BTreeMap<(Key, String), Vec<Key>>,
}

impl MemoryService {
    pub(crate) fn insert(&mut self, entity: Entity) {
        let key = (entity.entity_type().entity_name, entity.id().clone());
        self.entities.insert(key, entity);
    }

    pub(crate) fn link(&mut self, from: &Entity, relation: &str, to: &Entity, back: &str) {
        self.links
            .entry((key_of(from), relation.to_string()))
            .or_default()
            .push(key_of(to));
        self.links
            .entry((key_of(to), back.to_string()))
            .or_default()
            .push(key_of(from));
    }

    /// Two Things, three Datastreams, five Observations and their satellites.
    pub(crate) fn sample() -> Self {
        let mut service = Self::default();

        let thing_1 = thing(1, "Station A");
        let thing_2 = thing(2, "Station B");
        let location_3 = location(3);
        let sensor_5 = sensor(5);
        let feature_7 = feature(7);
        let streams = [
            datastream(10, "Air temperature"),
            datastream(11, "Humidity"),
            datastream(12, "Air temperature"),
        ];
        let observations = (100..)
            .zip([20.5, 21.0, 21.5, 19.0, 18.5])
            .map(|(id, result)| observation(id, result))
            .collect::<Vec<_>>();

        service.link(&thing_1, "Locations", &location_3, "Things");
        service.link(&streams[0], "Thing", &thing_1, "Datastreams");
        service.link(&streams[1], "Thing", &thing_1, "Datastreams");
        service.link(&streams[2], "Thing", &thing_2, "Datastreams");
        for stream in &streams {
            service.link(stream, "Sensor", &sensor_5, "Datastreams");
        }
        for (i, observation) in observations.iter().enumerate() {
            let stream = if i < 3 { &streams[0] } else { &streams[2] };
            service.link(observation, "Datastream", stream, "Observations");
            service.link(observation, "FeatureOfInterest", &feature_7, "Observations");
        }

        for entity in [thing_1, thing_2, location_3, sensor_5, feature_7]
            .into_iter()
            .chain(streams)
            .chain(observations)
        {
            service.insert(entity);
        }

        service
    }
}

fn key_of(entity: &Entity) -> Key {
    (entity.entity_type().entity_name, entity.id().clone())
}

impl EntityService for MemoryService {
    fn get_by_id(&self, entity_type: EntityType, id: &EntityId) -> Result<Entity, ServiceError> {
        self.entities
            .get(&(entity_type.entity_name, id.clone()))
            .cloned()
            .ok_or_else(|| ServiceError::not_found(entity_type, id.clone()))
    }

    fn get_collection(
        &self,
        entity_type: EntityType,
        scope: Option<&Scope>,
        options: &QueryOptions,
    ) -> Result<Page<Entity>, ServiceError> {
        let matching: Vec<Entity> = match scope {
            Some(scope) => {
                let source = (scope.source_type.entity_name, scope.source_id.clone());
                self.links
                    .get(&(source, scope.relation.clone()))
                    .into_iter()
                    .flatten()
                    .filter_map(|key| self.entities.get(key))
                    .filter(|entity| entity.entity_type().entity_name == entity_type.entity_name)
                    .cloned()
                    .collect()
            }
            None => self
                .entities
                .values()
                .filter(|entity| entity.entity_type().entity_name == entity_type.entity_name)
                .cloned()
                .collect(),
        };

        let total = matching.len() as u64;
        let skip = usize::try_from(options.skip().unwrap_or(0)).unwrap_or(usize::MAX);
        let top = usize::try_from(options.top().unwrap_or(u64::MAX)).unwrap_or(usize::MAX);
        let items = matching.into_iter().skip(skip).take(top).collect();

        let page = Page::new(items);
        Ok(match options.count() {
            Some(true) => page.with_count(total),
            _ => page,
        })
    }

    fn is_related(
        &self,
        entity_type: EntityType,
        scope: &Scope,
        id: &EntityId,
    ) -> Result<bool, ServiceError> {
        let source = (scope.source_type.entity_name, scope.source_id.clone());
        let target = (entity_type.entity_name, id.clone());

        Ok(self
            .links
            .get(&(source, scope.relation.clone()))
            .is_some_and(|keys| keys.contains(&target)))
    }
}
