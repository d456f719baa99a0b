//! Capability records for the SensorThings core profile and the STAplus
//! extension.
//!
//! Core records list their STAplus navigation properties too; the registry
//! drops them unless the `plus` profile is enabled.

use crate::model::{EntityModel, Profile, RelationModel};

///
/// CORE
///

pub static THING: EntityModel = EntityModel {
    entity_name: "Thing",
    collection: "Things",
    fields: &["name", "description", "properties"],
    relations: &[
        RelationModel::many("Locations", "Location"),
        RelationModel::many("HistoricalLocations", "HistoricalLocation"),
        RelationModel::many("Datastreams", "Datastream"),
        RelationModel::one("Party", "Party"),
    ],
    profile: Profile::Core,
};

pub static LOCATION: EntityModel = EntityModel {
    entity_name: "Location",
    collection: "Locations",
    fields: &[
        "name",
        "description",
        "encodingType",
        "location",
        "properties",
    ],
    relations: &[
        RelationModel::many("Things", "Thing"),
        RelationModel::many("HistoricalLocations", "HistoricalLocation"),
    ],
    profile: Profile::Core,
};

pub static HISTORICAL_LOCATION: EntityModel = EntityModel {
    entity_name: "HistoricalLocation",
    collection: "HistoricalLocations",
    fields: &["time"],
    relations: &[
        RelationModel::one("Thing", "Thing"),
        RelationModel::many("Locations", "Location"),
    ],
    profile: Profile::Core,
};

pub static DATASTREAM: EntityModel = EntityModel {
    entity_name: "Datastream",
    collection: "Datastreams",
    fields: &[
        "name",
        "description",
        "observationType",
        "unitOfMeasurement",
        "observedArea",
        "phenomenonTime",
        "resultTime",
        "properties",
    ],
    relations: &[
        RelationModel::one("Thing", "Thing"),
        RelationModel::one("Sensor", "Sensor"),
        RelationModel::one("ObservedProperty", "ObservedProperty"),
        RelationModel::many("Observations", "Observation"),
        RelationModel::one("Party", "Party"),
        RelationModel::one("Project", "Project"),
        RelationModel::one("License", "License"),
    ],
    profile: Profile::Core,
};

pub static SENSOR: EntityModel = EntityModel {
    entity_name: "Sensor",
    collection: "Sensors",
    fields: &[
        "name",
        "description",
        "encodingType",
        "metadata",
        "properties",
    ],
    relations: &[RelationModel::many("Datastreams", "Datastream")],
    profile: Profile::Core,
};

pub static OBSERVED_PROPERTY: EntityModel = EntityModel {
    entity_name: "ObservedProperty",
    collection: "ObservedProperties",
    fields: &["name", "definition", "description", "properties"],
    relations: &[RelationModel::many("Datastreams", "Datastream")],
    profile: Profile::Core,
};

pub static OBSERVATION: EntityModel = EntityModel {
    entity_name: "Observation",
    collection: "Observations",
    fields: &[
        "phenomenonTime",
        "resultTime",
        "result",
        "resultQuality",
        "validTime",
        "parameters",
    ],
    relations: &[
        RelationModel::one("Datastream", "Datastream"),
        RelationModel::one("FeatureOfInterest", "FeatureOfInterest"),
        RelationModel::many("Groups", "Group"),
        RelationModel::many("Subjects", "Relation"),
        RelationModel::many("Objects", "Relation"),
    ],
    profile: Profile::Core,
};

pub static FEATURE_OF_INTEREST: EntityModel = EntityModel {
    entity_name: "FeatureOfInterest",
    collection: "FeaturesOfInterest",
    fields: &[
        "name",
        "description",
        "encodingType",
        "feature",
        "properties",
    ],
    relations: &[RelationModel::many("Observations", "Observation")],
    profile: Profile::Core,
};

pub static CORE_MODELS: [&EntityModel; 8] = [
    &THING,
    &LOCATION,
    &HISTORICAL_LOCATION,
    &DATASTREAM,
    &SENSOR,
    &OBSERVED_PROPERTY,
    &OBSERVATION,
    &FEATURE_OF_INTEREST,
];

///
/// PLUS
///

pub static PARTY: EntityModel = EntityModel {
    entity_name: "Party",
    collection: "Parties",
    fields: &["displayName", "description", "role", "authId"],
    relations: &[
        RelationModel::many("Things", "Thing"),
        RelationModel::many("Datastreams", "Datastream"),
        RelationModel::many("Groups", "Group"),
    ],
    profile: Profile::Plus,
};

pub static PROJECT: EntityModel = EntityModel {
    entity_name: "Project",
    collection: "Projects",
    fields: &[
        "name",
        "description",
        "classification",
        "termsOfUse",
        "privacyPolicy",
        "creationTime",
        "runTime",
        "url",
        "properties",
    ],
    relations: &[RelationModel::many("Datastreams", "Datastream")],
    profile: Profile::Plus,
};

pub static LICENSE: EntityModel = EntityModel {
    entity_name: "License",
    collection: "Licenses",
    fields: &[
        "name",
        "definition",
        "description",
        "logo",
        "attributionText",
        "properties",
    ],
    relations: &[
        RelationModel::many("Datastreams", "Datastream"),
        RelationModel::many("Groups", "Group"),
    ],
    profile: Profile::Plus,
};

pub static GROUP: EntityModel = EntityModel {
    entity_name: "Group",
    collection: "Groups",
    fields: &[
        "name",
        "description",
        "purpose",
        "creationTime",
        "endTime",
        "termsOfUse",
        "privacyPolicy",
        "properties",
    ],
    relations: &[
        RelationModel::many("Observations", "Observation"),
        RelationModel::many("Relations", "Relation"),
        RelationModel::one("Party", "Party"),
        RelationModel::one("License", "License"),
    ],
    profile: Profile::Plus,
};

pub static RELATION: EntityModel = EntityModel {
    entity_name: "Relation",
    collection: "Relations",
    fields: &["role", "description", "externalObject", "properties"],
    relations: &[
        RelationModel::one("Subject", "Observation"),
        RelationModel::one("Object", "Observation"),
        RelationModel::many("Groups", "Group"),
    ],
    profile: Profile::Plus,
};

pub static PLUS_MODELS: [&EntityModel; 5] = [&PARTY, &PROJECT, &LICENSE, &GROUP, &RELATION];

/// Records belonging to one profile.
#[must_use]
pub fn models(profile: Profile) -> &'static [&'static EntityModel] {
    match profile {
        Profile::Core => &CORE_MODELS,
        Profile::Plus => &PLUS_MODELS,
    }
}
