//! Entity capability records.
//!
//! Each entity kind is described by one static [`EntityModel`]: its collection
//! keyword, its properties, and the navigation properties reachable from it.
//! The path grammar, the query validator, the projector and the subscription
//! matcher all consult these records instead of switching on type names, so
//! adding an entity kind means adding one record to a profile.
//!
//! Records are grouped into profiles (`core` and the STAplus `plus`
//! extension). A [`ModelRegistry`] holds the records of the enabled profiles
//! and hides relations whose target kind is not registered.

mod entity;
pub mod profile;
mod registry;


pub use entity::{Cardinality, EntityModel, EntityType, Profile, RelationModel};
pub use registry::{ModelError, ModelRegistry, Navigation};
