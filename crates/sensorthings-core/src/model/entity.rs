use derive_more::Display;
use std::fmt;

///
/// EntityType
/// Resolved entity kind; always points at a registered static record.
///

pub type EntityType = &'static EntityModel;

///
/// Profile
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Profile {
    Core,
    Plus,
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Cardinality {
    One,
    Many,
}

///
/// RelationModel
/// One navigation property of an entity kind.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RelationModel {
    /// Navigation property name as it appears in paths and `$expand`.
    pub name: &'static str,
    /// Entity name of the target kind.
    pub target: &'static str,
    pub cardinality: Cardinality,
}

impl RelationModel {
    #[must_use]
    pub const fn one(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            target,
            cardinality: Cardinality::One,
        }
    }

    #[must_use]
    pub const fn many(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            target,
            cardinality: Cardinality::Many,
        }
    }

    #[must_use]
    pub const fn is_many(&self) -> bool {
        matches!(self.cardinality, Cardinality::Many)
    }
}

///
/// EntityModel
/// Static capability record for one entity kind.
///

#[derive(Eq, PartialEq)]
pub struct EntityModel {
    /// Singular name, e.g. `Thing`.
    pub entity_name: &'static str,
    /// Collection keyword, e.g. `Things`. The only legal root token.
    pub collection: &'static str,
    /// Scalar properties, excluding `id`.
    pub fields: &'static [&'static str],
    /// Navigation properties; targets outside the enabled profiles are ignored.
    pub relations: &'static [RelationModel],
    pub profile: Profile,
}

impl EntityModel {
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        name == "id" || self.fields.contains(&name)
    }

    /// Raw relation lookup; prefer `ModelRegistry::navigation` which applies
    /// profile filtering.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&'static RelationModel> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    /// First navigation property pointing at the kind named `target`.
    #[must_use]
    pub fn relation_to(&self, target: &str) -> Option<&'static RelationModel> {
        self.relations
            .iter()
            .find(|relation| relation.target == target)
    }

    /// True when `name` is a property or a navigation property.
    #[must_use]
    pub fn is_addressable(&self, name: &str) -> bool {
        self.has_field(name) || self.relation(name).is_some()
    }
}

impl fmt::Debug for EntityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityModel({})", self.entity_name)
    }
}

impl fmt::Display for EntityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_name)
    }
}
