//! In-memory entity graph.
//!
//! An [`Entity`] is what the persistence layer hands to the engine: an id, its
//! scalar properties as JSON values, and whichever related entities were
//! loaded. Relations that are not loaded render as navigation links.

#[cfg(test)]
mod tests;

use crate::model::EntityType;
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

///
/// EntityId
///
/// Unquoted id value. Path keys use `'text'` for string ids (with `''` as an
/// escaped quote); numeric ids are written bare.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Decode a path key token (the text between the parentheses).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        if key.is_empty() {
            return None;
        }

        match key.strip_prefix('\'') {
            Some(rest) => {
                let inner = rest.strip_suffix('\'')?;
                if inner.replace("''", "").contains('\'') {
                    return None;
                }

                Some(Self(inner.replace("''", "'")))
            }
            None => Some(Self(key.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.0.parse::<i64>().is_ok()
    }

    /// Encode as a path key token.
    #[must_use]
    pub fn to_key(&self) -> String {
        if self.is_numeric() {
            self.0.clone()
        } else {
            format!("'{}'", self.0.replace('\'', "''"))
        }
    }

    /// JSON form used for `@iot.id`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        self.0
            .parse::<i64>()
            .map_or_else(|_| Value::String(self.0.clone()), Value::from)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i32> for EntityId {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

///
/// Related
/// Loaded navigation target(s). `One(None)` is a loaded, empty to-one link.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Related {
    One(Option<Box<Entity>>),
    Many(Vec<Entity>),
}

impl Related {
    #[must_use]
    pub fn one(entity: Entity) -> Self {
        Self::One(Some(Box::new(entity)))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        let (one, many) = match self {
            Self::One(entity) => (entity.as_deref(), [].as_slice()),
            Self::Many(entities) => (None, entities.as_slice()),
        };

        one.into_iter().chain(many)
    }
}

///
/// Entity
///

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    entity_type: EntityType,
    id: EntityId,
    fields: BTreeMap<String, Value>,
    related: BTreeMap<String, Related>,
}

impl Entity {
    pub fn new(entity_type: EntityType, id: impl Into<EntityId>) -> Self {
        Self {
            entity_type,
            id: id.into(),
            fields: BTreeMap::new(),
            related: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_related(mut self, relation: impl Into<String>, related: Related) -> Self {
        self.related.insert(relation.into(), related);
        self
    }

    pub fn set_related(&mut self, relation: impl Into<String>, related: Related) {
        self.related.insert(relation.into(), related);
    }

    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    #[must_use]
    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn related(&self, relation: &str) -> Option<&Related> {
        self.related.get(relation)
    }

    /// Canonical path of this entity relative to the service root.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}({})", self.entity_type.collection, self.id.to_key())
    }
}
