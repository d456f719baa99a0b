use crate::entity::{Entity, EntityId};
use derive_more::Display;
use std::collections::{BTreeMap, BTreeSet};

///
/// ChangeKind
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

///
/// ChangeEvent
///
/// One committed mutation, raised by the persistence layer exactly once.
/// `changed_fields == None` means the entity is to be treated as fully new
/// (create or full replace). `related_collections` is keyed by the collection
/// keyword of the related kind (`Things`) and lists the affected ids.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    kind: ChangeKind,
    entity: Entity,
    changed_fields: Option<BTreeSet<String>>,
    related_collections: BTreeMap<String, BTreeSet<EntityId>>,
}

impl ChangeEvent {
    fn new(kind: ChangeKind, entity: Entity, changed_fields: Option<BTreeSet<String>>) -> Self {
        Self {
            kind,
            entity,
            changed_fields,
            related_collections: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn created(entity: Entity) -> Self {
        Self::new(ChangeKind::Created, entity, None)
    }

    /// Partial update touching only `changed_fields`.
    pub fn updated<I, S>(entity: Entity, changed_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let changed = changed_fields.into_iter().map(Into::into).collect();

        Self::new(ChangeKind::Updated, entity, Some(changed))
    }

    /// Full replace; every property counts as changed.
    #[must_use]
    pub fn replaced(entity: Entity) -> Self {
        Self::new(ChangeKind::Updated, entity, None)
    }

    #[must_use]
    pub fn deleted(entity: Entity) -> Self {
        Self::new(ChangeKind::Deleted, entity, None)
    }

    #[must_use]
    pub fn with_related<I, T>(mut self, collection: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        self.related_collections
            .entry(collection.into())
            .or_default()
            .extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        self.kind
    }

    #[must_use]
    pub const fn entity(&self) -> &Entity {
        &self.entity
    }

    #[must_use]
    pub const fn entity_type_name(&self) -> &'static str {
        self.entity.entity_type().entity_name
    }

    #[must_use]
    pub const fn changed_fields(&self) -> Option<&BTreeSet<String>> {
        self.changed_fields.as_ref()
    }

    #[must_use]
    pub const fn related_collections(&self) -> &BTreeMap<String, BTreeSet<EntityId>> {
        &self.related_collections
    }

    /// True when the mutation may have changed `field`.
    #[must_use]
    pub fn touches(&self, field: &str) -> bool {
        self.changed_fields
            .as_ref()
            .is_none_or(|fields| fields.contains(field))
    }

    #[must_use]
    pub fn is_related_to(&self, collection: &str, id: &EntityId) -> bool {
        self.related_collections
            .get(collection)
            .is_some_and(|ids| ids.contains(id))
    }
}
