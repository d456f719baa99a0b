//! Persistence facade.
//!
//! The engine never stores entities. An [`EntityService`] answers id lookups
//! and (optionally scoped) collection reads; [`RequestResolver`] drives it to
//! answer HTTP requests addressed with the shared path grammar.

mod resolve;


pub use resolve::{RequestResolver, Resolved};

use crate::{
    entity::{Entity, EntityId},
    error::{Error, ErrorKind, ErrorOrigin},
    model::EntityType,
    query::QueryOptions,
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error as ThisError;

///
/// ServiceError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ServiceError {
    #[error("{entity}({id}) not found")]
    NotFound { entity: &'static str, id: EntityId },

    #[error("{entity}({id}) has no value for '{property}'")]
    PropertyNotSet {
        entity: &'static str,
        id: EntityId,
        property: String,
    },

    #[error("entity service failure: {message}")]
    Backend { message: String },
}

impl ServiceError {
    #[must_use]
    pub const fn not_found(entity_type: EntityType, id: EntityId) -> Self {
        Self::NotFound {
            entity: entity_type.entity_name,
            id,
        }
    }

    pub fn property_not_set(entity: &Entity, property: impl Into<String>) -> Self {
        Self::PropertyNotSet {
            entity: entity.entity_type().entity_name,
            id: entity.id().clone(),
            property: property.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::PropertyNotSet { .. } => ErrorKind::NotFound,
            Self::Backend { .. } => ErrorKind::Service,
        }
    }
}

impl From<ServiceError> for Error {
    fn from(err: ServiceError) -> Self {
        Self::new(err.kind(), ErrorOrigin::Service, err.to_string())
    }
}

///
/// Scope
/// Restricts a collection read to the entities related to one source entity.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Scope {
    pub source_type: EntityType,
    pub source_id: EntityId,
    /// Navigation property followed from the source.
    pub relation: String,
}

impl Scope {
    pub fn new(source: &Entity, relation: impl Into<String>) -> Self {
        Self {
            source_type: source.entity_type(),
            source_id: source.id().clone(),
            relation: relation.into(),
        }
    }
}

///
/// Page
///

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total size before paging; present when `$count=true` was requested.
    pub count: Option<u64>,
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(items: Vec<T>) -> Self {
        Self {
            items,
            count: None,
            next_link: None,
        }
    }

    #[must_use]
    pub const fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_next_link(mut self, next_link: impl Into<String>) -> Self {
        self.next_link = Some(next_link.into());
        self
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            next_link: self.next_link,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1 + usize::from(self.count.is_some()) + usize::from(self.next_link.is_some());
        let mut map = serializer.serialize_map(Some(len))?;

        if let Some(count) = self.count {
            map.serialize_entry("@iot.count", &count)?;
        }
        map.serialize_entry("value", &self.items)?;
        if let Some(next_link) = &self.next_link {
            map.serialize_entry("@iot.nextLink", next_link)?;
        }

        map.end()
    }
}

///
/// EntityService
///
/// Storage collaborator. `get_collection` honors `$filter`, `$orderby`,
/// `$top`, `$skip` and `$count` from `options`; related entities are loaded
/// by the resolver, not by the service.
///

pub trait EntityService {
    fn get_by_id(&self, entity_type: EntityType, id: &EntityId) -> Result<Entity, ServiceError>;

    fn get_collection(
        &self,
        entity_type: EntityType,
        scope: Option<&Scope>,
        options: &QueryOptions,
    ) -> Result<Page<Entity>, ServiceError>;

    /// Whether `id` is among the entities `scope` reaches.
    ///
    /// The default scans the scoped collection; stores with an index should
    /// answer directly.
    fn is_related(
        &self,
        entity_type: EntityType,
        scope: &Scope,
        id: &EntityId,
    ) -> Result<bool, ServiceError> {
        let page = self.get_collection(entity_type, Some(scope), &QueryOptions::new())?;

        Ok(page.items.iter().any(|entity| entity.id() == id))
    }
}

impl<T: EntityService + ?Sized> EntityService for &T {
    fn get_by_id(&self, entity_type: EntityType, id: &EntityId) -> Result<Entity, ServiceError> {
        (**self).get_by_id(entity_type, id)
    }

    fn get_collection(
        &self,
        entity_type: EntityType,
        scope: Option<&Scope>,
        options: &QueryOptions,
    ) -> Result<Page<Entity>, ServiceError> {
        (**self).get_collection(entity_type, scope, options)
    }

    fn is_related(
        &self,
        entity_type: EntityType,
        scope: &Scope,
        id: &EntityId,
    ) -> Result<bool, ServiceError> {
        (**self).is_related(entity_type, scope, id)
    }
}
