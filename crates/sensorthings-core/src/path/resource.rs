use crate::{entity::EntityId, model::EntityType, query::QueryOptions};
use derive_more::Display;
use std::fmt;

///
/// PathType
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum PathType {
    Collection,
    Entity,
    Reference,
    Property,
    Value,
}

///
/// PathSegment
///
/// One addressable hop. `id` present means one specific entity; absent means
/// the collection (or, after a to-one relation, the single related entity).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathSegment {
    entity_set: String,
    entity_type: EntityType,
    id: Option<EntityId>,
    property: Option<String>,
}

impl PathSegment {
    pub(crate) fn new(
        entity_set: impl Into<String>,
        entity_type: EntityType,
        id: Option<EntityId>,
    ) -> Self {
        Self {
            entity_set: entity_set.into(),
            entity_type,
            id,
            property: None,
        }
    }

    #[must_use]
    pub(crate) fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Keyword as written: a collection keyword or a navigation property name.
    #[must_use]
    pub fn entity_set(&self) -> &str {
        &self.entity_set
    }

    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    #[must_use]
    pub const fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    #[must_use]
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entity_set)?;
        if let Some(id) = &self.id {
            write!(f, "({})", id.to_key())?;
        }
        if let Some(property) = &self.property {
            write!(f, "/{property}")?;
        }

        Ok(())
    }
}

///
/// ResourcePath
///
/// Root-to-leaf chain of segments. Every non-leaf segment carries an id.
/// A collection leaf may carry a `$select=` suffix, kept as select-only
/// options.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourcePath {
    segments: Vec<PathSegment>,
    path_type: PathType,
    collection: bool,
    select: Option<QueryOptions>,
}

impl ResourcePath {
    pub(crate) fn new(segments: Vec<PathSegment>, path_type: PathType, collection: bool) -> Self {
        debug_assert!(!segments.is_empty(), "resource path needs a root segment");
        debug_assert!(
            segments[..segments.len() - 1]
                .iter()
                .all(|segment| segment.id.is_some() && segment.property.is_none()),
            "only the leaf segment may be unidentified"
        );

        Self {
            segments,
            path_type,
            collection,
            select: None,
        }
    }

    pub(crate) fn with_select(mut self, select: QueryOptions) -> Self {
        debug_assert!(self.path_type == PathType::Collection);
        self.select = Some(select);
        self
    }

    #[must_use]
    pub const fn path_type(&self) -> PathType {
        self.path_type
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn leaf(&self) -> &PathSegment {
        &self.segments[self.segments.len() - 1]
    }

    /// Segment the leaf was navigated from, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&PathSegment> {
        self.segments.len().checked_sub(2).map(|i| &self.segments[i])
    }

    /// Entity kind addressed by the leaf segment.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.leaf().entity_type
    }

    #[must_use]
    pub fn property(&self) -> Option<&str> {
        self.leaf().property()
    }

    /// True when the leaf addresses a whole collection rather than one entity.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        self.collection
    }

    /// Options from a `$select=` path suffix.
    #[must_use]
    pub const fn select(&self) -> Option<&QueryOptions> {
        self.select.as_ref()
    }

    /// Detach the `$select=` suffix, leaving the bare path.
    pub const fn take_select(&mut self) -> Option<QueryOptions> {
        self.select.take()
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }

        match (&self.select, self.path_type) {
            (Some(select), _) => write!(f, "{select}"),
            (None, PathType::Value) => f.write_str("/$value"),
            (None, PathType::Reference) => f.write_str("/$ref"),
            (None, _) => Ok(()),
        }
    }
}
