use crate::{
    entity::{Entity, EntityId, Related},
    error::{Error, ErrorKind, ErrorOrigin},
    model::ModelRegistry,
    obs::events,
    path::{PathGrammar, PathSegment, PathType, ResourcePath},
    query::{ProjectedView, Projector, QueryOptionError, QueryOptions, QueryOptionsParser},
    service::{EntityService, Page, Scope, ServiceError},
};
use sensorthings_config::QueryConfig;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::debug;

const COMPONENT: &str = "request_resolver";

///
/// Resolved
/// Outcome of one HTTP read, ready for a response writer.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Collection(Page<ProjectedView>),
    Entity(ProjectedView),
    Property { name: String, value: Value },
    /// Raw property value for `/$value`.
    Value(Value),
    Reference(String),
    References(Page<String>),
}

impl Resolved {
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

///
/// SelfLink
///

struct SelfLink<'a>(&'a str);

impl Serialize for SelfLink<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("@iot.selfLink", self.0)?;
        map.end()
    }
}

impl Serialize for Resolved {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Collection(page) => page.serialize(serializer),
            Self::Entity(view) => view.serialize(serializer),
            Self::Property { name, value } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, value)?;
                map.end()
            }
            Self::Value(value) => value.serialize(serializer),
            Self::Reference(link) => SelfLink(link).serialize(serializer),
            Self::References(page) => Page {
                items: page.items.iter().map(|link| SelfLink(link)).collect(),
                count: page.count,
                next_link: page.next_link.clone(),
            }
            .serialize(serializer),
        }
    }
}

///
/// RequestResolver
///
/// Answers HTTP reads: parses the path and query, validates the options
/// against the addressed kind, walks the path through the service, loads
/// expansions and projects the result.
///

pub struct RequestResolver<'a, S> {
    registry: &'a ModelRegistry,
    parser: QueryOptionsParser,
    projector: &'a Projector,
    paging: &'a QueryConfig,
    service: S,
}

impl<'a, S: EntityService> RequestResolver<'a, S> {
    pub const fn new(
        registry: &'a ModelRegistry,
        parser: QueryOptionsParser,
        projector: &'a Projector,
        paging: &'a QueryConfig,
        service: S,
    ) -> Self {
        Self {
            registry,
            parser,
            projector,
            paging,
            service,
        }
    }

    /// Resolve a percent-decoded path and optional query string.
    pub fn resolve(&self, raw_path: &str, raw_query: Option<&str>) -> Result<Resolved, Error> {
        let mut path = PathGrammar::new(self.registry).parse(raw_path)?;
        let mut options = self.parser.parse(raw_query.unwrap_or_default())?;

        // `Things$select=a` reads as `Things?$select=a`.
        if let Some(select) = path.take_select() {
            if !options.select().is_empty() {
                return Err(QueryOptionError::Duplicate {
                    option: "$select".to_string(),
                }
                .into());
            }
            options = options.with_select(select.select().iter().cloned());
        }

        if matches!(
            path.path_type(),
            PathType::Collection | PathType::Entity | PathType::Reference
        ) {
            options.validate(path.entity_type(), self.registry)?;
        }

        let resolved = match path.path_type() {
            PathType::Collection => Resolved::Collection(self.collection(&path, &options)?),
            PathType::Entity => {
                let mut entity = self.entity(&path)?;
                self.expand(&mut entity, &options)?;
                Resolved::Entity(self.projector.project(&entity, &options))
            }
            PathType::Property | PathType::Value => {
                let entity = self.entity(&path)?;
                let name = path.property().unwrap_or_default().to_string();
                let value = property_value(&entity, &name)?;

                if path.path_type() == PathType::Value {
                    if value.is_null() {
                        return Err(ServiceError::property_not_set(&entity, name).into());
                    }
                    Resolved::Value(value)
                } else {
                    Resolved::Property { name, value }
                }
            }
            PathType::Reference if path.is_collection() => {
                let page = self.page(&path, &options)?;
                Resolved::References(page.map(|entity| self.projector.self_link(&entity)))
            }
            PathType::Reference => Resolved::Reference(self.projector.self_link(&self.entity(&path)?)),
        };

        debug!(
            event = events::REQUEST_RESOLVED,
            component = COMPONENT,
            path = %path,
            path_type = %path.path_type(),
            "request resolved"
        );

        Ok(resolved)
    }

    fn collection(
        &self,
        path: &ResourcePath,
        options: &QueryOptions,
    ) -> Result<Page<ProjectedView>, Error> {
        let mut page = self.page(path, options)?;
        for entity in &mut page.items {
            self.expand(entity, options)?;
        }

        Ok(page.map(|entity| self.projector.project(&entity, options)))
    }

    // One page of the leaf collection, with `$top` defaulted and clamped.
    fn page(&self, path: &ResourcePath, options: &QueryOptions) -> Result<Page<Entity>, Error> {
        let parents = &path.segments()[..path.len() - 1];
        let scope = self
            .walk(parents)?
            .map(|parent| Scope::new(&parent, path.leaf().entity_set()));

        let top = options
            .top()
            .unwrap_or(self.paging.default_top)
            .min(self.paging.max_top);
        let skip = options.skip().unwrap_or(0);
        let request = options.clone().with_top(top);

        let page = self
            .service
            .get_collection(path.entity_type(), scope.as_ref(), &request)?;

        let fetched = skip + page.len() as u64;
        let more = page
            .count
            .map_or(page.len() as u64 == top && top > 0, |count| fetched < count);
        if !more {
            return Ok(page);
        }

        let next = request.with_skip(skip + top);
        let link = format!("{}/{path}?{next}", self.projector.root_url());

        Ok(page.with_next_link(link))
    }

    fn entity(&self, path: &ResourcePath) -> Result<Entity, Error> {
        self.walk(path.segments())?.ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidPathSemantics,
                ErrorOrigin::Path,
                format!("'{path}' does not address a single entity"),
            )
        })
    }

    // Load every segment in order; each hop is read through its parent.
    fn walk(&self, segments: &[PathSegment]) -> Result<Option<Entity>, Error> {
        let mut current: Option<Entity> = None;

        for segment in segments {
            let entity = match (current.take(), segment.id()) {
                (None, Some(id)) => self.service.get_by_id(segment.entity_type(), id)?,
                (None, None) => {
                    return Err(Error::new(
                        ErrorKind::InvalidPathSemantics,
                        ErrorOrigin::Path,
                        format!("'{}' needs an id to be navigated", segment.entity_set()),
                    ));
                }
                (Some(parent), id) => self.related(&parent, segment, id)?,
            };
            current = Some(entity);
        }

        Ok(current)
    }

    fn related(
        &self,
        parent: &Entity,
        segment: &PathSegment,
        id: Option<&EntityId>,
    ) -> Result<Entity, Error> {
        let entity_type = segment.entity_type();
        let scope = Scope::new(parent, segment.entity_set());

        if let Some(id) = id {
            if !self.service.is_related(entity_type, &scope, id)? {
                return Err(ServiceError::not_found(entity_type, id.clone()).into());
            }
            return Ok(self.service.get_by_id(entity_type, id)?);
        }

        let page = self.service.get_collection(
            entity_type,
            Some(&scope),
            &QueryOptions::new().with_top(1),
        )?;

        page.items.into_iter().next().ok_or_else(|| {
            ServiceError::not_found(entity_type, parent.id().clone()).into()
        })
    }

    // Load the relations named in `$expand`, recursively.
    fn expand(&self, entity: &mut Entity, options: &QueryOptions) -> Result<(), Error> {
        for (relation, nested) in options.expand() {
            if !options.selects(relation) {
                continue;
            }
            let Some(nav) = self.registry.navigation(entity.entity_type(), relation) else {
                continue;
            };

            let scope = Scope::new(entity, relation.as_str());
            let mut page = self
                .service
                .get_collection(nav.target, Some(&scope), nested)?;
            for item in &mut page.items {
                self.expand(item, nested)?;
            }

            let related = if nav.relation.is_many() {
                Related::Many(page.items)
            } else {
                Related::One(page.items.into_iter().next().map(Box::new))
            };
            entity.set_related(relation.as_str(), related);
        }

        Ok(())
    }
}

// An absent field is not found; a field stored as null reads as null.
fn property_value(entity: &Entity, name: &str) -> Result<Value, ServiceError> {
    if name == "id" {
        return Ok(entity.id().to_json());
    }

    entity
        .field(name)
        .cloned()
        .ok_or_else(|| ServiceError::property_not_set(entity, name))
}
