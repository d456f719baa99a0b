use crate::{
    entity::{Entity, EntityId, Related},
    model::{EntityType, ModelRegistry},
    query::QueryOptions,
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

///
/// NavigationLink
/// Link stub emitted for a relation that is not inlined.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NavigationLink {
    pub target: EntityType,
    pub href: String,
}

///
/// Expanded
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expanded {
    One(Option<Box<ProjectedView>>),
    Many(Vec<ProjectedView>),
}

impl Serialize for Expanded {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::One(view) => view.serialize(serializer),
            Self::Many(views) => views.serialize(serializer),
        }
    }
}

///
/// ProjectedView
///
/// Result of applying a [`QueryOptions`] tree to an entity graph. Serializes
/// to SensorThings JSON: `@iot.selfLink`, `@iot.id`, the selected properties,
/// `Rel@iot.navigationLink` for link stubs and inline bodies for expansions.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedView {
    entity_type: EntityType,
    id: EntityId,
    self_link: String,
    fields: BTreeMap<String, Value>,
    links: BTreeMap<String, NavigationLink>,
    expanded: BTreeMap<String, Expanded>,
}

impl ProjectedView {
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    #[must_use]
    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    #[must_use]
    pub fn self_link(&self) -> &str {
        &self.self_link
    }

    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub const fn links(&self) -> &BTreeMap<String, NavigationLink> {
        &self.links
    }

    #[must_use]
    pub const fn expanded(&self) -> &BTreeMap<String, Expanded> {
        &self.expanded
    }

    /// Drop properties and inline bodies that `options` does not select.
    /// Dropped inline bodies do not turn back into link stubs.
    #[must_use]
    pub fn narrow(&self, options: &QueryOptions) -> Self {
        let mut view = self.clone();
        view.fields.retain(|name, _| options.selects(name));
        view.expanded.retain(|name, _| options.selects(name));

        view
    }

    /// Rebuild an entity graph from the view; link stubs are not carried.
    #[must_use]
    pub fn into_entity(self) -> Entity {
        let mut entity = Entity::new(self.entity_type, self.id);
        for (name, value) in self.fields {
            entity = entity.with_field(name, value);
        }

        for (name, expanded) in self.expanded {
            let related = match expanded {
                Expanded::One(view) => {
                    Related::One(view.map(|view| Box::new((*view).into_entity())))
                }
                Expanded::Many(views) => {
                    Related::Many(views.into_iter().map(Self::into_entity).collect())
                }
            };
            entity.set_related(name, related);
        }

        entity
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Serialize for ProjectedView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 2 + self.fields.len() + self.links.len() + self.expanded.len();
        let mut map = serializer.serialize_map(Some(len))?;

        map.serialize_entry("@iot.selfLink", &self.self_link)?;
        map.serialize_entry("@iot.id", &self.id.to_json())?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        for (name, link) in &self.links {
            map.serialize_entry(&format!("{name}@iot.navigationLink"), &link.href)?;
        }
        for (name, expanded) in &self.expanded {
            map.serialize_entry(name, expanded)?;
        }

        map.end()
    }
}

///
/// Projector
///
/// Applies query options to entities. Shared by the HTTP resolver and the
/// MQTT dispatcher; only the sink that receives the view differs.
///

#[derive(Clone, Debug)]
pub struct Projector {
    root_url: String,
    registry: ModelRegistry,
}

impl Projector {
    /// `root_url` is the versioned service root, without a trailing slash.
    pub fn new(root_url: impl Into<String>, registry: ModelRegistry) -> Self {
        Self {
            root_url: root_url.into(),
            registry,
        }
    }

    #[must_use]
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    #[must_use]
    pub fn self_link(&self, entity: &Entity) -> String {
        format!("{}/{}", self.root_url, entity.path())
    }

    #[must_use]
    pub fn project(&self, entity: &Entity, options: &QueryOptions) -> ProjectedView {
        let self_link = self.self_link(entity);
        let entity_type = entity.entity_type();

        let fields = entity
            .fields()
            .iter()
            .filter(|(name, _)| name.as_str() != "id" && options.selects(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let mut links = BTreeMap::new();
        let mut expanded = BTreeMap::new();

        for nav in self.registry.navigations(entity_type) {
            let name = nav.relation.name;
            let inline = options
                .expansion(name)
                .and_then(|nested| Some((nested, entity.related(name)?)));

            match inline {
                Some((nested, related)) => {
                    expanded.insert(name.to_string(), self.project_related(related, nested));
                }
                None => {
                    links.insert(
                        name.to_string(),
                        NavigationLink {
                            target: nav.target,
                            href: format!("{self_link}/{name}"),
                        },
                    );
                }
            }
        }

        ProjectedView {
            entity_type,
            id: entity.id().clone(),
            self_link,
            fields,
            links,
            expanded,
        }
    }

    fn project_related(&self, related: &Related, options: &QueryOptions) -> Expanded {
        match related {
            Related::One(entity) => Expanded::One(
                entity
                    .as_deref()
                    .map(|entity| Box::new(self.project(entity, options))),
            ),
            Related::Many(entities) => Expanded::Many(
                entities
                    .iter()
                    .map(|entity| self.project(entity, options))
                    .collect(),
            ),
        }
    }
}
