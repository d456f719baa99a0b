use crate::{
    dispatch::ChangeEvent,
    entity::EntityId,
    error::{Error, ErrorKind, ErrorOrigin},
    model::{EntityType, ModelRegistry},
    path::{PathError, PathGrammar, PathType, ResourcePath},
    query::{QueryOptionError, QueryOptions, QueryOptionsParser},
};
use derive_more::Display;
use std::hash::{Hash, Hasher};
use thiserror::Error as ThisError;

///
/// SubscriptionError
///
/// Every variant rejects the subscribe attempt; the underlying path or
/// option error is kept so the client can see which part failed.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SubscriptionError {
    #[error("topic '{topic}' rejected: {source}")]
    Path {
        topic: String,
        #[source]
        source: PathError,
    },

    #[error("topic '{topic}' rejected: {source}")]
    Query {
        topic: String,
        #[source]
        source: QueryOptionError,
    },

    #[error("topic '{topic}' rejected: {reason}")]
    Unsupported { topic: String, reason: String },
}

impl SubscriptionError {
    fn unsupported(topic: &str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::SubscriptionRejected
    }

    /// Classification of the underlying failure.
    #[must_use]
    pub const fn cause_kind(&self) -> ErrorKind {
        match self {
            Self::Path { source, .. } => source.kind(),
            Self::Query { source, .. } => source.kind(),
            Self::Unsupported { .. } => ErrorKind::SubscriptionRejected,
        }
    }
}

impl From<SubscriptionError> for Error {
    fn from(err: SubscriptionError) -> Self {
        Self::new(err.kind(), ErrorOrigin::Subscription, err.to_string())
    }
}

///
/// PatternClass
/// Topic classes, in compile priority order.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum PatternClass {
    /// `Things?$select=name`
    Select,
    /// `Things` or `Things(1)/Datastreams`
    CollectionBase,
    /// `Things(1)`
    EntityDirect,
    /// `Things(1)/Datastreams(2)` or `Datastreams(1)/Thing`
    EntityViaRelation,
    /// `Things(1)/name`
    Property,
}

///
/// SourceConstraint
/// The id-qualified hop a topic navigates from.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceConstraint {
    pub source_type: EntityType,
    pub source_id: EntityId,
    /// Navigation property followed from the source.
    pub relation: String,
}

impl SourceConstraint {
    /// Key into `ChangeEvent::related_collections`.
    #[must_use]
    pub const fn collection(&self) -> &'static str {
        self.source_type.collection
    }
}

///
/// Subscription
///
/// A compiled topic. Holds everything needed to decide relevance for a
/// change event without re-parsing. Equality and hashing use the topic only.
///

#[derive(Clone, Debug)]
pub struct Subscription {
    topic: String,
    class: PatternClass,
    watched: EntityType,
    entity_id: Option<EntityId>,
    property: Option<String>,
    source: Option<SourceConstraint>,
    options: QueryOptions,
}

impl Subscription {
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub const fn class(&self) -> PatternClass {
        self.class
    }

    #[must_use]
    pub const fn watched(&self) -> EntityType {
        self.watched
    }

    #[must_use]
    pub const fn entity_id(&self) -> Option<&EntityId> {
        self.entity_id.as_ref()
    }

    #[must_use]
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    #[must_use]
    pub const fn source(&self) -> Option<&SourceConstraint> {
        self.source.as_ref()
    }

    /// Select-only options used to project payloads; empty unless the
    /// topic carried `$select`.
    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Topic to publish on when `event` is relevant to this subscription.
    /// Always the subscribed topic, as the client spelled it.
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> Option<&str> {
        let entity = event.entity();

        if entity.entity_type().entity_name != self.watched.entity_name {
            return None;
        }
        if self
            .entity_id
            .as_ref()
            .is_some_and(|id| id != entity.id())
        {
            return None;
        }
        if let Some(source) = &self.source
            && !event.is_related_to(source.collection(), &source.source_id)
        {
            return None;
        }
        if let Some(property) = &self.property
            && !event.touches(property)
        {
            return None;
        }

        Some(&self.topic)
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic
    }
}

impl Eq for Subscription {}

impl Hash for Subscription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.topic.hash(state);
    }
}

///
/// TopicCompiler
///
/// Compiles MQTT topics with the same grammar the HTTP side uses. Topics may
/// carry the API version as their first level (`v1.1/Things`).
///

#[derive(Clone, Copy, Debug)]
pub struct TopicCompiler<'a> {
    registry: &'a ModelRegistry,
    version: &'a str,
}

impl<'a> TopicCompiler<'a> {
    #[must_use]
    pub const fn new(registry: &'a ModelRegistry, version: &'a str) -> Self {
        Self { registry, version }
    }

    pub fn compile(&self, topic: &str) -> Result<Subscription, SubscriptionError> {
        let body_start = topic
            .strip_prefix(self.version)
            .and_then(|rest| rest.strip_prefix('/'))
            .map_or(0, |rest| topic.len() - rest.len());
        let body = &topic[body_start..];

        let (path_text, query) = PathGrammar::split_query(body);
        let path = PathGrammar::new(self.registry)
            .parse(path_text)
            .map_err(|source| SubscriptionError::Path {
                topic: topic.to_string(),
                source,
            })?;

        if path.len() > 2 {
            return Err(SubscriptionError::unsupported(
                topic,
                "at most one navigation hop is allowed",
            ));
        }

        let options = match query {
            Some(query) => self.select_options(topic, query, &path)?,
            None => QueryOptions::new(),
        };

        let class = classify(topic, &path, query.is_some())?;
        let leaf = path.leaf();
        let source = path.parent().and_then(|parent| {
            Some(SourceConstraint {
                source_type: parent.entity_type(),
                source_id: parent.id()?.clone(),
                relation: leaf.entity_set().to_string(),
            })
        });

        Ok(Subscription {
            topic: topic.to_string(),
            class,
            watched: path.entity_type(),
            entity_id: leaf.id().cloned(),
            property: path.property().map(ToString::to_string),
            source,
            options,
        })
    }

    // Only `$select` is accepted on topics; expansion is an HTTP feature.
    fn select_options(
        &self,
        topic: &str,
        query: &str,
        path: &ResourcePath,
    ) -> Result<QueryOptions, SubscriptionError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        for item in query.split('&').filter(|item| !item.is_empty()) {
            let key = item.split_once('=').map_or(item, |(key, _)| key);
            if key != "$select" {
                return Err(SubscriptionError::unsupported(
                    topic,
                    format!("only $select is allowed in topics, found '{key}'"),
                ));
            }
        }

        let to_query_error = |source| SubscriptionError::Query {
            topic: topic.to_string(),
            source,
        };
        let options = QueryOptionsParser::new(0)
            .parse(query)
            .map_err(to_query_error)?;
        options
            .validate(path.entity_type(), self.registry)
            .map_err(to_query_error)?;

        Ok(options)
    }
}

fn classify(
    topic: &str,
    path: &ResourcePath,
    has_select: bool,
) -> Result<PatternClass, SubscriptionError> {
    if has_select {
        if path.path_type() != PathType::Collection {
            return Err(SubscriptionError::unsupported(
                topic,
                "$select is only allowed on collection topics",
            ));
        }
        return Ok(PatternClass::Select);
    }

    match path.path_type() {
        PathType::Collection => Ok(PatternClass::CollectionBase),
        PathType::Entity if path.len() == 1 => Ok(PatternClass::EntityDirect),
        PathType::Entity => Ok(PatternClass::EntityViaRelation),
        PathType::Property => Ok(PatternClass::Property),
        PathType::Value | PathType::Reference => Err(SubscriptionError::unsupported(
            topic,
            "$value and $ref cannot be subscribed to",
        )),
    }
}
