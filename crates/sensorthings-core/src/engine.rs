use crate::{
    Error,
    dispatch::{ChangeDispatcher, ChangeEvent, DispatchReport, PublishSink},
    entity::Entity,
    model::ModelRegistry,
    obs::events,
    path::{PathGrammar, ResourcePath},
    query::{ProjectedView, Projector, QueryOptions, QueryOptionsParser},
    service::{EntityService, RequestResolver},
    subscription::{ClientId, Subscription, SubscriptionRegistry, TopicCompiler},
};
use sensorthings_config::Config;
use tracing::warn;

const COMPONENT: &str = "engine";

///
/// Engine
///
/// One service instance: the enabled entity kinds, the shared parsers, the
/// projector and the live subscription registry. HTTP and MQTT front ends
/// hold a reference to the same engine.
///

#[derive(Debug)]
pub struct Engine {
    config: Config,
    registry: ModelRegistry,
    parser: QueryOptionsParser,
    projector: Projector,
    subscriptions: SubscriptionRegistry,
}

impl Engine {
    /// Build from an already validated configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let registry = ModelRegistry::from_config(&config.extensions);
        let parser = QueryOptionsParser::new(config.query.max_expand_depth);
        let projector = Projector::new(config.service.root_url(), registry.clone());

        Self {
            config,
            registry,
            parser,
            projector,
            subscriptions: SubscriptionRegistry::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn projector(&self) -> &Projector {
        &self.projector
    }

    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    //
    // Addressing
    //

    pub fn parse_path(&self, raw: &str) -> Result<ResourcePath, Error> {
        Ok(PathGrammar::new(&self.registry).parse(raw)?)
    }

    pub fn parse_query(&self, raw: &str) -> Result<QueryOptions, Error> {
        Ok(self.parser.parse(raw)?)
    }

    #[must_use]
    pub fn project(&self, entity: &Entity, options: &QueryOptions) -> ProjectedView {
        self.projector.project(entity, options)
    }

    /// Resolver for HTTP reads backed by `service`.
    pub fn resolver<S: EntityService>(&self, service: S) -> RequestResolver<'_, S> {
        RequestResolver::new(
            &self.registry,
            self.parser,
            &self.projector,
            &self.config.query,
            service,
        )
    }

    //
    // Subscriptions
    //

    pub fn compile_topic(&self, topic: &str) -> Result<Subscription, Error> {
        Ok(TopicCompiler::new(&self.registry, &self.config.service.version).compile(topic)?)
    }

    /// Compile `topic` and register it for `client`. Returns false when the
    /// client already held the topic.
    pub fn subscribe(&self, client: impl Into<ClientId>, topic: &str) -> Result<bool, Error> {
        let client = client.into();
        let compiler = TopicCompiler::new(&self.registry, &self.config.service.version);

        match compiler.compile(topic) {
            Ok(subscription) => Ok(self.subscriptions.add(client, subscription)),
            Err(err) => {
                warn!(
                    event = events::SUBSCRIPTION_REJECTED,
                    component = COMPONENT,
                    client = %client,
                    topic,
                    cause = %err.cause_kind(),
                    err = %err,
                    "subscription rejected"
                );
                Err(err.into())
            }
        }
    }

    pub fn unsubscribe(&self, client: &ClientId, topic: &str) -> bool {
        self.subscriptions.remove(client, topic)
    }

    /// Drop all subscriptions of a disconnected client.
    pub fn disconnect(&self, client: &ClientId) -> usize {
        self.subscriptions.remove_client(client)
    }

    //
    // Dispatch
    //

    pub const fn dispatcher<S: PublishSink>(&self, sink: S) -> ChangeDispatcher<'_, S> {
        ChangeDispatcher::new(&self.subscriptions, &self.projector, sink)
    }

    pub fn dispatch<S: PublishSink>(&self, event: &ChangeEvent, sink: S) -> DispatchReport {
        self.dispatcher(sink).dispatch(event)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

///
/// TESTS
///
