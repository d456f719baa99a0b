//! Change dispatch.
//!
//! The persistence layer calls [`ChangeDispatcher::dispatch`] once per
//! committed mutation. Events for unwatched kinds return immediately; the
//! rest are matched against a registry snapshot, projected once per distinct
//! payload shape and handed to a [`PublishSink`].

mod event;
mod sink;


pub use event::{ChangeEvent, ChangeKind};
pub use sink::{PublishError, PublishSink};

use crate::{
    obs::events,
    query::{Projector, QueryOptions},
    subscription::{Subscription, SubscriptionRegistry},
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

const COMPONENT: &str = "change_dispatcher";

///
/// DispatchReport
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DispatchReport {
    /// Subscriptions that matched the event.
    pub matched: usize,
    pub published: usize,
    /// Matches whose payload could not be built or published.
    pub failed: usize,
    /// Payloads serialized; at most one per distinct payload shape.
    pub serialized: usize,
}

///
/// PayloadKey
/// Cache key for one payload shape within a dispatch call.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum PayloadKey<'a> {
    Entity(&'a QueryOptions),
    Property(&'a str),
}

impl<'a> PayloadKey<'a> {
    fn of(subscription: &'a Subscription) -> Self {
        match subscription.property() {
            Some(property) => Self::Property(property),
            None => Self::Entity(subscription.options()),
        }
    }
}

///
/// ChangeDispatcher
///

pub struct ChangeDispatcher<'a, S> {
    registry: &'a SubscriptionRegistry,
    projector: &'a Projector,
    sink: S,
}

impl<'a, S: PublishSink> ChangeDispatcher<'a, S> {
    pub const fn new(registry: &'a SubscriptionRegistry, projector: &'a Projector, sink: S) -> Self {
        Self {
            registry,
            projector,
            sink,
        }
    }

    pub fn dispatch(&self, event: &ChangeEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        let entity_type = event.entity_type_name();

        if event.kind() == ChangeKind::Deleted {
            trace!(
                event = events::DISPATCH_SKIPPED,
                component = COMPONENT,
                entity_type,
                reason = "deleted",
                "delete events are not published"
            );
            return report;
        }

        let snapshot = self.registry.snapshot();
        if !snapshot.is_watched(entity_type) {
            trace!(
                event = events::DISPATCH_SKIPPED,
                component = COMPONENT,
                entity_type,
                reason = "unwatched",
                "no subscription watches this entity type"
            );
            return report;
        }

        let mut payloads = HashMap::<PayloadKey<'_>, Option<Vec<u8>>>::new();

        for subscription in snapshot.watching(entity_type) {
            let Some(topic) = subscription.matches(event) else {
                continue;
            };
            report.matched += 1;

            let payload = payloads
                .entry(PayloadKey::of(subscription))
                .or_insert_with_key(|key| {
                    let payload = self.payload(*key, event);
                    if payload.is_some() {
                        report.serialized += 1;
                    }
                    payload
                });

            let Some(payload) = payload else {
                report.failed += 1;
                continue;
            };

            match self.sink.publish(topic, payload) {
                Ok(()) => report.published += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        event = events::PUBLISH_FAILED,
                        component = COMPONENT,
                        entity_type,
                        topic = %topic,
                        err = %err,
                        "publish failed"
                    );
                }
            }
        }

        debug!(
            event = events::DISPATCH_COMPLETED,
            component = COMPONENT,
            entity_type,
            entity_id = %event.entity().id(),
            change = %event.kind(),
            matched = report.matched,
            published = report.published,
            failed = report.failed,
            serialized = report.serialized,
            "dispatch completed"
        );

        report
    }

    fn payload(&self, key: PayloadKey<'_>, event: &ChangeEvent) -> Option<Vec<u8>> {
        let entity = event.entity();
        let result = match key {
            PayloadKey::Entity(options) => {
                serde_json::to_vec(&self.projector.project(entity, options))
            }
            PayloadKey::Property(property) => {
                let value = if property == "id" {
                    entity.id().to_json()
                } else {
                    entity.field(property).cloned().unwrap_or(Value::Null)
                };
                let mut body = Map::new();
                body.insert(property.to_string(), value);

                serde_json::to_vec(&body)
            }
        };

        result
            .inspect_err(|err| {
                warn!(
                    event = events::PAYLOAD_SERIALIZE_FAILED,
                    component = COMPONENT,
                    entity_type = event.entity_type_name(),
                    err = %err,
                    "payload serialization failed"
                );
            })
            .ok()
    }
}
