//! Core engine for SensorThings resource addressing: path grammar, query
//! options, payload projection, and MQTT subscription matching.
//!
//! Both transports share one vocabulary. HTTP requests resolve a
//! [`path::ResourcePath`] plus [`query::QueryOptions`] through an
//! [`service::EntityService`]; MQTT topics compile into
//! [`subscription::Subscription`]s that the [`dispatch::ChangeDispatcher`]
//! re-evaluates on every committed mutation.
//!
//! ## Observability
//!
//! Library code emits `tracing` events and never installs a global
//! subscriber. Binaries and tests initialize `tracing_subscriber` themselves.
#![warn(unreachable_pub)]

pub mod dispatch;
pub mod engine;
pub mod entity;
pub mod error;
pub mod model;
pub(crate) mod obs;
pub mod path;
pub mod query;
pub mod service;
pub mod subscription;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use engine::Engine;
pub use error::{Error, ErrorKind, ErrorOrigin};

///
/// Prelude
///
/// Domain vocabulary only. No errors, sinks or services are re-exported here.
///

pub mod prelude {
    pub use crate::{
        entity::{Entity, EntityId, Related},
        model::{Cardinality, EntityModel, EntityType, ModelRegistry, Profile},
        path::{PathSegment, PathType, ResourcePath},
        query::{ProjectedView, QueryOptions},
    };
}
