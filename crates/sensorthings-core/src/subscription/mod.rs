//! MQTT subscriptions.
//!
//! Topics compile through the HTTP path grammar into [`Subscription`]s, which
//! the [`SubscriptionRegistry`] shares with every dispatcher. Compilation
//! checks classes in a fixed order (select, collection, entity, property)
//! and rejects anything else, including `$expand` and deeper navigation.

mod registry;
mod topic;

#[cfg(test)]
mod tests;

pub use registry::{ClientId, RegistrySnapshot, SubscriptionRegistry};
pub use topic::{PatternClass, SourceConstraint, Subscription, SubscriptionError, TopicCompiler};
