//! Stable `tracing` event names.
//!
//! Every event carries `event = events::X` and a `component` field so log
//! pipelines can filter without matching on message text.

pub(crate) mod events {
    pub(crate) const SUBSCRIPTION_ADDED: &str = "subscription.added";
    pub(crate) const SUBSCRIPTION_REMOVED: &str = "subscription.removed";
    pub(crate) const SUBSCRIPTION_REJECTED: &str = "subscription.rejected";
    pub(crate) const CLIENT_DISCONNECTED: &str = "subscription.client_disconnected";

    pub(crate) const DISPATCH_SKIPPED: &str = "dispatch.skipped";
    pub(crate) const DISPATCH_COMPLETED: &str = "dispatch.completed";
    pub(crate) const PAYLOAD_SERIALIZE_FAILED: &str = "dispatch.payload_serialize_failed";
    pub(crate) const PUBLISH_FAILED: &str = "dispatch.publish_failed";

    pub(crate) const REQUEST_RESOLVED: &str = "request.resolved";
}
