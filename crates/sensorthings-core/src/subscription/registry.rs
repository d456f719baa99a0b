use crate::{
    obs::events,
    subscription::Subscription,
};
use arc_swap::ArcSwap;
use derive_more::{Display, From};
use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info};

const COMPONENT: &str = "subscription_registry";

///
/// ClientId
///

#[derive(Clone, Debug, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

///
/// RegistrySnapshot
///
/// Immutable view of the active subscriptions, grouped by watched entity
/// name. The key set doubles as the watched-type index.
///

#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    by_type: HashMap<&'static str, Vec<Arc<Subscription>>>,
    len: usize,
}

impl RegistrySnapshot {
    fn build<'a>(subscriptions: impl Iterator<Item = &'a Arc<Subscription>>) -> Self {
        let mut by_type = HashMap::<&'static str, Vec<Arc<Subscription>>>::new();
        let mut len = 0;

        for subscription in subscriptions {
            by_type
                .entry(subscription.watched().entity_name)
                .or_default()
                .push(Arc::clone(subscription));
            len += 1;
        }

        Self { by_type, len }
    }

    #[must_use]
    pub fn is_watched(&self, entity_name: &str) -> bool {
        self.by_type.contains_key(entity_name)
    }

    /// Subscriptions watching `entity_name`; empty when none do.
    #[must_use]
    pub fn watching(&self, entity_name: &str) -> &[Arc<Subscription>] {
        self.by_type
            .get(entity_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Subscription>> {
        self.by_type.values().flatten()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

///
/// TopicEntry
///

#[derive(Debug)]
struct TopicEntry {
    subscription: Arc<Subscription>,
    clients: BTreeSet<ClientId>,
}

///
/// RegistryState
///

#[derive(Debug, Default)]
struct RegistryState {
    topics: HashMap<String, TopicEntry>,
    clients: HashMap<ClientId, BTreeSet<String>>,
}

///
/// SubscriptionRegistry
///
/// Active subscriptions shared by subscribe handlers and dispatchers.
/// Mutations serialize on one mutex and publish a fresh snapshot before
/// releasing it; readers load the snapshot without locking. Several clients
/// on the same topic share one compiled subscription.
///

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    state: Mutex<RegistryState>,
    snapshot: ArcSwap<RegistrySnapshot>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscription` for `client`. Returns false when the client
    /// already held this topic.
    pub fn add(&self, client: ClientId, subscription: Subscription) -> bool {
        let mut state = self.lock();
        let topic = subscription.topic().to_string();

        let entry = state
            .topics
            .entry(topic.clone())
            .or_insert_with(|| TopicEntry {
                subscription: Arc::new(subscription),
                clients: BTreeSet::new(),
            });
        let added = entry.clients.insert(client.clone());
        let fresh_topic = entry.clients.len() == 1 && added;

        state
            .clients
            .entry(client.clone())
            .or_default()
            .insert(topic.clone());

        if fresh_topic {
            self.publish(&state);
        }

        if added {
            info!(
                event = events::SUBSCRIPTION_ADDED,
                component = COMPONENT,
                client = %client,
                topic = %topic,
                shared = !fresh_topic,
                "subscription added"
            );
        }

        added
    }

    /// Drop `client`'s subscription to `topic`. Returns false when the client
    /// did not hold it.
    pub fn remove(&self, client: &ClientId, topic: &str) -> bool {
        let mut state = self.lock();

        let removed = state
            .clients
            .get_mut(client)
            .is_some_and(|topics| topics.remove(topic));
        if !removed {
            return false;
        }

        if state.clients.get(client).is_some_and(BTreeSet::is_empty) {
            state.clients.remove(client);
        }
        if release(&mut state, client, topic) {
            self.publish(&state);
        }

        info!(
            event = events::SUBSCRIPTION_REMOVED,
            component = COMPONENT,
            client = %client,
            topic = %topic,
            "subscription removed"
        );

        true
    }

    /// Drop every subscription held by `client`. Returns how many there were.
    pub fn remove_client(&self, client: &ClientId) -> usize {
        let mut state = self.lock();

        let Some(topics) = state.clients.remove(client) else {
            return 0;
        };

        let mut changed = false;
        for topic in &topics {
            changed |= release(&mut state, client, topic);
        }
        if changed {
            self.publish(&state);
        }

        info!(
            event = events::CLIENT_DISCONNECTED,
            component = COMPONENT,
            client = %client,
            topics = topics.len(),
            "client subscriptions dropped"
        );

        topics.len()
    }

    /// Current snapshot; never blocks on writers.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    #[must_use]
    pub fn snapshot_matching(&self, entity_name: &str) -> Vec<Arc<Subscription>> {
        self.snapshot.load().watching(entity_name).to_vec()
    }

    #[must_use]
    pub fn is_watched(&self, entity_name: &str) -> bool {
        self.snapshot.load().is_watched(entity_name)
    }

    /// Number of distinct subscribed topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn topics_of(&self, client: &ClientId) -> BTreeSet<String> {
        self.lock().clients.get(client).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Called with the state lock held so snapshots are published in
    // mutation order.
    fn publish(&self, state: &RegistryState) {
        let snapshot =
            RegistrySnapshot::build(state.topics.values().map(|entry| &entry.subscription));

        debug!(
            component = COMPONENT,
            subscriptions = snapshot.len(),
            watched_types = snapshot.by_type.len(),
            "registry snapshot published"
        );
        self.snapshot.store(Arc::new(snapshot));
    }
}

// Detach `client` from `topic`; true when the topic lost its last client.
fn release(state: &mut RegistryState, client: &ClientId, topic: &str) -> bool {
    let Some(entry) = state.topics.get_mut(topic) else {
        return false;
    };
    entry.clients.remove(client);
    if !entry.clients.is_empty() {
        return false;
    }

    state.topics.remove(topic);
    debug!(
        component = COMPONENT,
        topic = %topic,
        "last client left topic"
    );

    true
}
