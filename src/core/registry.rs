//! # Topic and middleware registries.
//!
//! Both registries are owned by one [`Emitter`](crate::Emitter) and read/written
//! concurrently by `on`, `off`, `emit` and `use_middleware`.
//!
//! ## Architecture
//! ```text
//! TopicRegistry:      DashMap<topic, HashMap<ListenerId, Arc<Subscription>>>
//! MiddlewareRegistry: DashMap<pattern, Vec<Middleware>>
//! ```
//!
//! ## Rules
//! - A topic with zero subscriptions is pruned right after the removal that
//!   emptied it (`remove_if` under the shard lock, so a concurrent insert wins).
//! - Readers take snapshots (`Vec` of keys or `Arc<Subscription>`) and release the
//!   shard lock before doing anything else; nothing mutates a map while iterating it.
//! - Multi-topic operations are not transactional.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::core::pattern::Query;
use crate::core::subscription::Subscription;
use crate::listeners::{ListenerId, ListenerRef};
use crate::middleware::Middleware;

type Subscriptions = HashMap<ListenerId, Arc<Subscription>>;

/// Topic → subscriptions, keyed by listener identity.
#[derive(Default)]
pub(crate) struct TopicRegistry {
    topics: DashMap<String, Subscriptions>,
}

impl TopicRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `sub` under its topic, returning the subscription it replaced.
    pub(crate) fn insert(&self, sub: Arc<Subscription>) -> Option<Arc<Subscription>> {
        let id = sub.listener().id();
        self.topics
            .entry(sub.topic().to_string())
            .or_default()
            .insert(id, sub)
    }

    /// Registered topic keys matching `query` in either direction.
    pub(crate) fn matched(&self, query: &str) -> Vec<String> {
        let q = Query::new(query);
        self.topics
            .iter()
            .filter(|entry| q.matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Subscriptions currently registered under exactly `topic`.
    pub(crate) fn snapshot(&self, topic: &str) -> Vec<Arc<Subscription>> {
        self.topics
            .get(topic)
            .map(|subs| subs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes the whole topic entry.
    pub(crate) fn remove_topic(&self, topic: &str) -> Vec<Arc<Subscription>> {
        self.topics
            .remove(topic)
            .map(|(_, subs)| subs.into_values().collect())
            .unwrap_or_default()
    }

    /// Removes the given identities from `topic`; prunes the topic if it empties.
    pub(crate) fn remove_listeners(
        &self,
        topic: &str,
        ids: &[ListenerId],
    ) -> Vec<Arc<Subscription>> {
        let removed = match self.topics.get_mut(topic) {
            Some(mut subs) => ids.iter().filter_map(|id| subs.remove(id)).collect(),
            None => Vec::new(),
        };
        self.prune(topic);
        removed
    }

    /// Removes `sub` only if its topic still maps its identity to this exact subscription.
    pub(crate) fn remove_exact(&self, sub: &Arc<Subscription>) -> bool {
        let topic = sub.topic();
        let id = sub.listener().id();
        let removed = match self.topics.get_mut(topic) {
            Some(mut subs) => {
                let same = subs.get(&id).is_some_and(|current| Arc::ptr_eq(current, sub));
                same && subs.remove(&id).is_some()
            }
            None => false,
        };
        self.prune(topic);
        removed
    }

    fn prune(&self, topic: &str) {
        self.topics.remove_if(topic, |_, subs| subs.is_empty());
    }

    /// Listener handles under every topic matching `query`.
    pub(crate) fn listeners(&self, query: &str) -> Vec<ListenerRef> {
        self.matched(query)
            .iter()
            .flat_map(|topic| self.snapshot(topic))
            .map(|sub| sub.listener().clone())
            .collect()
    }

    /// Sorted list of registered topic keys.
    pub(crate) fn topics(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.topics.iter().map(|e| e.key().clone()).collect();
        keys.sort_unstable();
        keys
    }

    /// Removes every topic and returns all subscriptions.
    pub(crate) fn drain(&self) -> Vec<Arc<Subscription>> {
        let keys: Vec<String> = self.topics.iter().map(|e| e.key().clone()).collect();
        keys.iter().flat_map(|k| self.remove_topic(k)).collect()
    }
}

/// Pattern → ordered middleware chain.
#[derive(Default)]
pub(crate) struct MiddlewareRegistry {
    chains: DashMap<String, Vec<Middleware>>,
}

impl MiddlewareRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sets the chain for `pattern`; an empty chain deletes the entry.
    pub(crate) fn set(&self, pattern: String, chain: Vec<Middleware>) {
        if chain.is_empty() {
            self.chains.remove(&pattern);
        } else {
            self.chains.insert(pattern, chain);
        }
    }

    /// Concatenated chains of every pattern matching `topic` (either direction),
    /// ordered by pattern so that the result is deterministic.
    pub(crate) fn for_topic(&self, topic: &str) -> Vec<Middleware> {
        let q = Query::new(topic);
        let mut hits: Vec<(String, Vec<Middleware>)> = self
            .chains
            .iter()
            .filter(|e| q.matches(e.key()))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        hits.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        hits.into_iter().flat_map(|(_, chain)| chain).collect()
    }

    /// Sorted list of registered patterns.
    pub(crate) fn patterns(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.chains.iter().map(|e| e.key().clone()).collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, Flag};
    use crate::listeners::ListenerFn;
    use crate::middleware::{self, apply};

    fn sub(topic: &str, l: &ListenerRef) -> Arc<Subscription> {
        Subscription::spawn(topic.to_string(), l.clone(), Vec::new(), 1)
    }

    fn noop() -> ListenerRef {
        ListenerFn::arc("noop", |_e: Event| async {})
    }

    #[tokio::test]
    async fn insert_replaces_same_identity() {
        let reg = TopicRegistry::new();
        let l = noop();
        assert!(reg.insert(sub("t", &l)).is_none());
        let prev = reg.insert(sub("t", &l));
        assert!(prev.is_some());
        assert_eq!(reg.snapshot("t").len(), 1);
    }

    #[tokio::test]
    async fn removal_prunes_empty_topic() {
        let reg = TopicRegistry::new();
        let a = noop();
        let b = noop();
        reg.insert(sub("t", &a));
        reg.insert(sub("t", &b));

        assert_eq!(reg.remove_listeners("t", &[a.id()]).len(), 1);
        assert_eq!(reg.topics(), vec!["t".to_string()]);
        assert!(reg.remove_listeners("t", &[a.id()]).is_empty());

        reg.remove_listeners("t", &[b.id()]);
        assert!(reg.topics().is_empty());
        assert!(reg.remove_listeners("missing", &[b.id()]).is_empty());
    }

    #[tokio::test]
    async fn remove_exact_ignores_replacement() {
        let reg = TopicRegistry::new();
        let l = noop();
        let old = sub("t", &l);
        reg.insert(Arc::clone(&old));
        reg.insert(sub("t", &l));

        assert!(!reg.remove_exact(&old));
        assert_eq!(reg.snapshot("t").len(), 1);

        let current = reg.snapshot("t").pop().unwrap();
        assert!(reg.remove_exact(&current));
        assert!(reg.topics().is_empty());
    }

    #[tokio::test]
    async fn matched_is_bidirectional() {
        let reg = TopicRegistry::new();
        let l = noop();
        reg.insert(sub("orders.*", &l));
        reg.insert(sub("orders.created", &l));
        reg.insert(sub("users.created", &l));

        let mut hits = reg.matched("orders.created");
        hits.sort();
        assert_eq!(hits, vec!["orders.*", "orders.created"]);

        let mut hits = reg.matched("*.created");
        hits.sort();
        assert_eq!(hits, vec!["orders.created", "users.created"]);

        assert!(reg.matched("[bad").is_empty());
        assert_eq!(reg.drain().len(), 3);
        assert!(reg.topics().is_empty());
    }

    #[test]
    fn middleware_set_and_delete() {
        let reg = MiddlewareRegistry::new();
        reg.set("*".into(), vec![middleware::void()]);
        reg.set("a".into(), vec![middleware::skip()]);
        assert_eq!(reg.patterns(), vec!["*", "a"]);

        let mut ev = Event::empty("a");
        apply(&mut ev, &reg.for_topic("a"));
        assert_eq!(ev.flag(), Flag::VOID | Flag::SKIP);

        let mut ev = Event::empty("b");
        apply(&mut ev, &reg.for_topic("b"));
        assert_eq!(ev.flag(), Flag::VOID);

        // a malformed pattern never applies, not even to an identical topic
        reg.set("[a".into(), vec![middleware::once()]);
        let mut ev = Event::empty("[a");
        apply(&mut ev, &reg.for_topic("[a"));
        assert_eq!(ev.flag(), Flag::VOID);
        reg.set("[a".into(), Vec::new());

        reg.set("*".into(), Vec::new());
        assert_eq!(reg.patterns(), vec!["a"]);
        assert!(reg.for_topic("b").is_empty());
    }
}
