use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;

/// A subscriber callback. Receives the decoded payload by value.
pub type Callback = dyn Fn(Bytes) + Send + Sync + 'static;

/// Topic-to-callback bindings.
///
/// At most one callback per topic; re-registration replaces. Written
/// from application threads, read concurrently by the receive loop.
#[derive(Default)]
pub struct SubscriptionRegistry {
    bindings: RwLock<HashMap<String, Arc<Callback>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `topic` to `callback`, replacing any existing binding.
    /// Takes effect for the next frame decoded after this call returns.
    /// Returns true when a previous binding was replaced.
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> bool
    where
        F: Fn(Bytes) + Send + Sync + 'static,
    {
        self.bindings
            .write()
            .expect("registry lock poisoned")
            .insert(topic.into(), Arc::new(callback))
            .is_some()
    }

    /// Remove the binding for `topic`. Returns true if one existed.
    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.bindings
            .write()
            .expect("registry lock poisoned")
            .remove(topic)
            .is_some()
    }

    pub fn get(&self, topic: &str) -> Option<Arc<Callback>> {
        self.bindings
            .read()
            .expect("registry lock poisoned")
            .get(topic)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.bindings.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("topics", &self.len())
            .finish()
    }
}
