//! The runtime value threaded through every operation in this crate, in
//! place of process globals: configuration, storage, the remote-key cache
//! and the outbound HTTP client all live here and get passed explicitly.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;

use crate::{client, config::Config, model::Actor, signature::KeyCache, store::Store, Result};

/// A capability the host application supplies: whether a local handle
/// corresponds to a real account. We never assume anything about how
/// accounts are modeled upstream beyond this yes/no check.
pub type ResolveUser = Arc<dyn Fn(&str) -> bool + Send + Sync>;

fn resolve_anyone(_handle: &str) -> bool {
    true
}

pub struct FederationRuntime {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub key_cache: KeyCache,
    pub http: reqwest::Client,
    pub resolve_user: ResolveUser,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FederationRuntime {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let ttl = Duration::from_secs(config.actor_key_cache_ttl);
        Self {
            config,
            store,
            key_cache: KeyCache::new(ttl),
            http: reqwest::Client::new(),
            resolve_user: Arc::new(resolve_anyone),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_resolver(mut self, resolve_user: ResolveUser) -> Self {
        self.resolve_user = resolve_user;
        self
    }

    /// Fetches (creating if absent) the mutex guarding the critical section
    /// for `(namespace, key)` — e.g. `("followers", actor_uri)` — so two
    /// concurrent inbound activities about the same actor serialize instead
    /// of racing on a read-modify-write of the same record.
    pub async fn lock_for(&self, namespace: &str, key: &str) -> Arc<Mutex<()>> {
        let lock_key = format!("{namespace}:{key}");
        let mut locks = self.locks.lock().await;
        locks
            .entry(lock_key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn fetch_actor(&self, uri: &str) -> Result<Actor> {
        client::fetch_actor(&self.http, uri).await
    }
}

pub type SharedState = Arc<FederationRuntime>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn lock_for_same_key_returns_same_mutex() {
        let state = FederationRuntime::new(Config::default(), Arc::new(InMemoryStore::default()));
        let a = state.lock_for("followers", "https://example.com/@alice").await;
        let b = state.lock_for("followers", "https://example.com/@alice").await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn lock_for_different_keys_returns_different_mutexes() {
        let state = FederationRuntime::new(Config::default(), Arc::new(InMemoryStore::default()));
        let a = state.lock_for("followers", "https://example.com/@alice").await;
        let b = state.lock_for("followers", "https://example.com/@bob").await;
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
