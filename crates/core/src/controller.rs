//! Synchronization controller: the seam between views and the server.
//!
//! Views subscribe to resource keys and execute mutations through a
//! [`SyncController`]; they never issue network calls themselves. The
//! controller is an explicit instance, injected where it is needed, so each
//! test (or each signed-in session) gets an isolated cache.

use log::info;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

use crate::cache::{CacheEntry, FetchCache};
use crate::config::SyncConfig;
use crate::errors::Result;
use crate::fetcher::ResourceFetcher;
use crate::invalidation::InvalidationSet;
use crate::keys::ResourceKey;
use crate::mutation::{MutationDef, MutationExecutor};

/// Live view of one cache entry.
///
/// Dropping the subscription detaches the observer; the entry stays cached
/// and an in-flight fetch still completes. Intermediate states that are
/// superseded before the subscriber looks are coalesced.
pub struct Subscription {
    key: ResourceKey,
    receiver: watch::Receiver<CacheEntry>,
}

impl Subscription {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Latest entry, marking it seen.
    pub fn current(&mut self) -> CacheEntry {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the next change; `None` once the controller is gone.
    pub async fn changed(&mut self) -> Option<CacheEntry> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until the entry is settled (`Success` or `Error`).
    pub async fn settled(&mut self) -> Option<CacheEntry> {
        self.receiver
            .wait_for(CacheEntry::is_settled)
            .await
            .ok()
            .map(|entry| entry.clone())
    }

    /// Wait until `predicate` holds for the entry.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&CacheEntry) -> bool,
    ) -> Option<CacheEntry> {
        self.receiver
            .wait_for(predicate)
            .await
            .ok()
            .map(|entry| entry.clone())
    }
}

/// Owns the fetch cache and the fetcher every read goes through.
#[derive(Clone)]
pub struct SyncController {
    cache: FetchCache,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl SyncController {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, config: SyncConfig) -> Self {
        Self {
            cache: FetchCache::new(config),
            fetcher,
        }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Subscribe to `key`, starting a read unless the entry is fresh.
    pub fn subscribe(&self, key: ResourceKey) -> Subscription {
        let receiver = self.cache.watch(&key);
        self.cache.prefetch(&key, Arc::clone(&self.fetcher));
        Subscription { key, receiver }
    }

    /// Read `key`; the entry is `Loading` before this returns unless fresh.
    pub fn read(&self, key: &ResourceKey) -> impl Future<Output = CacheEntry> + Send + 'static {
        self.cache.read(key, Arc::clone(&self.fetcher))
    }

    /// Read `key` and decode the settled value, surfacing entry errors.
    pub async fn read_as<T: DeserializeOwned>(&self, key: &ResourceKey) -> Result<T> {
        self.read(key).await.into_result()
    }

    pub fn refetch(&self, key: &ResourceKey) -> impl Future<Output = CacheEntry> + Send + 'static {
        self.cache.refetch(key, Arc::clone(&self.fetcher))
    }

    pub fn peek(&self, key: &ResourceKey) -> Option<CacheEntry> {
        self.cache.peek(key)
    }

    /// Outside a tokio runtime live keys are only marked stale.
    pub fn invalidate(&self, key: &ResourceKey) -> bool {
        self.cache.invalidate(key)
    }

    pub fn invalidate_prefix(&self, prefix: &ResourceKey) -> usize {
        self.cache.invalidate_prefix(prefix)
    }

    pub fn apply(&self, set: &InvalidationSet) -> usize {
        self.cache.apply(set)
    }

    /// Executor for `def` whose successes invalidate this controller's cache.
    pub fn executor<M: MutationDef>(&self, def: M) -> MutationExecutor<M> {
        MutationExecutor::new(def, self.cache.clone())
    }

    /// Teardown: abort in-flight fetches; later reads settle with `Shutdown`.
    pub fn shutdown(&self) {
        info!("Shutting down sync controller");
        self.cache.shutdown();
    }
}
