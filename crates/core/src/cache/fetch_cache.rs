use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::sleep;

use super::entry::{CacheEntry, FetchStatus};
use crate::config::{QueryOptions, SyncConfig};
use crate::errors::{Result, SyncError};
use crate::fetcher::ResourceFetcher;
use crate::invalidation::{Invalidation, InvalidationSet};
use crate::keys::ResourceKey;

type FetchDone = Shared<BoxFuture<'static, ()>>;

/// A spawned fetch that later readers may join.
struct InFlight {
    generation: u64,
    done: FetchDone,
    abort: AbortHandle,
}

/// Handle a reader awaits until the fetch it joined has finished.
struct Waiter {
    generation: u64,
    done: FetchDone,
}

enum ReadStart {
    Ready(CacheEntry),
    Wait(Waiter),
}

struct Slot {
    entry: CacheEntry,
    /// Bumped on every issued fetch; only the latest generation may settle.
    generation: u64,
    in_flight: Option<InFlight>,
    /// Fetcher that last served this key, reused for eager refetches.
    fetcher: Option<Arc<dyn ResourceFetcher>>,
    watchers: watch::Sender<CacheEntry>,
}

impl Slot {
    fn new(key: ResourceKey) -> Self {
        let entry = CacheEntry::idle(key);
        let (watchers, _) = watch::channel(entry.clone());
        Self {
            entry,
            generation: 0,
            in_flight: None,
            fetcher: None,
            watchers,
        }
    }

    fn publish(&self) {
        self.watchers.send_replace(self.entry.clone());
    }

    fn has_subscribers(&self) -> bool {
        self.watchers.receiver_count() > 0
    }

    /// The in-flight fetch, unless the entry was invalidated after it was issued.
    fn joinable(&self) -> Option<Waiter> {
        if self.entry.stale {
            return None;
        }
        self.in_flight.as_ref().map(|flight| Waiter {
            generation: flight.generation,
            done: flight.done.clone(),
        })
    }
}

struct CacheInner {
    slots: Mutex<HashMap<ResourceKey, Slot>>,
    config: SyncConfig,
    issued: AtomicU64,
    shut_down: AtomicBool,
}

impl CacheInner {
    fn slots(&self) -> MutexGuard<'_, HashMap<ResourceKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Apply a fetch result unless a newer fetch for the key was issued since.
    fn settle(&self, key: &ResourceKey, generation: u64, result: Result<Value>) {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(key) else {
            return;
        };
        if slot.generation != generation {
            debug!(
                "Discarding stale response for {} (generation {}, latest {})",
                key, generation, slot.generation
            );
            return;
        }

        slot.in_flight = None;
        let now = Utc::now();
        match result {
            Ok(value) => {
                debug!("Fetched {} (generation {})", key, generation);
                slot.entry.succeed(value, now);
            }
            Err(err) => {
                warn!("Fetch for {} failed: {}", key, err);
                slot.entry.fail(err, now);
            }
        }
        slot.publish();
    }

    /// Called once the fetch a reader waited on has finished. Returns the
    /// entry if it is settled, or the newer fetch the reader should wait on.
    fn resolve(&self, key: &ResourceKey, generation: u64) -> std::result::Result<CacheEntry, Waiter> {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(key) else {
            return Ok(CacheEntry::idle(key.clone()));
        };

        match &slot.in_flight {
            None => Ok(slot.entry.clone()),
            Some(flight) if flight.generation == generation => {
                // The task finished without settling: it panicked or was aborted.
                slot.in_flight = None;
                let error = if self.is_shut_down() {
                    SyncError::Shutdown
                } else {
                    SyncError::network("fetch task ended before settling")
                };
                slot.entry.fail(error, Utc::now());
                slot.publish();
                Ok(slot.entry.clone())
            }
            Some(flight) => Err(Waiter {
                generation: flight.generation,
                done: flight.done.clone(),
            }),
        }
    }
}

/// Per-key cache of server state with de-duplicated reads.
///
/// Cloning is cheap and every clone shares the same entries. Reads spawn
/// their fetch on the tokio runtime, so they must be issued from within one.
#[derive(Clone)]
pub struct FetchCache {
    inner: Arc<CacheInner>,
}

impl FetchCache {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                slots: Mutex::new(HashMap::new()),
                config,
                issued: AtomicU64::new(0),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Read `key`, fetching through `fetcher` unless the entry is fresh.
    ///
    /// The entry switches to `Loading` before this returns; the returned
    /// future resolves with the settled entry. Concurrent reads of the same
    /// key share one fetch.
    pub fn read(
        &self,
        key: &ResourceKey,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> impl Future<Output = CacheEntry> + Send + 'static {
        let start = self.begin(key, fetcher, false);
        self.finish(key.clone(), start)
    }

    /// Fetch `key` even if the entry is fresh.
    pub fn refetch(
        &self,
        key: &ResourceKey,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> impl Future<Output = CacheEntry> + Send + 'static {
        let start = self.begin(key, fetcher, true);
        self.finish(key.clone(), start)
    }

    /// Start a read without waiting for it.
    pub fn prefetch(&self, key: &ResourceKey, fetcher: Arc<dyn ResourceFetcher>) {
        let _ = self.begin(key, fetcher, false);
    }

    /// Mark `key` stale. Keys with live subscribers refetch right away when
    /// called from within a tokio runtime. Returns false when the key was
    /// never cached.
    pub fn invalidate(&self, key: &ResourceKey) -> bool {
        let mut slots = self.inner.slots();
        match slots.get_mut(key) {
            Some(slot) => {
                self.mark_stale(key, slot);
                true
            }
            None => false,
        }
    }

    /// Invalidate every cached key starting with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &ResourceKey) -> usize {
        let mut slots = self.inner.slots();
        let mut hit = 0;
        for (key, slot) in slots.iter_mut() {
            if key.starts_with(prefix) {
                self.mark_stale(key, slot);
                hit += 1;
            }
        }
        hit
    }

    /// Apply every target of `set`; returns the number of entries marked stale.
    pub fn apply(&self, set: &InvalidationSet) -> usize {
        set.iter()
            .map(|target| match target {
                Invalidation::Exact(key) => usize::from(self.invalidate(key)),
                Invalidation::Prefix(prefix) => self.invalidate_prefix(prefix),
            })
            .sum()
    }

    /// Snapshot of `key` without fetching.
    pub fn peek(&self, key: &ResourceKey) -> Option<CacheEntry> {
        self.inner.slots().get(key).map(|slot| slot.entry.clone())
    }

    /// Receiver that observes every change to the entry for `key`.
    ///
    /// Holding a receiver makes the key live: invalidation refetches it
    /// eagerly instead of waiting for the next read.
    pub fn watch(&self, key: &ResourceKey) -> watch::Receiver<CacheEntry> {
        let mut slots = self.inner.slots();
        slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()))
            .watchers
            .subscribe()
    }

    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.inner.slots().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total fetches issued by this cache, across all keys.
    pub fn issued_fetches(&self) -> u64 {
        self.inner.issued.load(Ordering::Relaxed)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.is_shut_down()
    }

    /// Abort every in-flight fetch and refuse new ones.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut slots = self.inner.slots();
        for slot in slots.values_mut() {
            if let Some(flight) = slot.in_flight.take() {
                flight.abort.abort();
                slot.generation += 1;
                if slot.entry.status == FetchStatus::Loading {
                    slot.entry.fail(SyncError::Shutdown, Utc::now());
                }
                slot.publish();
            }
        }
        debug!("Fetch cache shut down ({} entries)", slots.len());
    }

    fn begin(&self, key: &ResourceKey, fetcher: Arc<dyn ResourceFetcher>, force: bool) -> ReadStart {
        let mut slots = self.inner.slots();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()));

        if self.inner.is_shut_down() {
            let mut entry = slot.entry.clone();
            entry.fail(SyncError::Shutdown, Utc::now());
            return ReadStart::Ready(entry);
        }

        slot.fetcher = Some(Arc::clone(&fetcher));
        if !force {
            if slot.entry.is_fresh() {
                debug!("Cache hit for {}", key);
                return ReadStart::Ready(slot.entry.clone());
            }
            if let Some(waiter) = slot.joinable() {
                debug!("Joining in-flight fetch for {}", key);
                return ReadStart::Wait(waiter);
            }
        }
        ReadStart::Wait(self.start_fetch(key, slot, fetcher))
    }

    fn finish(
        &self,
        key: ResourceKey,
        start: ReadStart,
    ) -> impl Future<Output = CacheEntry> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        async move {
            let mut waiter = match start {
                ReadStart::Ready(entry) => return entry,
                ReadStart::Wait(waiter) => waiter,
            };
            loop {
                waiter.done.clone().await;
                match inner.resolve(&key, waiter.generation) {
                    Ok(entry) => return entry,
                    Err(newer) => waiter = newer,
                }
            }
        }
    }

    /// Live keys refetch only when called on a tokio runtime; elsewhere the
    /// entry is left stale for the next read.
    fn mark_stale(&self, key: &ResourceKey, slot: &mut Slot) {
        slot.entry.stale = true;
        if !self.inner.is_shut_down() && slot.has_subscribers() && Handle::try_current().is_ok() {
            if let Some(fetcher) = slot.fetcher.clone() {
                debug!("Refetching invalidated {} for live subscribers", key);
                self.start_fetch(key, slot, fetcher);
                return;
            }
        }
        debug!("Marked {} stale", key);
        slot.publish();
    }

    fn start_fetch(
        &self,
        key: &ResourceKey,
        slot: &mut Slot,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Waiter {
        // A superseded fetch keeps running; its result is discarded on settle.
        slot.generation += 1;
        let generation = slot.generation;
        slot.entry.status = FetchStatus::Loading;
        slot.entry.stale = false;
        slot.publish();

        let issued = self.inner.issued.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "Fetching {} (generation {}, fetch #{})",
            key, generation, issued
        );

        let options = self.inner.config.options_for(key).clone();
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(fetch_with_policy(fetcher.as_ref(), &task_key, &options))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(SyncError::network("fetch task panicked")));
            inner.settle(&task_key, generation, result);
        });
        let abort = handle.abort_handle();
        let done = async move {
            let _ = handle.await;
        }
        .boxed()
        .shared();

        slot.in_flight = Some(InFlight {
            generation,
            done: done.clone(),
            abort,
        });
        Waiter { generation, done }
    }
}

/// One logical fetch: attempts with the configured timeout, retrying
/// retryable failures up to `options.retry` times.
async fn fetch_with_policy(
    fetcher: &dyn ResourceFetcher,
    key: &ResourceKey,
    options: &QueryOptions,
) -> Result<Value> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let outcome = match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, fetcher.fetch(key)).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Timeout),
            },
            None => fetcher.fetch(key).await,
        };

        match outcome {
            Err(err) if err.is_retryable() && attempt <= options.retry => {
                let delay = options.backoff(attempt);
                debug!(
                    "Fetch for {} failed (attempt {}/{}), retrying in {:?}: {}",
                    key,
                    attempt,
                    options.retry + 1,
                    delay,
                    err
                );
                sleep(delay).await;
            }
            other => return other,
        }
    }
}
