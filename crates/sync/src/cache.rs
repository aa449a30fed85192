//! Session-wide query cache.
//!
//! [`QueryCache`] holds the latest known value per [`QueryKey`]. Consumers
//! [`observe`](QueryCache::observe) a key with a fetch function and are
//! notified whenever the value or its status changes. Writers never touch
//! values directly; they either [`invalidate`](QueryCache::invalidate) a key
//! (stale + background refetch for observed keys) or
//! [`patch`](QueryCache::patch) it with an authoritative payload.
//!
//! Each slot's value is replaced as a whole `Arc`, so readers never see a
//! partially updated collection. Refetch and patch race freely: whichever
//! is applied last wins.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use onair_client::ApiError;
use onair_core::types::Timestamp;

use crate::keys::QueryKey;

/// A type-erased cached value.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// The future a [`QueryFn`] returns.
pub type FetchFuture = BoxFuture<'static, Result<CachedValue, ApiError>>;

/// A type-erased fetch function registered by observers.
pub type QueryFn = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// Wrap a typed async fetch into a [`QueryFn`].
pub fn query_fn<T, F, Fut>(fetch: F) -> QueryFn
where
    T: Any + Send + Sync,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetch();
        Box::pin(async move { fut.await.map(|value| Arc::new(value) as CachedValue) })
    })
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of one cache slot.
#[derive(Clone, Default)]
pub struct QuerySnapshot {
    value: Option<CachedValue>,
    /// Invalidated and not yet refetched.
    pub is_stale: bool,
    /// A background fetch is in flight.
    pub is_fetching: bool,
    /// Message of the most recent failed fetch, cleared on success.
    pub error: Option<String>,
    /// When the value was last written by a fetch or a patch.
    pub updated_at: Option<Timestamp>,
}

impl QuerySnapshot {
    /// The cached value, if there is one and it has type `T`.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone()?.downcast::<T>().ok()
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

impl fmt::Debug for QuerySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySnapshot")
            .field("has_value", &self.value.is_some())
            .field("is_stale", &self.is_stale)
            .field("is_fetching", &self.is_fetching)
            .field("error", &self.error)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

struct ActiveFetch {
    id: u64,
    token: CancellationToken,
}

struct Slot {
    /// Distinguishes a slot from one recreated under the same key after
    /// [`QueryCache::clear`].
    id: u64,
    snapshot: watch::Sender<QuerySnapshot>,
    query_fn: Option<QueryFn>,
    observers: usize,
    fetch: Option<ActiveFetch>,
    /// Bumped by every invalidation. A fetch that sees it change while in
    /// flight schedules one follow-up fetch.
    invalidations: u64,
}

struct FetchJob {
    id: u64,
    query_fn: QueryFn,
    token: CancellationToken,
}

struct CacheInner {
    slots: Mutex<HashMap<QueryKey, Slot>>,
    next_id: AtomicU64,
    /// Session token. Every fetch runs under a child of it.
    cancel: CancellationToken,
}

// ---------------------------------------------------------------------------
// QueryCache
// ---------------------------------------------------------------------------

/// Keyed store of the latest value per resource collection.
///
/// Cheap to clone; clones share state. Operations never fail. Methods that
/// may start a background fetch must be called within a Tokio runtime.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                slots: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                cancel,
            }),
        }
    }

    /// Register `query_fn` for `key` and start observing it.
    ///
    /// Fetches in the background when the slot has no value yet or is
    /// stale. The latest registered `query_fn` is the one used for
    /// refetches.
    pub fn observe<T: Any + Send + Sync>(
        &self,
        key: QueryKey,
        query_fn: QueryFn,
    ) -> QueryObserver<T> {
        let (slot_id, rx, job) = {
            let mut slots = self.slots();
            let slot = slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(self.next_id()));
            slot.query_fn = Some(query_fn);
            slot.observers += 1;

            let needs_fetch = {
                let snapshot = slot.snapshot.borrow();
                !snapshot.has_value() || snapshot.is_stale
            };
            let job = if needs_fetch { self.begin_fetch(slot) } else { None };
            (slot.id, slot.snapshot.subscribe(), job)
        };

        if let Some(job) = job {
            self.spawn_fetch(key.clone(), job);
        }

        QueryObserver {
            key,
            slot_id,
            rx,
            cache: self.clone(),
            _marker: PhantomData,
        }
    }

    /// Mark every slot under `key` stale and refetch the observed ones.
    ///
    /// Returns immediately. Invalidations that arrive before a refetch has
    /// started coalesce into it; one that arrives while a fetch is in
    /// flight causes exactly one follow-up fetch after it completes.
    pub fn invalidate(&self, key: &QueryKey) {
        let jobs: Vec<(QueryKey, FetchJob)> = {
            let mut slots = self.slots();
            slots
                .iter_mut()
                .filter(|(slot_key, _)| key.is_prefix_of(slot_key))
                .filter_map(|(slot_key, slot)| {
                    slot.invalidations += 1;
                    slot.snapshot.send_if_modified(|s| {
                        let changed = !s.is_stale;
                        s.is_stale = true;
                        changed
                    });
                    self.begin_fetch(slot).map(|job| (slot_key.clone(), job))
                })
                .collect()
        };

        tracing::debug!(key = %key, refetches = jobs.len(), "Invalidated cache key");
        for (slot_key, job) in jobs {
            self.spawn_fetch(slot_key, job);
        }
    }

    /// Overwrite the value at exactly `key` and notify observers before
    /// returning. Does not mark anything stale or start a fetch.
    pub fn patch<T: Any + Send + Sync>(&self, key: &QueryKey, value: T) {
        let value: CachedValue = Arc::new(value);
        let mut slots = self.slots();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(self.next_id()));
        slot.snapshot.send_modify(|s| {
            s.value = Some(value);
            s.is_stale = false;
            s.error = None;
            s.updated_at = Some(Utc::now());
        });
        tracing::trace!(key = %key, "Patched cache key");
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.snapshot(key)?.value::<T>()
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        self.slots()
            .get(key)
            .map(|slot| slot.snapshot.borrow().clone())
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.snapshot(key).is_some_and(|s| s.is_stale)
    }

    /// Return the fresh cached value for `key`, or fetch it inline and
    /// store it.
    ///
    /// The fetched value is not stored if `key` was invalidated while the
    /// fetch was in flight; the caller still receives it.
    pub async fn ensure<T, F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<Arc<T>, ApiError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(snapshot) = self.snapshot(key) {
            if !snapshot.is_stale {
                if let Some(value) = snapshot.value::<T>() {
                    return Ok(value);
                }
            }
        }

        let epoch = self.epoch(key);
        let value = Arc::new(fetch().await?);

        let mut slots = self.slots();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(self.next_id()));
        if slot.invalidations == epoch {
            let cached: CachedValue = value.clone();
            slot.snapshot.send_modify(|s| {
                s.value = Some(cached);
                s.is_stale = false;
                s.error = None;
                s.updated_at = Some(Utc::now());
            });
        }
        Ok(value)
    }

    /// Drop every slot and abort in-flight fetches. Used at session
    /// teardown; existing observers see their channel close.
    pub fn clear(&self) {
        let mut slots = self.slots();
        for slot in slots.values_mut() {
            if let Some(active) = slot.fetch.take() {
                active.token.cancel();
            }
        }
        let count = slots.len();
        slots.clear();
        tracing::debug!(count, "Cleared query cache");
    }

    // ---- private helpers ----

    fn slots(&self) -> MutexGuard<'_, HashMap<QueryKey, Slot>> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn epoch(&self, key: &QueryKey) -> u64 {
        self.slots().get(key).map_or(0, |slot| slot.invalidations)
    }

    /// Claim the slot for a new fetch, unless one is already in flight or
    /// nobody is observing it.
    fn begin_fetch(&self, slot: &mut Slot) -> Option<FetchJob> {
        if slot.fetch.is_some() || slot.observers == 0 {
            return None;
        }
        let query_fn = slot.query_fn.clone()?;
        let id = self.next_id();
        let token = self.inner.cancel.child_token();
        slot.fetch = Some(ActiveFetch {
            id,
            token: token.clone(),
        });
        slot.snapshot.send_modify(|s| s.is_fetching = true);
        Some(FetchJob {
            id,
            query_fn,
            token,
        })
    }

    fn spawn_fetch(&self, key: QueryKey, job: FetchJob) {
        let cache = self.clone();
        tokio::spawn(async move {
            let epoch = cache.epoch(&key);
            let result = tokio::select! {
                _ = job.token.cancelled() => {
                    tracing::debug!(key = %key, "Fetch aborted");
                    cache.abandon_fetch(&key, job.id);
                    return;
                }
                result = (job.query_fn)() => result,
            };
            cache.complete_fetch(&key, job.id, epoch, result);
        });
    }

    fn complete_fetch(
        &self,
        key: &QueryKey,
        fetch_id: u64,
        epoch: u64,
        result: Result<CachedValue, ApiError>,
    ) {
        let follow_up = {
            let mut slots = self.slots();
            let Some(slot) = slots.get_mut(key) else {
                return;
            };
            if slot.fetch.as_ref().map(|f| f.id) != Some(fetch_id) {
                return;
            }
            slot.fetch = None;

            let invalidated_in_flight = slot.invalidations != epoch;
            match result {
                Ok(value) => slot.snapshot.send_modify(|s| {
                    s.value = Some(value);
                    s.is_stale = invalidated_in_flight;
                    s.is_fetching = false;
                    s.error = None;
                    s.updated_at = Some(Utc::now());
                }),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Fetch failed, keeping previous value");
                    slot.snapshot.send_modify(|s| {
                        s.is_fetching = false;
                        s.error = Some(e.to_string());
                    });
                }
            }

            if invalidated_in_flight {
                self.begin_fetch(slot)
            } else {
                None
            }
        };

        if let Some(job) = follow_up {
            self.spawn_fetch(key.clone(), job);
        }
    }

    fn abandon_fetch(&self, key: &QueryKey, fetch_id: u64) {
        let mut slots = self.slots();
        if let Some(slot) = slots.get_mut(key) {
            if slot.fetch.as_ref().map(|f| f.id) == Some(fetch_id) {
                slot.fetch = None;
                slot.snapshot.send_modify(|s| s.is_fetching = false);
            }
        }
    }

    /// Called when an observer is dropped. The last observer leaving
    /// aborts the slot's in-flight fetch.
    fn release(&self, key: &QueryKey, slot_id: u64) {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(key) else {
            return;
        };
        if slot.id != slot_id {
            return;
        }
        slot.observers = slot.observers.saturating_sub(1);
        if slot.observers == 0 {
            if let Some(active) = slot.fetch.take() {
                tracing::debug!(key = %key, "Last observer gone, aborting fetch");
                active.token.cancel();
                slot.snapshot.send_modify(|s| s.is_fetching = false);
            }
        }
    }
}

impl Slot {
    fn new(id: u64) -> Self {
        let (snapshot, _) = watch::channel(QuerySnapshot::default());
        Self {
            id,
            snapshot,
            query_fn: None,
            observers: 0,
            fetch: None,
            invalidations: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// QueryObserver
// ---------------------------------------------------------------------------

/// A live subscription to one cache key. Dropping it releases the key.
pub struct QueryObserver<T> {
    key: QueryKey,
    slot_id: u64,
    rx: watch::Receiver<QuerySnapshot>,
    cache: QueryCache,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> QueryObserver<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.rx.borrow().clone()
    }

    pub fn value(&self) -> Option<Arc<T>> {
        self.rx.borrow().value::<T>()
    }

    /// Wait for the next change. Returns `false` once the cache slot is
    /// gone (session cleared).
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the snapshot satisfies `predicate`, checking the current
    /// one first. `None` if the slot is dropped first.
    pub async fn wait_until(
        &mut self,
        predicate: impl FnMut(&QuerySnapshot) -> bool,
    ) -> Option<QuerySnapshot> {
        self.rx
            .wait_for(predicate)
            .await
            .ok()
            .map(|snapshot| (*snapshot).clone())
    }

    /// Wait until a value satisfying `predicate` is cached.
    pub async fn wait_for_value(&mut self, predicate: impl Fn(&T) -> bool) -> Option<Arc<T>> {
        let snapshot = self
            .wait_until(|s| s.value::<T>().is_some_and(|v| predicate(&v)))
            .await?;
        snapshot.value::<T>()
    }

    /// Invalidate this observer's key.
    pub fn refetch(&self) {
        self.cache.invalidate(&self.key);
    }
}

impl<T> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        self.cache.release(&self.key, self.slot_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    async fn within<F: Future>(fut: F) -> F::Output {
        tokio::time::timeout(WAIT, fut).await.expect("timed out")
    }

    /// Fetch function returning its own call number. Calls after the
    /// first wait on `gate` when one is given.
    fn counter(calls: Arc<AtomicUsize>, gate: Option<Arc<Notify>>) -> QueryFn {
        query_fn(move || {
            let calls = Arc::clone(&calls);
            let gate = gate.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if let (Some(gate), true) = (gate, n > 1) {
                    gate.notified().await;
                }
                Ok::<_, ApiError>(n)
            }
        })
    }

    fn key() -> QueryKey {
        QueryKey::new(["things"])
    }

    #[tokio::test]
    async fn observe_fetches_initial_value() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut obs = cache.observe::<usize>(key(), counter(calls.clone(), None));
        let value = within(obs.wait_for_value(|v| *v == 1)).await.unwrap();

        assert_eq!(*value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get::<usize>(&key()).as_deref(), Some(&1));
    }

    #[tokio::test]
    async fn second_observer_reuses_cached_value() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut first = cache.observe::<usize>(key(), counter(calls.clone(), None));
        within(first.wait_for_value(|v| *v == 1)).await.unwrap();

        let second = cache.observe::<usize>(key(), counter(calls.clone(), None));
        assert_eq!(second.value().as_deref(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn burst_of_invalidations_triggers_one_refetch() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut obs = cache.observe::<usize>(key(), counter(calls.clone(), None));
        within(obs.wait_for_value(|v| *v == 1)).await.unwrap();

        cache.invalidate(&key());
        cache.invalidate(&key());
        assert!(cache.is_stale(&key()));

        within(obs.wait_for_value(|v| *v == 2)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.is_stale(&key()));
    }

    #[tokio::test]
    async fn invalidation_during_fetch_schedules_one_follow_up() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut obs = cache.observe::<usize>(key(), counter(calls.clone(), Some(gate.clone())));
        within(obs.wait_for_value(|v| *v == 1)).await.unwrap();

        cache.invalidate(&key());
        // Let the refetch start and block on the gate.
        while calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        cache.invalidate(&key());
        cache.invalidate(&key());

        gate.notify_one();
        within(obs.wait_for_value(|v| *v == 2)).await.unwrap();
        gate.notify_one();
        within(obs.wait_for_value(|v| *v == 3)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!obs.snapshot().is_stale);
    }

    #[tokio::test]
    async fn patch_notifies_synchronously_without_fetching() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut obs = cache.observe::<usize>(key(), counter(calls.clone(), None));
        within(obs.wait_for_value(|v| *v == 1)).await.unwrap();

        cache.patch(&key(), 100usize);

        assert_eq!(obs.value().as_deref(), Some(&100));
        assert!(!obs.snapshot().is_stale);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refetch_resolving_after_patch_wins() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut obs = cache.observe::<usize>(key(), counter(calls.clone(), Some(gate.clone())));
        within(obs.wait_for_value(|v| *v == 1)).await.unwrap();

        cache.invalidate(&key());
        cache.patch(&key(), 100usize);
        assert_eq!(obs.value().as_deref(), Some(&100));

        gate.notify_one();
        let last = within(obs.wait_for_value(|v| *v == 2)).await.unwrap();
        assert_eq!(*last, 2);
        assert_eq!(cache.get::<usize>(&key()).as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn patch_applied_after_refetch_wins() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut obs = cache.observe::<usize>(key(), counter(calls.clone(), Some(gate.clone())));
        within(obs.wait_for_value(|v| *v == 1)).await.unwrap();

        cache.invalidate(&key());
        gate.notify_one();
        within(obs.wait_for_value(|v| *v == 2)).await.unwrap();

        cache.patch(&key(), 100usize);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.get::<usize>(&key()).as_deref(), Some(&100));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_matches_by_prefix() {
        let cache = QueryCache::new(CancellationToken::new());
        let child = QueryKey::new(["things", "7"]);
        let other = QueryKey::new(["others"]);
        cache.patch(&child, 1usize);
        cache.patch(&other, 1usize);

        cache.invalidate(&key());

        assert!(cache.is_stale(&child));
        assert!(!cache.is_stale(&other));
    }

    #[tokio::test]
    async fn unobserved_key_is_only_marked_stale() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut obs = cache.observe::<usize>(key(), counter(calls.clone(), None));
        within(obs.wait_for_value(|v| *v == 1)).await.unwrap();
        drop(obs);

        cache.invalidate(&key());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_stale(&key()));

        let mut obs = cache.observe::<usize>(key(), counter(calls.clone(), None));
        within(obs.wait_for_value(|v| *v == 2)).await.unwrap();
    }

    #[tokio::test]
    async fn dropping_last_observer_aborts_fetch() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut obs = cache.observe::<usize>(key(), counter(calls.clone(), Some(gate.clone())));
        within(obs.wait_for_value(|v| *v == 1)).await.unwrap();

        cache.invalidate(&key());
        while calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        drop(obs);

        let snapshot = cache.snapshot(&key()).unwrap();
        assert!(!snapshot.is_fetching);
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get::<usize>(&key()).as_deref(), Some(&1));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_value() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let failing = {
            let calls = calls.clone();
            query_fn(move || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == 1 {
                        Ok(1usize)
                    } else {
                        Err(ApiError::Status {
                            resource: "things",
                            status: 500,
                            message: None,
                        })
                    }
                }
            })
        };

        let mut obs = cache.observe::<usize>(key(), failing);
        within(obs.wait_for_value(|v| *v == 1)).await.unwrap();

        cache.invalidate(&key());
        let snapshot = within(obs.wait_until(|s| s.error.is_some())).await.unwrap();

        assert_eq!(snapshot.value::<usize>().as_deref(), Some(&1));
        assert!(snapshot.is_stale);
        assert!(!snapshot.is_fetching);
    }

    #[tokio::test]
    async fn ensure_returns_fresh_value_without_fetching() {
        let cache = QueryCache::new(CancellationToken::new());
        cache.patch(&key(), 5usize);

        let value = cache
            .ensure::<usize, _, _>(&key(), || async { panic!("should not fetch") })
            .await
            .unwrap();
        assert_eq!(*value, 5);
    }

    #[tokio::test]
    async fn ensure_fetches_and_stores_when_missing() {
        let cache = QueryCache::new(CancellationToken::new());

        let value = cache
            .ensure(&key(), || async { Ok::<_, ApiError>(9usize) })
            .await
            .unwrap();

        assert_eq!(*value, 9);
        assert_eq!(cache.get::<usize>(&key()).as_deref(), Some(&9));
    }

    #[tokio::test]
    async fn clear_closes_observers() {
        let cache = QueryCache::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut obs = cache.observe::<usize>(key(), counter(calls, None));
        within(obs.wait_for_value(|v| *v == 1)).await.unwrap();

        cache.clear();

        assert!(cache.get::<usize>(&key()).is_none());
        assert!(!within(obs.changed()).await);
    }

    #[test]
    fn wrong_type_reads_as_none() {
        let cache = QueryCache::new(CancellationToken::new());
        cache.patch(&key(), 5usize);
        assert!(cache.get::<String>(&key()).is_none());
    }
}
