//! Shared read cache with invalidate-then-refetch semantics.
//!
//! Each key holds one observable [`QueryState`]. Invalidating a key bumps its
//! generation and schedules a refetch; at most one fetch per key is in flight,
//! so a burst of invalidations collapses into a single follow-up fetch.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::error::{AppError, AppResult};

pub type QueryFuture<T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send>>;
pub type Fetcher<T> = Arc<dyn Fn() -> QueryFuture<T> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No fetch has settled yet.
    Pending,
    Success,
    Error,
}

#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    /// Last successful result. Kept across refetches and failed refetches.
    pub data: Option<Arc<T>>,
    pub error: Option<String>,
    /// Bumped on every invalidation.
    pub generation: u64,
    pub is_fetching: bool,
}

impl<T> QueryState<T> {
    fn pending() -> Self {
        Self {
            status: QueryStatus::Pending,
            data: None,
            error: None,
            generation: 0,
            is_fetching: false,
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.is_fetching && self.status != QueryStatus::Pending
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            generation: self.generation,
            is_fetching: self.is_fetching,
        }
    }
}

struct Entry<T> {
    state: watch::Sender<QueryState<T>>,
    fetcher: Fetcher<T>,
    in_flight: bool,
    rerun: bool,
}

pub struct QueryCache<T> {
    entries: Arc<Mutex<HashMap<QueryKey, Entry<T>>>>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Send + Sync + 'static> QueryCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to `key` and fetches it unless a fetch is already running.
    /// The first mount registers the fetcher used by later invalidations.
    pub fn mount(&self, key: QueryKey, fetcher: Fetcher<T>) -> QueryHandle<T> {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
            state: watch::channel(QueryState::pending()).0,
            fetcher,
            in_flight: false,
            rerun: false,
        });
        let rx = entry.state.subscribe();
        if !entry.in_flight {
            self.start_fetch(key.clone(), entry);
        }

        QueryHandle {
            key,
            rx,
            cache: self.clone(),
        }
    }

    /// Marks `key` stale and schedules a refetch. Returns false for a key that
    /// was never mounted.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };

        entry.state.send_modify(|state| state.generation += 1);
        if entry.in_flight {
            tracing::debug!(key = %key, "Query refetch coalesced into in-flight fetch");
            entry.rerun = true;
        } else {
            self.start_fetch(key.clone(), entry);
        }
        true
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<QueryState<T>> {
        self.lock().get(key).map(|entry| entry.state.borrow().clone())
    }

    fn start_fetch(&self, key: QueryKey, entry: &mut Entry<T>) {
        entry.in_flight = true;
        entry.state.send_modify(|state| state.is_fetching = true);

        let fetcher = entry.fetcher.clone();
        let cache = self.clone();
        tracing::debug!(key = %key, "Query fetch started");
        tokio::spawn(async move {
            // A panicking fetcher must still settle the key, or it stays in flight forever.
            let result = match tokio::spawn(async move { fetcher().await }).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(key = %key, "Query fetch task failed: {}", e);
                    Err(AppError::Internal(format!("query fetch failed: {}", e)))
                }
            };
            cache.settle(key, result);
        });
    }

    fn settle(&self, key: QueryKey, result: AppResult<T>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(&key) else {
            return;
        };

        entry.state.send_modify(|state| match result {
            Ok(data) => {
                state.status = QueryStatus::Success;
                state.data = Some(Arc::new(data));
                state.error = None;
            }
            Err(e) => {
                state.status = QueryStatus::Error;
                state.error = Some(e.to_string());
            }
        });

        if entry.rerun {
            entry.rerun = false;
            self.start_fetch(key, entry);
        } else {
            entry.in_flight = false;
            entry.state.send_modify(|state| state.is_fetching = false);
            tracing::debug!(key = %key, "Query settled");
        }
    }
}

/// A mounted query: observes one key of a [`QueryCache`].
pub struct QueryHandle<T> {
    key: QueryKey,
    rx: watch::Receiver<QueryState<T>>,
    cache: QueryCache<T>,
}

impl<T: Send + Sync + 'static> QueryHandle<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn snapshot(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    /// Waits until every scheduled fetch for this key has settled.
    pub async fn settled(&mut self) -> QueryState<T> {
        if let Ok(state) = self.rx.wait_for(|state| state.is_settled()).await {
            return (*state).clone();
        }
        self.snapshot()
    }

    /// Waits for the next state change of any kind.
    pub async fn changed(&mut self) -> QueryState<T> {
        let _ = self.rx.changed().await;
        self.snapshot()
    }

    pub fn refetch(&self) {
        self.cache.invalidate(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_fetcher(calls: Arc<AtomicUsize>, delay: Duration) -> Fetcher<usize> {
        Arc::new(move || {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(delay).await;
                Ok::<_, AppError>(n)
            })
        })
    }

    #[tokio::test]
    async fn test_mount_fetches_once() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handle = cache.mount(
            QueryKey::new("count"),
            counting_fetcher(calls.clone(), Duration::ZERO),
        );

        assert!(handle.snapshot().is_fetching);
        let state = handle.settled().await;
        assert_eq!(state.status, QueryStatus::Success);
        assert_eq!(state.data.as_deref(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidation_burst_coalesces() {
        let cache = QueryCache::new();
        let key = QueryKey::new("count");
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handle = cache.mount(
            key.clone(),
            counting_fetcher(calls.clone(), Duration::from_millis(20)),
        );

        for _ in 0..5 {
            assert!(cache.invalidate(&key));
        }
        let state = handle.settled().await;

        // The mount fetch plus exactly one follow-up for the whole burst.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.data.as_deref(), Some(&2));
        assert_eq!(state.generation, 5);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_data() {
        let cache: QueryCache<usize> = QueryCache::new();
        let key = QueryKey::new("flaky");
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher: Fetcher<usize> = {
            let calls = calls.clone();
            Arc::new(move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if n == 0 {
                        Ok(7)
                    } else {
                        Err(AppError::Backend("connection reset".into()))
                    }
                })
            })
        };
        let mut handle = cache.mount(key.clone(), fetcher);
        handle.settled().await;

        handle.refetch();
        let state = handle.settled().await;
        assert_eq!(state.status, QueryStatus::Error);
        assert_eq!(state.error.as_deref(), Some("connection reset"));
        assert_eq!(state.data.as_deref(), Some(&7));
    }

    #[tokio::test]
    async fn test_panicking_fetch_settles_as_error() {
        let cache: QueryCache<usize> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher: Fetcher<usize> = {
            let calls = calls.clone();
            Arc::new(move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if n == 0 {
                        panic!("decoder bug");
                    }
                    Ok::<_, AppError>(n)
                })
            })
        };
        let mut handle = cache.mount(QueryKey::new("fragile"), fetcher);

        let state = handle.settled().await;
        assert_eq!(state.status, QueryStatus::Error);
        assert!(!state.is_fetching);
        assert!(state.error.unwrap().starts_with("Internal error: query fetch failed"));

        handle.refetch();
        let state = handle.settled().await;
        assert_eq!(state.status, QueryStatus::Success);
        assert_eq!(state.data.as_deref(), Some(&1));
    }

    #[tokio::test]
    async fn test_invalidate_unknown_key() {
        let cache: QueryCache<usize> = QueryCache::new();
        assert!(!cache.invalidate(&QueryKey::new("missing")));
        assert!(cache.snapshot(&QueryKey::new("missing")).is_none());
    }

    #[tokio::test]
    async fn test_second_mount_shares_state() {
        let cache = QueryCache::new();
        let key = QueryKey::new("count");
        let calls = Arc::new(AtomicUsize::new(0));
        let mut first = cache.mount(
            key.clone(),
            counting_fetcher(calls.clone(), Duration::ZERO),
        );
        first.settled().await;

        let mut second = cache.mount(
            key.clone(),
            counting_fetcher(calls.clone(), Duration::ZERO),
        );
        let state = second.settled().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.snapshot().data, state.data);
    }
}
