//! Keyed response cache with per-key request coalescing.
//!
//! Every remote read goes through [`QueryCache::fetch`]. A fresh entry is
//! returned directly; otherwise exactly one fetch task runs per key and all
//! concurrent callers await the same shared result. Fetch tasks are spawned,
//! so a caller that stops waiting never cancels the request: the result still
//! lands in the cache for the next reader.
//!
//! Writes go through [`QueryCache::mutate`], which marks the declared keys
//! stale only after the remote write succeeded. Invalidation also detaches any
//! in-flight fetch of those keys; its waiters still get the pre-write value but
//! it is never stored.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::error::RemoteError;

pub const DEFAULT_CACHE_CAPACITY: usize = 512;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
const CACHE_EVENT_CAPACITY: usize = 256;

/// Resource kind plus identifying parameters, e.g. `dish-info/D1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    kind: String,
    params: Vec<String>,
}

impl QueryKey {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, value: impl ToString) -> Self {
        self.params.push(value.to_string());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Treats `self` as a filter: matches keys of the same kind whose
    /// parameters start with this key's parameters.
    pub fn matches(&self, key: &QueryKey) -> bool {
        self.kind == key.kind && key.params.starts_with(&self.params)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        for param in &self.params {
            write!(f, "/{param}")?;
        }
        Ok(())
    }
}

/// Per-call fetch behaviour. Failed fetches are not retried unless asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub retry: u32,
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            retry: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl QueryOptions {
    pub fn with_retry(retry: u32) -> Self {
        Self {
            retry,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entry count above which least recently accessed entries are dropped.
    pub capacity: usize,
    /// Age after which an entry reads as stale. `None` keeps entries fresh
    /// until invalidated.
    pub stale_after: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            stale_after: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Updated(QueryKey),
    Invalidated(QueryKey),
    Failed { key: QueryKey, error: RemoteError },
    Evicted(QueryKey),
    Cleared,
}

/// Render-side view of one key.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub value: Option<Value>,
    pub is_stale: bool,
    pub is_fetching: bool,
    pub updated_at: Option<Instant>,
}

impl QuerySnapshot {
    pub fn is_loading(&self) -> bool {
        self.is_fetching && self.value.is_none()
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Value, RemoteError>>>;

struct InFlight {
    ticket: u64,
    result: SharedFetch,
}

#[derive(Debug, Clone)]
struct CachedResource {
    value: Value,
    stale: bool,
    updated_at: Instant,
    last_accessed: Instant,
}

impl CachedResource {
    fn fresh(value: Value, now: Instant) -> Self {
        Self {
            value,
            stale: false,
            updated_at: now,
            last_accessed: now,
        }
    }

    fn is_fresh(&self, now: Instant, stale_after: Option<Duration>) -> bool {
        !self.stale
            && stale_after.map_or(true, |max_age| now.duration_since(self.updated_at) < max_age)
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CachedResource>,
    in_flight: HashMap<QueryKey, InFlight>,
    next_ticket: u64,
}

impl CacheState {
    fn evict_over_capacity(&mut self, capacity: usize, keep: &QueryKey) -> Vec<QueryKey> {
        let mut evicted = Vec::new();
        while self.entries.len() > capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(key, _)| *key != keep && !self.in_flight.contains_key(*key))
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());
            let Some(victim) = victim else {
                break;
            };
            self.entries.remove(&victim);
            evicted.push(victim);
        }
        evicted
    }
}

/// Process-wide response cache. Cloning yields another handle to the same
/// cache.
#[derive(Clone)]
pub struct QueryCache {
    state: Arc<Mutex<CacheState>>,
    config: CacheConfig,
    events: broadcast::Sender<CacheEvent>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        let (events, _) = broadcast::channel(CACHE_EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            config,
            events,
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Returns the cached value for `key` if fresh, otherwise joins or starts
    /// the single in-flight fetch for it.
    pub async fn fetch<F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> Result<Value, RemoteError>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + Send + 'static,
    {
        let pending = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let now = Instant::now();
            if let Some(entry) = state.entries.get_mut(&key) {
                if entry.is_fresh(now, self.config.stale_after) {
                    entry.last_accessed = now;
                    debug!(key = %key, "cache: fresh hit");
                    return Ok(entry.value.clone());
                }
            }

            if let Some(in_flight) = state.in_flight.get(&key) {
                debug!(key = %key, "cache: joining in-flight fetch");
                in_flight.result.clone()
            } else {
                state.next_ticket += 1;
                let ticket = state.next_ticket;
                let result = self.spawn_fetch(key.clone(), ticket, options, fetcher);
                state.in_flight.insert(
                    key,
                    InFlight {
                        ticket,
                        result: result.clone(),
                    },
                );
                result
            }
        };

        pending.await
    }

    fn spawn_fetch<F, Fut>(
        &self,
        key: QueryKey,
        ticket: u64,
        options: QueryOptions,
        fetcher: F,
    ) -> SharedFetch
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + Send + 'static,
    {
        info!(key = %key, ticket, "cache: starting fetch");
        let cache = self.clone();
        let task = tokio::spawn(async move {
            let result = fetch_with_retry(&key, options, fetcher).await;
            cache.settle(key, ticket, &result).await;
            result
        });

        async move {
            task.await.unwrap_or_else(|err| {
                Err(RemoteError::transport(format!("fetch task failed: {err}")))
            })
        }
        .boxed()
        .shared()
    }

    async fn settle(&self, key: QueryKey, ticket: u64, result: &Result<Value, RemoteError>) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let is_current = state
            .in_flight
            .get(&key)
            .is_some_and(|in_flight| in_flight.ticket == ticket);
        if !is_current {
            debug!(key = %key, ticket, "cache: discarding result of detached fetch");
            return;
        }
        state.in_flight.remove(&key);

        match result {
            Ok(value) => {
                state
                    .entries
                    .insert(key.clone(), CachedResource::fresh(value.clone(), Instant::now()));
                let evicted = state.evict_over_capacity(self.config.capacity, &key);
                drop(guard);

                debug!(key = %key, "cache: stored fresh value");
                let _ = self.events.send(CacheEvent::Updated(key));
                for key in evicted {
                    debug!(key = %key, "cache: evicted over capacity");
                    let _ = self.events.send(CacheEvent::Evicted(key));
                }
            }
            Err(err) => {
                drop(guard);
                warn!(key = %key, kind = ?err.kind, "cache: fetch failed: {err}");
                let _ = self.events.send(CacheEvent::Failed {
                    key,
                    error: err.clone(),
                });
            }
        }
    }

    /// Runs a remote write; on success marks every key matched by
    /// `invalidates` stale. A failed write leaves the cache untouched.
    pub async fn mutate<T, Fut>(&self, invalidates: &[QueryKey], write: Fut) -> Result<T, RemoteError>
    where
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        match write.await {
            Ok(output) => {
                self.invalidate(invalidates).await;
                Ok(output)
            }
            Err(err) => {
                warn!(kind = ?err.kind, "cache: mutation failed, cache untouched: {err}");
                Err(err)
            }
        }
    }

    /// Marks matching entries stale and detaches matching in-flight fetches.
    /// Returns the affected keys.
    pub async fn invalidate(&self, filters: &[QueryKey]) -> Vec<QueryKey> {
        let matches = |key: &QueryKey| filters.iter().any(|filter| filter.matches(key));
        let mut invalidated = Vec::new();
        {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            for (key, entry) in state.entries.iter_mut() {
                if matches(key) {
                    entry.stale = true;
                    invalidated.push(key.clone());
                }
            }
            let detached = state
                .in_flight
                .keys()
                .filter(|key| matches(key))
                .cloned()
                .collect::<Vec<_>>();
            for key in detached {
                state.in_flight.remove(&key);
                if !invalidated.contains(&key) {
                    invalidated.push(key);
                }
            }
        }

        info!(count = invalidated.len(), "cache: invalidated entries");
        for key in &invalidated {
            let _ = self.events.send(CacheEvent::Invalidated(key.clone()));
        }
        invalidated
    }

    /// Drops one entry; the next fetch of `key` goes to the remote API.
    pub async fn evict(&self, key: &QueryKey) -> bool {
        let removed = self.state.lock().await.entries.remove(key).is_some();
        if removed {
            let _ = self.events.send(CacheEvent::Evicted(key.clone()));
        }
        removed
    }

    /// Drops everything, including in-flight registrations. Used on session
    /// change.
    pub async fn clear(&self) {
        {
            let mut state = self.state.lock().await;
            state.entries.clear();
            state.in_flight.clear();
        }
        info!("cache: cleared");
        let _ = self.events.send(CacheEvent::Cleared);
    }

    pub async fn peek(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let state = self.state.lock().await;
        let entry = state.entries.get(key);
        let is_fetching = state.in_flight.contains_key(key);
        if entry.is_none() && !is_fetching {
            return None;
        }
        let now = Instant::now();
        Some(QuerySnapshot {
            value: entry.map(|entry| entry.value.clone()),
            is_stale: entry.map_or(true, |entry| !entry.is_fresh(now, self.config.stale_after)),
            is_fetching,
            updated_at: entry.map(|entry| entry.updated_at),
        })
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn fetch_with_retry<F, Fut>(
    key: &QueryKey,
    options: QueryOptions,
    fetcher: F,
) -> Result<Value, RemoteError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Value, RemoteError>>,
{
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < options.retry => {
                attempt += 1;
                warn!(
                    key = %key,
                    attempt,
                    max_retries = options.retry,
                    "cache: fetch failed, retrying: {err}"
                );
                tokio::time::sleep(options.retry_delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
#[path = "tests/query_cache_tests.rs"]
mod tests;
