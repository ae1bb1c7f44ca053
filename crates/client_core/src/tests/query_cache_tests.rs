use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use shared::error::ErrorKind;
use tokio::sync::Semaphore;

fn dish_key(id: &str) -> QueryKey {
    QueryKey::new("dish-info").param(id)
}

/// Fetcher that counts calls and blocks on `gate` before answering.
fn gated_fetcher(
    calls: Arc<AtomicUsize>,
    gate: Arc<Semaphore>,
    response: Result<Value, RemoteError>,
) -> impl Fn() -> BoxFuture<'static, Result<Value, RemoteError>> + Send + 'static {
    move || {
        let calls = Arc::clone(&calls);
        let gate = Arc::clone(&gate);
        let response = response.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let _permit = gate.acquire().await.expect("gate closed");
            response
        }
        .boxed()
    }
}

fn counting_fetcher(
    calls: Arc<AtomicUsize>,
    value: Value,
) -> impl Fn() -> BoxFuture<'static, Result<Value, RemoteError>> + Send + 'static {
    move || {
        let calls = Arc::clone(&calls);
        let value = value.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
        .boxed()
    }
}

fn open_gate() -> Arc<Semaphore> {
    Arc::new(Semaphore::new(Semaphore::MAX_PERMITS))
}

async fn wait_for_update(events: &mut broadcast::Receiver<CacheEvent>, key: &QueryKey) {
    loop {
        match events.recv().await.expect("cache event") {
            CacheEvent::Updated(updated) if &updated == key => return,
            _ => {}
        }
    }
}

#[tokio::test]
async fn concurrent_fetches_share_one_remote_call() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));

    let waiters = (0..5)
        .map(|_| {
            cache.fetch(
                dish_key("D1"),
                QueryOptions::default(),
                gated_fetcher(
                    Arc::clone(&calls),
                    Arc::clone(&gate),
                    Ok(json!({ "price": 50000 })),
                ),
            )
        })
        .collect::<Vec<_>>();

    let (results, ()) = tokio::join!(futures::future::join_all(waiters), async {
        tokio::task::yield_now().await;
        gate.add_permits(1);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.expect("fetch"), json!({ "price": 50000 }));
    }
}

#[tokio::test]
async fn fresh_entry_is_served_without_remote_call() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let value = cache
            .fetch(
                dish_key("D1"),
                QueryOptions::default(),
                counting_fetcher(Arc::clone(&calls), json!("pho")),
            )
            .await
            .expect("fetch");
        assert_eq!(value, json!("pho"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_fetch_reaches_every_waiter_and_stores_nothing() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let failure = RemoteError::new(ErrorKind::NotFound, "no such dish");

    let waiters = (0..3)
        .map(|_| {
            cache.fetch(
                dish_key("D404"),
                QueryOptions::default(),
                gated_fetcher(Arc::clone(&calls), Arc::clone(&gate), Err(failure.clone())),
            )
        })
        .collect::<Vec<_>>();

    let (results, ()) = tokio::join!(futures::future::join_all(waiters), async {
        tokio::task::yield_now().await;
        gate.add_permits(1);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.expect_err("must fail"), failure);
    }
    assert!(cache.peek(&dish_key("D404")).await.is_none());
}

#[tokio::test]
async fn failed_refetch_keeps_previous_stale_value() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = dish_key("D1");

    cache
        .fetch(
            key.clone(),
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls), json!("v1")),
        )
        .await
        .expect("first fetch");
    cache.invalidate(&[key.clone()]).await;

    let err = cache
        .fetch(
            key.clone(),
            QueryOptions::default(),
            gated_fetcher(
                Arc::clone(&calls),
                open_gate(),
                Err(RemoteError::transport("connection reset")),
            ),
        )
        .await
        .expect_err("refetch must fail");
    assert_eq!(err.kind, ErrorKind::Unknown);

    let snapshot = cache.peek(&key).await.expect("entry kept");
    assert_eq!(snapshot.value, Some(json!("v1")));
    assert!(snapshot.is_stale);
    assert!(!snapshot.is_fetching);
}

#[tokio::test]
async fn successful_mutation_forces_refetch_of_invalidated_keys() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let reviews = QueryKey::new("dish-reviews").param("D1");
    let info = dish_key("D1");
    let other = dish_key("D2");

    for key in [&reviews, &info, &other] {
        cache
            .fetch(
                key.clone(),
                QueryOptions::default(),
                counting_fetcher(Arc::clone(&calls), json!(key.to_string())),
            )
            .await
            .expect("prime");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let created = cache
        .mutate(&[reviews.clone(), info.clone()], async {
            Ok::<_, RemoteError>("created")
        })
        .await
        .expect("mutate");
    assert_eq!(created, "created");

    for key in [&reviews, &info, &other] {
        cache
            .fetch(
                key.clone(),
                QueryOptions::default(),
                counting_fetcher(Arc::clone(&calls), json!(key.to_string())),
            )
            .await
            .expect("refetch");
    }
    // only the two invalidated keys went back to the remote API
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn failed_mutation_leaves_cache_identical() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let keys = [dish_key("D1"), QueryKey::new("dish-reviews").param("D1")];

    for key in &keys {
        cache
            .fetch(
                key.clone(),
                QueryOptions::default(),
                counting_fetcher(Arc::clone(&calls), json!({ "key": key.to_string() })),
            )
            .await
            .expect("prime");
    }
    cache.invalidate(&[keys[1].clone()]).await;

    let mut before = Vec::new();
    for key in &keys {
        before.push(cache.peek(key).await);
    }

    let err = cache
        .mutate(&keys, async {
            Err::<(), _>(RemoteError::new(
                ErrorKind::NotAuthenticated,
                "login required",
            ))
        })
        .await
        .expect_err("must fail");
    assert_eq!(err.kind, ErrorKind::NotAuthenticated);

    for (key, snapshot) in keys.iter().zip(before) {
        assert_eq!(cache.peek(key).await, snapshot);
    }
}

#[tokio::test]
async fn invalidation_filters_match_by_prefix() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let keys = [
        QueryKey::new("dish-reviews").param("D1"),
        QueryKey::new("dish-reviews").param("D2"),
        dish_key("D1"),
    ];
    for key in &keys {
        cache
            .fetch(
                key.clone(),
                QueryOptions::default(),
                counting_fetcher(Arc::clone(&calls), json!(1)),
            )
            .await
            .expect("prime");
    }

    let mut invalidated = cache.invalidate(&[QueryKey::new("dish-reviews")]).await;
    invalidated.sort();

    assert_eq!(invalidated, vec![keys[0].clone(), keys[1].clone()]);
    assert!(!cache.peek(&keys[2]).await.expect("dish info").is_stale);
}

#[tokio::test]
async fn abandoned_waiter_does_not_cancel_the_fetch() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let key = dish_key("D1");
    let mut events = cache.subscribe();

    let waiter = {
        let cache = cache.clone();
        let fetcher = gated_fetcher(Arc::clone(&calls), Arc::clone(&gate), Ok(json!("late")));
        let key = key.clone();
        tokio::spawn(async move { cache.fetch(key, QueryOptions::default(), fetcher).await })
    };
    while cache.peek(&key).await.is_none() {
        tokio::task::yield_now().await;
    }
    waiter.abort();
    gate.add_permits(1);

    wait_for_update(&mut events, &key).await;

    let value = cache
        .fetch(
            key.clone(),
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls), json!("unused")),
        )
        .await
        .expect("cached");
    assert_eq!(value, json!("late"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_started_before_invalidation_is_not_stored() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let key = dish_key("D1");

    let old_waiter = {
        let cache = cache.clone();
        let fetcher = gated_fetcher(Arc::clone(&calls), Arc::clone(&gate), Ok(json!("old")));
        let key = key.clone();
        tokio::spawn(async move { cache.fetch(key, QueryOptions::default(), fetcher).await })
    };
    while cache.peek(&key).await.is_none() {
        tokio::task::yield_now().await;
    }

    cache.invalidate(&[key.clone()]).await;

    let new_waiter = {
        let cache = cache.clone();
        let fetcher = gated_fetcher(Arc::clone(&calls), Arc::clone(&gate), Ok(json!("new")));
        let key = key.clone();
        tokio::spawn(async move { cache.fetch(key, QueryOptions::default(), fetcher).await })
    };
    gate.add_permits(2);

    assert_eq!(old_waiter.await.expect("join").expect("old"), json!("old"));
    assert_eq!(new_waiter.await.expect("join").expect("new"), json!("new"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        cache.peek(&key).await.expect("entry").value,
        Some(json!("new"))
    );
}

#[tokio::test]
async fn retries_only_when_requested() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let flaky = {
        let calls = Arc::clone(&calls);
        move || {
            let calls = Arc::clone(&calls);
            async move {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(RemoteError::transport("flaky"))
                } else {
                    Ok(json!("ok"))
                }
            }
        }
    };

    let err = cache
        .fetch(dish_key("D1"), QueryOptions::default(), flaky.clone())
        .await
        .expect_err("no retry by default");
    assert_eq!(err.message, "flaky");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let options = QueryOptions {
        retry: 2,
        retry_delay: Duration::from_millis(1),
    };
    let value = cache
        .fetch(dish_key("D1"), options, flaky)
        .await
        .expect("retried");
    assert_eq!(value, json!("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn least_recently_accessed_entry_is_evicted_over_capacity() {
    let cache = QueryCache::new(CacheConfig {
        capacity: 2,
        stale_after: None,
    });
    let calls = Arc::new(AtomicUsize::new(0));

    for id in ["D1", "D2", "D3"] {
        cache
            .fetch(
                dish_key(id),
                QueryOptions::default(),
                counting_fetcher(Arc::clone(&calls), json!(id)),
            )
            .await
            .expect("fetch");
    }

    assert_eq!(cache.len().await, 2);
    assert!(cache.peek(&dish_key("D1")).await.is_none());
    assert!(cache.peek(&dish_key("D3")).await.is_some());
}

#[tokio::test]
async fn capacity_eviction_is_announced() {
    let cache = QueryCache::new(CacheConfig {
        capacity: 1,
        stale_after: None,
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let mut events = cache.subscribe();

    for id in ["D1", "D2"] {
        cache
            .fetch(
                dish_key(id),
                QueryOptions::default(),
                counting_fetcher(Arc::clone(&calls), json!(id)),
            )
            .await
            .expect("fetch");
    }

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            CacheEvent::Updated(dish_key("D1")),
            CacheEvent::Updated(dish_key("D2")),
            CacheEvent::Evicted(dish_key("D1")),
        ]
    );
}

#[tokio::test]
async fn evicted_entry_is_fetched_again() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let value = json!({ "price": 50000 });

    cache
        .fetch(
            dish_key("D1"),
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls), value.clone()),
        )
        .await
        .expect("first fetch");
    let mut events = cache.subscribe();

    assert!(cache.evict(&dish_key("D1")).await);
    assert!(!cache.evict(&dish_key("D1")).await);
    assert_eq!(
        events.recv().await.expect("event"),
        CacheEvent::Evicted(dish_key("D1"))
    );
    assert!(cache.peek(&dish_key("D1")).await.is_none());

    let refetched = cache
        .fetch(
            dish_key("D1"),
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls), value.clone()),
        )
        .await
        .expect("refetch");
    assert_eq!(refetched, value);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_fetch_is_announced_with_its_error() {
    let cache = QueryCache::default();
    let failure = RemoteError::new(ErrorKind::NotAuthenticated, "signed out");
    let mut events = cache.subscribe();

    let err = cache
        .fetch(
            QueryKey::new("user-session"),
            QueryOptions::default(),
            gated_fetcher(
                Arc::new(AtomicUsize::new(0)),
                open_gate(),
                Err(failure.clone()),
            ),
        )
        .await
        .expect_err("must fail");
    assert_eq!(err, failure);

    assert_eq!(
        events.recv().await.expect("event"),
        CacheEvent::Failed {
            key: QueryKey::new("user-session"),
            error: failure,
        }
    );
}

#[tokio::test]
async fn entries_older_than_stale_after_are_refetched() {
    let cache = QueryCache::new(CacheConfig {
        capacity: DEFAULT_CACHE_CAPACITY,
        stale_after: Some(Duration::from_millis(10)),
    });
    let calls = Arc::new(AtomicUsize::new(0));

    cache
        .fetch(
            dish_key("D1"),
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls), json!(1)),
        )
        .await
        .expect("fetch");
    tokio::time::sleep(Duration::from_millis(25)).await;
    assert!(cache.peek(&dish_key("D1")).await.expect("entry").is_stale);

    cache
        .fetch(
            dish_key("D1"),
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls), json!(2)),
        )
        .await
        .expect("refetch");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn clear_drops_entries_and_notifies_subscribers() {
    let cache = QueryCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    cache
        .fetch(
            QueryKey::new("user-session"),
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls), json!({ "id": "U1" })),
        )
        .await
        .expect("fetch");
    let mut events = cache.subscribe();

    cache.clear().await;

    assert!(cache.is_empty().await);
    assert_eq!(events.recv().await.expect("event"), CacheEvent::Cleared);
}

#[test]
fn query_key_display_and_matching() {
    let key = QueryKey::new("dish-recommendation").param("U1").param(10);
    assert_eq!(key.to_string(), "dish-recommendation/U1/10");
    assert_eq!(key.kind(), "dish-recommendation");
    assert!(QueryKey::new("dish-recommendation").matches(&key));
    assert!(QueryKey::new("dish-recommendation").param("U1").matches(&key));
    assert!(!QueryKey::new("dish-recommendation").param("U2").matches(&key));
    assert!(!QueryKey::new("dish-info").matches(&key));
}
