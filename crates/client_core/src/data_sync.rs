use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{
    error::RemoteError,
    query_cache::{CacheEvent, QueryCache, QueryKey, QueryOptions},
    transport::{ApiRequest, RemoteApi},
};

/// A remote write plus the cache keys it makes stale.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub request: ApiRequest,
    pub invalidates: Vec<QueryKey>,
}

impl MutationRequest {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            invalidates: Vec::new(),
        }
    }

    pub fn invalidates(mut self, key: QueryKey) -> Self {
        self.invalidates.push(key);
        self
    }
}

/// Typed reads and writes over a [`RemoteApi`], routed through one shared
/// [`QueryCache`].
#[derive(Clone)]
pub struct DataSync {
    api: Arc<dyn RemoteApi>,
    cache: QueryCache,
}

impl DataSync {
    pub fn new(api: Arc<dyn RemoteApi>, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.cache.subscribe()
    }

    /// Cached read. Payloads that do not decode as `T` fail the fetch and are
    /// never stored.
    pub async fn query<T>(
        &self,
        key: QueryKey,
        request: ApiRequest,
        options: QueryOptions,
    ) -> Result<T, RemoteError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        let value = self
            .cache
            .fetch(key, options, move || {
                let api = Arc::clone(&api);
                let request = request.clone();
                async move {
                    let value = api.send(request).await?;
                    serde_json::from_value::<T>(value.clone()).map_err(RemoteError::malformed)?;
                    Ok(value)
                }
            })
            .await?;
        serde_json::from_value(value).map_err(RemoteError::malformed)
    }

    /// Uncached write. The invalidation set is applied once the server
    /// accepted the write, even if its response then fails to decode, so
    /// writes whose body is not needed should decode into
    /// [`serde::de::IgnoredAny`].
    pub async fn mutate<T>(&self, mutation: MutationRequest) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
    {
        let MutationRequest {
            request,
            invalidates,
        } = mutation;
        let value: Value = self
            .cache
            .mutate(&invalidates, self.api.send(request))
            .await?;
        serde_json::from_value(value).map_err(RemoteError::malformed)
    }

    /// Uncached write that is not tied to any cached resource.
    pub async fn send<T>(&self, request: ApiRequest) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
    {
        self.mutate(MutationRequest::new(request)).await
    }
}

#[cfg(test)]
#[path = "tests/data_sync_tests.rs"]
mod tests;
