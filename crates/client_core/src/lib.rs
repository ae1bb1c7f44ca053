use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::info;

pub mod api;
pub mod config;
pub mod data_sync;
pub mod display;
pub mod error;
pub mod keys;
pub mod map;
pub mod notifications;
pub mod query_cache;
pub mod registration;
pub mod transport;
pub mod validation;

pub use api::{Auth, Dishes, Restaurants, Socials};
pub use config::{load_settings, Settings};
pub use data_sync::{DataSync, MutationRequest};
pub use error::{ClientError, RemoteError, ValidationError};
pub use query_cache::{CacheConfig, CacheEvent, QueryCache, QueryKey, QueryOptions, QuerySnapshot};
pub use registration::{MultiStepForm, RegistrationDraft, RegistrationFlow};
pub use transport::{ApiRequest, HttpTransport, Method, RemoteApi};

/// Entry point for render code: one cache and one remote API shared by every
/// resource handle. Cheap to clone.
#[derive(Clone)]
pub struct FoodClient {
    sync: DataSync,
}

impl FoodClient {
    pub fn new(api: Arc<dyn RemoteApi>, cache: QueryCache) -> Self {
        Self {
            sync: DataSync::new(api, cache),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.api_base_url()?;
        let transport = HttpTransport::new(base_url.clone(), settings.request_timeout())
            .context("failed to build http transport")?;
        let cache = QueryCache::new(settings.cache_config());
        info!(base_url = %base_url, capacity = cache.config().capacity, "client: ready");
        Ok(Self::new(Arc::new(transport), cache))
    }

    pub fn dishes(&self) -> Dishes<'_> {
        Dishes::new(&self.sync)
    }

    pub fn restaurants(&self) -> Restaurants<'_> {
        Restaurants::new(&self.sync)
    }

    pub fn socials(&self) -> Socials<'_> {
        Socials::new(&self.sync)
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth::new(&self.sync)
    }

    pub fn sync(&self) -> &DataSync {
        &self.sync
    }

    pub fn cache(&self) -> &QueryCache {
        self.sync.cache()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sync.subscribe()
    }
}
