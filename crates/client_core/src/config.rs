use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

use crate::{
    map::MapLoader,
    query_cache::{CacheConfig, DEFAULT_CACHE_CAPACITY},
};

pub const DEFAULT_CONFIG_PATH: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub maps_api_key: Option<String>,
    pub maps_base_url: String,
    pub request_timeout_secs: Option<u64>,
    pub cache_capacity: usize,
    pub stale_after_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api/".into(),
            maps_api_key: None,
            maps_base_url: "https://maps.googleapis.com/maps/api/js".into(),
            request_timeout_secs: Some(30),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            stale_after_secs: None,
        }
    }
}

impl Settings {
    /// API base with a trailing slash so relative resource paths join under it.
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        let raw = self.api_base_url.trim();
        let mut url =
            Url::parse(raw).with_context(|| format!("invalid api_base_url '{raw}'"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api_base_url must start with http:// or https://");
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Map script loader, or None when no (non-blank) maps key is set.
    pub fn map_loader(&self) -> anyhow::Result<Option<MapLoader>> {
        let Some(key) = self.maps_api_key.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if key.is_empty() {
            return Ok(None);
        }
        let raw = self.maps_base_url.trim();
        let base = Url::parse(raw).with_context(|| format!("invalid maps_base_url '{raw}'"))?;
        Ok(Some(MapLoader::new(base, key)))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.cache_capacity.max(1),
            stale_after: self.stale_after_secs.map(Duration::from_secs),
        }
    }
}

/// Defaults, then `client.toml` (or `path`), then environment overrides.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |name| std::env::var(name).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("api_base_url") {
        settings.api_base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("maps_api_key") {
        settings.maps_api_key = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("maps_base_url") {
        settings.maps_base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("request_timeout_secs") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }
    if let Some(v) = file_cfg.get("cache_capacity") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.cache_capacity = parsed;
        }
    }
    if let Some(v) = file_cfg.get("stale_after_secs") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.stale_after_secs = Some(parsed);
        }
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("GOOGLE_MAPS_API_KEY") {
        settings.maps_api_key = Some(v);
    }
    if let Some(v) = var("APP__MAPS_API_KEY") {
        settings.maps_api_key = Some(v);
    }

    if let Some(v) = var("APP__MAPS_BASE_URL") {
        settings.maps_base_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }
    if let Some(v) = var("APP__CACHE_CAPACITY") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.cache_capacity = parsed;
        }
    }
    if let Some(v) = var("APP__STALE_AFTER_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.stale_after_secs = Some(parsed);
        }
    }
}
