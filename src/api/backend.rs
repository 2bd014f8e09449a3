// Backend operations exposed to the front-end.
// The trait is the seam between the dispatcher and the business logic.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{Payload, ResourceCache};
use crate::error::Result;
use crate::paths::APP_NAME;
use crate::settings::{Settings, SettingsStore};

/// Name and version reported to the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

impl AppInfo {
    pub fn current() -> Self {
        Self {
            name: APP_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Operations reachable through the dispatcher, one method per operation.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn app_info(&self) -> Result<AppInfo>;

    async fn get_settings(&self) -> Result<Settings>;

    /// Replace the stored settings and return them.
    async fn set_settings(&self, settings: Settings) -> Result<Settings>;

    async fn cache_has(&self, key: String) -> Result<bool>;

    async fn cache_remove(&self, key: String) -> Result<()>;

    /// Download `url` into the cache entry `key`, returning the entry path.
    async fn cache_download(&self, url: String, key: String) -> Result<PathBuf>;

    /// Persist a peer-supplied value under `key`, returning the entry path.
    async fn cache_save(&self, key: String, data: Value) -> Result<PathBuf>;
}

/// Backend over the local resource cache and settings file.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    cache: ResourceCache,
    settings: SettingsStore,
}

impl LocalBackend {
    pub fn new(cache: ResourceCache, settings: SettingsStore) -> Self {
        Self { cache, settings }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn app_info(&self) -> Result<AppInfo> {
        Ok(AppInfo::current())
    }

    async fn get_settings(&self) -> Result<Settings> {
        self.settings.load().await
    }

    async fn set_settings(&self, settings: Settings) -> Result<Settings> {
        self.settings.save(&settings).await
    }

    async fn cache_has(&self, key: String) -> Result<bool> {
        Ok(self.cache.has(&key).await)
    }

    async fn cache_remove(&self, key: String) -> Result<()> {
        self.cache.rm(&key).await
    }

    async fn cache_download(&self, url: String, key: String) -> Result<PathBuf> {
        self.cache.fetch_as_file(&url, &key).await
    }

    async fn cache_save(&self, key: String, data: Value) -> Result<PathBuf> {
        self.cache.save(&key, Payload::from_json(data)).await
    }
}
