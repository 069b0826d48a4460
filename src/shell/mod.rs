//! Offline cache manager.
//!
//! Every resource fetch made by the application shell is routed through
//! [`OfflineCache::respond`]. Attendance service calls go to the network only,
//! with a synthesized JSON 503 when offline. Static assets are served
//! cache-first out of the current generation, falling back to the network and
//! finally to an offline HTML page.
//!
//! Generations follow an install / activate lifecycle: install populates the
//! current generation from a fixed manifest (all or nothing), activation deletes
//! every other generation.

mod fallback;
mod fetch;
mod network;
#[cfg(test)]
pub(crate) mod stub;

pub use fallback::*;
pub use fetch::*;
pub use network::*;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use futures::future::try_join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::ControlMessage;

/// Cache manager settings. `cache_name` is the version tag of the current generation.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Name of the current generation
    pub cache_name: String,
    /// Paths (or absolute URLs) populated at install
    pub manifest: Vec<String>,
    /// Substring identifying attendance service requests
    pub service_pattern: String,
    /// Base URL that manifest paths resolve against
    pub origin: String,
}

impl From<&Config> for CacheConfig {
    fn from(config: &Config) -> Self {
        Self {
            cache_name: config.cache_name.clone(),
            manifest: config.cache_manifest.clone(),
            service_pattern: config.service_pattern.clone(),
            origin: config.origin.clone(),
        }
    }
}

/// Lifecycle of the cache manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    /// Active and controlling all fetches.
    Activated,
    /// Install failed; this generation will never activate.
    Redundant,
}

pub struct OfflineCache {
    config: CacheConfig,
    repo: Arc<Repository>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
}

impl OfflineCache {
    pub fn new(config: CacheConfig, repo: Arc<Repository>, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            repo,
            network,
            state: RwLock::new(WorkerState::Parsed),
        }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
    }

    /// Resolve a manifest path against the origin. Absolute URLs pass through.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.origin, path)
        }
    }

    fn is_service_request(&self, request: &FetchRequest) -> bool {
        !self.config.service_pattern.is_empty() && request.url.contains(&self.config.service_pattern)
    }

    /// Install then activate without waiting for the previous generation's consumers.
    pub async fn start(&self) -> Result<(), AppError> {
        self.install().await?;
        self.skip_waiting().await
    }

    /// Populate the current generation with every manifest resource.
    ///
    /// Nothing is stored unless every resource fetched with a 2xx status.
    pub async fn install(&self) -> Result<(), AppError> {
        self.set_state(WorkerState::Installing).await;
        info!("Installing cache generation {}", self.config.cache_name);

        let fetches = self.config.manifest.iter().map(|path| {
            let url = self.resolve(path);
            async move {
                let response = self
                    .network
                    .fetch(FetchRequest::get(url.clone()))
                    .await
                    .map_err(|e| AppError::Install(format!("Failed to fetch {}: {}", url, e)))?;

                if !response.status.is_success() {
                    return Err(AppError::Install(format!(
                        "Failed to fetch {}: status {}",
                        url, response.status
                    )));
                }

                Ok((url, response))
            }
        });

        let stored = match try_join_all(fetches).await {
            Ok(entries) => self
                .repo
                .put_all_cache(&self.config.cache_name, &entries)
                .await
                .map(|()| entries.len()),
            Err(e) => Err(e),
        };

        match stored {
            Ok(count) => {
                self.set_state(WorkerState::Installed).await;
                info!("Cached {} resources into {}", count, self.config.cache_name);
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                warn!("Install of {} failed: {}", self.config.cache_name, e);
                Err(e)
            }
        }
    }

    /// Activate a waiting generation now. No-op in any other state.
    pub async fn skip_waiting(&self) -> Result<(), AppError> {
        if self.state().await == WorkerState::Installed {
            self.activate().await
        } else {
            debug!("skip waiting ignored in state {:?}", self.state().await);
            Ok(())
        }
    }

    /// Delete every generation except the current one, then take control.
    pub async fn activate(&self) -> Result<(), AppError> {
        self.set_state(WorkerState::Activating).await;
        info!("Activating cache generation {}", self.config.cache_name);

        self.repo.open_cache(&self.config.cache_name).await?;
        for name in self.repo.cache_names().await? {
            if name != self.config.cache_name {
                info!("Deleting stale cache generation {}", name);
                self.repo.delete_cache(&name).await?;
            }
        }

        let entries = self.repo.cache_len(&self.config.cache_name).await?;
        self.set_state(WorkerState::Activated).await;
        info!(
            "Cache generation {} is active with {} entries",
            self.config.cache_name, entries
        );
        Ok(())
    }

    /// Answer one intercepted fetch. Never fails.
    pub async fn respond(&self, request: FetchRequest) -> FetchResponse {
        if self.is_service_request(&request) {
            self.network_only(request).await
        } else {
            self.cache_first(request).await
        }
    }

    async fn network_only(&self, request: FetchRequest) -> FetchResponse {
        let url = request.url.clone();
        match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Service request to {} failed: {}", url, e);
                offline_service_response()
            }
        }
    }

    async fn cache_first(&self, request: FetchRequest) -> FetchResponse {
        let url = request.url.clone();
        let cacheable = request.method == Method::GET;

        if cacheable {
            match self.repo.match_cache(&self.config.cache_name, &url).await {
                Ok(Some(cached)) => {
                    debug!(content_type = ?cached.content_type(), "Serving {} from cache", url);
                    return cached;
                }
                Ok(None) => {}
                Err(e) => debug!("Cache lookup for {} failed: {}", url, e),
            }
        }

        debug!("Fetching {} from network", url);
        match self.network.fetch(request).await {
            Ok(response) => {
                if cacheable && response.is_cacheable() {
                    self.store_in_background(url, response.clone());
                }
                response
            }
            Err(e) => {
                warn!("Fetch of {} failed, serving offline page: {}", url, e);
                offline_page_response()
            }
        }
    }

    /// Best-effort write; failures are logged and never retried.
    fn store_in_background(&self, url: String, response: FetchResponse) {
        let repo = self.repo.clone();
        let name = self.config.cache_name.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.put_cache(&name, &url, &response).await {
                warn!("Failed to cache {}: {}", url, e);
            }
        });
    }

    /// Handle a control message. Neither command produces a reply.
    pub async fn handle_message(&self, message: ControlMessage) {
        match message {
            ControlMessage::SkipWaiting => {
                if let Err(e) = self.skip_waiting().await {
                    warn!("Skip waiting failed: {}", e);
                }
            }
            ControlMessage::ClearCache => match self.repo.delete_cache(&self.config.cache_name).await {
                Ok(_) => info!("Cleared cache generation {}", self.config.cache_name),
                Err(e) => warn!("Failed to clear cache {}: {}", self.config.cache_name, e),
            },
        }
    }
}

#[async_trait]
impl Network for OfflineCache {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, AppError> {
        Ok(self.respond(request).await)
    }
}
