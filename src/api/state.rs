use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::cache::{CacheBackend, CacheError, FjallCache, MemoryCache};
use crate::client::{ClientSettings, ReliefWebApiClient, ReqwestTransport, TransportError};
use crate::config::{CacheBackendKind, Config};
use crate::observability::Metrics;
use crate::resource::{FjallResourceStore, ResourceError, ResourceManager, ResourceSettings};
use crate::storage::{AttachmentStore, StorageError};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to open cache: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to create HTTP transport: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to open resource store: {0}")]
    Resource(#[from] ResourceError),

    #[error("Failed to open attachment storage: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resources: ResourceManager,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, resources: ResourceManager) -> Self {
        let metrics = resources.client().metrics().clone();
        Self {
            config: Arc::new(config),
            resources,
            metrics,
        }
    }

    /// Wire every component from the configuration
    pub fn build(config: Config) -> Result<Self, StateError> {
        let cache: Arc<dyn CacheBackend> = match config.cache.backend {
            CacheBackendKind::Memory => Arc::new(MemoryCache::new()),
            CacheBackendKind::Fjall => Arc::new(FjallCache::open(&config.cache.path)?),
        };
        info!(backend = ?config.cache.backend, "Response cache ready");

        let transport = Arc::new(ReqwestTransport::new(&config.api)?);
        let client = ReliefWebApiClient::new(transport, cache, ClientSettings::from_config(&config))
            .with_metrics(Arc::new(Metrics::new()));

        let store = Arc::new(FjallResourceStore::open(&config.server.store_path)?);
        let attachments = AttachmentStore::from_config(&config.storage)?;

        let resources = ResourceManager::new(
            client,
            store,
            attachments,
            ResourceSettings::from_config(&config),
        );

        Ok(Self::new(config, resources))
    }
}
