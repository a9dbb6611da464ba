//! Application state - shared across all handlers.

use std::sync::Arc;

use hivemind_core::PostService;
use hivemind_core::error::RepoError;
use hivemind_core::ports::Storage;
use hivemind_infra::{CommentHub, InMemoryStorage};

use crate::config::{AppConfig, StorageKind};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: PostService,
    pub hub: CommentHub,
    pub storage_kind: StorageKind,
}

impl AppState {
    /// Build the application state with the configured storage engine.
    pub async fn new(config: &AppConfig) -> Result<Self, RepoError> {
        let storage: Arc<dyn Storage> = match config.storage {
            StorageKind::Memory => {
                tracing::info!("Using in-memory storage");
                Arc::new(InMemoryStorage::new())
            }
            StorageKind::Postgres => Self::postgres(config).await?,
        };

        tracing::info!("Application state initialized");
        Ok(Self::with_storage(storage, config.storage))
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::with_storage(Arc::new(InMemoryStorage::new()), StorageKind::Memory)
    }

    fn with_storage(storage: Arc<dyn Storage>, storage_kind: StorageKind) -> Self {
        let hub = CommentHub::new();
        let service = PostService::new(storage, Arc::new(hub.clone()));
        Self {
            service,
            hub,
            storage_kind,
        }
    }

    #[cfg(feature = "postgres")]
    async fn postgres(config: &AppConfig) -> Result<Arc<dyn Storage>, RepoError> {
        use hivemind_infra::database::{PostgresStorage, connect};

        let db_config = config
            .database
            .as_ref()
            .ok_or_else(|| RepoError::Connection("DATABASE_URL not set".to_string()))?;
        let conn = connect(db_config).await?;
        Ok(Arc::new(PostgresStorage::new(conn)))
    }

    #[cfg(not(feature = "postgres"))]
    async fn postgres(_config: &AppConfig) -> Result<Arc<dyn Storage>, RepoError> {
        Err(RepoError::Connection(
            "built without the postgres feature".to_string(),
        ))
    }
}
