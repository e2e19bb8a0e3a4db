//! Application context providing the dependency injection root.

use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::di::Context as ContextDerive;
use crate::error::AppError;
use crate::storage::{DumpOnlyStorage, Neo4jStorage, NetworkStorage};

/// Shared dependencies; `#[derive(Context)]` makes each field extractable
/// by services.
#[derive(ContextDerive, Clone)]
pub struct AppContext {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Sink receiving network dumps.
    pub storage: Arc<dyn NetworkStorage>,
}

impl AppContext {
    pub fn new(config: Config, storage: Arc<dyn NetworkStorage>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
        }
    }

    /// Builds the context with the sink selected by `[storage] backend`.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let storage: Arc<dyn NetworkStorage> = match config.storage.backend {
            StorageBackend::Dump => Arc::new(DumpOnlyStorage),
            StorageBackend::Neo4j => {
                let neo4j = config.neo4j.as_ref().ok_or_else(|| {
                    AppError::Storage("storage backend is neo4j but [neo4j] is not configured".into())
                })?;
                Arc::new(Neo4jStorage::connect(neo4j).await?)
            }
        };
        tracing::debug!(backend = ?config.storage.backend, "Selected storage backend");
        Ok(Self::new(config, storage))
    }
}
