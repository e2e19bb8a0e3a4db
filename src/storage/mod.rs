//! Persistence sinks for render contexts.
//!
//! Every store goes through a CSV dump first; sinks decide what to do with
//! the files.

mod csv_dump;
mod neo4j;

use async_trait::async_trait;

use crate::error::AppError;

pub use csv_dump::{CsvDumper, Dump, DumpFiles, DumpRows, PropColumn, PropKind, DELIMITER};
pub use neo4j::{file_uri, Neo4jStorage};

/// Destination of network dumps.
#[async_trait]
pub trait NetworkStorage: Send + Sync {
    /// First store of a session: every entity with its domain properties.
    async fn initial_store(&self, dump: &Dump) -> Result<(), AppError>;

    /// Later stores: only what changed since the previous one.
    async fn update_store(&self, dump: &Dump) -> Result<(), AppError>;
}

/// Only logs the dump. Files outlive the store when `[storage] dump_dir`
/// is set.
#[derive(Debug, Clone, Default)]
pub struct DumpOnlyStorage;

#[async_trait]
impl NetworkStorage for DumpOnlyStorage {
    async fn initial_store(&self, dump: &Dump) -> Result<(), AppError> {
        tracing::info!(
            nodes = %dump.files.nodes.display(),
            links = %dump.files.links.display(),
            rows = dump.rows.nodes + dump.rows.links + dump.rows.communities,
            "Wrote initial dump"
        );
        Ok(())
    }

    async fn update_store(&self, dump: &Dump) -> Result<(), AppError> {
        tracing::debug!(
            nodes = dump.rows.nodes,
            links = dump.rows.links,
            communities = dump.rows.communities,
            "Wrote update dump"
        );
        Ok(())
    }
}
