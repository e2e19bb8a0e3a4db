//! Storage service: dumps a manager's contexts and hands them to the sink.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::Config;
use crate::context::AppContext;
use crate::contexts::NetworkContext;
use crate::di::FromContext;
use crate::error::AppError;
use crate::networks::NetworkManager;
use crate::storage::{CsvDumper, DumpRows, NetworkStorage};

/// Flushes networks to the configured [`NetworkStorage`].
///
/// Call before draining render updates: update stores only write entities
/// that are still flagged dirty.
#[derive(FromContext, Clone)]
pub struct StorageService {
    config: Arc<Config>,
    storage: Arc<dyn NetworkStorage>,
}

/// Where a dump is written; a temporary directory is removed on drop.
enum DumpDir {
    Kept(PathBuf),
    Temporary(TempDir),
}

impl DumpDir {
    fn path(&self) -> &std::path::Path {
        match self {
            DumpDir::Kept(path) => path,
            DumpDir::Temporary(dir) => dir.path(),
        }
    }
}

impl StorageService {
    /// Stores every entity of every network, paused or not.
    pub async fn initial_store(&self, manager: &mut NetworkManager) -> Result<DumpRows, AppError> {
        // pending requests are covered by this store
        manager.take_store_requests();
        self.flush(manager, true).await
    }

    /// Stores what changed if any network asked for it.
    ///
    /// Returns `None` while storage is paused or nothing was requested.
    pub async fn update_store(
        &self,
        manager: &mut NetworkManager,
    ) -> Result<Option<DumpRows>, AppError> {
        if manager.is_storage_paused() {
            tracing::debug!("Storage paused, skipping update");
            return Ok(None);
        }
        let requested = manager.take_store_requests();
        if requested.is_empty() {
            return Ok(None);
        }
        tracing::debug!(subnetworks = ?requested, "Storing requested networks");
        self.flush(manager, false).await.map(Some)
    }

    async fn flush(&self, manager: &NetworkManager, initial: bool) -> Result<DumpRows, AppError> {
        let dir = self.dump_dir()?;
        let contexts: Vec<&NetworkContext> = manager.networks().map(|n| &n.context).collect();

        let dumper = if initial {
            CsvDumper::initial(manager.global())
        } else {
            CsvDumper::update(manager.global())
        };
        let dump = dumper.dump(dir.path(), &contexts)?;

        let result = if initial {
            self.storage.initial_store(&dump).await
        } else {
            self.storage.update_store(&dump).await
        };
        if let Err(e) = &result {
            tracing::error!(error = %e, initial, "Failed to store networks");
        }
        result.map(|_| dump.rows)
    }

    fn dump_dir(&self) -> Result<DumpDir, AppError> {
        match &self.config.storage.dump_dir {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(|source| AppError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(DumpDir::Kept(path.clone()))
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("vidigraph-dump")
                    .tempdir()
                    .map_err(|source| AppError::Io {
                        path: std::env::temp_dir(),
                        source,
                    })?;
                Ok(DumpDir::Temporary(dir))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::FromRef;
    use crate::loader::{LayoutKind, LayoutSet};
    use crate::models::fixtures::{self, member};
    use crate::networks::MAIN_NETWORK_ID;
    use crate::storage::Dump;
    use async_trait::async_trait;
    use bevy_math::Vec3;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        stores: Mutex<Vec<(bool, DumpRows)>>,
        fail: bool,
    }

    #[async_trait]
    impl NetworkStorage for Recording {
        async fn initial_store(&self, dump: &Dump) -> Result<(), AppError> {
            assert!(dump.files.nodes.exists());
            self.stores.lock().unwrap().push((true, dump.rows));
            Ok(())
        }

        async fn update_store(&self, dump: &Dump) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::Storage("sink offline".into()));
            }
            self.stores.lock().unwrap().push((false, dump.rows));
            Ok(())
        }
    }

    fn setup(sink: Arc<Recording>) -> (StorageService, NetworkManager) {
        let layouts = Arc::new(LayoutSet::from_files([(
            LayoutKind::Spherical,
            fixtures::friends_network(),
        )]));
        let config = Config::default();
        let manager = NetworkManager::from_layouts(layouts, &config).unwrap();
        let ctx = AppContext::new(config, sink);
        (StorageService::from_ref(&ctx), manager)
    }

    #[tokio::test]
    async fn test_initial_store_writes_everything() {
        let sink = Arc::new(Recording::default());
        let (service, mut manager) = setup(sink.clone());

        let rows = service.initial_store(&mut manager).await.unwrap();
        assert_eq!(rows.nodes, 50);
        assert_eq!(rows.links, 80);
        assert!(manager.take_store_requests().is_empty());
        assert_eq!(sink.stores.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_store_waits_for_requests_and_pause() {
        let sink = Arc::new(Recording::default());
        let (service, mut manager) = setup(sink.clone());
        service.initial_store(&mut manager).await.unwrap();
        manager.drain_render_updates();

        assert!(service.update_store(&mut manager).await.unwrap().is_none());

        manager.pause_storage_update();
        manager
            .with_network(MAIN_NETWORK_ID, |network, global| {
                network.set_nodes_size(global, &[member(0, 1)], 3.0)
            })
            .unwrap();
        assert!(service.update_store(&mut manager).await.unwrap().is_none());

        manager.resume_storage_update();
        let rows = service.update_store(&mut manager).await.unwrap().unwrap();
        assert_eq!(rows.nodes, 1);
        assert!(!sink.stores.lock().unwrap().last().unwrap().0);
    }

    #[tokio::test]
    async fn test_drag_while_paused_is_stored_once_on_resume() {
        let sink = Arc::new(Recording::default());
        let (service, mut manager) = setup(sink.clone());
        service.initial_store(&mut manager).await.unwrap();
        manager.drain_render_updates();

        let moved = member(0, 1);
        manager.pause_storage_update();
        for frame in 1..=3 {
            manager
                .with_network(MAIN_NETWORK_ID, |network, global| {
                    network.set_nodes_position(global, &[(moved, Vec3::splat(frame as f32))])
                })
                .unwrap();
            assert!(service.update_store(&mut manager).await.unwrap().is_none());
            manager.drain_render_updates();
        }
        manager
            .with_network(MAIN_NETWORK_ID, |network, global| network.end_move(global))
            .unwrap();
        manager.resume_storage_update();

        let rows = service.update_store(&mut manager).await.unwrap().unwrap();
        assert_eq!(rows.nodes, 1);
        assert!(rows.communities >= 1);
        manager.drain_render_updates();

        assert!(service.update_store(&mut manager).await.unwrap().is_none());
        assert_eq!(sink.stores.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sink_failure_propagates() {
        let sink = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let (service, mut manager) = setup(sink);
        manager.resume_storage_update();

        let result = service.update_store(&mut manager).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }
}
