//! Store command handler.

use color_eyre::Result;

use crate::context::AppContext;
use crate::di::FromRef;
use crate::services::StorageService;

use super::App;

impl App {
    /// Run the initial store of the main network through the configured sink.
    pub async fn run_store(&self) -> Result<()> {
        let config = self.config()?;
        let mut manager = self.load_manager(&config)?;

        let ctx = AppContext::connect(config).await?;
        let storage = StorageService::from_ref(&ctx);

        let rows = storage.initial_store(&mut manager).await.map_err(|e| {
            color_eyre::eyre::eyre!("Initial store failed: {}", e)
        })?;
        tracing::info!(
            communities = rows.communities,
            nodes = rows.nodes,
            links = rows.links,
            "Initial store complete"
        );
        Ok(())
    }
}
