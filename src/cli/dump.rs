//! Dump command handler.

use std::path::Path;

use color_eyre::Result;

use crate::contexts::NetworkContext;
use crate::models::CommunityId;
use crate::storage::CsvDumper;

use super::App;

impl App {
    /// Write the CSV dump of the main network, optionally with focused
    /// communities.
    pub fn run_dump(&self, out: &Path, focus: &[CommunityId]) -> Result<()> {
        let config = self.config()?;
        let mut manager = self.load_manager(&config)?;

        if !focus.is_empty() {
            manager.with_main(|main, global| main.cycle_community_focus(global, focus, false));
        }

        std::fs::create_dir_all(out)?;
        let contexts: Vec<&NetworkContext> = manager.networks().map(|n| &n.context).collect();
        let dump = CsvDumper::initial(manager.global()).dump(out, &contexts)?;

        tracing::info!(
            dir = %out.display(),
            communities = dump.rows.communities,
            nodes = dump.rows.nodes,
            links = dump.rows.links,
            "Dump complete"
        );
        for path in dump.files.paths() {
            println!("{}", path.display());
        }
        Ok(())
    }
}
