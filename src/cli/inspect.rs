//! Inspect command handler.

use color_eyre::Result;
use serde_json::json;

use super::App;

impl App {
    /// Print a JSON summary of the dataset's Graph Model.
    pub fn run_inspect(&self) -> Result<()> {
        let config = self.config()?;
        let manager = self.load_manager(&config)?;
        let global = manager.global();

        let communities: Vec<_> = global
            .communities
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "root": c.root_node_id,
                    "members": c.nodes.len(),
                    "innerLinks": c.inner_links.len(),
                    "outerLinks": c.outer_links.len(),
                    "neighbors": c.aggregate_links,
                })
            })
            .collect();

        let summary = json!({
            "dataset": config.dataset.name,
            "root": global.root_id,
            "coded": global.coded,
            "realNodes": global.real_node_ids().len(),
            "virtualNodes": global.virtual_node_ids().len(),
            "links": global.links.len(),
            "treeLinks": global.tree_links.len(),
            "communities": communities,
            "minimapLinks": manager.minimap().links.len(),
        });

        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}
