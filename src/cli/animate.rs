//! Animate command handler.

use color_eyre::Result;

use crate::context::AppContext;
use crate::di::FromRef;
use crate::models::CommunityId;
use crate::services::StorageService;

use super::App;

/// Stops runaway loops if a transition never finishes.
const MAX_FRAMES: usize = 100_000;

impl App {
    /// Run one transition headlessly at the configured frame rate.
    ///
    /// Each frame stores pending changes, then drains the redraw sets the
    /// way a renderer would.
    pub async fn run_animate(&self, focus: &[CommunityId], duration: Option<f32>) -> Result<()> {
        let mut config = self.config()?;
        if let Some(duration) = duration {
            config.animation.duration_secs = duration;
        }
        let dt = config.animation.frame_time();
        let mut manager = self.load_manager(&config)?;

        let ctx = AppContext::connect(config).await?;
        let storage = StorageService::from_ref(&ctx);
        storage.initial_store(&mut manager).await?;
        manager.drain_render_updates();
        manager.drain_minimap_updates();

        if focus.is_empty() {
            manager.with_main(|main, global| main.toggle_spherical_and_hairball(global, true));
        } else {
            manager.with_main(|main, global| main.cycle_community_focus(global, focus, true));
        }

        let mut frames = 0;
        let mut redrawn = (0usize, 0usize, 0usize);
        loop {
            let running = manager.tick(dt);
            frames += 1;

            storage.update_store(&mut manager).await?;
            for (subnetwork, dirty) in manager.drain_render_updates() {
                tracing::debug!(
                    frame = frames,
                    subnetwork,
                    nodes = dirty.nodes.len(),
                    links = dirty.links.len(),
                    communities = dirty.communities.len(),
                    "Redraw"
                );
                redrawn.0 += dirty.nodes.len();
                redrawn.1 += dirty.links.len();
                redrawn.2 += dirty.communities.len();
            }
            let overview = manager.drain_minimap_updates();
            if !overview.is_empty() {
                tracing::debug!(frame = frames, communities = overview.nodes.len(), "Minimap redraw");
            }

            if !running || frames >= MAX_FRAMES {
                break;
            }
        }

        tracing::info!(
            frames,
            nodes = redrawn.0,
            links = redrawn.1,
            communities = redrawn.2,
            spherical = manager.main().is_spherical(),
            "Transition complete"
        );
        println!(
            "{} frames, {} node / {} link / {} community redraws",
            frames, redrawn.0, redrawn.1, redrawn.2
        );
        Ok(())
    }
}
