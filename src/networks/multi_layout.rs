//! The main network: spherical overview with per-community focus layouts.

use std::sync::Arc;

use crate::config::Config;
use crate::contexts::CommunityState;
use crate::graph::NetworkGlobal;
use crate::loader::LayoutSet;
use crate::models::{CommunityId, NodeId};
use crate::transformers::TransformerKind;

use super::node_link::NodeLinkNetwork;

/// Subnetwork ID of the main network.
pub const MAIN_NETWORK_ID: u32 = 0;

/// Transformers run for a layout change, in commit order.
///
/// Focus layouts snap their immediate unfocus entries before later ones
/// snapshot their start positions.
const LAYOUT_ORDER: [TransformerKind; 5] = [
    TransformerKind::Spider,
    TransformerKind::Floor,
    TransformerKind::Cluster,
    TransformerKind::Hairball,
    TransformerKind::Spherical,
];

pub struct MultiLayoutNetwork {
    pub network: NodeLinkNetwork,
    spherical: bool,
}

impl MultiLayoutNetwork {
    pub fn new(layouts: Arc<LayoutSet>, config: &Config) -> Self {
        Self {
            network: NodeLinkNetwork::new(MAIN_NETWORK_ID, layouts, config),
            spherical: true,
        }
    }

    /// Populates the context and places every node on the spherical layout.
    pub fn initialize(&mut self, global: &mut NetworkGlobal) {
        let network = &mut self.network;
        network.context.set_from_global(global);
        network
            .transformers
            .spherical
            .update_all_on_next_apply(&network.context);
        network.transform(TransformerKind::Spherical, global, false, None);
        self.spherical = true;

        for community in global.communities.iter_mut() {
            community.focus = false;
        }
        tracing::info!(
            nodes = network.context.nodes.len(),
            links = network.context.links.len(),
            communities = network.context.communities.len(),
            "Initialized main network"
        );
    }

    pub fn is_spherical(&self) -> bool {
        self.spherical
    }

    /// Advances each community to its next focus state.
    ///
    /// Only available in the spherical overview.
    pub fn cycle_community_focus(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
        animated: bool,
    ) {
        if !self.spherical {
            tracing::debug!("Community focus ignored outside the spherical layout");
            return;
        }

        for &id in ids {
            if !self.network.context.communities.contains_key(&id) {
                tracing::warn!(community = id, "Community not found in main network");
                continue;
            }
            let next = self.network.context.community_state(id).next_focus();
            self.queue_layout(global, id, next);
        }
        self.network
            .transform_many(&LAYOUT_ORDER, global, animated, None);
    }

    /// Moves communities directly to `state`.
    pub fn set_layout(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
        state: CommunityState,
        animated: bool,
    ) {
        if state == CommunityState::Other {
            tracing::warn!(state = state.as_str(), "Unsupported community layout");
            return;
        }
        for &id in ids {
            if !self.network.context.communities.contains_key(&id) {
                tracing::warn!(community = id, "Community not found in main network");
                continue;
            }
            if self.network.context.community_state(id) != state {
                self.queue_layout(global, id, state);
            }
        }
        self.network
            .transform_many(&LAYOUT_ORDER, global, animated, None);
    }

    /// Switches the whole network between spherical and hairball layouts.
    ///
    /// Leaving the spherical layout first clears every community focus.
    pub fn toggle_spherical_and_hairball(&mut self, global: &mut NetworkGlobal, animated: bool) {
        if self.spherical {
            let ids: Vec<CommunityId> = self.network.context.communities.keys().copied().collect();
            for id in ids {
                self.clear_community_state(global, id);
            }
            self.network.transform_many(
                &[
                    TransformerKind::Spider,
                    TransformerKind::Floor,
                    TransformerKind::Cluster,
                ],
                global,
                false,
                None,
            );
        }

        self.spherical = !self.spherical;
        let network = &mut self.network;
        if self.spherical {
            network
                .transformers
                .spherical
                .update_all_on_next_apply(&network.context);
            network.transform(TransformerKind::Spherical, global, animated, None);
        } else {
            let ids: Vec<NodeId> = network.context.nodes.keys().copied().collect();
            network.transformers.hairball.update_nodes_on_next_apply(ids);
            network.transform(TransformerKind::Hairball, global, animated, None);
        }
        tracing::info!(spherical = self.spherical, "Toggled main layout");
    }

    /// Brings nodes toward the viewer or returns them.
    pub fn toggle_focus_nodes(&mut self, global: &mut NetworkGlobal, ids: &[NodeId], animated: bool) {
        self.network.toggle_bring_nodes(global, ids, animated);
    }

    /// Queues the transformer work moving one community to `target`.
    fn queue_layout(&mut self, global: &mut NetworkGlobal, id: CommunityId, target: CommunityState) {
        let current = self.network.context.community_state(id);
        let transformers = &mut self.network.transformers;

        match target {
            CommunityState::None => {
                if let Some(focus) = transformers.focus_for(current) {
                    focus.set_focus_community_queue(id, false);
                } else {
                    transformers
                        .spherical
                        .update_communities_on_next_apply(global, &[id]);
                    self.set_state(id, CommunityState::None);
                }
            }
            CommunityState::Spider | CommunityState::Floor | CommunityState::Cluster => {
                if let Some(focus) = transformers.focus_for(current) {
                    focus.set_focus_community_imm(id, false);
                }
                if let Some(focus) = transformers.focus_for(target) {
                    focus.set_focus_community_queue(id, true);
                }
            }
            CommunityState::Hairball => {
                if let Some(focus) = transformers.focus_for(current) {
                    focus.set_focus_community_imm(id, false);
                }
                let members: Vec<NodeId> = self
                    .network
                    .context
                    .communities
                    .get(&id)
                    .map(|c| c.nodes.iter().copied().collect())
                    .unwrap_or_default();
                transformers.hairball.update_nodes_on_next_apply(members);
                self.set_state(id, CommunityState::Hairball);
            }
            CommunityState::Other => {}
        }

        if let Some(community) = global.communities.get_mut(id) {
            community.focus = matches!(
                target,
                CommunityState::Spider | CommunityState::Floor | CommunityState::Cluster
            );
            community.dirty = true;
        }
    }

    /// Queues an immediate unfocus of whatever layout holds the community.
    fn clear_community_state(&mut self, global: &mut NetworkGlobal, id: CommunityId) {
        let current = self.network.context.community_state(id);
        if let Some(focus) = self.network.transformers.focus_for(current) {
            focus.set_focus_community_imm(id, false);
        }
        self.set_state(id, CommunityState::None);
        if let Some(community) = global.communities.get_mut(id) {
            community.focus = false;
        }
    }

    fn set_state(&mut self, id: CommunityId, state: CommunityState) {
        if let Some(community) = self.network.context.communities.get_mut(&id) {
            community.state = state;
            community.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LayoutKind;
    use crate::models::fixtures::{self, member};
    use bevy_math::Vec3;

    fn setup() -> (NetworkGlobal, MultiLayoutNetwork) {
        let data = fixtures::friends_network();
        let mut global = NetworkGlobal::build(&data).unwrap();
        let layouts = Arc::new(LayoutSet::from_files([
            (LayoutKind::Spherical, data),
            (
                LayoutKind::Hairball,
                fixtures::friends_layout(|id| Vec3::new(0.0, id as f32, 0.0)),
            ),
            (
                LayoutKind::Cluster,
                fixtures::friends_layout(|id| Vec3::new(0.0, 0.0, id as f32)),
            ),
            (
                LayoutKind::Flat,
                fixtures::friends_layout(|id| Vec3::new(id as f32, 0.0, 0.0)),
            ),
        ]));
        let mut main = MultiLayoutNetwork::new(layouts, &Config::default());
        main.initialize(&mut global);
        (global, main)
    }

    #[test]
    fn test_initialize_places_spherical_layout() {
        let (_, main) = setup();
        let id = member(0, 3);
        assert_eq!(
            main.network.context.nodes[&id].position,
            fixtures::fibonacci_point(id, 1.0)
        );
        assert!(main.is_spherical());
        assert!(main.network.context.communities[&0].size > 0.0);
    }

    #[test]
    fn test_cycle_walks_focus_states() {
        let (mut global, mut main) = setup();
        let id = member(2, 0);
        let expected = [
            CommunityState::Spider,
            CommunityState::Floor,
            CommunityState::Cluster,
            CommunityState::None,
        ];

        for state in expected {
            main.cycle_community_focus(&mut global, &[2], false);
            assert_eq!(main.network.context.community_state(2), state);
            assert_eq!(global.communities.get(2).unwrap().focus, state.is_focused());
        }

        // back at the overview after a full cycle
        assert_eq!(
            main.network.context.nodes[&id].position,
            fixtures::fibonacci_point(id, 1.0)
        );
    }

    #[test]
    fn test_floor_focus_after_spider_animates_from_spherical() {
        let (mut global, mut main) = setup();
        let id = member(1, 4);

        main.cycle_community_focus(&mut global, &[1], false);
        main.cycle_community_focus(&mut global, &[1], true);
        main.network.tick(0.0, &mut global);
        assert_eq!(
            main.network.context.nodes[&id].position,
            fixtures::fibonacci_point(id, 1.0)
        );

        main.network.tick(1.0, &mut global);
        assert_eq!(
            main.network.context.nodes[&id].position,
            Vec3::new(id as f32, 0.0, 0.0)
        );
    }

    #[test]
    fn test_hairball_toggle_clears_focus() {
        let (mut global, mut main) = setup();
        main.set_layout(&mut global, &[0, 3], CommunityState::Cluster, false);
        assert_eq!(main.network.context.community_state(3), CommunityState::Cluster);

        main.toggle_spherical_and_hairball(&mut global, false);
        assert!(!main.is_spherical());
        assert!(main
            .network
            .context
            .communities
            .values()
            .all(|c| c.state == CommunityState::None));
        assert!(global.communities.iter().all(|c| !c.focus));
        let id = member(3, 3);
        assert_eq!(
            main.network.context.nodes[&id].position,
            Vec3::new(0.0, id as f32, 0.0)
        );

        // focus cycling is disabled in hairball mode
        main.cycle_community_focus(&mut global, &[3], false);
        assert_eq!(main.network.context.community_state(3), CommunityState::None);

        main.toggle_spherical_and_hairball(&mut global, false);
        assert_eq!(
            main.network.context.nodes[&id].position,
            fixtures::fibonacci_point(id, 1.0)
        );
    }

    #[test]
    fn test_set_layout_hairball_per_community() {
        let (mut global, mut main) = setup();
        main.set_layout(&mut global, &[4], CommunityState::Hairball, false);

        let id = member(4, 1);
        assert_eq!(main.network.context.community_state(4), CommunityState::Hairball);
        assert_eq!(
            main.network.context.nodes[&id].position,
            Vec3::new(0.0, id as f32, 0.0)
        );
        assert!(!global.communities.get(4).unwrap().focus);
    }
}
