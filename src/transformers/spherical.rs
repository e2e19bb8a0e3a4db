//! Spherical layout: the precomputed overview positions.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::contexts::{CommunityState, NetworkContext};
use crate::graph::NetworkGlobal;
use crate::loader::{LayoutKind, LayoutSet};
use crate::models::{CommunityId, NodeId};

use super::interpolator::TransformInterpolator;
use super::plan::{LayoutPlan, LinkPatch};
use super::{NetworkTransformer, TransformInfo};

/// Restores queued nodes to their spherical layout positions.
pub struct SphericalLayoutTransformer {
    layouts: Arc<LayoutSet>,
    anchor: TransformInfo,
    queued: BTreeSet<NodeId>,
}

impl SphericalLayoutTransformer {
    pub fn new(layouts: Arc<LayoutSet>, anchor: TransformInfo) -> Self {
        Self {
            layouts,
            anchor,
            queued: BTreeSet::new(),
        }
    }

    pub fn update_nodes_on_next_apply(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.queued.extend(ids);
    }

    /// Queues each community's members, its root and the root's ancestors.
    pub fn update_communities_on_next_apply(
        &mut self,
        global: &NetworkGlobal,
        ids: &[CommunityId],
    ) {
        for &id in ids {
            self.queued.extend(global.community_scaffolding(id));
            if let Some(community) = global.communities.get(id) {
                self.queued.extend(community.nodes.iter().copied());
            }
        }
    }

    /// Queues every node of the context.
    pub fn update_all_on_next_apply(&mut self, context: &NetworkContext) {
        self.queued.extend(context.nodes.keys().copied());
    }

    fn plan(&mut self, global: &NetworkGlobal, context: &NetworkContext) -> LayoutPlan {
        let mut plan = LayoutPlan::default();
        let settings = &context.settings;

        for id in std::mem::take(&mut self.queued) {
            if !context.nodes.contains_key(&id) {
                continue;
            }
            let Some(position) = self.layouts.position(LayoutKind::Spherical, id) else {
                tracing::warn!(node = id, "No spherical position for node");
                continue;
            };
            plan.positions.insert(id, self.anchor.transform_point(position));

            for &link_id in context.node_links(id) {
                let Some(link) = global.links.get(link_id) else {
                    continue;
                };
                let mut patch = LinkPatch::bundling(settings.edge_bundling_strength);
                if link.source_id == id {
                    patch.bundle_start = Some(true);
                }
                if link.target_id == id {
                    patch.bundle_end = Some(true);
                }
                if context.node_state(link.other_end(id)) == CommunityState::None {
                    patch.alpha = Some(settings.link_normal_alpha);
                }
                plan.patch_link(link_id, patch);
            }
        }

        plan.all_communities = true;
        plan
    }
}

impl NetworkTransformer for SphericalLayoutTransformer {
    fn apply_transformation(&mut self, global: &mut NetworkGlobal, context: &mut NetworkContext) {
        self.plan(global, context).commit(global, context);
    }

    fn get_interpolator(
        &mut self,
        global: &mut NetworkGlobal,
        context: &mut NetworkContext,
    ) -> Box<dyn TransformInterpolator> {
        self.plan(global, context).into_interpolator(global, context)
    }
}
