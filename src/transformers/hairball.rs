//! Hairball layout: unbundled force-directed positions per community.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::contexts::NetworkContext;
use crate::graph::NetworkGlobal;
use crate::loader::{LayoutKind, LayoutSet};
use crate::models::NodeId;

use super::interpolator::TransformInterpolator;
use super::plan::{LayoutPlan, LinkPatch};
use super::{NetworkTransformer, TransformInfo};

pub struct HairballLayoutTransformer {
    layouts: Arc<LayoutSet>,
    anchor: TransformInfo,
    queued: BTreeSet<NodeId>,
}

impl HairballLayoutTransformer {
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

    fn plan(&mut self, global: &NetworkGlobal, context: &NetworkContext) -> LayoutPlan {
        let mut plan = LayoutPlan::default();
        let queued: BTreeSet<NodeId> = std::mem::take(&mut self.queued)
            .into_iter()
            .filter(|id| context.nodes.contains_key(id) && !global.is_virtual(*id))
            .collect();

        for &id in &queued {
            let Some(position) = self.layouts.position(LayoutKind::Hairball, id) else {
                tracing::warn!(node = id, "No hairball position for node");
                continue;
            };
            plan.positions.insert(id, self.anchor.transform_point(position));
            if let Some(c) = context.nodes.get(&id).and_then(|n| n.community_id) {
                plan.communities.insert(c);
            }

            for &link_id in context.outgoing_links(id) {
                let target = global.links.get(link_id).map(|l| l.target_id);
                if target.is_some_and(|t| queued.contains(&t)) {
                    plan.patch_link(link_id, LinkPatch::bundling(0.0));
                }
            }
        }

        plan
    }
}

impl NetworkTransformer for HairballLayoutTransformer {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::ContextSettings;
    use crate::models::fixtures::{self, community_root, member};
    use bevy_math::Vec3;

    #[test]
    fn test_hairball_moves_real_nodes_and_unbundles_internal_links() {
        let data = fixtures::friends_network();
        let mut global = NetworkGlobal::build(&data).unwrap();
        let mut context = NetworkContext::new(0, ContextSettings::default());
        context.set_from_global(&global);
        context.communities.values_mut().for_each(|c| c.dirty = false);

        let hairball = fixtures::friends_layout(|id| Vec3::splat(id as f32));
        let layouts = Arc::new(LayoutSet::from_files([
            (LayoutKind::Spherical, data),
            (LayoutKind::Hairball, hairball),
        ]));
        let mut transformer = HairballLayoutTransformer::new(layouts, TransformInfo::IDENTITY);

        let members: Vec<NodeId> = (0..10).map(|k| member(0, k)).collect();
        transformer.update_nodes_on_next_apply(members.iter().copied());
        transformer.update_nodes_on_next_apply([community_root(0)]);
        transformer.apply_transformation(&mut global, &mut context);

        assert_eq!(context.nodes[&member(0, 3)].position, Vec3::splat(103.0));
        assert_eq!(context.nodes[&community_root(0)].position, Vec3::ZERO);
        assert!(context.communities[&0].dirty);
        assert!(!context.communities[&2].dirty);

        // ring link 0 -> 1 is internal, 0 -> next community is not
        let internal = global.outgoing_links(member(0, 0))[0];
        assert_eq!(context.links[&internal].bundling_strength, 0.0);
        let outer = global
            .outgoing_links(member(0, 0))
            .iter()
            .copied()
            .find(|l| global.links.get(*l).unwrap().target_id == member(1, 0))
            .unwrap();
        assert_eq!(
            context.links[&outer].bundling_strength,
            context.settings.edge_bundling_strength
        );
    }
}
