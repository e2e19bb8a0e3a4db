//! Places the whole network under a world anchor, e.g. flattened onto a
//! surface.

use crate::contexts::NetworkContext;
use crate::graph::NetworkGlobal;

use super::interpolator::TransformInterpolator;
use super::plan::LayoutPlan;
use super::{NetworkTransformer, TransformInfo};

/// Maps every real node's current position through one anchor transform.
pub struct WorldTransformTransformer {
    anchor: TransformInfo,
}

impl WorldTransformTransformer {
    pub fn new(anchor: TransformInfo) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> TransformInfo {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: TransformInfo) {
        self.anchor = anchor;
    }

    fn plan(&self, global: &NetworkGlobal, context: &NetworkContext) -> LayoutPlan {
        let mut plan = LayoutPlan::default();
        for (&id, node) in &context.nodes {
            if global.is_virtual(id) {
                continue;
            }
            plan.positions
                .insert(id, self.anchor.transform_point(node.position));
            if let Some(community) = node.community_id {
                plan.communities.insert(community);
            }
        }
        plan
    }
}

impl NetworkTransformer for WorldTransformTransformer {
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
    use crate::models::fixtures::{self, member};
    use bevy_math::{Quat, Vec3};

    fn setup() -> (NetworkGlobal, NetworkContext) {
        let mut global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();
        let mut context = NetworkContext::new(0, ContextSettings::default());
        context.set_from_global(&global);
        for (i, node) in context.nodes.values_mut().enumerate() {
            node.position = Vec3::new(i as f32, 1.0, 0.0);
        }
        context.drain_dirty(&mut global);
        (global, context)
    }

    fn flatten() -> TransformInfo {
        TransformInfo {
            translation: Vec3::new(0.0, -1.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::new(1.0, 0.0, 1.0),
        }
    }

    #[test]
    fn test_apply_maps_real_nodes_through_anchor() {
        let (mut global, mut context) = setup();
        let id = member(1, 3);
        let before = context.nodes[&id].position;
        let root = global.root_id;
        let root_before = context.nodes[&root].position;

        WorldTransformTransformer::new(flatten()).apply_transformation(&mut global, &mut context);

        assert_eq!(context.nodes[&id].position, Vec3::new(before.x, -1.0, 0.0));
        assert!(context.nodes[&id].dirty);
        assert!(context.communities[&1].dirty);
        assert_eq!(context.nodes[&root].position, root_before);
    }

    #[test]
    fn test_interpolator_eases_to_anchored_positions() {
        let (mut global, mut context) = setup();
        let id = member(3, 0);
        let start = context.nodes[&id].position;

        let mut world = WorldTransformTransformer::new(flatten());
        let mut interpolator = world.get_interpolator(&mut global, &mut context);
        interpolator.interpolate(0.0, &mut context);
        assert_eq!(context.nodes[&id].position, start);
        interpolator.interpolate(1.0, &mut context);
        assert_eq!(context.nodes[&id].position, flatten().transform_point(start));
    }
}
