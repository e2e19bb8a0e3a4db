//! Pulls individual nodes toward the viewer and sends them back.

use std::collections::BTreeMap;

use bevy_math::Vec3;

use crate::config::BringNodeConfig;
use crate::contexts::NetworkContext;
use crate::graph::NetworkGlobal;
use crate::models::NodeId;

use super::interpolator::TransformInterpolator;
use super::plan::LayoutPlan;
use super::NetworkTransformer;

const MIN_DISTANCE: f32 = 1e-6;

/// Viewer pose used to place brought nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewer {
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
}

impl Default for Viewer {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
        }
    }
}

pub struct BringNodeTransformer {
    viewer: Viewer,
    target_spread: f32,
    offset: f32,
    pending: BTreeMap<NodeId, bool>,
    /// Positions of brought nodes before they moved.
    home: BTreeMap<NodeId, Vec3>,
}

impl BringNodeTransformer {
    pub fn new(config: &BringNodeConfig) -> Self {
        let (position, forward) = config.viewer();
        Self {
            viewer: Viewer { position, forward },
            target_spread: config.target_spread,
            offset: config.offset,
            pending: BTreeMap::new(),
            home: BTreeMap::new(),
        }
    }

    pub fn set_viewer(&mut self, viewer: Viewer) {
        self.viewer = viewer;
    }

    /// Queues a node to be brought (`true`) or returned (`false`).
    pub fn set_bring_node_queue(&mut self, id: NodeId, bring: bool) {
        self.pending.insert(id, bring);
    }

    pub fn is_brought(&self, id: NodeId) -> bool {
        self.home.contains_key(&id)
    }

    fn focal_point(&self) -> Vec3 {
        self.viewer.position + self.viewer.forward * self.offset
    }

    /// Point at `target_spread` from the focal point, toward `position`.
    fn destination(&self, position: Vec3) -> Vec3 {
        let focal = self.focal_point();
        let distance = position.distance(focal);
        if distance < MIN_DISTANCE {
            return position;
        }
        focal.lerp(position, self.target_spread / distance)
    }

    fn plan(&mut self, context: &mut NetworkContext) -> LayoutPlan {
        let mut plan = LayoutPlan::default();

        for (id, bring) in std::mem::take(&mut self.pending) {
            let Some(position) = context.nodes.get(&id).map(|n| n.position) else {
                tracing::warn!(node = id, subnetwork = context.subnetwork_id, "Cannot bring missing node");
                continue;
            };

            let target = if bring {
                let home = *self.home.entry(id).or_insert(position);
                Some(self.destination(home))
            } else {
                self.home.remove(&id)
            };

            let Some(target) = target else {
                continue;
            };
            if let Some(node) = context.nodes.get_mut(&id) {
                node.brought = bring;
            }
            plan.positions.insert(id, target);
        }

        plan
    }
}

impl NetworkTransformer for BringNodeTransformer {
    fn apply_transformation(&mut self, global: &mut NetworkGlobal, context: &mut NetworkContext) {
        self.plan(context).commit(global, context);
    }

    fn get_interpolator(
        &mut self,
        global: &mut NetworkGlobal,
        context: &mut NetworkContext,
    ) -> Box<dyn TransformInterpolator> {
        self.plan(context).into_interpolator(global, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::ContextSettings;
    use crate::models::fixtures::{self, member};

    fn setup() -> (NetworkGlobal, NetworkContext) {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();
        let mut context = NetworkContext::new(0, ContextSettings::default());
        context.set_from_global(&global);
        (global, context)
    }

    #[test]
    fn test_bring_and_return_node() {
        let (mut global, mut context) = setup();
        let id = member(0, 1);
        let home = Vec3::new(0.0, 0.0, 10.2);
        context.nodes.get_mut(&id).unwrap().position = home;

        let mut bring = BringNodeTransformer::new(&BringNodeConfig::default());
        bring.set_bring_node_queue(id, true);
        bring.apply_transformation(&mut global, &mut context);

        // focal point (0, 0, 0.2), spread 2
        let brought = context.nodes[&id].position;
        assert!((brought - Vec3::new(0.0, 0.0, 2.2)).length() < 1e-5);
        assert!(context.nodes[&id].brought);
        assert!(bring.is_brought(id));

        bring.set_bring_node_queue(id, false);
        bring.apply_transformation(&mut global, &mut context);
        assert_eq!(context.nodes[&id].position, home);
        assert!(!context.nodes[&id].brought);
    }

    #[test]
    fn test_node_at_focal_point_stays() {
        let (mut global, mut context) = setup();
        let id = member(2, 0);
        let focal = Vec3::new(0.0, 0.0, 0.2);
        context.nodes.get_mut(&id).unwrap().position = focal;

        let mut bring = BringNodeTransformer::new(&BringNodeConfig::default());
        bring.set_bring_node_queue(id, true);
        bring.apply_transformation(&mut global, &mut context);

        assert_eq!(context.nodes[&id].position, focal);
    }

    #[test]
    fn test_return_without_bring_is_ignored() {
        let (mut global, mut context) = setup();
        let id = member(2, 0);
        let before = context.nodes[&id].position;

        let mut bring = BringNodeTransformer::new(&BringNodeConfig::default());
        bring.set_bring_node_queue(id, false);
        bring.apply_transformation(&mut global, &mut context);

        assert_eq!(context.nodes[&id].position, before);
    }
}
