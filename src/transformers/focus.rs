//! Community focus layouts: spider, cluster and floor.
//!
//! All three share one shape. Callers queue per-community focus intents,
//! the next transformation moves members between the spherical overview and
//! the focus layout, and link bundling follows the resulting community
//! states.

use std::collections::BTreeMap;
use std::sync::Arc;

use bevy_math::Vec3;

use crate::contexts::{CommunityState, ContextSettings, NetworkContext};
use crate::graph::{Link, NetworkGlobal};
use crate::loader::{LayoutKind, LayoutSet};
use crate::models::{CommunityId, NodeId};

use super::interpolator::TransformInterpolator;
use super::plan::{LayoutPlan, LinkPatch};
use super::{LayoutAnchors, NetworkTransformer, TransformInfo};

/// Pending focus intents. Re-queueing a community keeps only the latest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusQueue {
    pending: BTreeMap<CommunityId, bool>,
    immediate: BTreeMap<CommunityId, bool>,
}

impl FocusQueue {
    /// Queues an animated transition.
    pub fn queue(&mut self, id: CommunityId, focus: bool) {
        self.immediate.remove(&id);
        self.pending.insert(id, focus);
    }

    /// Queues a transition that snaps without animation.
    pub fn queue_immediate(&mut self, id: CommunityId, focus: bool) {
        self.pending.remove(&id);
        self.immediate.insert(id, focus);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.immediate.is_empty()
    }

    /// Takes `(community, focus, immediate)` entries, immediate ones first.
    fn drain(&mut self) -> Vec<(CommunityId, bool, bool)> {
        let immediate = std::mem::take(&mut self.immediate);
        let pending = std::mem::take(&mut self.pending);
        immediate
            .into_iter()
            .map(|(id, focus)| (id, focus, true))
            .chain(pending.into_iter().map(|(id, focus)| (id, focus, false)))
            .collect()
    }
}

/// Which focus layout a transformer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusStyle {
    Spider,
    Cluster,
    Floor,
}

impl FocusStyle {
    pub fn layout(self) -> LayoutKind {
        match self {
            FocusStyle::Spider => LayoutKind::Spider,
            FocusStyle::Cluster => LayoutKind::Cluster,
            FocusStyle::Floor => LayoutKind::Flat,
        }
    }

    pub fn state(self) -> CommunityState {
        match self {
            FocusStyle::Spider => CommunityState::Spider,
            FocusStyle::Cluster => CommunityState::Cluster,
            FocusStyle::Floor => CommunityState::Floor,
        }
    }

    fn anchor(self, anchors: &LayoutAnchors) -> TransformInfo {
        match self {
            FocusStyle::Spider => anchors.spider,
            FocusStyle::Cluster => anchors.cluster,
            FocusStyle::Floor => anchors.floor,
        }
    }
}

/// Link attributes for one end of a link, by the states of both ends.
///
/// `node` is the end being laid out. Its bundle flag is cleared while its
/// community is focused.
pub fn tiered_link_patch(
    settings: &ContextSettings,
    link: &Link,
    node: NodeId,
    near: CommunityState,
    far: CommunityState,
) -> LinkPatch {
    let (alpha, bundling) = match (near.is_focused(), far.is_focused()) {
        (false, false) => (settings.link_normal_alpha, settings.edge_bundling_strength),
        (true, false) | (false, true) => (
            settings.link_context2focus_alpha,
            settings.edge_bundling_strength,
        ),
        (true, true) if near == far => (settings.link_normal_alpha, 0.0),
        (true, true) => (settings.link_context_alpha, settings.edge_bundling_strength),
    };

    let mut patch = LinkPatch {
        bundling_strength: Some(bundling),
        alpha: Some(alpha),
        ..Default::default()
    };
    if link.source_id == node {
        patch.bundle_start = Some(!near.is_focused());
    }
    if link.target_id == node {
        patch.bundle_end = Some(!near.is_focused());
    }
    patch
}

/// Moves communities into and out of one focus layout.
pub struct FocusLayoutTransformer {
    style: FocusStyle,
    layouts: Arc<LayoutSet>,
    anchor: TransformInfo,
    spherical: TransformInfo,
    queue: FocusQueue,
}

impl FocusLayoutTransformer {
    pub fn new(style: FocusStyle, layouts: Arc<LayoutSet>, anchors: &LayoutAnchors) -> Self {
        Self {
            style,
            layouts,
            anchor: style.anchor(anchors),
            spherical: anchors.spherical,
            queue: FocusQueue::default(),
        }
    }

    pub fn spider(layouts: Arc<LayoutSet>, anchors: &LayoutAnchors) -> Self {
        Self::new(FocusStyle::Spider, layouts, anchors)
    }

    pub fn cluster(layouts: Arc<LayoutSet>, anchors: &LayoutAnchors) -> Self {
        Self::new(FocusStyle::Cluster, layouts, anchors)
    }

    pub fn floor(layouts: Arc<LayoutSet>, anchors: &LayoutAnchors) -> Self {
        Self::new(FocusStyle::Floor, layouts, anchors)
    }

    pub fn style(&self) -> FocusStyle {
        self.style
    }

    pub fn set_focus_community_queue(&mut self, id: CommunityId, focus: bool) {
        self.queue.queue(id, focus);
    }

    pub fn set_focus_community_imm(&mut self, id: CommunityId, focus: bool) {
        self.queue.queue_immediate(id, focus);
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    fn target(&self, id: NodeId, focus: bool) -> Option<Vec3> {
        if focus {
            self.layouts
                .position(self.style.layout(), id)
                .map(|p| self.anchor.transform_point(p))
        } else {
            self.layouts
                .position(LayoutKind::Spherical, id)
                .map(|p| self.spherical.transform_point(p))
        }
    }

    /// Updates community states, then computes member targets and links.
    fn plan(&mut self, global: &NetworkGlobal, context: &mut NetworkContext) -> LayoutPlan {
        let mut plan = LayoutPlan::default();
        let entries = self.queue.drain();

        for &(id, focus, _) in &entries {
            let Some(community) = context.communities.get_mut(&id) else {
                tracing::warn!(community = id, subnetwork = context.subnetwork_id, "Community not in context");
                continue;
            };
            if focus {
                community.state = self.style.state();
            } else if community.state == self.style.state() {
                community.state = CommunityState::None;
            }
        }

        let settings = &context.settings;
        for (id, focus, immediate) in entries {
            let Some(community) = context.communities.get(&id) else {
                continue;
            };
            plan.communities.insert(id);

            for &node_id in &community.nodes {
                let Some(position) = self.target(node_id, focus) else {
                    tracing::warn!(node = node_id, layout = %self.style.layout(), "No position for node");
                    continue;
                };
                if immediate {
                    plan.snaps.insert(node_id, position);
                    plan.positions.remove(&node_id);
                } else {
                    plan.positions.insert(node_id, position);
                    plan.snaps.remove(&node_id);
                }

                for &link_id in context.node_links(node_id) {
                    let Some(link) = global.links.get(link_id) else {
                        continue;
                    };
                    let patch = match self.style {
                        FocusStyle::Spider => {
                            let inner = community.nodes.contains(&link.other_end(node_id));
                            if !inner {
                                continue;
                            }
                            let strength = if focus { 0.0 } else { settings.edge_bundling_strength };
                            LinkPatch::bundling(strength)
                        }
                        FocusStyle::Cluster | FocusStyle::Floor => tiered_link_patch(
                            settings,
                            link,
                            node_id,
                            community.state,
                            context.node_state(link.other_end(node_id)),
                        ),
                    };
                    plan.patch_link(link_id, patch);
                }
            }
        }

        plan
    }
}

impl NetworkTransformer for FocusLayoutTransformer {
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
    use crate::models::fixtures::{self, member};

    struct Fixture {
        global: NetworkGlobal,
        context: NetworkContext,
        layouts: Arc<LayoutSet>,
    }

    fn setup() -> Fixture {
        let data = fixtures::friends_network();
        let global = NetworkGlobal::build(&data).unwrap();
        let mut context = NetworkContext::new(0, ContextSettings::default());
        context.set_from_global(&global);
        let layouts = Arc::new(LayoutSet::from_files([
            (LayoutKind::Spherical, data),
            (
                LayoutKind::Cluster,
                fixtures::friends_layout(|id| Vec3::new(id as f32, 5.0, 0.0)),
            ),
            (
                LayoutKind::Flat,
                fixtures::friends_layout(|id| Vec3::new(id as f32, 0.0, -1.0)),
            ),
        ]));
        Fixture {
            global,
            context,
            layouts,
        }
    }

    fn inner_link(global: &NetworkGlobal) -> i32 {
        global.outgoing_links(member(1, 0))[0]
    }

    #[test]
    fn test_queue_keeps_latest_intent() {
        let mut queue = FocusQueue::default();
        queue.queue(1, true);
        queue.queue(1, false);
        queue.queue_immediate(2, true);
        queue.queue(2, false);

        assert_eq!(queue.drain(), vec![(1, false, false), (2, false, false)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_spider_focus_unbundles_inner_links() {
        let Fixture {
            mut global,
            mut context,
            layouts,
        } = setup();
        let mut spider = FocusLayoutTransformer::spider(layouts, &LayoutAnchors::default());

        spider.set_focus_community_queue(1, true);
        spider.apply_transformation(&mut global, &mut context);

        assert_eq!(context.communities[&1].state, CommunityState::Spider);
        // spider falls back to spherical positions
        let id = member(1, 4);
        assert_eq!(context.nodes[&id].position, fixtures::fibonacci_point(id, 1.0));
        assert_eq!(context.links[&inner_link(&global)].bundling_strength, 0.0);

        spider.set_focus_community_queue(1, false);
        spider.apply_transformation(&mut global, &mut context);
        assert_eq!(context.communities[&1].state, CommunityState::None);
        assert_eq!(
            context.links[&inner_link(&global)].bundling_strength,
            context.settings.edge_bundling_strength
        );
    }

    #[test]
    fn test_cluster_focus_tiers_links() {
        let Fixture {
            mut global,
            mut context,
            layouts,
        } = setup();
        let mut cluster = FocusLayoutTransformer::cluster(layouts, &LayoutAnchors::default());

        cluster.set_focus_community_queue(1, true);
        cluster.apply_transformation(&mut global, &mut context);

        let id = member(1, 2);
        assert_eq!(context.nodes[&id].position, Vec3::new(id as f32, 5.0, 0.0));

        let settings = context.settings.clone();
        let inner = &context.links[&inner_link(&global)];
        assert_eq!(inner.bundling_strength, 0.0);
        assert_eq!(inner.alpha, settings.link_normal_alpha);
        assert!(!inner.bundle_start);

        let outer_id = global
            .outgoing_links(member(1, 0))
            .iter()
            .copied()
            .find(|l| global.links.get(*l).unwrap().target_id == member(2, 0))
            .unwrap();
        let outer = &context.links[&outer_id];
        assert_eq!(outer.alpha, settings.link_context2focus_alpha);
        assert_eq!(outer.bundling_strength, settings.edge_bundling_strength);
        assert!(!outer.bundle_start);
    }

    #[test]
    fn test_floor_uses_flat_positions_and_immediate_snaps() {
        let Fixture {
            mut global,
            mut context,
            layouts,
        } = setup();
        let mut floor = FocusLayoutTransformer::floor(layouts, &LayoutAnchors::default());
        let id = member(3, 1);

        floor.set_focus_community_imm(3, true);
        let mut interpolator = floor.get_interpolator(&mut global, &mut context);
        interpolator.interpolate(0.0, &mut context);

        // flat positions fall back to 3D when no pos2D is present
        assert_eq!(context.nodes[&id].position, Vec3::new(id as f32, 0.0, -1.0));
        assert_eq!(context.communities[&3].state, CommunityState::Floor);
    }

    #[test]
    fn test_tiered_patch_table() {
        let settings = ContextSettings::default();
        let link = Link {
            id: 0,
            source_id: 1,
            target_id: 2,
            path_in_tree: vec![1, 0, 2],
            is_spline: false,
            props: Default::default(),
            selected_on: Default::default(),
            dirty: false,
        };
        use CommunityState::*;

        let both_none = tiered_link_patch(&settings, &link, 1, None, None);
        assert_eq!(both_none.alpha, Some(settings.link_normal_alpha));
        assert_eq!(both_none.bundle_start, Some(true));
        assert_eq!(both_none.bundle_end, Option::None);

        let same = tiered_link_patch(&settings, &link, 2, Floor, Floor);
        assert_eq!(same.bundling_strength, Some(0.0));
        assert_eq!(same.bundle_end, Some(false));

        let different = tiered_link_patch(&settings, &link, 1, Cluster, Spider);
        assert_eq!(different.alpha, Some(settings.link_context_alpha));
    }
}
