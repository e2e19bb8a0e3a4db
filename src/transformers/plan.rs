//! Target state computed by a layout, shared by apply and interpolate.

use std::collections::{BTreeMap, BTreeSet};

use bevy_math::Vec3;

use crate::contexts::NetworkContext;
use crate::graph::NetworkGlobal;
use crate::models::{CommunityId, LinkId, NodeId};

use super::interpolator::{PositionInterpolator, TransformInterpolator};

/// Partial update of a link's bundling attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkPatch {
    pub bundling_strength: Option<f32>,
    pub alpha: Option<f32>,
    pub bundle_start: Option<bool>,
    pub bundle_end: Option<bool>,
}

impl LinkPatch {
    pub fn bundling(strength: f32) -> Self {
        Self {
            bundling_strength: Some(strength),
            ..Default::default()
        }
    }

    /// Later values win.
    fn merge(&mut self, other: LinkPatch) {
        self.bundling_strength = other.bundling_strength.or(self.bundling_strength);
        self.alpha = other.alpha.or(self.alpha);
        self.bundle_start = other.bundle_start.or(self.bundle_start);
        self.bundle_end = other.bundle_end.or(self.bundle_end);
    }
}

/// Everything one transformation will change.
#[derive(Debug, Clone, Default)]
pub struct LayoutPlan {
    /// Animated node targets.
    pub positions: BTreeMap<NodeId, Vec3>,
    /// Node targets applied without animation.
    pub snaps: BTreeMap<NodeId, Vec3>,
    pub links: BTreeMap<LinkId, LinkPatch>,
    pub communities: BTreeSet<CommunityId>,
    pub all_communities: bool,
}

impl LayoutPlan {
    pub fn patch_link(&mut self, id: LinkId, patch: LinkPatch) {
        self.links.entry(id).or_default().merge(patch);
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
            && self.snaps.is_empty()
            && self.links.is_empty()
            && self.communities.is_empty()
            && !self.all_communities
    }

    /// Applies everything except animated positions.
    fn commit_attributes(
        &self,
        global: &mut NetworkGlobal,
        context: &mut NetworkContext,
    ) {
        for (&id, patch) in &self.links {
            let Some(link) = context.links.get_mut(&id) else {
                continue;
            };
            if let Some(strength) = patch.bundling_strength {
                link.bundling_strength = strength;
            }
            if let Some(alpha) = patch.alpha {
                link.alpha = alpha;
            }
            if let Some(flag) = patch.bundle_start {
                link.bundle_start = flag;
            }
            if let Some(flag) = patch.bundle_end {
                link.bundle_end = flag;
            }
            link.dirty = true;
            global.mark_link_dirty(id);
        }

        for (&id, &position) in &self.snaps {
            context.set_node_position(global, id, position);
        }

        for &id in &self.communities {
            context.mark_community_dirty(id);
            global.mark_community_dirty(id);
        }
        if self.all_communities {
            context.mark_all_communities_dirty();
        }
    }

    /// Applies the whole plan immediately.
    pub fn commit(self, global: &mut NetworkGlobal, context: &mut NetworkContext) {
        self.commit_attributes(global, context);
        for (&id, &position) in &self.positions {
            context.set_node_position(global, id, position);
        }
    }

    /// Applies non-positional changes now and returns an animator for positions.
    pub fn into_interpolator(
        self,
        global: &mut NetworkGlobal,
        context: &mut NetworkContext,
    ) -> Box<dyn TransformInterpolator> {
        self.commit_attributes(global, context);
        for &id in self.positions.keys() {
            global.mark_node_dirty(id);
        }
        Box::new(PositionInterpolator::new(context, self.positions))
    }
}
