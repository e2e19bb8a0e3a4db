//! Overview context: one node per community, links weighted by traffic.

use std::collections::BTreeMap;

use bevy_color::Srgba;
use bevy_math::Vec3;

use crate::color;
use crate::graph::NetworkGlobal;
use crate::models::CommunityId;

use super::NetworkContext;

/// Upper bound on rendered overview links.
pub const MAX_MINIMAP_LINKS: usize = 100;

/// A community drawn as a single overview node.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapNode {
    /// Number of members.
    pub size: f32,
    pub position: Vec3,
    pub color: Srgba,
    pub dirty: bool,
}

/// Aggregated link between two communities.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapLink {
    /// Number of links between the pair.
    pub weight: usize,
    pub dirty: bool,
}

/// Overview entities to redraw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinimapDirty {
    pub nodes: Vec<CommunityId>,
    pub links: Vec<(CommunityId, CommunityId)>,
}

impl MinimapDirty {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }
}

/// Overview of the main network.
#[derive(Debug, Clone, Default)]
pub struct MinimapContext {
    pub nodes: BTreeMap<CommunityId, MinimapNode>,
    /// Keyed by `(min, max)` community pair.
    pub links: BTreeMap<(CommunityId, CommunityId), MinimapLink>,
    /// Scale applied to main-context positions.
    pub scale: f32,
}

impl MinimapContext {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }

    pub fn set_from_global(&mut self, global: &NetworkGlobal) {
        self.nodes.clear();
        self.links.clear();

        for community in global.communities.iter() {
            self.nodes.insert(
                community.id,
                MinimapNode {
                    size: community.nodes.len() as f32,
                    position: Vec3::ZERO,
                    color: color::palette_color(community.id.max(0) as usize),
                    dirty: true,
                },
            );
        }

        let mut weights: BTreeMap<(CommunityId, CommunityId), usize> = BTreeMap::new();
        for community in global.communities.iter() {
            for (&other, &count) in &community.aggregate_links {
                let key = (community.id.min(other), community.id.max(other));
                weights.insert(key, count);
            }
        }

        // keep the heaviest pairs; ties resolved by pair key
        let mut ranked: Vec<_> = weights.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(MAX_MINIMAP_LINKS);

        self.links = ranked
            .into_iter()
            .map(|(key, weight)| {
                (
                    key,
                    MinimapLink {
                        weight,
                        dirty: true,
                    },
                )
            })
            .collect();
    }

    /// Follows the main context's community centers and member counts.
    pub fn recompute_props(&mut self, global: &NetworkGlobal, main: &NetworkContext) {
        for (id, node) in self.nodes.iter_mut() {
            let position = main
                .communities
                .get(id)
                .map_or(Vec3::ZERO, |c| c.mass_center * self.scale);
            let size = global
                .communities
                .get(*id)
                .map_or(0.0, |c| c.nodes.len() as f32);

            if node.position != position || node.size != size {
                node.position = position;
                node.size = size;
                node.dirty = true;
            }
        }
    }

    /// Reports flagged overview entities and clears their flags.
    pub fn drain_dirty(&mut self) -> MinimapDirty {
        let mut dirty = MinimapDirty::default();
        for (id, node) in self.nodes.iter_mut().filter(|(_, n)| n.dirty) {
            node.dirty = false;
            dirty.nodes.push(*id);
        }
        for (pair, link) in self.links.iter_mut().filter(|(_, l)| l.dirty) {
            link.dirty = false;
            dirty.links.push(*pair);
        }
        dirty
    }
}
