//! Fruchterman–Reingold layout computed on demand.
//!
//! Unlike the other layouts this one has no precomputed file: positions are
//! simulated from the context's own links. Seeding is deterministic so the
//! same context always produces the same layout.

use std::collections::{BTreeSet, HashMap};

use bevy_math::Vec3;

use crate::contexts::NetworkContext;
use crate::graph::NetworkGlobal;
use crate::models::NodeId;

use super::interpolator::TransformInterpolator;
use super::plan::LayoutPlan;
use super::NetworkTransformer;

const ITERATIONS: usize = 50;
const WIDTH: f32 = 5.0;
const HEIGHT: f32 = 5.0;
const TEMPERATURE: f32 = 0.1;
const MIN_DISTANCE: f32 = 0.001;

/// Lays out real nodes of a context around their current centroid.
#[derive(Debug, Default)]
pub struct ForceDirectedTransformer {
    /// Restricts the layout to these nodes; empty means every real node.
    queued: BTreeSet<NodeId>,
}

impl ForceDirectedTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_nodes_on_next_apply(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.queued.extend(ids);
    }

    fn plan(&mut self, global: &NetworkGlobal, context: &NetworkContext) -> LayoutPlan {
        let queued = std::mem::take(&mut self.queued);
        let ids: Vec<NodeId> = context
            .nodes
            .keys()
            .copied()
            .filter(|id| !global.is_virtual(*id))
            .filter(|id| queued.is_empty() || queued.contains(id))
            .collect();

        let mut plan = LayoutPlan::default();
        if ids.is_empty() {
            return plan;
        }

        let centroid = ids
            .iter()
            .filter_map(|id| context.nodes.get(id).map(|n| n.position))
            .sum::<Vec3>()
            / ids.len() as f32;

        let index: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let edges: Vec<(usize, usize)> = context
            .links
            .keys()
            .filter_map(|&link_id| {
                let link = global.links.get(link_id)?;
                Some((*index.get(&link.source_id)?, *index.get(&link.target_id)?))
            })
            .filter(|(u, v)| u != v)
            .collect();

        let positions = simulate(ids.len(), &edges);
        for (id, position) in ids.iter().zip(positions) {
            plan.positions.insert(*id, centroid + position);
        }
        plan.all_communities = true;

        tracing::debug!(
            subnetwork = context.subnetwork_id,
            nodes = ids.len(),
            edges = edges.len(),
            "Computed force-directed layout"
        );
        plan
    }
}

/// Runs the simulation over `n` nodes and returns centered positions.
fn simulate(n: usize, edges: &[(usize, usize)]) -> Vec<Vec3> {
    let mut pos: Vec<Vec3> = (0..n).map(|i| seed_position(i, n)).collect();
    let k = (WIDTH * HEIGHT / n as f32).sqrt();

    for _ in 0..ITERATIONS {
        let mut disp = vec![Vec3::ZERO; n];

        // Repulsion: k² / d between all pairs
        for v in 0..n {
            for u in 0..n {
                if u == v {
                    continue;
                }
                let delta = pos[v] - pos[u];
                let dist = delta.length();
                if dist > MIN_DISTANCE {
                    disp[v] += delta / dist * (k * k / dist);
                }
            }
        }

        // Attraction: d² / k along links
        for &(u, v) in edges {
            let delta = pos[v] - pos[u];
            let dist = delta.length();
            if dist <= MIN_DISTANCE {
                continue;
            }
            let pull = delta / dist * (dist * dist / k);
            disp[v] -= pull;
            disp[u] += pull;
        }

        for (p, d) in pos.iter_mut().zip(&disp) {
            let magnitude = d.length();
            if magnitude > MIN_DISTANCE {
                *p += *d / magnitude * magnitude.min(TEMPERATURE);
            }
            p.x = p.x.clamp(-WIDTH / 2.0, WIDTH / 2.0);
            p.y = p.y.clamp(-HEIGHT / 2.0, HEIGHT / 2.0);
        }
    }

    let center = pos.iter().copied().sum::<Vec3>() / n as f32;
    pos.into_iter().map(|p| p - center).collect()
}

/// Fibonacci-sphere point inside the unit sphere.
fn seed_position(i: usize, n: usize) -> Vec3 {
    let golden_ratio = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let idx = i as f32 + 0.5;
    let total = n.max(1) as f32;

    let theta = 2.0 * std::f32::consts::PI * idx / golden_ratio;
    let phi = (1.0 - 2.0 * idx / total).clamp(-1.0, 1.0).acos();
    let radius = 0.5 + 0.5 * (i as f32 * 1.618).sin().abs();

    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

impl NetworkTransformer for ForceDirectedTransformer {
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
