//! Snapshot-based animators driven by an external frame loop.

use std::collections::BTreeMap;

use bevy_math::Vec3;

use crate::contexts::NetworkContext;
use crate::models::NodeId;

/// Advances a transition to `t ∈ [0, 1]`.
///
/// Called once per frame with increasing `t`; cancelling a transition is
/// simply not calling it again.
pub trait TransformInterpolator: Send {
    fn interpolate(&mut self, t: f32, context: &mut NetworkContext);
}

/// Cubic ease-in/out on `[0, 1]`.
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Blend that returns `start` at 0 and `end` at 1 bit-for-bit.
pub fn lerp_exact(start: Vec3, end: Vec3, s: f32) -> Vec3 {
    start * (1.0 - s) + end * s
}

/// Interpolator for transformers that only touch non-positional attributes.
#[derive(Debug, Default)]
pub struct NoopInterpolator;

impl TransformInterpolator for NoopInterpolator {
    fn interpolate(&mut self, _t: f32, _context: &mut NetworkContext) {}
}

/// Runs several interpolators as one transition, in order.
#[derive(Default)]
pub struct ChainInterpolator {
    parts: Vec<Box<dyn TransformInterpolator>>,
}

impl ChainInterpolator {
    pub fn new(parts: Vec<Box<dyn TransformInterpolator>>) -> Self {
        Self { parts }
    }
}

impl TransformInterpolator for ChainInterpolator {
    fn interpolate(&mut self, t: f32, context: &mut NetworkContext) {
        for part in &mut self.parts {
            part.interpolate(t, context);
        }
    }
}

/// Eases node positions from their snapshot toward layout targets.
#[derive(Debug, Clone, Default)]
pub struct PositionInterpolator {
    start: BTreeMap<NodeId, Vec3>,
    end: BTreeMap<NodeId, Vec3>,
}

impl PositionInterpolator {
    /// Snapshots the current position of every targeted node.
    pub fn new(context: &NetworkContext, targets: BTreeMap<NodeId, Vec3>) -> Self {
        let start = targets
            .keys()
            .filter_map(|id| context.nodes.get(id).map(|n| (*id, n.position)))
            .collect();
        let end = targets
            .into_iter()
            .filter(|(id, _)| context.nodes.contains_key(id))
            .collect();
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.len()
    }

    pub fn is_empty(&self) -> bool {
        self.end.is_empty()
    }
}

impl TransformInterpolator for PositionInterpolator {
    fn interpolate(&mut self, t: f32, context: &mut NetworkContext) {
        let s = smoothstep(t);
        for (id, end) in &self.end {
            let Some(start) = self.start.get(id) else {
                continue;
            };
            let Some(node) = context.nodes.get_mut(id) else {
                continue;
            };
            node.position = lerp_exact(*start, *end, s);
            node.dirty = true;
            if let Some(c) = node.community_id {
                context.mark_community_dirty(c);
            }
        }
    }
}
