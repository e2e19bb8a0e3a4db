//! Control points of bundled link curves.
//!
//! A renderer draws each link as a B-spline through these points. Bundled
//! links follow the virtual hierarchy; the bundling strength then blends the
//! curve back toward a straight line.

use bevy_math::Vec3;

use crate::contexts::{ContextNode, NetworkContext};
use crate::graph::NetworkGlobal;
use crate::models::{LinkId, NodeId};

/// Below this strength a link is drawn straight.
pub const MIN_BUNDLING_STRENGTH: f32 = 0.001;

/// Raw control points of a link in `context`.
///
/// Returns `None` when the link or either endpoint is not in the context.
pub fn control_points(global: &NetworkGlobal, context: &NetworkContext, id: LinkId) -> Option<Vec<Vec3>> {
    let link = global.links.get(id)?;
    let props = context.links.get(&id)?;
    let source = context.nodes.get(&link.source_id)?;
    let target = context.nodes.get(&link.target_id)?;
    let (s, t) = (source.position, target.position);

    if props.bundling_strength < MIN_BUNDLING_STRENGTH {
        return Some(vec![s, s.lerp(t, 0.5), t]);
    }

    let center = |node: &ContextNode| {
        node.community_id
            .and_then(|c| context.communities.get(&c))
            .map_or(node.position, |c| c.mass_center)
    };
    let (sc, tc) = (center(source), center(target));

    // a cleared flag marks the focused end
    let points = match (props.bundle_start, props.bundle_end) {
        (false, true) => vec![s, (sc + tc) / 2.0, tc, t],
        (true, false) => vec![s, sc, (sc + tc) / 2.0, t],
        _ => {
            let mut points: Vec<Vec3> = link
                .path_in_tree
                .iter()
                .filter_map(|&node| tree_position(global, context, node))
                .collect();
            if points.len() < 2 {
                points = vec![s, t];
            }
            points
        }
    };
    Some(points)
}

/// Position of a hierarchy node in `context`.
///
/// Scaffolding absent from the context sits at the mean mass center of the
/// context communities below it.
fn tree_position(global: &NetworkGlobal, context: &NetworkContext, id: NodeId) -> Option<Vec3> {
    if let Some(node) = context.nodes.get(&id) {
        return Some(node.position);
    }
    if !global.is_virtual(id) {
        return None;
    }

    let centers: Vec<Vec3> = context
        .communities
        .values()
        .filter(|community| {
            global
                .communities
                .get(community.id)
                .and_then(|c| global.nodes.get(c.root_node_id))
                .is_some_and(|root| root.id == id || root.ancestors.contains(&id))
        })
        .map(|community| community.mass_center)
        .collect();

    if centers.is_empty() {
        return None;
    }
    Some(centers.iter().copied().sum::<Vec3>() / centers.len() as f32)
}

/// Blends interior points toward the source–target line.
///
/// `strength` 1 keeps the points, 0 puts them on the line. Endpoints are
/// never moved.
pub fn straighten(points: &[Vec3], strength: f32) -> Vec<Vec3> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let (first, last) = (points[0], points[n - 1]);
    let beta = strength.clamp(0.0, 1.0);

    points
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            if i == 0 || i == n - 1 {
                return p;
            }
            let line = first.lerp(last, i as f32 / (n - 1) as f32);
            line.lerp(p, beta)
        })
        .collect()
}

/// Control points after applying the link's bundling strength.
pub fn link_curve(global: &NetworkGlobal, context: &NetworkContext, id: LinkId) -> Option<Vec<Vec3>> {
    let points = control_points(global, context, id)?;
    let strength = context.links.get(&id)?.bundling_strength;
    Some(straighten(&points, strength))
}
