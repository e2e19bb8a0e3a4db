//! Direct attribute edits on context entities.

use bevy_color::Srgba;
use bevy_math::Vec3;

use crate::contexts::NetworkContext;
use crate::graph::NetworkGlobal;
use crate::models::{LinkId, NodeId};

use super::interpolator::{NoopInterpolator, TransformInterpolator};
use super::NetworkTransformer;

/// A node attribute update. Sizes are in node-scale units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeEdit {
    Size(f32),
    Position(Vec3),
    Color(Srgba),
}

/// A link attribute update.
///
/// Width is in link-width units, alpha in normal-alpha units and bundling
/// strength in edge-bundling units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkEdit {
    Width(f32),
    BundlingStrength(f32),
    ColorStart(Srgba),
    ColorEnd(Srgba),
    BundleStart(bool),
    BundleEnd(bool),
    Alpha(f32),
}

#[derive(Debug, Default)]
pub struct EditTransformer {
    node_edits: Vec<(NodeId, NodeEdit)>,
    link_edits: Vec<(LinkId, LinkEdit)>,
}

impl EditTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_node_edit(&mut self, ids: &[NodeId], edit: NodeEdit) {
        self.node_edits.extend(ids.iter().map(|&id| (id, edit)));
    }

    pub fn queue_link_edit(&mut self, ids: &[LinkId], edit: LinkEdit) {
        self.link_edits.extend(ids.iter().map(|&id| (id, edit)));
    }

    pub fn is_empty(&self) -> bool {
        self.node_edits.is_empty() && self.link_edits.is_empty()
    }

    fn apply_node_edits(&mut self, global: &mut NetworkGlobal, context: &mut NetworkContext) {
        let mut missing = Vec::new();
        let scale = context.settings.node_scale;

        for (id, edit) in std::mem::take(&mut self.node_edits) {
            if let NodeEdit::Position(position) = edit {
                if !context.set_node_position(global, id, position) {
                    missing.push(id);
                }
                continue;
            }

            let Some(node) = context.nodes.get_mut(&id) else {
                missing.push(id);
                continue;
            };
            match edit {
                NodeEdit::Size(size) => node.size = size * scale,
                NodeEdit::Color(color) => node.color = color,
                NodeEdit::Position(_) => {}
            }
            node.dirty = true;
            global.mark_node_dirty(id);
        }

        if !missing.is_empty() {
            tracing::warn!(
                subnetwork = context.subnetwork_id,
                "Nodes {:?} not found in subnetwork {}",
                missing,
                context.subnetwork_id
            );
        }
    }

    fn apply_link_edits(&mut self, global: &mut NetworkGlobal, context: &mut NetworkContext) {
        let mut missing = Vec::new();
        let settings = context.settings.clone();

        for (id, edit) in std::mem::take(&mut self.link_edits) {
            let Some(link) = context.links.get_mut(&id) else {
                missing.push(id);
                continue;
            };
            match edit {
                LinkEdit::Width(width) => link.width = width * settings.link_width,
                LinkEdit::BundlingStrength(strength) => {
                    link.bundling_strength = strength * settings.edge_bundling_strength
                }
                LinkEdit::ColorStart(color) => link.color_start = color,
                LinkEdit::ColorEnd(color) => link.color_end = color,
                LinkEdit::BundleStart(flag) => link.bundle_start = flag,
                LinkEdit::BundleEnd(flag) => link.bundle_end = flag,
                LinkEdit::Alpha(alpha) => link.alpha = alpha * settings.link_normal_alpha,
            }
            link.dirty = true;
            global.mark_link_dirty(id);
        }

        if !missing.is_empty() {
            tracing::warn!(
                subnetwork = context.subnetwork_id,
                "Links {:?} not found in subnetwork {}",
                missing,
                context.subnetwork_id
            );
        }
    }
}

impl NetworkTransformer for EditTransformer {
    fn apply_transformation(&mut self, global: &mut NetworkGlobal, context: &mut NetworkContext) {
        self.apply_node_edits(global, context);
        self.apply_link_edits(global, context);
    }

    fn get_interpolator(
        &mut self,
        global: &mut NetworkGlobal,
        context: &mut NetworkContext,
    ) -> Box<dyn TransformInterpolator> {
        self.apply_transformation(global, context);
        Box::new(NoopInterpolator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::ContextSettings;
    use crate::models::fixtures::{self, member};

    fn setup() -> (NetworkGlobal, NetworkContext) {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();
        let mut context = NetworkContext::new(3, ContextSettings::default());
        context.set_from_global(&global);
        context.clear_dirty();
        (global, context)
    }

    #[test]
    fn test_edits_scale_by_settings_and_last_write_wins() {
        let (mut global, mut context) = setup();
        let mut edit = EditTransformer::new();
        let id = member(1, 1);

        edit.queue_node_edit(&[id], NodeEdit::Size(3.0));
        edit.queue_node_edit(&[id], NodeEdit::Size(2.0));
        edit.queue_link_edit(&[0, 1], LinkEdit::Alpha(2.0));
        edit.queue_link_edit(&[1], LinkEdit::BundlingStrength(0.0));
        edit.apply_transformation(&mut global, &mut context);

        assert_eq!(context.nodes[&id].size, 2.0 * context.settings.node_scale);
        assert!(context.nodes[&id].dirty);
        assert_eq!(context.links[&0].alpha, 2.0 * context.settings.link_normal_alpha);
        assert_eq!(context.links[&1].bundling_strength, 0.0);
        assert!(edit.is_empty());
    }

    #[test]
    fn test_position_edit_marks_community() {
        let (mut global, mut context) = setup();
        let mut edit = EditTransformer::new();

        edit.queue_node_edit(&[member(4, 4), 9999], NodeEdit::Position(Vec3::ONE));
        let mut interpolator = edit.get_interpolator(&mut global, &mut context);
        interpolator.interpolate(0.5, &mut context);

        assert_eq!(context.nodes[&member(4, 4)].position, Vec3::ONE);
        assert!(context.communities[&4].dirty);
        assert!(!context.communities[&3].dirty);
    }
}
