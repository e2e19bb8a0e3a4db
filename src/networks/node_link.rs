//! A node-link view: one render context plus its transformers.

use std::sync::Arc;

use bevy_math::{Quat, Vec3};

use crate::color;
use crate::config::Config;
use crate::contexts::encoding::{ColorEncoding, LinkProperty, NodeProperty, ScalarEncoding};
use crate::contexts::{CommunityState, DirtySet, Encodings, NetworkContext};
use crate::error::AppError;
use crate::graph::{NetworkGlobal, SubnetworkId};
use crate::loader::LayoutSet;
use crate::models::{CommunityId, LinkId, NodeId};
use crate::transformers::{
    BringNodeTransformer, ChainInterpolator, EditTransformer, EncodingTransformer, FocusLayoutTransformer,
    ForceDirectedTransformer, HairballLayoutTransformer, HighlightTransformer, LinkEdit, NodeEdit,
    NetworkTransformer, SphericalLayoutTransformer, TransformInfo, TransformerKind, Viewer,
    WorldTransformTransformer,
};

use super::animation::Animation;

/// Every transformer a network owns, one per slot.
pub struct TransformerSet {
    pub spherical: SphericalLayoutTransformer,
    pub hairball: HairballLayoutTransformer,
    pub spider: FocusLayoutTransformer,
    pub cluster: FocusLayoutTransformer,
    pub floor: FocusLayoutTransformer,
    pub bring_node: BringNodeTransformer,
    pub force_directed: ForceDirectedTransformer,
    pub encoding: EncodingTransformer,
    pub edit: EditTransformer,
    pub highlight: HighlightTransformer,
    pub world: WorldTransformTransformer,
}

impl TransformerSet {
    pub fn new(layouts: Arc<LayoutSet>, config: &Config) -> Self {
        let anchors = &config.layouts;
        Self {
            spherical: SphericalLayoutTransformer::new(layouts.clone(), anchors.spherical),
            hairball: HairballLayoutTransformer::new(layouts.clone(), anchors.hairball),
            spider: FocusLayoutTransformer::spider(layouts.clone(), anchors),
            cluster: FocusLayoutTransformer::cluster(layouts.clone(), anchors),
            floor: FocusLayoutTransformer::floor(layouts, anchors),
            bring_node: BringNodeTransformer::new(&config.bring_node),
            force_directed: ForceDirectedTransformer::new(),
            encoding: EncodingTransformer::new(),
            edit: EditTransformer::new(),
            highlight: HighlightTransformer::new(),
            world: WorldTransformTransformer::new(anchors.world),
        }
    }

    pub fn get_mut(&mut self, kind: TransformerKind) -> &mut dyn NetworkTransformer {
        match kind {
            TransformerKind::Spherical => &mut self.spherical,
            TransformerKind::Hairball => &mut self.hairball,
            TransformerKind::Spider => &mut self.spider,
            TransformerKind::Cluster => &mut self.cluster,
            TransformerKind::Floor => &mut self.floor,
            TransformerKind::BringNode => &mut self.bring_node,
            TransformerKind::ForceDirected => &mut self.force_directed,
            TransformerKind::Encoding => &mut self.encoding,
            TransformerKind::Edit => &mut self.edit,
            TransformerKind::Highlight => &mut self.highlight,
            TransformerKind::World => &mut self.world,
        }
    }

    /// The focus transformer owning a community state, if any.
    pub fn focus_for(&mut self, state: CommunityState) -> Option<&mut FocusLayoutTransformer> {
        match state {
            CommunityState::Spider => Some(&mut self.spider),
            CommunityState::Cluster => Some(&mut self.cluster),
            CommunityState::Floor => Some(&mut self.floor),
            _ => None,
        }
    }
}

/// A render context with its transformers and running transition.
pub struct NodeLinkNetwork {
    pub context: NetworkContext,
    pub transformers: TransformerSet,
    animation: Option<Animation>,
    duration: f32,
    store_requested: bool,
    /// Changes drained for rendering while storage was paused.
    unstored: DirtySet,
}

impl NodeLinkNetwork {
    pub fn new(id: SubnetworkId, layouts: Arc<LayoutSet>, config: &Config) -> Self {
        Self {
            context: NetworkContext::new(id, config.context.clone()),
            transformers: TransformerSet::new(layouts, config),
            animation: None,
            duration: config.animation.duration_secs,
            store_requested: false,
            unstored: DirtySet::default(),
        }
    }

    pub fn id(&self) -> SubnetworkId {
        self.context.subnetwork_id
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Takes the pending request to persist this network.
    pub fn take_store_request(&mut self) -> bool {
        std::mem::take(&mut self.store_requested)
    }

    /// Keeps drained changes until storage resumes.
    pub fn hold_unstored(&mut self, dirty: &DirtySet) {
        self.unstored.merge(dirty);
    }

    /// Re-flags held changes and requests a store.
    pub fn release_unstored(&mut self) {
        let held = std::mem::take(&mut self.unstored);
        if !held.is_empty() {
            tracing::debug!(
                subnetwork = self.id(),
                nodes = held.nodes.len(),
                links = held.links.len(),
                communities = held.communities.len(),
                "Releasing changes held during pause"
            );
            self.context.mark_dirty(&held);
        }
        self.request_store();
    }

    pub fn request_store(&mut self) {
        self.store_requested = true;
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Runs a transformer, animated over `duration` (or the configured
    /// default) or committed at once.
    pub fn transform(
        &mut self,
        kind: TransformerKind,
        global: &mut NetworkGlobal,
        animated: bool,
        duration: Option<f32>,
    ) {
        self.transform_many(&[kind], global, animated, duration);
    }

    /// Runs several transformers in order as a single transition.
    pub fn transform_many(
        &mut self,
        kinds: &[TransformerKind],
        global: &mut NetworkGlobal,
        animated: bool,
        duration: Option<f32>,
    ) {
        self.cancel_animation(global);

        let duration = duration.unwrap_or(self.duration);
        if animated && duration > 0.0 {
            let parts = kinds
                .iter()
                .map(|&kind| {
                    self.transformers
                        .get_mut(kind)
                        .get_interpolator(global, &mut self.context)
                })
                .collect();
            tracing::debug!(subnetwork = self.id(), transformers = ?kinds, duration, "Starting transition");
            self.animation = Some(Animation::new(
                Box::new(ChainInterpolator::new(parts)),
                duration,
            ));
            self.update_network(global, true, false);
        } else {
            for &kind in kinds {
                self.transformers
                    .get_mut(kind)
                    .apply_transformation(global, &mut self.context);
            }
            self.update_network(global, true, true);
        }
    }

    /// Drops a running transition where it stands.
    ///
    /// Positions stay wherever the last frame left them; the next
    /// transition snapshots them as its start.
    pub fn cancel_animation(&mut self, global: &mut NetworkGlobal) {
        if self.animation.take().is_some() {
            tracing::debug!(subnetwork = self.id(), "Cancelled running transition");
            self.update_network(global, true, false);
        }
    }

    /// Advances the running transition; returns whether it finished now.
    pub fn tick(&mut self, dt: f32, global: &mut NetworkGlobal) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        let finished = animation.advance(dt, &mut self.context);
        if finished {
            self.animation = None;
        }
        self.update_network(global, true, finished);
        finished
    }

    /// Propagates Graph Model changes and refreshes derived state.
    pub fn update_network(
        &mut self,
        global: &mut NetworkGlobal,
        update_community_props: bool,
        update_storage: bool,
    ) {
        self.transformers
            .highlight
            .apply_transformation(global, &mut self.context);
        if update_community_props {
            self.context.recompute_comm_props(global);
        }
        if update_storage {
            self.store_requested = true;
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    fn valid_ids(&self, kind: &str, ids: &[i32], known: impl Fn(i32) -> bool) -> Vec<i32> {
        let (valid, invalid): (Vec<i32>, Vec<i32>) = ids.iter().copied().partition(|id| known(*id));
        if !invalid.is_empty() {
            tracing::warn!(
                subnetwork = self.id(),
                "{} {:?} not found in subnetwork {}",
                kind,
                invalid,
                self.id()
            );
        }
        valid
    }

    fn valid_nodes(&self, ids: &[NodeId]) -> Vec<NodeId> {
        self.valid_ids("Nodes", ids, |id| self.context.nodes.contains_key(&id))
    }

    fn valid_links(&self, ids: &[LinkId]) -> Vec<LinkId> {
        self.valid_ids("Links", ids, |id| self.context.links.contains_key(&id))
    }

    fn valid_communities(&self, ids: &[CommunityId]) -> Vec<CommunityId> {
        self.valid_ids("Communities", ids, |id| {
            self.context.communities.contains_key(&id)
        })
    }

    pub fn set_selected_nodes(&mut self, global: &mut NetworkGlobal, ids: &[NodeId], selected: bool) {
        let ids = self.valid_nodes(ids);
        self.context.set_selected_nodes(global, &ids, selected);
        self.update_network(global, false, true);
    }

    pub fn set_selected_links(&mut self, global: &mut NetworkGlobal, ids: &[LinkId], selected: bool) {
        let ids = self.valid_links(ids);
        self.context.set_selected_links(global, &ids, selected);
        self.update_network(global, false, true);
    }

    pub fn set_selected_communities(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
        selected: bool,
    ) {
        let ids = self.valid_communities(ids);
        self.context.set_selected_communities(global, &ids, selected);
        self.update_network(global, false, true);
    }

    pub fn set_selected_network(&mut self, global: &mut NetworkGlobal, selected: bool) {
        self.context.set_selected_network(global, selected);
        self.update_network(global, false, true);
    }

    /// Flips the network's selection; returns the new state.
    pub fn toggle_selected_network(&mut self, global: &mut NetworkGlobal) -> bool {
        let selected = !self.context.selected;
        self.set_selected_network(global, selected);
        selected
    }

    pub fn toggle_selected_nodes(&mut self, global: &mut NetworkGlobal, ids: &[NodeId]) -> Vec<NodeId> {
        let ids = self.valid_nodes(ids);
        let selected = self.context.toggle_selected_nodes(global, &ids);
        self.update_network(global, false, true);
        selected
    }

    pub fn toggle_selected_links(&mut self, global: &mut NetworkGlobal, ids: &[LinkId]) -> Vec<LinkId> {
        let ids = self.valid_links(ids);
        let selected = self.context.toggle_selected_links(global, &ids);
        self.update_network(global, false, true);
        selected
    }

    pub fn toggle_selected_communities(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
    ) -> Vec<CommunityId> {
        let ids = self.valid_communities(ids);
        let selected = self.context.toggle_selected_communities(global, &ids);
        self.update_network(global, false, true);
        selected
    }

    pub fn clear_selection(&mut self, global: &mut NetworkGlobal) {
        self.context.clear_selection(global);
        self.update_network(global, false, true);
    }

    // ========================================================================
    // Attribute edits
    // ========================================================================

    pub fn edit_nodes(&mut self, global: &mut NetworkGlobal, ids: &[NodeId], edit: NodeEdit) {
        self.transformers.edit.queue_node_edit(ids, edit);
        self.transform(TransformerKind::Edit, global, false, None);
    }

    pub fn edit_links(&mut self, global: &mut NetworkGlobal, ids: &[LinkId], edit: LinkEdit) {
        self.transformers.edit.queue_link_edit(ids, edit);
        self.transform(TransformerKind::Edit, global, false, None);
    }

    pub fn set_nodes_size(&mut self, global: &mut NetworkGlobal, ids: &[NodeId], size: f32) {
        self.edit_nodes(global, ids, NodeEdit::Size(size));
    }

    pub fn set_nodes_color(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[NodeId],
        value: &str,
    ) -> Result<(), AppError> {
        let color = color::parse_color(value)?;
        self.edit_nodes(global, ids, NodeEdit::Color(color));
        Ok(())
    }

    pub fn set_nodes_position(&mut self, global: &mut NetworkGlobal, moves: &[(NodeId, Vec3)]) {
        for &(id, position) in moves {
            self.transformers
                .edit
                .queue_node_edit(&[id], NodeEdit::Position(position));
        }
        self.transform(TransformerKind::Edit, global, false, None);
    }

    pub fn set_links_width(&mut self, global: &mut NetworkGlobal, ids: &[LinkId], width: f32) {
        self.edit_links(global, ids, LinkEdit::Width(width));
    }

    pub fn set_links_alpha(&mut self, global: &mut NetworkGlobal, ids: &[LinkId], alpha: f32) {
        self.edit_links(global, ids, LinkEdit::Alpha(alpha));
    }

    pub fn set_links_bundling_strength(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[LinkId],
        strength: f32,
    ) {
        self.edit_links(global, ids, LinkEdit::BundlingStrength(strength));
    }

    pub fn set_links_color_start(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[LinkId],
        value: &str,
    ) -> Result<(), AppError> {
        let color = color::parse_color(value)?;
        self.edit_links(global, ids, LinkEdit::ColorStart(color));
        Ok(())
    }

    pub fn set_links_color_end(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[LinkId],
        value: &str,
    ) -> Result<(), AppError> {
        let color = color::parse_color(value)?;
        self.edit_links(global, ids, LinkEdit::ColorEnd(color));
        Ok(())
    }

    pub fn set_links_bundle_start(&mut self, global: &mut NetworkGlobal, ids: &[LinkId], flag: bool) {
        self.edit_links(global, ids, LinkEdit::BundleStart(flag));
    }

    pub fn set_links_bundle_end(&mut self, global: &mut NetworkGlobal, ids: &[LinkId], flag: bool) {
        self.edit_links(global, ids, LinkEdit::BundleEnd(flag));
    }

    // ========================================================================
    // Encodings
    // ========================================================================

    /// Rebinds encodings through `update` and re-evaluates them.
    ///
    /// A rejected encoding leaves the context untouched.
    pub fn set_encodings(
        &mut self,
        global: &mut NetworkGlobal,
        update: impl FnOnce(&mut Encodings, &NetworkGlobal) -> Result<(), AppError>,
    ) -> Result<(), AppError> {
        if let Err(e) = update(&mut self.context.encodings, global) {
            tracing::warn!(subnetwork = self.id(), error = %e, "Rejected encoding");
            return Err(e);
        }
        self.transform(TransformerKind::Encoding, global, false, None);
        Ok(())
    }

    pub fn set_node_size_encoding(
        &mut self,
        global: &mut NetworkGlobal,
        encoding: ScalarEncoding<NodeProperty>,
    ) -> Result<(), AppError> {
        self.set_encodings(global, |e, g| e.set_node_size(g, encoding))
    }

    pub fn set_node_color_encoding(
        &mut self,
        global: &mut NetworkGlobal,
        encoding: ColorEncoding<NodeProperty>,
    ) -> Result<(), AppError> {
        self.set_encodings(global, |e, g| e.set_node_color(g, encoding))
    }

    pub fn set_link_width_encoding(
        &mut self,
        global: &mut NetworkGlobal,
        encoding: ScalarEncoding<LinkProperty>,
    ) -> Result<(), AppError> {
        self.set_encodings(global, |e, g| e.set_link_width(g, encoding))
    }

    pub fn set_link_alpha_encoding(
        &mut self,
        global: &mut NetworkGlobal,
        encoding: ScalarEncoding<LinkProperty>,
    ) -> Result<(), AppError> {
        self.set_encodings(global, |e, g| e.set_link_alpha(g, encoding))
    }

    // ========================================================================
    // Movement
    // ========================================================================

    pub fn translate_communities(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
        delta: Vec3,
    ) {
        let ids = self.valid_communities(ids);
        self.context.translate_communities(global, &ids, delta);
        self.update_network(global, true, false);
    }

    pub fn rotate_communities(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
        rotation: Quat,
    ) {
        let ids = self.valid_communities(ids);
        self.context.rotate_communities(global, &ids, rotation);
        self.update_network(global, true, false);
    }

    /// Moves every real node of the network.
    pub fn translate_network(&mut self, global: &mut NetworkGlobal, delta: Vec3) {
        let ids: Vec<NodeId> = self
            .context
            .nodes
            .keys()
            .copied()
            .filter(|id| !global.is_virtual(*id))
            .collect();
        for id in ids {
            if let Some(position) = self.context.nodes.get(&id).map(|n| n.position) {
                self.context.set_node_position(global, id, position + delta);
            }
        }
        self.context.mark_all_communities_dirty();
        self.update_network(global, true, false);
    }

    /// Ends a drag gesture and requests a store.
    pub fn end_move(&mut self, global: &mut NetworkGlobal) {
        self.update_network(global, true, true);
    }

    // ========================================================================
    // Layouts
    // ========================================================================

    /// Lays out communities as hairballs or restores their spherical layout.
    pub fn set_hairball(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
        hairball: bool,
        animated: bool,
    ) {
        let ids = self.valid_communities(ids);
        for &id in &ids {
            let Some(community) = self.context.communities.get_mut(&id) else {
                continue;
            };
            if hairball {
                community.state = CommunityState::Hairball;
                let members: Vec<NodeId> = community.nodes.iter().copied().collect();
                self.transformers.hairball.update_nodes_on_next_apply(members);
            } else {
                community.state = CommunityState::None;
            }
        }

        if hairball {
            self.transform(TransformerKind::Hairball, global, animated, None);
        } else {
            self.transformers
                .spherical
                .update_communities_on_next_apply(global, &ids);
            self.transform(TransformerKind::Spherical, global, animated, None);
        }
    }

    /// Lays out the given nodes (all real nodes when empty) by simulation.
    pub fn force_directed_layout(&mut self, global: &mut NetworkGlobal, ids: &[NodeId], animated: bool) {
        let ids = self.valid_nodes(ids);
        self.transformers.force_directed.update_nodes_on_next_apply(ids);
        self.transform(TransformerKind::ForceDirected, global, animated, None);
    }

    pub fn set_viewer(&mut self, viewer: Viewer) {
        self.transformers.bring_node.set_viewer(viewer);
    }

    /// Moves the whole network under the `[layouts.world]` anchor, or
    /// under `anchor` when given.
    pub fn apply_world_transform(
        &mut self,
        global: &mut NetworkGlobal,
        anchor: Option<TransformInfo>,
        animated: bool,
    ) {
        if let Some(anchor) = anchor {
            self.transformers.world.set_anchor(anchor);
        }
        self.transform(TransformerKind::World, global, animated, None);
    }

    /// Brings nodes toward the viewer, or returns brought ones home.
    pub fn toggle_bring_nodes(&mut self, global: &mut NetworkGlobal, ids: &[NodeId], animated: bool) {
        for id in self.valid_nodes(ids) {
            let bring = !self.transformers.bring_node.is_brought(id);
            self.transformers.bring_node.set_bring_node_queue(id, bring);
        }
        self.transform(TransformerKind::BringNode, global, animated, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LayoutKind;
    use crate::models::fixtures::{self, member};

    fn setup() -> (NetworkGlobal, NodeLinkNetwork) {
        let data = fixtures::friends_network();
        let global = NetworkGlobal::build(&data).unwrap();
        let hairball = fixtures::friends_layout(|id| Vec3::new(id as f32, 0.0, 0.0));
        let layouts = Arc::new(LayoutSet::from_files([
            (LayoutKind::Spherical, data),
            (LayoutKind::Hairball, hairball),
        ]));
        let mut network = NodeLinkNetwork::new(2, layouts, &Config::default());
        network.context.set_from_global(&global);
        (global, network)
    }

    #[test]
    fn test_animated_transform_runs_to_completion() {
        let (mut global, mut network) = setup();
        let id = member(1, 1);

        network.set_hairball(&mut global, &[1], true, true);
        assert!(network.is_animating());
        assert_eq!(network.context.community_state(1), CommunityState::Hairball);

        assert!(!network.tick(0.5, &mut global));
        assert!(network.tick(0.6, &mut global));
        assert!(!network.is_animating());
        assert_eq!(network.context.nodes[&id].position, Vec3::new(id as f32, 0.0, 0.0));
        assert!(network.take_store_request());
        assert!(!network.take_store_request());
    }

    #[test]
    fn test_new_transition_cancels_running_one() {
        let (mut global, mut network) = setup();
        let id = member(1, 1);

        network.set_hairball(&mut global, &[1], true, true);
        network.tick(0.5, &mut global);
        let halfway = network.context.nodes[&id].position;

        network.set_hairball(&mut global, &[1], false, true);
        network.tick(0.0, &mut global);
        assert_eq!(network.context.nodes[&id].position, halfway);

        network.tick(2.0, &mut global);
        assert_eq!(network.context.nodes[&id].position, fixtures::fibonacci_point(id, 1.0));
        assert_eq!(network.context.community_state(1), CommunityState::None);
    }

    #[test]
    fn test_world_transform_moves_real_nodes() {
        let (mut global, mut network) = setup();
        let id = member(2, 5);
        network.context.nodes.get_mut(&id).unwrap().position = Vec3::X;

        network.apply_world_transform(&mut global, Some(TransformInfo::from_translation(Vec3::Z)), false);
        assert_eq!(network.context.nodes[&id].position, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(network.transformers.world.anchor().translation, Vec3::Z);
        assert!(!network.is_animating());
    }

    #[test]
    fn test_selection_skips_unknown_ids() {
        let (mut global, mut network) = setup();

        network.set_selected_nodes(&mut global, &[member(0, 0), 4242], true);
        assert!(network.context.nodes[&member(0, 0)].selected);
        assert!(global.nodes.get(member(0, 0)).unwrap().selected_on.contains(&2));

        let selected = network.toggle_selected_nodes(&mut global, &[member(0, 0), member(0, 1)]);
        assert_eq!(selected, vec![member(0, 1)]);
        assert!(!network.context.nodes[&member(0, 0)].selected);
    }

    #[test]
    fn test_rejected_encoding_keeps_context() {
        let (mut global, mut network) = setup();
        let before = network.context.encodings.clone();

        let result = network.set_node_size_encoding(
            &mut global,
            ScalarEncoding::Linear {
                property: NodeProperty::Field("nickname".into()),
                min: 0.0,
                max: 1.0,
                scale: 1.0,
            },
        );

        assert!(result.is_err());
        assert_eq!(network.context.encodings, before);
    }

    #[test]
    fn test_color_edit_rejects_bad_color() {
        let (mut global, mut network) = setup();
        assert!(network
            .set_nodes_color(&mut global, &[member(0, 0)], "not-a-color")
            .is_err());
        network
            .set_nodes_color(&mut global, &[member(0, 0)], "#ff0000")
            .unwrap();
        assert_eq!(
            network.context.nodes[&member(0, 0)].color,
            bevy_color::Srgba::RED
        );
    }

    #[test]
    fn test_bring_toggle_round_trips() {
        let (mut global, mut network) = setup();
        let id = member(3, 3);
        let home = network.context.nodes[&id].position;

        network.toggle_bring_nodes(&mut global, &[id], false);
        assert!(network.context.nodes[&id].brought);
        network.toggle_bring_nodes(&mut global, &[id], false);
        assert_eq!(network.context.nodes[&id].position, home);
    }
}
