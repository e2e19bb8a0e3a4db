//! Render context: per-view overlay of visual state on the Graph Model.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bevy_color::Srgba;
use bevy_math::{Quat, Vec3};

use crate::graph::{NetworkGlobal, SubnetworkId};
use crate::models::{generate_guid, CommunityId, LinkId, NodeId};

use super::encoding::Encodings;
use super::geometry::{self, Hull};
use super::ContextSettings;

/// Hull sample radius around each member, in node-scale units.
const HULL_PADDING: f32 = 0.3;

/// Layout state of a community within a context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommunityState {
    #[default]
    None,
    Spider,
    Floor,
    Cluster,
    Hairball,
    Other,
}

impl CommunityState {
    /// States visited by repeated focus cycling.
    pub const FOCUS_CYCLE: [CommunityState; 4] = [
        CommunityState::None,
        CommunityState::Spider,
        CommunityState::Floor,
        CommunityState::Cluster,
    ];

    /// Next state in the focus cycle; states outside the cycle return to `None`.
    pub fn next_focus(self) -> Self {
        match Self::FOCUS_CYCLE.iter().position(|&s| s == self) {
            Some(idx) => Self::FOCUS_CYCLE[(idx + 1) % Self::FOCUS_CYCLE.len()],
            None => CommunityState::None,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "spherical" | "none" => CommunityState::None,
            "spider" => CommunityState::Spider,
            "floor" => CommunityState::Floor,
            "cluster" => CommunityState::Cluster,
            "hairball" => CommunityState::Hairball,
            _ => CommunityState::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommunityState::None => "none",
            CommunityState::Spider => "spider",
            CommunityState::Floor => "floor",
            CommunityState::Cluster => "cluster",
            CommunityState::Hairball => "hairball",
            CommunityState::Other => "other",
        }
    }

    pub fn is_focused(self) -> bool {
        self != CommunityState::None
    }
}

/// Visual state of a node in one context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextNode {
    pub guid: String,
    pub size: f32,
    pub position: Vec3,
    pub color: Srgba,
    pub community_id: Option<CommunityId>,
    pub moveable: bool,
    pub selected: bool,
    /// Pulled toward the viewer by the bring-node layout.
    pub brought: bool,
    pub dirty: bool,
}

/// Visual state of a link in one context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextLink {
    pub guid: String,
    pub bundling_strength: f32,
    pub width: f32,
    pub color_start: Srgba,
    pub color_end: Srgba,
    pub alpha: f32,
    pub bundle_start: bool,
    pub bundle_end: bool,
    pub selected: bool,
    pub dirty: bool,
}

/// Aggregate state of a community in one context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextCommunity {
    pub guid: String,
    pub id: CommunityId,
    pub mass: f64,
    pub mass_center: Vec3,
    pub size: f64,
    pub state: CommunityState,
    /// Convex hull relative to `mass_center`.
    pub hull: Hull,
    /// Members present in this context.
    pub nodes: BTreeSet<NodeId>,
    pub moveable: bool,
    pub selected: bool,
    pub dirty: bool,
}

/// Envelope around every community of a context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkShell {
    pub mass_center: Vec3,
    pub size: f64,
    pub hull: Hull,
}

/// Entities whose visual representation must be re-emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    pub nodes: Vec<NodeId>,
    pub links: Vec<LinkId>,
    pub communities: Vec<CommunityId>,
}

impl DirtySet {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty() && self.communities.is_empty()
    }

    /// Adds `other`'s ids, keeping each list sorted and unique.
    pub fn merge(&mut self, other: &DirtySet) {
        fn extend(into: &mut Vec<i32>, from: &[i32]) {
            into.extend_from_slice(from);
            into.sort_unstable();
            into.dedup();
        }
        extend(&mut self.nodes, &other.nodes);
        extend(&mut self.links, &other.links);
        extend(&mut self.communities, &other.communities);
    }
}

/// One render view over the Graph Model.
///
/// Entities are sparse overlays keyed by Graph Model IDs. GUIDs are fresh
/// per context so duplicated subnetworks never alias each other.
#[derive(Debug, Clone)]
pub struct NetworkContext {
    pub settings: ContextSettings,
    pub subnetwork_id: SubnetworkId,
    pub nodes: BTreeMap<NodeId, ContextNode>,
    pub links: BTreeMap<LinkId, ContextLink>,
    pub communities: BTreeMap<CommunityId, ContextCommunity>,
    pub encodings: Encodings,
    /// Every community is selected.
    pub selected: bool,
    pub use_shell: bool,
    pub shell: NetworkShell,
    node_guids: HashMap<String, NodeId>,
    link_guids: HashMap<String, LinkId>,
    community_guids: HashMap<String, CommunityId>,
    node_links: HashMap<NodeId, Vec<LinkId>>,
    outgoing_links: HashMap<NodeId, Vec<LinkId>>,
}

impl NetworkContext {
    pub fn new(subnetwork_id: SubnetworkId, settings: ContextSettings) -> Self {
        let encodings = Encodings::defaults(&settings);
        Self {
            settings,
            subnetwork_id,
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            communities: BTreeMap::new(),
            encodings,
            selected: false,
            use_shell: false,
            shell: NetworkShell::default(),
            node_guids: HashMap::new(),
            link_guids: HashMap::new(),
            community_guids: HashMap::new(),
            node_links: HashMap::new(),
            outgoing_links: HashMap::new(),
        }
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.communities.clear();
        self.node_guids.clear();
        self.link_guids.clear();
        self.community_guids.clear();
        self.node_links.clear();
        self.outgoing_links.clear();
        self.selected = false;
    }

    // ========================================================================
    // Population
    // ========================================================================

    /// Populates the context with the whole Graph Model and default encodings.
    pub fn set_from_global(&mut self, global: &NetworkGlobal) {
        self.reset();
        self.encodings = Encodings::defaults(&self.settings);

        for node in global.nodes.iter() {
            self.insert_node(
                node.id,
                ContextNode {
                    guid: generate_guid(),
                    size: self.settings.node_scale,
                    position: Vec3::ZERO,
                    color: self.settings.node_default_color,
                    community_id: node.community_id,
                    moveable: false,
                    selected: false,
                    brought: false,
                    dirty: true,
                },
            );
        }

        for link in global.links.iter() {
            self.insert_link(link.id, self.default_link());
        }

        for community in global.communities.iter() {
            self.insert_community(community.id, community.nodes.iter().copied().collect());
        }

        self.rebuild_matrices(global);
        self.apply_encodings(global);
    }

    /// Populates the context as a filtered deep copy of `source`.
    ///
    /// IDs missing from `source` are logged and skipped. Links are kept when
    /// both ends survive; communities keep their surviving members.
    pub fn set_from_context(
        &mut self,
        global: &NetworkGlobal,
        source: &NetworkContext,
        node_ids: &[NodeId],
    ) {
        self.reset();
        self.settings = source.settings.clone();
        self.encodings = source.encodings.clone();
        self.use_shell = source.use_shell;

        let (valid, invalid): (Vec<NodeId>, Vec<NodeId>) = node_ids
            .iter()
            .copied()
            .partition(|id| source.nodes.contains_key(id));
        if !invalid.is_empty() {
            tracing::warn!(
                subnetwork = source.subnetwork_id,
                "Nodes {:?} not found in subnetwork {}",
                invalid,
                source.subnetwork_id
            );
        }

        for id in &valid {
            let Some(node) = source.nodes.get(id) else {
                continue;
            };
            self.insert_node(
                *id,
                ContextNode {
                    guid: generate_guid(),
                    size: node.size,
                    position: node.position,
                    color: node.color,
                    community_id: node.community_id,
                    moveable: true,
                    selected: false,
                    brought: false,
                    dirty: true,
                },
            );
        }

        for (&link_id, link) in &source.links {
            let Some(global_link) = global.links.get(link_id) else {
                continue;
            };
            if !self.nodes.contains_key(&global_link.source_id)
                || !self.nodes.contains_key(&global_link.target_id)
            {
                continue;
            }
            self.insert_link(
                link_id,
                ContextLink {
                    guid: generate_guid(),
                    selected: false,
                    dirty: true,
                    ..link.clone()
                },
            );
        }

        for (&community_id, community) in &source.communities {
            let members: BTreeSet<NodeId> = community
                .nodes
                .iter()
                .copied()
                .filter(|id| self.nodes.contains_key(id))
                .collect();
            if members.is_empty() {
                continue;
            }
            self.insert_community(community_id, members);
        }

        self.rebuild_matrices(global);
    }

    fn default_link(&self) -> ContextLink {
        ContextLink {
            guid: generate_guid(),
            bundling_strength: 0.0,
            width: 1.0,
            color_start: self.settings.link_default_color,
            color_end: self.settings.link_default_color,
            alpha: 1.0,
            bundle_start: false,
            bundle_end: false,
            selected: false,
            dirty: true,
        }
    }

    fn insert_node(&mut self, id: NodeId, node: ContextNode) {
        self.node_guids.insert(node.guid.clone(), id);
        self.nodes.insert(id, node);
    }

    fn insert_link(&mut self, id: LinkId, link: ContextLink) {
        self.link_guids.insert(link.guid.clone(), id);
        self.links.insert(id, link);
    }

    fn insert_community(&mut self, id: CommunityId, nodes: BTreeSet<NodeId>) {
        let guid = generate_guid();
        self.community_guids.insert(guid.clone(), id);
        self.communities.insert(
            id,
            ContextCommunity {
                guid,
                id,
                mass: 0.0,
                mass_center: Vec3::ZERO,
                size: geometry::MIN_COMMUNITY_SIZE,
                state: CommunityState::None,
                hull: Hull::default(),
                nodes,
                moveable: self.subnetwork_id != 0,
                selected: false,
                dirty: true,
            },
        );
    }

    /// Node→link matrices restricted to links present in this context.
    fn rebuild_matrices(&mut self, global: &NetworkGlobal) {
        self.node_links.clear();
        self.outgoing_links.clear();

        for &link_id in self.links.keys() {
            let Some(link) = global.links.get(link_id) else {
                continue;
            };
            self.node_links
                .entry(link.source_id)
                .or_default()
                .push(link_id);
            if link.target_id != link.source_id {
                self.node_links
                    .entry(link.target_id)
                    .or_default()
                    .push(link_id);
            }
            self.outgoing_links
                .entry(link.source_id)
                .or_default()
                .push(link_id);
        }
    }

    /// Evaluates the bound encodings into every real node and link.
    ///
    /// Returns the touched node and link IDs.
    pub fn apply_encodings(&mut self, global: &NetworkGlobal) -> (Vec<NodeId>, Vec<LinkId>) {
        let mut touched_nodes = Vec::new();
        for (&id, node) in self.nodes.iter_mut() {
            let Some(global_node) = global.nodes.get(id) else {
                continue;
            };
            if global_node.is_virtual {
                continue;
            }
            node.size = self.encodings.node_size(global_node);
            node.color = self.encodings.node_color(global_node);
            node.dirty = true;
            touched_nodes.push(id);
        }

        let mut touched_links = Vec::new();
        for (&id, link) in self.links.iter_mut() {
            let Some(global_link) = global.links.get(id) else {
                continue;
            };
            let visual = self.encodings.link_visual(global, global_link);
            link.width = visual.width;
            link.bundling_strength = visual.bundling_strength;
            link.color_start = visual.color_start;
            link.color_end = visual.color_end;
            link.bundle_start = visual.bundle_start;
            link.bundle_end = visual.bundle_end;
            link.alpha = visual.alpha;
            link.dirty = true;
            touched_links.push(id);
        }

        for id in &touched_nodes {
            if let Some(c) = self.nodes.get(id).and_then(|n| n.community_id) {
                self.mark_community_dirty(c);
            }
        }

        (touched_nodes, touched_links)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Links touching a node within this context.
    pub fn node_links(&self, id: NodeId) -> &[LinkId] {
        self.node_links.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Links leaving a node within this context.
    pub fn outgoing_links(&self, id: NodeId) -> &[LinkId] {
        self.outgoing_links
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn node_by_guid(&self, guid: &str) -> Option<NodeId> {
        self.node_guids.get(guid).copied()
    }

    pub fn link_by_guid(&self, guid: &str) -> Option<LinkId> {
        self.link_guids.get(guid).copied()
    }

    pub fn community_by_guid(&self, guid: &str) -> Option<CommunityId> {
        self.community_guids.get(guid).copied()
    }

    /// State of the community a node belongs to.
    pub fn node_state(&self, id: NodeId) -> CommunityState {
        self.nodes
            .get(&id)
            .and_then(|n| n.community_id)
            .and_then(|c| self.communities.get(&c))
            .map_or(CommunityState::None, |c| c.state)
    }

    pub fn community_state(&self, id: CommunityId) -> CommunityState {
        self.communities
            .get(&id)
            .map_or(CommunityState::None, |c| c.state)
    }

    // ========================================================================
    // Dirty bookkeeping
    // ========================================================================

    pub fn mark_node_dirty(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.dirty = true;
        }
    }

    pub fn mark_link_dirty(&mut self, id: LinkId) {
        if let Some(link) = self.links.get_mut(&id) {
            link.dirty = true;
        }
    }

    pub fn mark_community_dirty(&mut self, id: CommunityId) {
        if let Some(community) = self.communities.get_mut(&id) {
            community.dirty = true;
        }
    }

    pub fn mark_all_communities_dirty(&mut self) {
        for community in self.communities.values_mut() {
            community.dirty = true;
        }
    }

    /// Entities dirty in this context or in the Graph Model.
    pub fn collect_dirty(&self, global: &NetworkGlobal) -> DirtySet {
        DirtySet {
            nodes: self
                .nodes
                .iter()
                .filter(|(id, n)| n.dirty || global.nodes.get(**id).is_some_and(|g| g.dirty))
                .map(|(id, _)| *id)
                .collect(),
            links: self
                .links
                .iter()
                .filter(|(id, l)| l.dirty || global.links.get(**id).is_some_and(|g| g.dirty))
                .map(|(id, _)| *id)
                .collect(),
            communities: self
                .communities
                .iter()
                .filter(|(id, c)| {
                    c.dirty || global.communities.get(**id).is_some_and(|g| g.dirty)
                })
                .map(|(id, _)| *id)
                .collect(),
        }
    }

    /// Flags the given entities dirty again on the context side. Ids no
    /// longer in the context are ignored.
    pub fn mark_dirty(&mut self, dirty: &DirtySet) {
        for id in &dirty.nodes {
            if let Some(node) = self.nodes.get_mut(id) {
                node.dirty = true;
            }
        }
        for id in &dirty.links {
            if let Some(link) = self.links.get_mut(id) {
                link.dirty = true;
            }
        }
        for id in &dirty.communities {
            if let Some(community) = self.communities.get_mut(id) {
                community.dirty = true;
            }
        }
    }

    /// Clears the context-side flags.
    pub fn clear_dirty(&mut self) {
        self.nodes.values_mut().for_each(|n| n.dirty = false);
        self.links.values_mut().for_each(|l| l.dirty = false);
        self.communities.values_mut().for_each(|c| c.dirty = false);
    }

    /// Render-consumer contract: report entities dirty on either side, then
    /// clear both flags.
    pub fn drain_dirty(&mut self, global: &mut NetworkGlobal) -> DirtySet {
        let dirty = self.collect_dirty(global);
        for &id in &dirty.nodes {
            if let Some(node) = global.nodes.get_mut(id) {
                node.dirty = false;
            }
        }
        for &id in &dirty.links {
            if let Some(link) = global.links.get_mut(id) {
                link.dirty = false;
            }
        }
        for &id in &dirty.communities {
            if let Some(community) = global.communities.get_mut(id) {
                community.dirty = false;
            }
        }
        self.clear_dirty();
        dirty
    }

    // ========================================================================
    // Community aggregates
    // ========================================================================

    /// Recomputes mass, center, size and hull of dirty communities.
    pub fn recompute_comm_props(&mut self, global: &NetworkGlobal) {
        let padding = self.settings.node_scale * HULL_PADDING;

        for community in self.communities.values_mut().filter(|c| c.dirty) {
            let members: Vec<(f64, Vec3)> = community
                .nodes
                .iter()
                .filter_map(|id| {
                    let node = self.nodes.get(id)?;
                    let degree = global.nodes.get(*id).map_or(0.0, |n| n.degree);
                    Some((degree, node.position))
                })
                .collect();

            let props = geometry::group_props(&members);
            community.mass = props.mass;
            community.mass_center = props.center;
            community.size = props.size;

            let positions: Vec<Vec3> = members.iter().map(|(_, p)| *p).collect();
            community.hull = geometry::convex_hull(&positions, padding, props.center);
        }

        if self.use_shell {
            self.recompute_shell();
        }
    }

    fn recompute_shell(&mut self) {
        let centers: Vec<(f64, Vec3)> = self
            .communities
            .values()
            .map(|c| (c.mass, c.mass_center))
            .collect();
        let props = geometry::group_props(&centers);
        let largest = self
            .communities
            .values()
            .map(|c| c.size as f32)
            .fold(0.0_f32, f32::max);

        let positions: Vec<Vec3> = centers.iter().map(|(_, p)| *p).collect();
        self.shell = NetworkShell {
            mass_center: props.center,
            size: props.size + largest as f64,
            hull: geometry::convex_hull(&positions, largest + self.settings.node_scale, props.center),
        };
    }

    // ========================================================================
    // Movement
    // ========================================================================

    /// Moves a node, marking it and its community dirty on both sides.
    pub fn set_node_position(
        &mut self,
        global: &mut NetworkGlobal,
        id: NodeId,
        position: Vec3,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.position = position;
        node.dirty = true;
        let community = node.community_id;

        global.mark_node_dirty(id);
        if let Some(c) = community {
            self.mark_community_dirty(c);
            global.mark_community_dirty(c);
        }
        true
    }

    /// Translates every member of the given communities.
    pub fn translate_communities(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
        delta: Vec3,
    ) {
        for id in ids {
            let members: Vec<NodeId> = self
                .communities
                .get(id)
                .map(|c| c.nodes.iter().copied().collect())
                .unwrap_or_default();
            for node_id in members {
                if let Some(position) = self.nodes.get(&node_id).map(|n| n.position) {
                    self.set_node_position(global, node_id, position + delta);
                }
            }
        }
    }

    /// Rotates every member of the given communities about its mass center.
    pub fn rotate_communities(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
        rotation: Quat,
    ) {
        for id in ids {
            let Some(community) = self.communities.get(id) else {
                continue;
            };
            let pivot = community.mass_center;
            let members: Vec<NodeId> = community.nodes.iter().copied().collect();
            for node_id in members {
                if let Some(position) = self.nodes.get(&node_id).map(|n| n.position) {
                    self.set_node_position(global, node_id, pivot + rotation * (position - pivot));
                }
            }
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Sets node selection; each node's links follow its new state.
    pub fn set_selected_nodes(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[NodeId],
        selected: bool,
    ) {
        let subnetwork = self.subnetwork_id;
        for &id in ids {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            if node.selected != selected {
                node.selected = selected;
                node.dirty = true;
                if let Some(global_node) = global.nodes.get_mut(id) {
                    toggle_membership(&mut global_node.selected_on, subnetwork, selected);
                    global_node.dirty = true;
                }
            }

            let link_ids = self.node_links.get(&id).cloned().unwrap_or_default();
            self.select_links(global, &link_ids, selected);
        }
        self.recompute_selecteds(global);
    }

    pub fn set_selected_links(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[LinkId],
        selected: bool,
    ) {
        self.select_links(global, ids, selected);
        self.recompute_selecteds(global);
    }

    fn select_links(&mut self, global: &mut NetworkGlobal, ids: &[LinkId], selected: bool) {
        let subnetwork = self.subnetwork_id;
        for &id in ids {
            let Some(link) = self.links.get_mut(&id) else {
                continue;
            };
            if link.selected == selected {
                continue;
            }
            link.selected = selected;
            link.dirty = true;
            if let Some(global_link) = global.links.get_mut(id) {
                toggle_membership(&mut global_link.selected_on, subnetwork, selected);
                global_link.dirty = true;
            }
        }
    }

    /// Selects or deselects every member of the given communities.
    pub fn set_selected_communities(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
        selected: bool,
    ) {
        let mut members = Vec::new();
        for id in ids {
            if let Some(community) = self.communities.get_mut(id) {
                community.dirty = true;
                members.extend(community.nodes.iter().copied());
                global.mark_community_dirty(*id);
            }
        }
        self.set_selected_nodes(global, &members, selected);
    }

    pub fn set_selected_network(&mut self, global: &mut NetworkGlobal, selected: bool) {
        let ids: Vec<CommunityId> = self.communities.keys().copied().collect();
        self.set_selected_communities(global, &ids, selected);
    }

    /// Flips node selection; returns the IDs that became selected.
    ///
    /// Newly selected nodes are applied first, so a link between a node
    /// being selected and one being deselected ends up deselected.
    pub fn toggle_selected_nodes(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[NodeId],
    ) -> Vec<NodeId> {
        let (deselect, select) = self.partition_by(ids, |c, id| {
            c.nodes.get(&id).map(|n| n.selected)
        });
        self.set_selected_nodes(global, &select, true);
        self.set_selected_nodes(global, &deselect, false);
        select
    }

    /// Flips link selection; returns the IDs that became selected.
    pub fn toggle_selected_links(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[LinkId],
    ) -> Vec<LinkId> {
        let (deselect, select) = self.partition_by(ids, |c, id| {
            c.links.get(&id).map(|l| l.selected)
        });
        self.set_selected_links(global, &select, true);
        self.set_selected_links(global, &deselect, false);
        select
    }

    /// Flips community selection; returns the IDs that became selected.
    pub fn toggle_selected_communities(
        &mut self,
        global: &mut NetworkGlobal,
        ids: &[CommunityId],
    ) -> Vec<CommunityId> {
        let (deselect, select) = self.partition_by(ids, |c, id| {
            c.communities.get(&id).map(|c| c.selected)
        });
        self.set_selected_communities(global, &select, true);
        self.set_selected_communities(global, &deselect, false);
        select
    }

    /// Splits known IDs into (currently selected, not selected).
    fn partition_by(
        &self,
        ids: &[i32],
        selected: impl Fn(&Self, i32) -> Option<bool>,
    ) -> (Vec<i32>, Vec<i32>) {
        let mut on = Vec::new();
        let mut off = Vec::new();
        for &id in ids {
            match selected(self, id) {
                Some(true) => on.push(id),
                Some(false) => off.push(id),
                None => {}
            }
        }
        (on, off)
    }

    pub fn clear_selection(&mut self, global: &mut NetworkGlobal) {
        self.set_selected_network(global, false);
        let link_ids: Vec<LinkId> = self.links.keys().copied().collect();
        self.set_selected_links(global, &link_ids, false);
    }

    /// A community is selected iff every member is; the network iff every
    /// community is. Recomputed from scratch on each call.
    pub fn recompute_selecteds(&mut self, global: &mut NetworkGlobal) {
        let subnetwork = self.subnetwork_id;
        for community in self.communities.values_mut() {
            let selected = !community.nodes.is_empty()
                && community
                    .nodes
                    .iter()
                    .all(|id| self.nodes.get(id).is_some_and(|n| n.selected));
            if community.selected == selected {
                continue;
            }
            community.selected = selected;
            community.dirty = true;
            if let Some(global_community) = global.communities.get_mut(community.id) {
                toggle_membership(&mut global_community.selected_on, subnetwork, selected);
                global_community.dirty = true;
            }
        }

        self.selected =
            !self.communities.is_empty() && self.communities.values().all(|c| c.selected);
    }

    pub fn selected_node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.selected)
            .map(|(id, _)| *id)
            .collect()
    }
}

fn toggle_membership(set: &mut BTreeSet<SubnetworkId>, id: SubnetworkId, on: bool) {
    if on {
        set.insert(id);
    } else {
        set.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{self, member};

    fn setup() -> (NetworkGlobal, NetworkContext) {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();
        let mut context = NetworkContext::new(0, ContextSettings::default());
        context.set_from_global(&global);
        (global, context)
    }

    #[test]
    fn test_set_from_global_populates_overlays() {
        let (global, context) = setup();

        assert_eq!(context.nodes.len(), global.nodes.len());
        assert_eq!(context.links.len(), 80);
        assert_eq!(context.communities.len(), 5);
        let link = context.links.values().next().unwrap();
        assert_eq!(link.alpha, context.settings.link_normal_alpha);
        assert_eq!(link.bundling_strength, context.settings.edge_bundling_strength);

        let guid = &context.nodes[&member(1, 1)].guid;
        assert_eq!(context.node_by_guid(guid), Some(member(1, 1)));
    }

    #[test]
    fn test_selection_round_trip() {
        let (mut global, mut context) = setup();
        let ids = [member(0, 0), member(0, 1), member(3, 4)];

        context.set_selected_nodes(&mut global, &ids, true);
        assert!(ids.iter().all(|id| context.nodes[id].selected));
        assert!(ids.iter().all(|id| global.nodes.get(*id).unwrap().selected()));
        assert!(context.links.values().any(|l| l.selected));

        context.set_selected_nodes(&mut global, &ids, false);
        assert!(context.nodes.values().all(|n| !n.selected));
        assert!(context.links.values().all(|l| !l.selected));
        assert!(global.links.iter().all(|l| !l.selected()));
        assert!(context.communities.values().all(|c| !c.selected));
    }

    #[test]
    fn test_complete_community_rule() {
        let (mut global, mut context) = setup();
        let all_but_one: Vec<NodeId> = (0..9).map(|k| member(2, k)).collect();

        context.set_selected_nodes(&mut global, &all_but_one, true);
        assert!(!context.communities[&2].selected);

        context.set_selected_nodes(&mut global, &[member(2, 9)], true);
        assert!(context.communities[&2].selected);
        assert!(global.communities.get(2).unwrap().selected());
        assert!(!context.selected);

        context.set_selected_nodes(&mut global, &[member(2, 4)], false);
        assert!(!context.communities[&2].selected);
    }

    #[test]
    fn test_select_network_and_clear() {
        let (mut global, mut context) = setup();

        context.set_selected_network(&mut global, true);
        assert!(context.selected);
        assert!(context.communities.values().all(|c| c.selected));

        context.clear_selection(&mut global);
        assert!(!context.selected);
        assert!(context.nodes.values().all(|n| !n.selected));
        assert!(context.links.values().all(|l| !l.selected));
    }

    #[test]
    fn test_toggle_returns_newly_selected() {
        let (mut global, mut context) = setup();
        context.set_selected_nodes(&mut global, &[member(0, 0)], true);

        let newly = context.toggle_selected_nodes(&mut global, &[member(0, 0), member(0, 1), 9999]);
        assert_eq!(newly, vec![member(0, 1)]);
        assert!(!context.nodes[&member(0, 0)].selected);
        assert!(context.nodes[&member(0, 1)].selected);

        let newly = context.toggle_selected_communities(&mut global, &[4]);
        assert_eq!(newly, vec![4]);
        assert!(context.communities[&4].selected);
    }

    #[test]
    fn test_toggle_applies_selection_before_deselection() {
        let (mut global, mut context) = setup();
        let link = global.links.iter().next().unwrap();
        let (id, source, target) = (link.id, link.source_id, link.target_id);

        context.set_selected_nodes(&mut global, &[source], true);
        assert!(context.links[&id].selected);

        let newly = context.toggle_selected_nodes(&mut global, &[source, target]);
        assert_eq!(newly, vec![target]);
        assert!(context.nodes[&target].selected);
        assert!(!context.links[&id].selected);
        assert!(!global.links.get(id).unwrap().selected());
    }

    #[test]
    fn test_community_selection_marks_graph_model_dirty() {
        let (mut global, mut context) = setup();
        context.set_selected_communities(&mut global, &[1], true);
        context.drain_dirty(&mut global);

        // members are unchanged, the community is still flagged on both sides
        context.set_selected_communities(&mut global, &[1], true);
        assert!(context.communities[&1].dirty);
        assert!(global.communities.get(1).unwrap().dirty);
        assert!(!global.communities.get(0).unwrap().dirty);
    }

    #[test]
    fn test_set_from_context_full_copy_is_equivalent() {
        let (global, mut source) = setup();
        for (i, node) in source.nodes.values_mut().enumerate() {
            node.position = Vec3::new(i as f32, 0.5, -1.0);
        }
        source.links.values_mut().next().unwrap().width = 0.42;

        let ids: Vec<NodeId> = global.real_node_ids().to_vec();
        let mut copy = NetworkContext::new(1, ContextSettings::default());
        copy.set_from_context(&global, &source, &ids);

        assert_eq!(copy.nodes.len(), 50);
        assert_eq!(copy.links.len(), 80);
        assert_eq!(copy.communities.len(), 5);
        for (id, node) in &copy.nodes {
            let original = &source.nodes[id];
            assert_eq!(node.position, original.position);
            assert_eq!(node.color, original.color);
            assert_eq!(node.size, original.size);
            assert_ne!(node.guid, original.guid);
        }
        for (id, link) in &copy.links {
            let original = &source.links[id];
            assert_eq!(link.width, original.width);
            assert_eq!(link.color_start, original.color_start);
            assert_eq!(link.alpha, original.alpha);
        }
        assert_eq!(copy.encodings, source.encodings);
    }

    #[test]
    fn test_set_from_context_subset_and_invalid_ids() {
        let (global, source) = setup();
        let ids = [member(0, 0), member(0, 1), member(1, 0), 424242];

        let mut copy = NetworkContext::new(2, ContextSettings::default());
        copy.set_from_context(&global, &source, &ids);

        assert_eq!(copy.nodes.len(), 3);
        // ring 0-1 and outer 0 -> (1,0)
        assert_eq!(copy.links.len(), 2);
        assert_eq!(copy.communities.len(), 2);
        assert_eq!(copy.communities[&0].nodes.len(), 2);
        assert_eq!(copy.node_links(member(0, 0)).len(), 2);
    }

    #[test]
    fn test_recompute_comm_props_only_dirty() {
        let (global, mut context) = setup();
        for k in 0..10 {
            context.nodes.get_mut(&member(0, k)).unwrap().position = Vec3::new(k as f32, 0.0, 0.0);
        }
        context.recompute_comm_props(&global);

        let first = &context.communities[&0];
        assert_eq!(first.mass_center, Vec3::new(4.5, 0.0, 0.0));
        assert!((first.size - 4.5).abs() < 1e-5);
        assert!(!first.hull.is_empty());

        context.clear_dirty();
        context.nodes.get_mut(&member(0, 0)).unwrap().position = Vec3::new(100.0, 0.0, 0.0);
        context.recompute_comm_props(&global);
        assert_eq!(context.communities[&0].mass_center, Vec3::new(4.5, 0.0, 0.0));
    }

    #[test]
    fn test_drain_dirty_ors_and_clears_both() {
        let (mut global, mut context) = setup();
        context.drain_dirty(&mut global);

        global.mark_node_dirty(member(1, 1));
        context.mark_link_dirty(3);
        let dirty = context.drain_dirty(&mut global);
        assert_eq!(dirty.nodes, vec![member(1, 1)]);
        assert_eq!(dirty.links, vec![3]);

        assert!(context.drain_dirty(&mut global).is_empty());
        assert!(!global.nodes.get(member(1, 1)).unwrap().dirty);
    }

    #[test]
    fn test_set_node_position_marks_community() {
        let (mut global, mut context) = setup();
        context.drain_dirty(&mut global);

        assert!(context.set_node_position(&mut global, member(3, 3), Vec3::ONE));
        assert!(!context.set_node_position(&mut global, 31337, Vec3::ONE));
        assert!(context.communities[&3].dirty);
        assert!(global.communities.get(3).unwrap().dirty);
    }

    #[test]
    fn test_focus_cycle() {
        assert_eq!(CommunityState::None.next_focus(), CommunityState::Spider);
        assert_eq!(CommunityState::Spider.next_focus(), CommunityState::Floor);
        assert_eq!(CommunityState::Floor.next_focus(), CommunityState::Cluster);
        assert_eq!(CommunityState::Cluster.next_focus(), CommunityState::None);
        assert_eq!(CommunityState::Hairball.next_focus(), CommunityState::None);
        assert_eq!(CommunityState::parse("Spherical"), CommunityState::None);
        assert_eq!(CommunityState::parse("wobbly"), CommunityState::Other);
    }
}
