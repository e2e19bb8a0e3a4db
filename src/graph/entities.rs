//! Structural entities of the Graph Model.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{CommunityId, LinkId, NodeId, PropBag};

use super::collection::Keyed;

/// ID of a render context (0 is the main network).
pub type SubnetworkId = u32;

/// A node of the hierarchy, real or virtual.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    /// Community the node belongs to; `None` for virtual scaffolding.
    pub community_id: Option<CommunityId>,
    /// Tree parent; `None` only for the root.
    pub ancestor_id: Option<NodeId>,
    /// Ordered tree children.
    pub child_ids: Vec<NodeId>,
    pub is_virtual: bool,
    /// Accumulated link weight.
    pub degree: f64,
    pub height: i32,
    /// Color string from the file, if any.
    pub color: Option<String>,
    pub props: PropBag,
    /// Ancestor chain, parent first and ending at the root.
    pub ancestors: Vec<NodeId>,
    /// Subnetworks in which the node is currently selected.
    pub selected_on: BTreeSet<SubnetworkId>,
    pub dirty: bool,
}

impl Node {
    pub fn selected(&self) -> bool {
        !self.selected_on.is_empty()
    }

    /// Distance to the root.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }
}

impl Keyed for Node {
    const KIND: &'static str = "node";

    fn key(&self) -> i32 {
        self.id
    }
}

/// A real link between two real nodes.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    /// Tree path from source to target through their lowest common ancestor.
    pub path_in_tree: Vec<NodeId>,
    pub is_spline: bool,
    pub props: PropBag,
    pub selected_on: BTreeSet<SubnetworkId>,
    pub dirty: bool,
}

impl Link {
    pub fn selected(&self) -> bool {
        !self.selected_on.is_empty()
    }

    /// The endpoint opposite to `node`.
    pub fn other_end(&self, node: NodeId) -> NodeId {
        if self.source_id == node {
            self.target_id
        } else {
            self.source_id
        }
    }
}

impl Keyed for Link {
    const KIND: &'static str = "link";

    fn key(&self) -> i32 {
        self.id
    }
}

/// Parent-to-child edge of the virtual hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLink {
    /// Negative, so it never collides with a real link ID.
    pub id: LinkId,
    pub source_id: NodeId,
    pub target_id: NodeId,
}

/// A set of real nodes sharing one virtual parent.
#[derive(Debug, Clone)]
pub struct Community {
    pub id: CommunityId,
    pub root_node_id: NodeId,
    /// Real member nodes, in node order.
    pub nodes: Vec<NodeId>,
    /// Links with both ends inside the community.
    pub inner_links: Vec<LinkId>,
    /// Links with exactly one end inside the community.
    pub outer_links: Vec<LinkId>,
    /// Other community → number of links between the two.
    pub aggregate_links: BTreeMap<CommunityId, usize>,
    pub selected_on: BTreeSet<SubnetworkId>,
    pub focus: bool,
    pub dirty: bool,
}

impl Community {
    pub fn new(id: CommunityId, root_node_id: NodeId) -> Self {
        Self {
            id,
            root_node_id,
            nodes: Vec::new(),
            inner_links: Vec::new(),
            outer_links: Vec::new(),
            aggregate_links: BTreeMap::new(),
            selected_on: BTreeSet::new(),
            focus: false,
            dirty: false,
        }
    }

    pub fn selected(&self) -> bool {
        !self.selected_on.is_empty()
    }
}

impl Keyed for Community {
    const KIND: &'static str = "community";

    fn key(&self) -> i32 {
        self.id
    }
}
