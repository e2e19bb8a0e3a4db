//! Graph Model builder and queries.

use std::collections::{HashMap, HashSet};

use crate::error::AppError;
use crate::models::{CommunityId, LinkId, NetworkFileData, NodeId};

use super::collection::Collection;
use super::entities::{Community, Link, Node, TreeLink};

/// Degree contribution of each link endpoint.
pub const DEGREE_PER_LINK: f64 = 0.01;

/// Result of the community tagging pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityTagging {
    /// Community root per community ID (the index).
    pub roots: Vec<NodeId>,
    /// Real node → community.
    pub membership: HashMap<NodeId, CommunityId>,
}

/// Structural truth shared by every render context.
#[derive(Debug, Clone)]
pub struct NetworkGlobal {
    pub root_id: NodeId,
    pub nodes: Collection<Node>,
    pub links: Collection<Link>,
    pub tree_links: Vec<TreeLink>,
    pub communities: Collection<Community>,
    /// Whether domain props are coded categories.
    pub coded: bool,
    node_links: HashMap<NodeId, Vec<LinkId>>,
    outgoing_links: HashMap<NodeId, Vec<LinkId>>,
    real_node_ids: Vec<NodeId>,
    virtual_node_ids: Vec<NodeId>,
}

impl NetworkGlobal {
    /// Builds the Graph Model from one layout file. All-or-nothing.
    pub fn build(data: &NetworkFileData) -> Result<Self, AppError> {
        let mut network = Self {
            root_id: data.root_idx,
            nodes: Collection::with_capacity(data.nodes.len()),
            links: Collection::with_capacity(data.links.len()),
            tree_links: Vec::new(),
            communities: Collection::default(),
            coded: data.coded,
            node_links: HashMap::new(),
            outgoing_links: HashMap::new(),
            real_node_ids: Vec::new(),
            virtual_node_ids: Vec::new(),
        };

        for file_node in &data.nodes {
            network.nodes.insert(Node {
                id: file_node.idx,
                label: file_node.label.clone(),
                community_id: None,
                ancestor_id: file_node.ancestor(),
                child_ids: Vec::new(),
                is_virtual: file_node.virtual_node,
                degree: 0.0,
                height: file_node.height,
                color: file_node.color.clone(),
                props: file_node.props.clone(),
                ancestors: Vec::new(),
                selected_on: Default::default(),
                dirty: false,
            })?;
            if file_node.virtual_node {
                network.virtual_node_ids.push(file_node.idx);
            } else {
                network.real_node_ids.push(file_node.idx);
            }
        }

        if !network.nodes.contains(network.root_id) {
            return Err(AppError::MissingRoot(network.root_id));
        }

        network.init_ancestors()?;
        network.init_children(data)?;
        network.init_links(data)?;
        network.init_tree_links();

        let tagging = network.tag_communities()?;
        network.init_communities(&tagging)?;

        tracing::info!(
            nodes = network.nodes.len(),
            links = network.links.len(),
            communities = network.communities.len(),
            "Built graph model"
        );

        Ok(network)
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    fn init_ancestors(&mut self) -> Result<(), AppError> {
        let ids: Vec<NodeId> = self.nodes.ids().collect();
        for id in ids {
            let chain = self.ancestor_chain(id)?;
            if let Some(node) = self.nodes.get_mut(id) {
                node.ancestors = chain;
            }
        }
        Ok(())
    }

    /// Walks parent pointers up to the root, parent first.
    fn ancestor_chain(&self, id: NodeId) -> Result<Vec<NodeId>, AppError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = id;

        while current != self.root_id {
            let parent = self
                .nodes
                .get(current)
                .and_then(|n| n.ancestor_id)
                .ok_or_else(|| {
                    AppError::MalformedTree(format!(
                        "node {} is detached from root {}",
                        current, self.root_id
                    ))
                })?;

            if !self.nodes.contains(parent) {
                return Err(AppError::MissingAncestor {
                    node: current,
                    ancestor: parent,
                });
            }
            if !seen.insert(parent) {
                return Err(AppError::CyclicAncestry(parent));
            }

            chain.push(parent);
            current = parent;
        }

        Ok(chain)
    }

    /// Child order follows the files; children only reachable through
    /// their ancestor pointer are appended in node order.
    fn init_children(&mut self, data: &NetworkFileData) -> Result<(), AppError> {
        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for file_node in &data.nodes {
            for &child in &file_node.child_idx {
                let parent = self.nodes.get(child).and_then(|n| n.ancestor_id);
                if parent != Some(file_node.idx) {
                    return Err(AppError::MalformedTree(format!(
                        "node {} lists child {} whose ancestor is {:?}",
                        file_node.idx, child, parent
                    )));
                }
                children.entry(file_node.idx).or_default().push(child);
            }
        }

        for node in self.nodes.iter() {
            if node.id == self.root_id {
                continue;
            }
            if let Some(parent) = node.ancestor_id {
                let list = children.entry(parent).or_default();
                if !list.contains(&node.id) {
                    list.push(node.id);
                }
            }
        }

        for (parent, list) in children {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.child_ids = list;
            }
        }
        Ok(())
    }

    fn init_tree_links(&mut self) {
        let mut stack = vec![self.root_id];
        let mut tree_links = Vec::new();

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for &child in node.child_ids.iter().rev() {
                stack.push(child);
            }
            if !node.is_virtual {
                continue;
            }
            for &child in &node.child_ids {
                tree_links.push(TreeLink {
                    id: -(tree_links.len() as LinkId) - 1,
                    source_id: id,
                    target_id: child,
                });
            }
        }

        self.tree_links = tree_links;
    }

    // ========================================================================
    // Links
    // ========================================================================

    fn init_links(&mut self, data: &NetworkFileData) -> Result<(), AppError> {
        for file_link in &data.links {
            for endpoint in [file_link.source_idx, file_link.target_idx] {
                match self.nodes.get(endpoint) {
                    None => {
                        return Err(AppError::UnknownNode {
                            link: file_link.link_idx,
                            node: endpoint,
                        })
                    }
                    Some(node) if node.is_virtual => {
                        return Err(AppError::VirtualLinkEndpoint {
                            link: file_link.link_idx,
                            node: endpoint,
                        })
                    }
                    Some(_) => {}
                }
            }

            let path_in_tree = self.path_in_tree(file_link.source_idx, file_link.target_idx);
            self.links.insert(Link {
                id: file_link.link_idx,
                source_id: file_link.source_idx,
                target_id: file_link.target_idx,
                path_in_tree,
                is_spline: file_link.spline,
                props: file_link.props.clone(),
                selected_on: Default::default(),
                dirty: false,
            })?;

            for endpoint in [file_link.source_idx, file_link.target_idx] {
                if let Some(node) = self.nodes.get_mut(endpoint) {
                    node.degree += DEGREE_PER_LINK;
                }
            }

            let undirected = self.node_links.entry(file_link.source_idx).or_default();
            undirected.push(file_link.link_idx);
            if file_link.target_idx != file_link.source_idx {
                self.node_links
                    .entry(file_link.target_idx)
                    .or_default()
                    .push(file_link.link_idx);
            }
            self.outgoing_links
                .entry(file_link.source_idx)
                .or_default()
                .push(file_link.link_idx);
        }
        Ok(())
    }

    /// Tree path from `source` to `target` through their lowest common ancestor.
    ///
    /// The LCA is the first entry of the source's ancestor chain that also
    /// appears in the target's chain.
    pub fn path_in_tree(&self, source: NodeId, target: NodeId) -> Vec<NodeId> {
        let (Some(s), Some(t)) = (self.nodes.get(source), self.nodes.get(target)) else {
            return Vec::new();
        };

        let target_ancestors: HashSet<NodeId> = t.ancestors.iter().copied().collect();
        let Some(common_pos) = s
            .ancestors
            .iter()
            .position(|a| target_ancestors.contains(a))
        else {
            return vec![source, target];
        };
        let common = s.ancestors[common_pos];
        let target_pos = t
            .ancestors
            .iter()
            .position(|&a| a == common)
            .unwrap_or(t.ancestors.len());

        let mut path = Vec::with_capacity(common_pos + target_pos + 3);
        path.push(source);
        path.extend_from_slice(&s.ancestors[..common_pos]);
        path.push(common);
        path.extend(t.ancestors[..target_pos].iter().rev());
        path.push(target);
        path
    }

    // ========================================================================
    // Communities
    // ========================================================================

    /// Depth-first tagging pass over the tree.
    ///
    /// A virtual node with at least one real child becomes a community root;
    /// its real children (and their real descendants) join it. Pure over the
    /// tree, so re-running it yields the same partition.
    pub fn tag_communities(&self) -> Result<CommunityTagging, AppError> {
        let mut roots = Vec::new();
        let mut membership = HashMap::new();
        let mut stack: Vec<(NodeId, Option<CommunityId>)> = vec![(self.root_id, None)];

        while let Some((id, inherited)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };

            let community = if node.is_virtual {
                let has_real_child = node
                    .child_ids
                    .iter()
                    .any(|&c| self.nodes.get(c).is_some_and(|n| !n.is_virtual));
                if has_real_child {
                    roots.push(id);
                    Some((roots.len() - 1) as CommunityId)
                } else {
                    None
                }
            } else {
                let community = inherited.ok_or_else(|| {
                    AppError::MalformedTree(format!("real node {} has no community root", id))
                })?;
                membership.insert(id, community);
                Some(community)
            };

            for &child in node.child_ids.iter().rev() {
                let child_is_real = self.nodes.get(child).is_some_and(|n| !n.is_virtual);
                stack.push((child, if child_is_real { community } else { None }));
            }
        }

        Ok(CommunityTagging { roots, membership })
    }

    fn init_communities(&mut self, tagging: &CommunityTagging) -> Result<(), AppError> {
        let mut communities: Vec<Community> = tagging
            .roots
            .iter()
            .enumerate()
            .map(|(id, &root)| Community::new(id as CommunityId, root))
            .collect();

        for node in self.nodes.iter_mut() {
            node.community_id = tagging.membership.get(&node.id).copied();
            if let Some(c) = node.community_id {
                communities[c as usize].nodes.push(node.id);
            }
        }

        for link in self.links.iter() {
            let source = self.nodes.get(link.source_id).and_then(|n| n.community_id);
            let target = self.nodes.get(link.target_id).and_then(|n| n.community_id);
            let (Some(source), Some(target)) = (source, target) else {
                continue;
            };

            if source == target {
                communities[source as usize].inner_links.push(link.id);
            } else {
                communities[source as usize].outer_links.push(link.id);
                communities[target as usize].outer_links.push(link.id);
                *communities[source as usize]
                    .aggregate_links
                    .entry(target)
                    .or_default() += 1;
                *communities[target as usize]
                    .aggregate_links
                    .entry(source)
                    .or_default() += 1;
            }
        }

        self.communities = Collection::with_capacity(communities.len());
        for community in communities {
            self.communities.insert(community)?;
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Links touching a node in either direction.
    pub fn node_links(&self, id: NodeId) -> &[LinkId] {
        self.node_links.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Links whose source is the node.
    pub fn outgoing_links(&self, id: NodeId) -> &[LinkId] {
        self.outgoing_links
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn community_of(&self, id: NodeId) -> Option<CommunityId> {
        self.nodes.get(id).and_then(|n| n.community_id)
    }

    pub fn is_virtual(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.is_virtual)
    }

    pub fn real_node_ids(&self) -> &[NodeId] {
        &self.real_node_ids
    }

    pub fn virtual_node_ids(&self) -> &[NodeId] {
        &self.virtual_node_ids
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(id).map(Node::depth)
    }

    /// The community root followed by its virtual ancestors.
    pub fn community_scaffolding(&self, id: CommunityId) -> Vec<NodeId> {
        let Some(community) = self.communities.get(id) else {
            return Vec::new();
        };
        let mut ids = vec![community.root_node_id];
        if let Some(root) = self.nodes.get(community.root_node_id) {
            ids.extend(root.ancestors.iter().copied());
        }
        ids
    }

    pub fn mark_node_dirty(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.dirty = true;
        }
    }

    pub fn mark_link_dirty(&mut self, id: LinkId) {
        if let Some(link) = self.links.get_mut(id) {
            link.dirty = true;
        }
    }

    pub fn mark_community_dirty(&mut self, id: CommunityId) {
        if let Some(community) = self.communities.get_mut(id) {
            community.dirty = true;
        }
    }

    /// Clears every global dirty flag once all contexts have read them.
    pub fn clear_dirty(&mut self) {
        self.nodes.iter_mut().for_each(|n| n.dirty = false);
        self.links.iter_mut().for_each(|l| l.dirty = false);
        self.communities.iter_mut().for_each(|c| c.dirty = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{self, community_root, member};
    use crate::models::{LinkFileData, NodeFileData};

    fn node(idx: NodeId, anc: NodeId, virtual_node: bool) -> NodeFileData {
        NodeFileData {
            idx,
            anc_idx: anc,
            virtual_node,
            ..Default::default()
        }
    }

    #[test]
    fn test_ancestor_lists_end_at_root_once() {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();

        for node in global.nodes.iter().filter(|n| n.id != global.root_id) {
            assert_eq!(node.ancestors.last(), Some(&global.root_id));
            let root_count = node
                .ancestors
                .iter()
                .filter(|&&a| a == global.root_id)
                .count();
            assert_eq!(root_count, 1);
            let unique: HashSet<_> = node.ancestors.iter().collect();
            assert_eq!(unique.len(), node.ancestors.len());
        }
        assert!(global.nodes.get(global.root_id).unwrap().ancestors.is_empty());
    }

    #[test]
    fn test_path_in_tree_is_contiguous() {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();

        for link in global.links.iter() {
            let path = &link.path_in_tree;
            assert_eq!(path.first(), Some(&link.source_id));
            assert_eq!(path.last(), Some(&link.target_id));

            for pair in path.windows(2) {
                let a = global.nodes.get(pair[0]).unwrap();
                let b = global.nodes.get(pair[1]).unwrap();
                assert!(
                    a.ancestor_id == Some(b.id) || b.ancestor_id == Some(a.id),
                    "{} and {} are not tree neighbors",
                    a.id,
                    b.id
                );
            }

            let edges = path.len() - 1;
            let bound = global.depth(link.source_id).unwrap() + global.depth(link.target_id).unwrap();
            assert!(edges <= bound);
        }
    }

    #[test]
    fn test_path_through_community_root_and_global_root() {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();

        assert_eq!(
            global.path_in_tree(member(0, 0), member(0, 1)),
            vec![member(0, 0), community_root(0), member(0, 1)]
        );
        assert_eq!(
            global.path_in_tree(member(0, 0), member(1, 0)),
            vec![
                member(0, 0),
                community_root(0),
                fixtures::ROOT,
                community_root(1),
                member(1, 0)
            ]
        );
    }

    #[test]
    fn test_communities_partition_real_nodes() {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();
        assert_eq!(global.communities.len(), 5);

        let mut seen = HashSet::new();
        for community in global.communities.iter() {
            for &id in &community.nodes {
                assert!(seen.insert(id), "node {} in two communities", id);
            }
        }
        let real: HashSet<_> = global.real_node_ids().iter().copied().collect();
        assert_eq!(seen, real);

        let again = global.tag_communities().unwrap();
        assert_eq!(again, global.tag_communities().unwrap());
        for node in global.nodes.iter() {
            assert_eq!(node.community_id, again.membership.get(&node.id).copied());
        }
    }

    #[test]
    fn test_community_links_and_aggregates() {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();
        let first = global.communities.get(0).unwrap();

        assert_eq!(first.root_node_id, community_root(0));
        assert_eq!(first.inner_links.len(), 12);
        assert_eq!(first.outer_links.len(), 8);
        assert_eq!(first.aggregate_links.get(&1), Some(&4));
        assert_eq!(first.aggregate_links.get(&4), Some(&4));
    }

    #[test]
    fn test_degree_and_matrices() {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();
        let id = member(0, 0);

        // ring (2) + chord (1) + outgoing outer (1) + incoming outer (1)
        assert_eq!(global.node_links(id).len(), 5);
        assert!((global.nodes.get(id).unwrap().degree - 5.0 * DEGREE_PER_LINK).abs() < 1e-9);
        assert_eq!(global.outgoing_links(id).len(), 3);
    }

    #[test]
    fn test_tree_links_are_negative() {
        let global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();

        assert_eq!(global.tree_links.len(), 5 + 50);
        assert!(global.tree_links.iter().all(|l| l.id < 0));
        assert!(global.tree_links.iter().all(|l| !global.links.contains(l.id)));
    }

    #[test]
    fn test_missing_ancestor_is_fatal() {
        let data = NetworkFileData {
            root_idx: 0,
            nodes: vec![node(0, -1, true), node(1, 0, true), node(2, 9, false)],
            ..Default::default()
        };

        let err = NetworkGlobal::build(&data).unwrap_err();
        assert!(matches!(err, AppError::MissingAncestor { node: 2, ancestor: 9 }));
        assert!(err.is_load_error());
    }

    #[test]
    fn test_cyclic_ancestry_is_fatal() {
        let data = NetworkFileData {
            root_idx: 0,
            nodes: vec![node(0, -1, true), node(1, 2, true), node(2, 1, true)],
            ..Default::default()
        };

        let err = NetworkGlobal::build(&data).unwrap_err();
        assert!(matches!(err, AppError::CyclicAncestry(_)));
    }

    #[test]
    fn test_link_to_unknown_node_is_fatal() {
        let data = NetworkFileData {
            root_idx: 0,
            nodes: vec![node(0, -1, true), node(1, 0, false)],
            links: vec![LinkFileData {
                link_idx: 0,
                source_idx: 1,
                target_idx: 5,
                ..Default::default()
            }],
            ..Default::default()
        };

        let err = NetworkGlobal::build(&data).unwrap_err();
        assert!(matches!(err, AppError::UnknownNode { link: 0, node: 5 }));
    }

    #[test]
    fn test_real_descendants_join_parent_community() {
        let data = NetworkFileData {
            root_idx: 0,
            nodes: vec![
                node(0, -1, true),
                node(1, 0, true),
                node(2, 1, false),
                node(3, 2, false),
                node(4, 1, true),
                node(5, 4, false),
            ],
            ..Default::default()
        };

        let global = NetworkGlobal::build(&data).unwrap();
        assert_eq!(global.communities.len(), 2);
        assert_eq!(global.community_of(2), Some(0));
        assert_eq!(global.community_of(3), Some(0));
        assert_eq!(global.community_of(5), Some(1));
        assert_eq!(global.community_of(4), None);
    }
}
