//! Owner of the Graph Model and every network drawn from it.

use std::collections::BTreeMap;
use std::iter;
use std::sync::Arc;

use crate::config::Config;
use crate::contexts::{DirtySet, MinimapContext, MinimapDirty};
use crate::error::AppError;
use crate::graph::{NetworkGlobal, SubnetworkId};
use crate::loader::{LayoutKind, LayoutSet};
use crate::transformers::LinkEdit;

use super::multi_layout::{MultiLayoutNetwork, MAIN_NETWORK_ID};
use super::node_link::NodeLinkNetwork;

/// Scale applied to main-network community centers in the minimap.
const MINIMAP_SCALE: f32 = 0.1;

/// The Graph Model, the main network, its subnetworks and the minimap.
///
/// Every mutation goes through [`NetworkManager::with_network`] or
/// [`NetworkManager::with_main`] so that Graph Model changes made by one
/// network are propagated to the others.
pub struct NetworkManager {
    global: NetworkGlobal,
    layouts: Arc<LayoutSet>,
    main: MultiLayoutNetwork,
    subnetworks: BTreeMap<SubnetworkId, NodeLinkNetwork>,
    minimap: MinimapContext,
    config: Config,
    next_id: SubnetworkId,
    storage_paused: bool,
}

impl NetworkManager {
    /// Loads the configured dataset and initializes the main network.
    pub fn load(config: &Config) -> Result<Self, AppError> {
        let (dir, name) = config.dataset_location();
        let layouts = LayoutSet::load(&dir, name)?;
        Self::from_layouts(Arc::new(layouts), config)
    }

    pub fn from_layouts(layouts: Arc<LayoutSet>, config: &Config) -> Result<Self, AppError> {
        let base = layouts
            .base()
            .ok_or(AppError::MissingLayout(LayoutKind::Spherical.suffix()))?;
        let mut global = NetworkGlobal::build(&base.file)?;

        let mut main = MultiLayoutNetwork::new(layouts.clone(), config);
        main.initialize(&mut global);

        let mut minimap = MinimapContext::new(MINIMAP_SCALE);
        minimap.set_from_global(&global);
        minimap.recompute_props(&global, &main.network.context);

        Ok(Self {
            global,
            layouts,
            main,
            subnetworks: BTreeMap::new(),
            minimap,
            config: config.clone(),
            next_id: MAIN_NETWORK_ID + 1,
            storage_paused: false,
        })
    }

    pub fn global(&self) -> &NetworkGlobal {
        &self.global
    }

    pub fn main(&self) -> &MultiLayoutNetwork {
        &self.main
    }

    pub fn minimap(&self) -> &MinimapContext {
        &self.minimap
    }

    /// The network with `id`; `0` is the main network.
    pub fn network(&self, id: SubnetworkId) -> Option<&NodeLinkNetwork> {
        if id == MAIN_NETWORK_ID {
            return Some(&self.main.network);
        }
        self.subnetworks.get(&id)
    }

    /// The main network followed by subnetworks in ID order.
    pub fn networks(&self) -> impl Iterator<Item = &NodeLinkNetwork> {
        iter::once(&self.main.network).chain(self.subnetworks.values())
    }

    pub fn subnetwork_ids(&self) -> Vec<SubnetworkId> {
        self.subnetworks.keys().copied().collect()
    }

    pub fn is_animating(&self) -> bool {
        self.networks().any(NodeLinkNetwork::is_animating)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Runs `f` against one network, then propagates Graph Model changes.
    pub fn with_network<R>(
        &mut self,
        id: SubnetworkId,
        f: impl FnOnce(&mut NodeLinkNetwork, &mut NetworkGlobal) -> R,
    ) -> Result<R, AppError> {
        let network = if id == MAIN_NETWORK_ID {
            &mut self.main.network
        } else {
            self.subnetworks
                .get_mut(&id)
                .ok_or(AppError::SubnetworkNotFound(id))?
        };
        let result = f(network, &mut self.global);
        self.propagate(id);
        Ok(result)
    }

    /// Runs `f` against the main network's layout controller.
    pub fn with_main<R>(
        &mut self,
        f: impl FnOnce(&mut MultiLayoutNetwork, &mut NetworkGlobal) -> R,
    ) -> R {
        let result = f(&mut self.main, &mut self.global);
        self.propagate(MAIN_NETWORK_ID);
        result
    }

    /// Lets every network other than `source` pick up Graph Model changes.
    fn propagate(&mut self, source: SubnetworkId) {
        for network in iter::once(&mut self.main.network).chain(self.subnetworks.values_mut()) {
            if network.id() != source {
                network.update_network(&mut self.global, false, false);
            }
        }
        self.minimap
            .recompute_props(&self.global, &self.main.network.context);
    }

    // ========================================================================
    // Subnetworks
    // ========================================================================

    /// Copies the selected nodes of `from` into a new subnetwork.
    ///
    /// The copy keeps positions and attributes but draws links straight.
    pub fn duplicate_selection(&mut self, from: SubnetworkId) -> Result<SubnetworkId, AppError> {
        let source = self
            .network(from)
            .ok_or(AppError::SubnetworkNotFound(from))?;
        let ids = source.context.selected_node_ids();
        if ids.is_empty() {
            return Err(AppError::EmptySelection(from));
        }

        let id = self.next_id;
        let mut network = NodeLinkNetwork::new(id, self.layouts.clone(), &self.config);
        network.context.set_from_context(&self.global, &source.context, &ids);
        network.context.use_shell = true;

        let links: Vec<_> = network.context.links.keys().copied().collect();
        network.edit_links(&mut self.global, &links, LinkEdit::BundlingStrength(0.0));

        tracing::info!(
            subnetwork = id,
            source = from,
            nodes = network.context.nodes.len(),
            links = links.len(),
            "Created subnetwork"
        );
        self.subnetworks.insert(id, network);
        self.next_id += 1;
        Ok(id)
    }

    /// Drops a subnetwork, releasing its selections in the Graph Model.
    pub fn remove_subnetwork(&mut self, id: SubnetworkId) -> Result<(), AppError> {
        if id == MAIN_NETWORK_ID {
            return Err(AppError::MainNetworkRemoval);
        }
        let mut network = self
            .subnetworks
            .remove(&id)
            .ok_or(AppError::SubnetworkNotFound(id))?;
        network.context.clear_selection(&mut self.global);
        self.propagate(id);
        tracing::info!(subnetwork = id, "Removed subnetwork");
        Ok(())
    }

    // ========================================================================
    // Frame loop
    // ========================================================================

    /// Advances every running transition; returns whether any is still running.
    pub fn tick(&mut self, dt: f32) -> bool {
        for network in iter::once(&mut self.main.network).chain(self.subnetworks.values_mut()) {
            if network.tick(dt, &mut self.global) {
                tracing::debug!(subnetwork = network.id(), "Transition finished");
            }
        }
        self.minimap
            .recompute_props(&self.global, &self.main.network.context);
        self.is_animating()
    }

    /// Reports what each network must redraw, then clears every flag.
    ///
    /// All contexts read the Graph Model flags before any are cleared. While
    /// storage is paused each network keeps what was drained so that the
    /// store on resume still sees it.
    pub fn drain_render_updates(&mut self) -> Vec<(SubnetworkId, DirtySet)> {
        let updates: Vec<_> = self
            .networks()
            .map(|network| (network.id(), network.context.collect_dirty(&self.global)))
            .collect();

        let networks = iter::once(&mut self.main.network).chain(self.subnetworks.values_mut());
        for (network, (_, dirty)) in networks.zip(&updates) {
            if self.storage_paused {
                network.hold_unstored(dirty);
            }
            network.context.clear_dirty();
        }
        self.global.clear_dirty();
        updates
    }

    /// Reports what the minimap must redraw and clears its flags.
    pub fn drain_minimap_updates(&mut self) -> MinimapDirty {
        self.minimap.drain_dirty()
    }

    // ========================================================================
    // Storage
    // ========================================================================

    /// Holds back store requests, e.g. during a drag gesture.
    pub fn pause_storage_update(&mut self) {
        self.storage_paused = true;
    }

    /// Resumes storing and requests a store of every network, including
    /// the changes drained while paused.
    pub fn resume_storage_update(&mut self) {
        self.storage_paused = false;
        for network in iter::once(&mut self.main.network).chain(self.subnetworks.values_mut()) {
            network.release_unstored();
        }
    }

    pub fn is_storage_paused(&self) -> bool {
        self.storage_paused
    }

    /// Networks waiting to be stored. Requests stay pending while paused.
    pub fn take_store_requests(&mut self) -> Vec<SubnetworkId> {
        if self.storage_paused {
            return Vec::new();
        }
        iter::once(&mut self.main.network)
            .chain(self.subnetworks.values_mut())
            .filter_map(|network| network.take_store_request().then(|| network.id()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{self, member};
    use bevy_math::Vec3;

    fn setup() -> NetworkManager {
        let data = fixtures::friends_network();
        let layouts = Arc::new(LayoutSet::from_files([
            (LayoutKind::Spherical, data),
            (
                LayoutKind::Hairball,
                fixtures::friends_layout(|id| Vec3::new(0.0, id as f32, 0.0)),
            ),
        ]));
        NetworkManager::from_layouts(layouts, &Config::default()).unwrap()
    }

    fn select_members(manager: &mut NetworkManager, id: SubnetworkId, ids: &[i32]) {
        manager
            .with_network(id, |network, global| network.set_selected_nodes(global, ids, true))
            .unwrap();
    }

    #[test]
    fn test_missing_spherical_layout_is_rejected() {
        let layouts = Arc::new(LayoutSet::from_files([(
            LayoutKind::Hairball,
            fixtures::friends_network(),
        )]));
        let result = NetworkManager::from_layouts(layouts, &Config::default());
        assert!(matches!(result, Err(AppError::MissingLayout(_))));
    }

    #[test]
    fn test_from_layouts_initializes_main_and_minimap() {
        let manager = setup();
        assert!(manager.main().is_spherical());
        assert_eq!(manager.minimap().nodes.len(), 5);
        assert!(manager.network(MAIN_NETWORK_ID).is_some());
        assert!(manager.network(7).is_none());
    }

    #[test]
    fn test_duplicate_selection_copies_nodes_with_straight_links() {
        let mut manager = setup();
        let ids: Vec<i32> = (0..4).map(|k| member(1, k)).collect();
        select_members(&mut manager, MAIN_NETWORK_ID, &ids);

        let id = manager.duplicate_selection(MAIN_NETWORK_ID).unwrap();
        assert_eq!(id, 1);

        let sub = manager.network(id).unwrap();
        assert_eq!(sub.context.nodes.len(), 4);
        assert!(sub.context.use_shell);
        assert!(sub.context.links.values().all(|l| l.bundling_strength == 0.0));
        let main = &manager.main().network.context;
        assert_eq!(
            sub.context.nodes[&member(1, 2)].position,
            main.nodes[&member(1, 2)].position
        );
        assert_eq!(manager.subnetwork_ids(), vec![1]);
    }

    #[test]
    fn test_duplicate_errors() {
        let mut manager = setup();
        assert!(matches!(
            manager.duplicate_selection(MAIN_NETWORK_ID),
            Err(AppError::EmptySelection(0))
        ));
        assert!(matches!(
            manager.duplicate_selection(3),
            Err(AppError::SubnetworkNotFound(3))
        ));
    }

    #[test]
    fn test_selection_propagates_to_other_contexts() {
        let mut manager = setup();
        select_members(&mut manager, MAIN_NETWORK_ID, &[member(2, 0), member(2, 1)]);
        let sub = manager.duplicate_selection(MAIN_NETWORK_ID).unwrap();
        manager.drain_render_updates();

        select_members(&mut manager, sub, &[member(2, 0)]);

        let updates = manager.drain_render_updates();
        let (_, main_dirty) = updates
            .iter()
            .find(|(id, _)| *id == MAIN_NETWORK_ID)
            .unwrap();
        assert!(main_dirty.nodes.contains(&member(2, 0)));

        let again = manager.drain_render_updates();
        assert!(again.iter().all(|(_, dirty)| dirty.is_empty()));
    }

    #[test]
    fn test_remove_subnetwork_releases_selection() {
        let mut manager = setup();
        let id = member(0, 0);
        select_members(&mut manager, MAIN_NETWORK_ID, &[id]);
        let sub = manager.duplicate_selection(MAIN_NETWORK_ID).unwrap();
        select_members(&mut manager, sub, &[id]);
        assert!(manager.global().nodes.get(id).unwrap().selected_on.contains(&sub));

        manager.remove_subnetwork(sub).unwrap();
        let selected_on = &manager.global().nodes.get(id).unwrap().selected_on;
        assert!(!selected_on.contains(&sub));
        assert!(selected_on.contains(&MAIN_NETWORK_ID));

        assert!(matches!(
            manager.remove_subnetwork(sub),
            Err(AppError::SubnetworkNotFound(_))
        ));
        assert!(matches!(
            manager.remove_subnetwork(MAIN_NETWORK_ID),
            Err(AppError::MainNetworkRemoval)
        ));
    }

    #[test]
    fn test_storage_requests_wait_while_paused() {
        let mut manager = setup();
        assert_eq!(manager.take_store_requests(), vec![MAIN_NETWORK_ID]);
        assert!(manager.take_store_requests().is_empty());

        manager.pause_storage_update();
        manager
            .with_network(MAIN_NETWORK_ID, |network, global| {
                network.set_nodes_size(global, &[member(3, 1)], 2.0)
            })
            .unwrap();
        assert!(manager.take_store_requests().is_empty());

        manager.resume_storage_update();
        assert_eq!(manager.take_store_requests(), vec![MAIN_NETWORK_ID]);
    }

    #[test]
    fn test_changes_drained_while_paused_are_flagged_on_resume() {
        let mut manager = setup();
        manager.drain_render_updates();

        let moved = member(0, 1);
        manager.pause_storage_update();
        for step in 1..=3 {
            manager
                .with_network(MAIN_NETWORK_ID, |network, global| {
                    network.set_nodes_position(global, &[(moved, Vec3::splat(step as f32))])
                })
                .unwrap();
            let updates = manager.drain_render_updates();
            assert!(updates[0].1.nodes.contains(&moved));
        }
        assert!(!manager.main().network.context.nodes[&moved].dirty);

        manager.resume_storage_update();
        let context = &manager.main().network.context;
        assert!(context.nodes[&moved].dirty);
        assert!(!context.nodes[&member(1, 1)].dirty);

        // held changes are released once
        manager.drain_render_updates();
        manager.pause_storage_update();
        manager.resume_storage_update();
        assert!(!manager.main().network.context.nodes[&moved].dirty);
    }

    #[test]
    fn test_minimap_updates_follow_moves_and_drain() {
        let mut manager = setup();
        manager.drain_render_updates();
        manager.drain_minimap_updates();
        assert!(manager.drain_minimap_updates().is_empty());

        manager
            .with_network(MAIN_NETWORK_ID, |network, global| {
                network.translate_communities(global, &[2], Vec3::new(5.0, 0.0, 0.0))
            })
            .unwrap();
        assert_eq!(manager.drain_minimap_updates().nodes, vec![2]);
        assert!(manager.minimap().nodes.values().all(|n| !n.dirty));
    }

    #[test]
    fn test_tick_runs_transitions_to_completion() {
        let mut manager = setup();
        manager.with_main(|main, global| main.toggle_spherical_and_hairball(global, true));
        assert!(manager.is_animating());

        assert!(manager.tick(0.5));
        assert!(!manager.tick(1.0));
        let id = member(4, 2);
        assert_eq!(
            manager.main().network.context.nodes[&id].position,
            Vec3::new(0.0, id as f32, 0.0)
        );
    }
}
