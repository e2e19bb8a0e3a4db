//! Propagates Graph Model changes into a context.
//!
//! Selection lives in the Graph Model, so one context's change must be
//! re-rendered by every other context showing the same node.

use crate::contexts::NetworkContext;
use crate::graph::NetworkGlobal;
use crate::models::NodeId;

use super::interpolator::{NoopInterpolator, TransformInterpolator};
use super::NetworkTransformer;

#[derive(Debug, Default)]
pub struct HighlightTransformer;

impl HighlightTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl NetworkTransformer for HighlightTransformer {
    fn apply_transformation(&mut self, global: &mut NetworkGlobal, context: &mut NetworkContext) {
        let dirty: Vec<NodeId> = context
            .nodes
            .keys()
            .copied()
            .filter(|id| global.nodes.get(*id).is_some_and(|n| n.dirty))
            .collect();

        for id in dirty {
            context.mark_node_dirty(id);
            let links = context.node_links(id).to_vec();
            for link_id in links {
                context.mark_link_dirty(link_id);
            }
        }
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

    #[test]
    fn test_global_dirty_nodes_mark_context_links() {
        let mut global = NetworkGlobal::build(&fixtures::friends_network()).unwrap();
        let mut context = NetworkContext::new(1, ContextSettings::default());
        context.set_from_global(&global);
        context.drain_dirty(&mut global);

        let id = member(2, 5);
        global.mark_node_dirty(id);
        HighlightTransformer::new().apply_transformation(&mut global, &mut context);

        assert!(context.nodes[&id].dirty);
        assert!(!context.nodes[&member(2, 6)].dirty);
        for link_id in global.node_links(id) {
            assert!(context.links[link_id].dirty);
        }
    }
}
