//! Evaluates the context's bound encodings.

use crate::contexts::NetworkContext;
use crate::graph::NetworkGlobal;

use super::interpolator::{NoopInterpolator, TransformInterpolator};
use super::NetworkTransformer;

#[derive(Debug, Default)]
pub struct EncodingTransformer;

impl EncodingTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl NetworkTransformer for EncodingTransformer {
    fn apply_transformation(&mut self, global: &mut NetworkGlobal, context: &mut NetworkContext) {
        let (nodes, links) = context.apply_encodings(global);
        tracing::debug!(
            subnetwork = context.subnetwork_id,
            nodes = nodes.len(),
            links = links.len(),
            "Applied encodings"
        );

        for id in nodes {
            global.mark_node_dirty(id);
            if let Some(c) = global.community_of(id) {
                global.mark_community_dirty(c);
            }
        }
        for id in links {
            global.mark_link_dirty(id);
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
