//! Layout and encoding strategies applied to a render context.
//!
//! Each transformer computes new context values from the Graph Model and its
//! injected layout data. `apply_transformation` commits them at once;
//! `get_interpolator` commits the non-positional part and returns an
//! animator that eases positions toward the same targets.

mod bring_node;
mod edit;
mod encoding;
mod focus;
mod force_directed;
mod hairball;
mod highlight;
mod interpolator;
mod plan;
mod spherical;
mod transform_info;
mod world;

use std::fmt;

use crate::contexts::NetworkContext;
use crate::graph::NetworkGlobal;

pub use bring_node::{BringNodeTransformer, Viewer};
pub use edit::{EditTransformer, LinkEdit, NodeEdit};
pub use encoding::EncodingTransformer;
pub use focus::{tiered_link_patch, FocusLayoutTransformer, FocusQueue, FocusStyle};
pub use force_directed::ForceDirectedTransformer;
pub use hairball::HairballLayoutTransformer;
pub use highlight::HighlightTransformer;
pub use interpolator::{
    lerp_exact, smoothstep, ChainInterpolator, NoopInterpolator, PositionInterpolator,
    TransformInterpolator,
};
pub use plan::{LayoutPlan, LinkPatch};
pub use spherical::SphericalLayoutTransformer;
pub use transform_info::{LayoutAnchors, TransformInfo};
pub use world::WorldTransformTransformer;

/// A strategy that recomputes context values.
pub trait NetworkTransformer: Send {
    /// Commits the transformation immediately.
    fn apply_transformation(&mut self, global: &mut NetworkGlobal, context: &mut NetworkContext);

    /// Commits non-positional changes and returns an animator for the rest.
    fn get_interpolator(
        &mut self,
        global: &mut NetworkGlobal,
        context: &mut NetworkContext,
    ) -> Box<dyn TransformInterpolator>;
}

/// Named transformer slots of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransformerKind {
    Spherical,
    Hairball,
    Spider,
    Cluster,
    Floor,
    BringNode,
    ForceDirected,
    Encoding,
    Edit,
    Highlight,
    World,
}

impl TransformerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransformerKind::Spherical => "spherical",
            TransformerKind::Hairball => "hairball",
            TransformerKind::Spider => "spider",
            TransformerKind::Cluster => "cluster",
            TransformerKind::Floor => "floor",
            TransformerKind::BringNode => "bringNode",
            TransformerKind::ForceDirected => "forceDirected",
            TransformerKind::Encoding => "encoding",
            TransformerKind::Edit => "edit",
            TransformerKind::Highlight => "highlight",
            TransformerKind::World => "world",
        }
    }
}

impl fmt::Display for TransformerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
