//! Render contexts layered over the Graph Model.
//!
//! A [`NetworkContext`] carries the visual state (positions, colors, sizes,
//! selection, dirty flags) of one view. The main network, every duplicated
//! subnetwork and the minimap each own one.

pub mod encoding;
pub mod geometry;
mod minimap;
mod network_context;
mod settings;

pub use encoding::{
    ColorEncoding, Encodings, FlagEncoding, LinkProperty, NodeProperty, ScalarEncoding,
};
pub use geometry::Hull;
pub use minimap::{MinimapContext, MinimapDirty, MinimapLink, MinimapNode, MAX_MINIMAP_LINKS};
pub use network_context::{
    CommunityState, ContextCommunity, ContextLink, ContextNode, DirtySet, NetworkContext,
    NetworkShell,
};
pub use settings::ContextSettings;
