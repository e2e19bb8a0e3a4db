//! Graph Model: the structural truth behind every render context.
//!
//! Nodes, links and communities live in [`Collection`] arenas keyed by their
//! external IDs. Render contexts overlay them by ID and never hold references.

mod collection;
mod entities;
mod network;

pub use collection::{Collection, Keyed};
pub use entities::{Community, Link, Node, SubnetworkId, TreeLink};
pub use network::{CommunityTagging, NetworkGlobal, DEGREE_PER_LINK};
