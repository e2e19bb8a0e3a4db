//! File data models for layout datasets.

mod network_file;
mod props;

#[cfg(test)]
pub(crate) mod fixtures;

pub use network_file::{
    generate_guid, CommunityId, FilePosition, LinkFileData, LinkId, NetworkFileData,
    NodeFileData, NodeId, NO_ANCESTOR,
};
pub use props::{CategoryKey, PropBag, PropValue};
