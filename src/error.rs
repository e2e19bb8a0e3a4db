//! Application error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{CommunityId, LinkId, NodeId};

/// Application-level errors for VidiGraph.
#[derive(Error, Debug)]
pub enum AppError {
    // Load errors
    #[error("Layout file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // Structural errors
    #[error("Duplicate {kind} ID: {id}")]
    DuplicateId { kind: &'static str, id: i32 },

    #[error("Root node {0} not found")]
    MissingRoot(NodeId),

    #[error("Node {node} references missing ancestor {ancestor}")]
    MissingAncestor { node: NodeId, ancestor: NodeId },

    #[error("Cyclic ancestry detected at node {0}")]
    CyclicAncestry(NodeId),

    #[error("Link {link} references unknown node {node}")]
    UnknownNode { link: LinkId, node: NodeId },

    #[error("Link {link} connects virtual node {node}")]
    VirtualLinkEndpoint { link: LinkId, node: NodeId },

    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    #[error("Layout variant missing: {0}")]
    MissingLayout(&'static str),

    // Runtime errors
    #[error("Community not found: {0}")]
    CommunityNotFound(CommunityId),

    #[error("Subnetwork not found: {0}")]
    SubnetworkNotFound(u32),

    #[error("No nodes selected in subnetwork {0}")]
    EmptySelection(u32),

    #[error("The main network cannot be removed")]
    MainNetworkRemoval,

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    // Persistence errors
    #[error("Neo4j connection error: {0}")]
    Connection(#[from] neo4rs::Error),

    #[error("Neo4j query error: {message}")]
    Query { message: String, query: String },

    #[error("CSV dump error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Whether the error happened while building the graph (fatal at load).
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            AppError::MissingFile(_)
                | AppError::Io { .. }
                | AppError::Json { .. }
                | AppError::DuplicateId { .. }
                | AppError::MissingRoot(_)
                | AppError::MissingAncestor { .. }
                | AppError::CyclicAncestry(_)
                | AppError::UnknownNode { .. }
                | AppError::VirtualLinkEndpoint { .. }
                | AppError::MalformedTree(_)
                | AppError::MissingLayout(_)
        )
    }
}
